//! Countersign - two-party quote signing service

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use countersign::{
    auth::{TokenAuthenticator, TokenHasher},
    config::Args,
    db::MongoClient,
    server::{self, AppState},
    signing::SigningController,
    store::{DocumentStore, MongoDocumentStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let mut args = Args::parse();
    args.normalize();

    let log_level = args.log_level.clone();
    let registry = tracing_subscriber::registry().with(
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| format!("countersign={},info", log_level).into()),
    );
    if args.log_format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Countersign - quote signing service");
    info!("======================================");
    info!("Version: {} ({})", env!("CARGO_PKG_VERSION"), option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"));
    info!("Listen: {}", args.listen);
    info!("MongoDB: {} / {}", args.redacted_mongo_uri(), args.mongo_db);
    info!("Upload limit: {} bytes", args.max_upload_bytes);
    info!("======================================");

    // Both values are present once validate() has passed
    let mongo_uri = args.mongo_uri.clone().unwrap_or_default();
    let secret = args.sign_secret.clone().unwrap_or_default();

    let hasher = match TokenHasher::new(&secret) {
        Ok(hasher) => hasher,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let mongo = match MongoClient::new(&mongo_uri, &args.mongo_db).await {
        Ok(client) => client,
        Err(e) => {
            error!("MongoDB connection failed: {}", e);
            std::process::exit(1);
        }
    };

    let store: Arc<dyn DocumentStore> = match MongoDocumentStore::new(mongo).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!("MongoDB setup failed: {}", e);
            std::process::exit(1);
        }
    };

    let authenticator = TokenAuthenticator::new(hasher, Arc::clone(&store));
    let controller = SigningController::new(authenticator, store);
    let state = Arc::new(AppState::new(args, controller));

    server::run(state).await?;

    Ok(())
}
