//! Signing workflow integration tests
//!
//! Drives the controller against the in-memory store with generated PDFs and
//! signature images:
//! - Buyer then seller signing of one quote
//! - Idempotent re-signing
//! - Authentication and missing-original failures
//! - Concurrent signing of one role

mod common;

use bytes::Bytes;
use countersign::store::DocumentStore;
use countersign::types::{BlobKind, QuoteStatus, Role};
use countersign::CountersignError;

use common::{cm_operands, letter_pdf, page_count, png, Fixture};

// =============================================================================
// Two-party scenario
// =============================================================================

#[tokio::test]
async fn test_buyer_then_seller_reaches_fully_signed() {
    let fx = Fixture::new();
    fx.seed("Q-100", "tok-b", "tok-s", Some(letter_pdf(1))).await;

    let buyer = fx
        .controller
        .sign("tok-b", png(360, 120, [0, 0, 0, 255]))
        .await
        .unwrap();
    assert_eq!(buyer.quote_id, "Q-100");
    assert_eq!(buyer.role, Role::Buyer);
    assert!(!buyer.reused);
    assert_eq!(
        cm_operands(&buyer.bytes, 1),
        vec![vec![180.0, 0.0, 0.0, 60.0, 120.0, 120.0]]
    );

    let quote = fx.store.find_quote("Q-100").await.unwrap().unwrap();
    assert_eq!(quote.status, QuoteStatus::BuyerSigned);
    assert!(quote.buyer.signed);
    assert!(quote.buyer.signed_at.is_some());
    assert!(quote.buyer.signed_artifact_ref.is_some());
    assert!(!quote.seller.signed);

    let seller = fx
        .controller
        .sign("tok-s", png(360, 120, [0, 0, 255, 255]))
        .await
        .unwrap();
    assert_eq!(seller.role, Role::Seller);
    // Each party signs its own copy of the original
    assert_eq!(
        cm_operands(&seller.bytes, 1),
        vec![vec![180.0, 0.0, 0.0, 60.0, 380.0, 120.0]]
    );

    let quote = fx.store.find_quote("Q-100").await.unwrap().unwrap();
    assert_eq!(quote.status, QuoteStatus::FullySigned);
    assert_eq!(quote.status, quote.derived_status());
}

#[tokio::test]
async fn test_seller_first_is_seller_signed() {
    let fx = Fixture::new();
    fx.seed("Q-200", "b-200", "s-200", Some(letter_pdf(1))).await;

    fx.controller
        .sign("s-200", png(90, 30, [0, 0, 0, 255]))
        .await
        .unwrap();

    let quote = fx.store.find_quote("Q-200").await.unwrap().unwrap();
    assert_eq!(quote.status, QuoteStatus::SellerSigned);
    assert!(!quote.buyer.signed);
}

#[tokio::test]
async fn test_session_tracks_signing() {
    let fx = Fixture::new();
    fx.seed("Q-100", "tok-b", "tok-s", Some(letter_pdf(1))).await;

    let before = fx.controller.session("tok-b").await.unwrap();
    assert_eq!(before.role, Role::Buyer);
    assert!(!before.signed);

    fx.controller
        .sign("tok-b", png(20, 10, [0, 0, 0, 255]))
        .await
        .unwrap();

    assert!(fx.controller.session("tok-b").await.unwrap().signed);
    assert!(!fx.controller.session("tok-s").await.unwrap().signed);
}

// =============================================================================
// Idempotence
// =============================================================================

#[tokio::test]
async fn test_resigning_returns_first_artifact() {
    let fx = Fixture::new();
    fx.seed("Q-100", "tok-b", "tok-s", Some(letter_pdf(1))).await;

    let first = fx
        .controller
        .sign("tok-b", png(360, 120, [0, 0, 0, 255]))
        .await
        .unwrap();
    let second = fx
        .controller
        .sign("tok-b", png(50, 200, [255, 0, 0, 255]))
        .await
        .unwrap();

    assert_eq!(first.bytes, second.bytes);
    assert!(second.reused);
    assert_eq!(
        fx.store
            .blob_count(BlobKind::Signed, "Q-100", Some(Role::Buyer))
            .await,
        1
    );

    let quote = fx.store.find_quote("Q-100").await.unwrap().unwrap();
    assert_eq!(quote.status, QuoteStatus::BuyerSigned);
}

#[tokio::test]
async fn test_resigning_ignores_invalid_image() {
    let fx = Fixture::new();
    fx.seed("Q-100", "tok-b", "tok-s", Some(letter_pdf(1))).await;

    let first = fx
        .controller
        .sign("tok-b", png(40, 20, [0, 0, 0, 255]))
        .await
        .unwrap();
    let again = fx
        .controller
        .sign("tok-b", Bytes::from_static(b"not an image"))
        .await
        .unwrap();
    assert_eq!(first.bytes, again.bytes);
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_unknown_token_is_unauthorized() {
    let fx = Fixture::new();
    fx.seed("Q-100", "tok-b", "tok-s", Some(letter_pdf(1))).await;

    let err = fx
        .controller
        .sign("unknown-token", png(10, 10, [0, 0, 0, 255]))
        .await
        .unwrap_err();
    assert!(matches!(err, CountersignError::Unauthorized));
    assert_eq!(err.status_code(), hyper::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_missing_original_leaves_quote_pending() {
    let fx = Fixture::new();
    fx.seed("Q-300", "b-300", "s-300", None).await;

    let err = fx
        .controller
        .sign("b-300", png(10, 10, [0, 0, 0, 255]))
        .await
        .unwrap_err();
    assert!(matches!(err, CountersignError::MissingOriginal(_)));
    assert!(!err.is_retryable());

    let quote = fx.store.find_quote("Q-300").await.unwrap().unwrap();
    assert_eq!(quote.status, QuoteStatus::Pending);
    assert_eq!(
        fx.store
            .blob_count(BlobKind::Signed, "Q-300", Some(Role::Buyer))
            .await,
        0
    );
}

#[tokio::test]
async fn test_zero_width_image_is_invalid_image() {
    let fx = Fixture::new();
    fx.seed("Q-100", "tok-b", "tok-s", Some(letter_pdf(1))).await;

    // PNG header whose IHDR declares a width of zero
    let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
    bytes.extend_from_slice(&13u32.to_be_bytes());
    bytes.extend_from_slice(b"IHDR");
    bytes.extend_from_slice(&0u32.to_be_bytes());
    bytes.extend_from_slice(&10u32.to_be_bytes());
    bytes.extend_from_slice(&[8, 6, 0, 0, 0]);
    bytes.extend_from_slice(&[0, 0, 0, 0]);

    let err = fx
        .controller
        .sign("tok-b", Bytes::from(bytes))
        .await
        .unwrap_err();
    assert!(matches!(err, CountersignError::InvalidImage(_)));

    let quote = fx.store.find_quote("Q-100").await.unwrap().unwrap();
    assert!(!quote.buyer.signed);
}

#[tokio::test]
async fn test_corrupt_original_is_invalid_document() {
    let fx = Fixture::new();
    fx.seed("Q-400", "b-400", "s-400", Some(b"%PDF-1.7 truncated".to_vec()))
        .await;

    let err = fx
        .controller
        .sign("b-400", png(10, 10, [0, 0, 0, 255]))
        .await
        .unwrap_err();
    assert!(matches!(err, CountersignError::InvalidDocument(_)));
}

// =============================================================================
// Documents and determinism
// =============================================================================

#[tokio::test]
async fn test_multi_page_quote_keeps_later_pages() {
    let fx = Fixture::new();
    fx.seed("Q-500", "b-500", "s-500", Some(letter_pdf(3))).await;

    let signed = fx
        .controller
        .sign("b-500", png(180, 90, [0, 0, 0, 255]))
        .await
        .unwrap();

    assert_eq!(page_count(&signed.bytes), 3);
    assert_eq!(cm_operands(&signed.bytes, 1).len(), 1);
    assert!(cm_operands(&signed.bytes, 2).is_empty());
    assert!(cm_operands(&signed.bytes, 3).is_empty());
}

#[tokio::test]
async fn test_same_inputs_same_output() {
    let a = Fixture::new();
    let b = Fixture::new();
    a.seed("Q-600", "b-600", "s-600", Some(letter_pdf(1))).await;
    b.seed("Q-600", "b-600", "s-600", Some(letter_pdf(1))).await;

    let image = png(300, 100, [12, 34, 56, 200]);
    let one = a.controller.sign("s-600", image.clone()).await.unwrap();
    let two = b.controller.sign("s-600", image).await.unwrap();

    assert_eq!(one.bytes, two.bytes);
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_signs_agree_on_one_artifact() {
    let fx = Fixture::new();
    fx.seed("Q-700", "b-700", "s-700", Some(letter_pdf(1))).await;

    // Different images so the two composed PDFs differ
    let (first, second) = tokio::join!(
        fx.controller.sign("b-700", png(100, 50, [0, 0, 0, 255])),
        fx.controller.sign("b-700", png(100, 20, [255, 0, 0, 255])),
    );
    let first = first.unwrap();
    let second = second.unwrap();

    assert_eq!(first.bytes, second.bytes);

    let quote = fx.store.find_quote("Q-700").await.unwrap().unwrap();
    let referenced = fx
        .store
        .get_blob_by_ref(quote.buyer.signed_artifact_ref.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(referenced, first.bytes);
    assert_eq!(quote.status, QuoteStatus::BuyerSigned);
}
