//! Chunked upload integration tests.

mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::{sample_png, split_chunks, TestHarness};

use scavhunt_core::parse_timestamp;
use scavhunt_core::schema::TASK_STATUS;

// ============================================================================
// The happy path
// ============================================================================

#[tokio::test]
async fn a_single_chunk_runs_the_whole_pipeline() {
    let harness = TestHarness::new().await;
    let token = harness.player("alice").await;
    let png = sample_png();

    let response = harness
        .send_chunk(&token, "Find a cat", "proof.png", 0, 1, png.clone())
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["state"], "done");
    assert_eq!(body["filename"], "Find-a-cat_proof.png");

    // Both variants landed; the original bytes are untouched and the
    // compressed copy is a JPEG.
    let original = harness
        .bucket
        .object_bytes("alice/Find-a-cat_proof.png")
        .await
        .expect("original stored");
    assert_eq!(original, png);
    let compressed = harness
        .bucket
        .object_bytes("alice/compressed/Find-a-cat_proof.png")
        .await
        .expect("compressed stored");
    assert_eq!(&compressed[..2], &[0xFF, 0xD8]);

    // The activity cell is pending and the status log gained a row.
    let grid = harness.tables.raw("1_point").await.unwrap();
    assert_eq!(grid[0], vec!["Activities".to_string(), "alice".to_string()]);
    assert_eq!(grid[1][1], "0");

    let log = harness.tables.raw(TASK_STATUS).await.unwrap();
    let row = log.last().unwrap();
    assert!(parse_timestamp(&row[0]).is_some());
    assert_eq!(&row[1..], &["alice", "Find a cat", "", ""]);
}

#[tokio::test]
async fn chunks_arrive_out_of_order_and_the_final_retry_completes() {
    let harness = TestHarness::new().await;
    let token = harness.player("alice").await;
    let png = sample_png();
    let chunks = split_chunks(&png, 3);

    // The final chunk first: reassembly finds chunk 0 missing and the
    // stored part stays put for the retry.
    let premature = harness
        .send_chunk(&token, "Find a cat", "proof.png", 2, 3, chunks[2].clone())
        .await;
    premature.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = premature.json();
    assert_eq!(body["error"]["code"], "missing_chunk");
    assert_eq!(body["error"]["details"]["index"], 0);

    for index in [0, 1] {
        let response = harness
            .send_chunk(
                &token,
                "Find a cat",
                "proof.png",
                index,
                3,
                chunks[index as usize].clone(),
            )
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["state"], "receiving");
    }

    let done = harness
        .send_chunk(&token, "Find a cat", "proof.png", 2, 3, chunks[2].clone())
        .await;
    done.assert_status_ok();
    let body: serde_json::Value = done.json();
    assert_eq!(body["state"], "done");

    // Reassembly was byte-identical.
    let original = harness
        .bucket
        .object_bytes("alice/Find-a-cat_proof.png")
        .await
        .expect("original stored");
    assert_eq!(original, png);
}

// ============================================================================
// Rejections
// ============================================================================

#[tokio::test]
async fn unsupported_extensions_are_rejected_before_storage() {
    let harness = TestHarness::new().await;
    let token = harness.player("alice").await;

    let response = harness
        .send_chunk(&token, "Find a cat", "notes.txt", 0, 1, b"hi".to_vec())
        .await;
    response.assert_status(StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "unsupported_media_type");

    // Nothing reached the bucket or the status log.
    assert_eq!(harness.bucket.object_count().await, 0);
    assert_eq!(harness.tables.raw(TASK_STATUS).await.unwrap().len(), 1);
}

#[tokio::test]
async fn uploads_outside_the_submission_window_are_refused() {
    let harness = TestHarness::with_config(|c| {
        c.submission_window_end = Some(Utc::now() - Duration::hours(1));
    })
    .await;
    let token = harness.player("alice").await;

    let response = harness
        .send_chunk(&token, "Find a cat", "proof.png", 0, 1, sample_png())
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "submissions_closed");
    assert_eq!(harness.bucket.object_count().await, 0);
}

#[tokio::test]
async fn an_unknown_task_fails_after_the_blob_writes() {
    let harness = TestHarness::new().await;
    let token = harness.player("alice").await;

    let response = harness
        .send_chunk(&token, "No such task", "proof.png", 0, 1, sample_png())
        .await;
    response.assert_status_not_found();

    // The media landed before the task lookup failed; the ledger did not
    // change, so the objects are orphans an organizer can clean up.
    assert!(harness.bucket.contains("alice/No-such-task_proof.png").await);
    assert!(
        harness
            .bucket
            .contains("alice/compressed/No-such-task_proof.png")
            .await
    );
    assert_eq!(harness.tables.raw(TASK_STATUS).await.unwrap().len(), 1);
}

#[tokio::test]
async fn chunk_counts_are_validated() {
    let harness = TestHarness::new().await;
    let token = harness.player("alice").await;

    harness
        .send_chunk(&token, "Find a cat", "proof.png", 0, 0, sample_png())
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    harness
        .send_chunk(&token, "Find a cat", "proof.png", 5, 3, sample_png())
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn uploads_require_a_session() {
    let harness = TestHarness::new().await;

    let form = axum_test::multipart::MultipartForm::new().add_text("task", "Find a cat");
    harness
        .server
        .post("/tasks/upload")
        .multipart(form)
        .await
        .assert_status_unauthorized();
}
