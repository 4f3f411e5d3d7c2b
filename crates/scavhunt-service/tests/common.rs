//! Common test utilities for scavhunt integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::Router;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::{TestResponse, TestServer};
use serde_json::json;
use tempfile::TempDir;

use scavhunt_core::schema::{
    HISTORY, HISTORY_HEADER, TASK_STATUS, TASK_STATUS_HEADER, TOTALS, TOTALS_HEADER, USER_INFO,
    USER_INFO_HEADER,
};
use scavhunt_service::{create_router, AppState, ServiceConfig};
use scavhunt_store::{BlobApi, MemoryBucket, MemoryTables, TableApi};

/// The organizer access key every harness is configured with.
pub const ACCESS_KEY: &str = "night-owls";

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// The in-memory workbook behind the ledger, for seeding and assertions.
    pub tables: Arc<MemoryTables>,
    /// The in-memory bucket behind the media store.
    pub bucket: Arc<MemoryBucket>,
    /// Scratch directory for upload chunks (kept alive for test duration).
    pub _scratch: TempDir,
}

impl TestHarness {
    /// Create a test harness over a freshly seeded workbook.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a harness with the configuration adjusted before startup.
    pub async fn with_config(adjust: impl FnOnce(&mut ServiceConfig)) -> Self {
        let tables = Arc::new(MemoryTables::new());
        seed_workbook(&tables).await;
        let bucket = Arc::new(MemoryBucket::new());
        let scratch = TempDir::new().expect("Failed to create scratch directory");

        let mut config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            scratch_dir: scratch.path().to_string_lossy().to_string(),
            organizer_access_key: Some(ACCESS_KEY.to_string()),
            session_ttl_seconds: 60,
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
            ..ServiceConfig::default()
        };
        adjust(&mut config);

        let state = AppState::new(
            Arc::clone(&tables) as Arc<dyn TableApi>,
            Arc::clone(&bucket) as Arc<dyn BlobApi>,
            config,
        );
        let router: Router = create_router(state);
        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            tables,
            bucket,
            _scratch: scratch,
        }
    }

    /// Register a player, asserting success.
    pub async fn register(&self, username: &str, password: &str, nickname: &str) {
        self.server
            .post("/auth/register")
            .json(&json!({
                "username": username,
                "password": password,
                "nickname": nickname,
            }))
            .await
            .assert_status_ok();
    }

    /// Log a player in and return the session token.
    pub async fn login(&self, username: &str, password: &str) -> String {
        let response = self
            .server
            .post("/auth/login")
            .json(&json!({ "username": username, "password": password }))
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        body["token"]
            .as_str()
            .expect("token in login response")
            .to_string()
    }

    /// Register and log in, returning the token.
    pub async fn player(&self, username: &str) -> String {
        self.register(username, "hunter2", username).await;
        self.login(username, "hunter2").await
    }

    /// Register a player and upgrade their session to organizer.
    pub async fn organizer(&self) -> String {
        let token = self.player("judge").await;
        self.server
            .post("/approve/login")
            .add_header("authorization", bearer(&token))
            .json(&json!({ "access_key": ACCESS_KEY }))
            .await
            .assert_status_ok();
        token
    }

    /// Send one chunk of an upload.
    pub async fn send_chunk(
        &self,
        token: &str,
        task: &str,
        file_name: &str,
        index: u32,
        total: u32,
        bytes: Vec<u8>,
    ) -> TestResponse {
        let form = MultipartForm::new()
            .add_text("task", task)
            .add_text("file_name", file_name)
            .add_text("chunk_index", index.to_string())
            .add_text("total_chunks", total.to_string())
            .add_part(
                "chunk",
                Part::bytes(bytes).file_name(file_name.to_string()),
            );
        self.server
            .post("/tasks/upload")
            .add_header("authorization", bearer(token))
            .multipart(form)
            .await
    }

    /// Upload a whole file in one chunk, asserting completion.
    pub async fn upload_file(&self, token: &str, task: &str, file_name: &str, bytes: Vec<u8>) {
        let response = self.send_chunk(token, task, file_name, 0, 1, bytes).await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["state"], "done");
    }
}

/// `Bearer {token}` for the authorization header.
pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

/// A tiny valid PNG for upload tests.
pub fn sample_png() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(8, 8, image::Rgb([200, 30, 30]));
    let mut png = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut png, image::ImageFormat::Png)
        .expect("encode sample png");
    png.into_inner()
}

/// Split bytes into `total` chunks the way an uploading client would.
pub fn split_chunks(bytes: &[u8], total: u32) -> Vec<Vec<u8>> {
    let size = bytes.len().div_ceil(total as usize).max(1);
    let mut chunks: Vec<Vec<u8>> = bytes.chunks(size).map(<[u8]>::to_vec).collect();
    while chunks.len() < total as usize {
        chunks.push(Vec::new());
    }
    chunks
}

/// Build owned rows from string literals.
pub fn rows(raw: &[&[&str]]) -> Vec<Vec<String>> {
    raw.iter()
        .map(|r| r.iter().map(|c| (*c).to_string()).collect())
        .collect()
}

/// A one-row grid holding just the header.
pub fn header(cells: &[&str]) -> Vec<Vec<String>> {
    vec![cells.iter().map(|c| (*c).to_string()).collect()]
}

/// Seed the nine hunt tables: an empty roster, five tier tables with a
/// few tasks each, and the three empty logs.
async fn seed_workbook(tables: &MemoryTables) {
    tables.insert_table(USER_INFO, header(&USER_INFO_HEADER)).await;
    tables
        .insert_table(
            "1_point",
            rows(&[&["Activities"], &["Find a cat"], &["Find a dog"]]),
        )
        .await;
    tables
        .insert_table("3_point", rows(&[&["Activities"], &["Busk a song"]]))
        .await;
    tables
        .insert_table("5_point", rows(&[&["Activities"], &["Climb a hill"]]))
        .await;
    tables
        .insert_table("7_point", rows(&[&["Activities"], &["Swim at dawn"]]))
        .await;
    tables
        .insert_table("10_point", rows(&[&["Activities"], &["Ride every tram"]]))
        .await;
    tables.insert_table(TOTALS, header(&TOTALS_HEADER)).await;
    tables.insert_table(HISTORY, header(&HISTORY_HEADER)).await;
    tables
        .insert_table(TASK_STATUS, header(&TASK_STATUS_HEADER))
        .await;
}
