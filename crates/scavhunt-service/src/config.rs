//! Service configuration.

use chrono::{DateTime, Utc};

/// Configuration for the scavhunt service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on.
    pub listen_addr: String,

    /// Scratch directory for upload chunks awaiting reassembly.
    pub scratch_dir: String,

    /// Base URL of the spreadsheet API.
    pub sheets_api_url: String,

    /// API token for the spreadsheet API.
    pub sheets_api_token: String,

    /// Workbook holding the hunt's tables.
    pub workbook_id: String,

    /// Base URL of the blob store API.
    pub blob_api_url: String,

    /// API token for the blob store API.
    pub blob_api_token: String,

    /// Bucket holding uploaded media.
    pub blob_bucket: String,

    /// Shared key that upgrades a session to organizer (optional).
    /// When unset, the approval endpoints cannot be reached.
    pub organizer_access_key: Option<String>,

    /// Idle session lifetime in seconds. Activity refreshes the window.
    pub session_ttl_seconds: u64,

    /// Validity window requested for signed media URLs, in seconds.
    pub signed_url_ttl_seconds: u64,

    /// Earliest instant uploads are accepted (RFC 3339, optional).
    pub submission_window_start: Option<DateTime<Utc>>,

    /// Latest instant uploads are accepted (RFC 3339, optional).
    pub submission_window_end: Option<DateTime<Utc>>,

    /// Offset from UTC, in minutes, used for ledger timestamps.
    pub utc_offset_minutes: i32,

    /// JPEG quality for recompressed images (1-100).
    pub image_quality: u8,

    /// Target video bitrate passed to the encoder (e.g. "400k").
    pub video_bitrate: String,

    /// External video encoder binary.
    pub video_encoder: String,

    /// Age in seconds after which abandoned upload chunks are swept.
    pub chunk_ttl_seconds: u64,

    /// Interval in seconds between chunk sweeps.
    pub chunk_sweep_interval_seconds: u64,

    /// Allowed CORS origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            listen_addr: std::env::var("LISTEN_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            scratch_dir: std::env::var("SCRATCH_DIR")
                .unwrap_or_else(|_| "/data/scavhunt/chunks".to_string()),
            sheets_api_url: std::env::var("SHEETS_API_URL")
                .unwrap_or_else(|_| "http://localhost:9090".to_string()),
            sheets_api_token: std::env::var("SHEETS_API_TOKEN").unwrap_or_default(),
            workbook_id: std::env::var("SHEETS_WORKBOOK_ID")
                .unwrap_or_else(|_| "hunt".to_string()),
            blob_api_url: std::env::var("BLOB_API_URL")
                .unwrap_or_else(|_| "http://localhost:9091".to_string()),
            blob_api_token: std::env::var("BLOB_API_TOKEN").unwrap_or_default(),
            blob_bucket: std::env::var("BLOB_BUCKET")
                .unwrap_or_else(|_| "hunt-media".to_string()),
            organizer_access_key: std::env::var("ORGANIZER_ACCESS_KEY").ok(),
            session_ttl_seconds: std::env::var("SESSION_TTL_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1800),
            signed_url_ttl_seconds: std::env::var("SIGNED_URL_TTL_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3600),
            submission_window_start: parse_instant("SUBMISSION_WINDOW_START"),
            submission_window_end: parse_instant("SUBMISSION_WINDOW_END"),
            utc_offset_minutes: std::env::var("UTC_OFFSET_MINUTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(600),
            image_quality: std::env::var("IMAGE_QUALITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(50),
            video_bitrate: std::env::var("VIDEO_BITRATE")
                .unwrap_or_else(|_| "400k".to_string()),
            video_encoder: std::env::var("VIDEO_ENCODER")
                .unwrap_or_else(|_| "ffmpeg".to_string()),
            chunk_ttl_seconds: std::env::var("CHUNK_TTL_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3600),
            chunk_sweep_interval_seconds: std::env::var("CHUNK_SWEEP_INTERVAL_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(300),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            max_body_bytes: std::env::var("MAX_BODY_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10 * 1024 * 1024),
            request_timeout_seconds: std::env::var("REQUEST_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60),
        }
    }

    /// Whether uploads are accepted at `now`.
    ///
    /// An unset bound is open on that side; with neither bound set,
    /// submissions are always open.
    #[must_use]
    pub fn submissions_open(&self, now: DateTime<Utc>) -> bool {
        if let Some(start) = self.submission_window_start {
            if now < start {
                return false;
            }
        }
        if let Some(end) = self.submission_window_end {
            if now > end {
                return false;
            }
        }
        true
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            scratch_dir: "/data/scavhunt/chunks".to_string(),
            sheets_api_url: "http://localhost:9090".to_string(),
            sheets_api_token: String::new(),
            workbook_id: "hunt".to_string(),
            blob_api_url: "http://localhost:9091".to_string(),
            blob_api_token: String::new(),
            blob_bucket: "hunt-media".to_string(),
            organizer_access_key: None,
            session_ttl_seconds: 1800,
            signed_url_ttl_seconds: 3600,
            submission_window_start: None,
            submission_window_end: None,
            utc_offset_minutes: 600,
            image_quality: 50,
            video_bitrate: "400k".to_string(),
            video_encoder: "ffmpeg".to_string(),
            chunk_ttl_seconds: 3600,
            chunk_sweep_interval_seconds: 300,
            cors_origins: vec!["*".to_string()],
            max_body_bytes: 10 * 1024 * 1024,
            request_timeout_seconds: 60,
        }
    }
}

fn parse_instant(var: &str) -> Option<DateTime<Utc>> {
    std::env::var(var)
        .ok()
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|t| t.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, hour, 0, 0).single().unwrap()
    }

    #[test]
    fn submissions_open_with_no_window() {
        let config = ServiceConfig::default();
        assert!(config.submissions_open(at(12)));
    }

    #[test]
    fn submissions_respect_both_bounds() {
        let config = ServiceConfig {
            submission_window_start: Some(at(9)),
            submission_window_end: Some(at(17)),
            ..ServiceConfig::default()
        };
        assert!(!config.submissions_open(at(8)));
        assert!(config.submissions_open(at(9)));
        assert!(config.submissions_open(at(12)));
        assert!(config.submissions_open(at(17)));
        assert!(!config.submissions_open(at(18)));
    }

    #[test]
    fn submissions_with_one_bound_are_half_open() {
        let ends_only = ServiceConfig {
            submission_window_end: Some(at(17)),
            ..ServiceConfig::default()
        };
        assert!(ends_only.submissions_open(at(0)));
        assert!(!ends_only.submissions_open(at(18)));

        let starts_only = ServiceConfig {
            submission_window_start: Some(at(9)),
            ..ServiceConfig::default()
        };
        assert!(!starts_only.submissions_open(at(8)));
        assert!(starts_only.submissions_open(at(23)));
    }
}
