//! Wire types of the policy store HTTP API
//!
//! The store serves the unlock flag and the YouTube timer from two separate
//! resources; a policy fetch reads both and merges them.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};

use crate::{FetchError, FetchResult, Policy};

/// `GET /client/{id}/unlock-status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnlockStatusResponse {
    #[serde(default)]
    pub client_name: Option<String>,
    pub unlock: bool,
    #[serde(default)]
    pub last_updated: Option<String>,
}

/// `GET /client/{id}/youtube-timer`
///
/// The timer is carried as a signed integer so that an out-of-range value
/// surfaces as a malformed response rather than a decode panic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YoutubeTimerResponse {
    #[serde(default)]
    pub client_name: Option<String>,
    pub timer_seconds: i64,
    #[serde(default)]
    pub last_updated: Option<String>,
}

/// Body of `POST /clients/{id}/configure`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfigBody {
    pub unlock_allowed: bool,
    pub youtube_timer_seconds: u32,
}

/// One row of `GET /clients`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSummary {
    pub name: String,
    pub unlock_allowed: bool,
    pub youtube_timer_seconds: i64,
    #[serde(default)]
    pub last_updated: Option<String>,
}

/// `GET /clients`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientListResponse {
    pub clients: Vec<ClientSummary>,
    pub total_clients: usize,
}

/// Acknowledgement returned by the mutating endpoints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MutationResponse {
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// `GET /api`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiMessage {
    pub message: String,
}

impl Policy {
    /// Merge the two store resources into one policy
    pub fn from_wire(
        unlock: &UnlockStatusResponse,
        timer: &YoutubeTimerResponse,
    ) -> FetchResult<Self> {
        let youtube_timer_seconds = u32::try_from(timer.timer_seconds).map_err(|_| {
            FetchError::Malformed(format!(
                "timer_seconds out of range: {}",
                timer.timer_seconds
            ))
        })?;

        let unlock_updated = parse_optional_timestamp(unlock.last_updated.as_deref())?;
        let timer_updated = parse_optional_timestamp(timer.last_updated.as_deref())?;

        Ok(Self {
            unlock_allowed: unlock.unlock,
            youtube_timer_seconds,
            last_updated: unlock_updated.max(timer_updated),
        })
    }
}

fn parse_optional_timestamp(value: Option<&str>) -> FetchResult<Option<DateTime<Local>>> {
    value.map(parse_store_timestamp).transpose()
}

/// Parse a store timestamp.
///
/// Accepts RFC 3339 and naive ISO 8601 (`2025-06-01T12:00:00.123456`),
/// the latter interpreted as local time.
pub fn parse_store_timestamp(value: &str) -> FetchResult<DateTime<Local>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Local));
    }

    let naive = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .map_err(|e| FetchError::Malformed(format!("bad timestamp '{value}': {e}")))?;

    Local
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| FetchError::Malformed(format!("timestamp '{value}' does not exist locally")))
}
