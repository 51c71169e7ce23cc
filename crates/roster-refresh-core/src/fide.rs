// FIDE rating lookup. Best-effort: failures become a cell value, never an
// error for the caller.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::FideConfig;
use crate::http::{get_json_lenient, lenient_text, JsonResponse, LookupError};

/// `GET {api}{fide_id}`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FideRatingResponse {
    #[serde(default, deserialize_with = "lenient_text")]
    pub rating: Option<String>,
}

/// The secondary rating cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecondaryRating {
    Rated(String),
    /// No usable FIDE id, or the player has no rating.
    NotApplicable,
    /// The lookup itself failed.
    Failed,
}

impl fmt::Display for SecondaryRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecondaryRating::Rated(value) => f.write_str(value),
            SecondaryRating::NotApplicable => f.write_str("N/A"),
            SecondaryRating::Failed => f.write_str("Error"),
        }
    }
}

/// Returns the trimmed id if it is non-empty and all ASCII digits. An id of
/// only zeros is the ECF's placeholder for "no FIDE registration".
pub fn numeric_fide_id(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    let digits = !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit());
    (digits && !trimmed.bytes().all(|b| b == b'0')).then_some(trimmed)
}

// ---------------------------------------------------------------------------
// FideApi
// ---------------------------------------------------------------------------

#[async_trait]
pub trait FideApi: Send + Sync {
    async fn player_rating(&self, fide_id: &str) -> Result<FideRatingResponse, LookupError>;
}

/// reqwest-backed [`FideApi`] with a bounded request timeout.
pub struct FideClient {
    http: reqwest::Client,
    api_url: String,
}

impl FideClient {
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: reqwest::Client::builder().timeout(timeout).build()?,
            api_url: api_url.into(),
        })
    }

    pub fn from_config(config: &FideConfig) -> Result<Self, reqwest::Error> {
        Self::new(
            config.api_url.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }
}

#[async_trait]
impl FideApi for FideClient {
    async fn player_rating(&self, fide_id: &str) -> Result<FideRatingResponse, LookupError> {
        let url = format!("{}{fide_id}", self.api_url);
        match get_json_lenient(&self.http, &url).await? {
            JsonResponse::Ok(response) => Ok(response),
            // A miss is "no rating", not a failure.
            JsonResponse::NotOk(status) => {
                debug!(fide_id, %status, "FIDE lookup returned non-success status");
                Ok(FideRatingResponse::default())
            }
        }
    }
}

/// Resolve the secondary rating cell for a raw FIDE id.
pub async fn secondary_rating<A: FideApi + ?Sized>(api: &A, raw_id: &str) -> SecondaryRating {
    let Some(fide_id) = numeric_fide_id(raw_id) else {
        return SecondaryRating::NotApplicable;
    };

    match api.player_rating(fide_id).await {
        Ok(FideRatingResponse {
            rating: Some(rating),
        }) => SecondaryRating::Rated(rating),
        Ok(_) => SecondaryRating::NotApplicable,
        Err(e) => {
            warn!(fide_id, "FIDE lookup failed: {e}");
            SecondaryRating::Failed
        }
    }
}
