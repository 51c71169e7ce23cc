// ECF rating API client: player profile and current rating lookups.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;

use crate::code::PlayerCode;
use crate::config::EcfConfig;
use crate::http::{get_json, lenient_text, LookupError};

// ---------------------------------------------------------------------------
// Response shapes
// ---------------------------------------------------------------------------

/// `GET {api}/players/code/{code}`. Only the fields the roster needs.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PlayerProfile {
    #[serde(default, deserialize_with = "lenient_text")]
    pub full_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub club_name: Option<String>,
    #[serde(default, rename = "FIDE_no", deserialize_with = "lenient_text")]
    pub fide_no: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub due_date: Option<String>,
}

/// `GET {api}/ratings/{type}/{code}/{date}`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RatingResponse {
    #[serde(default, deserialize_with = "lenient_text")]
    pub original_rating: Option<String>,
}

/// Everything the row transformer needs about one player. Missing upstream
/// fields are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerRecord {
    pub full_name: String,
    pub club: String,
    pub fide_id: String,
    pub membership: String,
    pub expiry: String,
    pub rating: String,
}

// ---------------------------------------------------------------------------
// EcfApi
// ---------------------------------------------------------------------------

#[async_trait]
pub trait EcfApi: Send + Sync {
    async fn profile(&self, code: &PlayerCode) -> Result<PlayerProfile, LookupError>;

    async fn rating(
        &self,
        code: &PlayerCode,
        date: NaiveDate,
    ) -> Result<RatingResponse, LookupError>;
}

/// reqwest-backed [`EcfApi`].
pub struct EcfClient {
    http: reqwest::Client,
    api_url: String,
    rating_type: String,
}

impl EcfClient {
    pub fn new(
        api_url: impl Into<String>,
        rating_type: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            rating_type: rating_type.into(),
        })
    }

    pub fn from_config(config: &EcfConfig) -> Result<Self, reqwest::Error> {
        Self::new(
            config.api_url.clone(),
            config.rating_type.clone(),
            config.timeout_secs.map(Duration::from_secs),
        )
    }

    fn profile_url(&self, code: &PlayerCode) -> String {
        format!("{}/players/code/{code}", self.api_url)
    }

    fn rating_url(&self, code: &PlayerCode, date: NaiveDate) -> String {
        format!(
            "{}/ratings/{}/{code}/{}",
            self.api_url,
            self.rating_type,
            date.format("%Y-%m-%d")
        )
    }
}

#[async_trait]
impl EcfApi for EcfClient {
    async fn profile(&self, code: &PlayerCode) -> Result<PlayerProfile, LookupError> {
        get_json(&self.http, &self.profile_url(code)).await
    }

    async fn rating(
        &self,
        code: &PlayerCode,
        date: NaiveDate,
    ) -> Result<RatingResponse, LookupError> {
        get_json(&self.http, &self.rating_url(code, date)).await
    }
}

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

/// Fetch the profile and the rating on `date` for `code`, one after the other.
/// Either failure is returned as-is; containment is the caller's decision.
pub async fn lookup_player<A: EcfApi + ?Sized>(
    api: &A,
    code: &PlayerCode,
    date: NaiveDate,
) -> Result<PlayerRecord, LookupError> {
    let profile = api.profile(code).await?;
    let rating = api.rating(code, date).await?;
    debug!(%code, ?profile, ?rating, "ECF lookup complete");

    Ok(PlayerRecord {
        full_name: profile.full_name.unwrap_or_default(),
        club: profile.club_name.unwrap_or_default(),
        fide_id: profile
            .fide_no
            .filter(|id| !id.trim().bytes().all(|b| b == b'0'))
            .unwrap_or_default(),
        membership: profile.category.unwrap_or_default(),
        expiry: profile.due_date.unwrap_or_default(),
        rating: rating.original_rating.unwrap_or_default(),
    })
}
