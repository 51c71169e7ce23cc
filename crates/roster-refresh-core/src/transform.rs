// Per-row enrichment: code extraction, ECF and FIDE lookups, and rebuilding
// the leading nine roster columns.

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::code::{extract_code, PlayerCode};
use crate::config::{Config, LookupFailurePolicy};
use crate::ecf::{lookup_player, EcfApi};
use crate::fide::{numeric_fide_id, secondary_rating, FideApi};
use crate::http::LookupError;

/// Number of leading columns replaced on an enriched row. Columns from this
/// index onwards are carried over untouched.
pub const ENRICHED_COLUMNS: usize = 9;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A failed ECF lookup under [`LookupFailurePolicy::Abort`].
#[derive(Debug, Error)]
#[error("ECF lookup failed for player {code}: {source}")]
pub struct RowError {
    pub code: PlayerCode,
    #[source]
    pub source: LookupError,
}

/// What happened to one input row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    /// Empty row, written back as an empty line.
    Blank,
    /// No player code in column 0; row is unchanged.
    NoCode(Vec<String>),
    Enriched(Vec<String>),
    /// Lookup failed under [`LookupFailurePolicy::KeepRow`]; row is unchanged.
    Kept(Vec<String>),
}

impl RowOutcome {
    pub fn into_row(self) -> Vec<String> {
        match self {
            RowOutcome::Blank => Vec::new(),
            RowOutcome::NoCode(row) | RowOutcome::Enriched(row) | RowOutcome::Kept(row) => row,
        }
    }
}

/// Link prefixes for the two generated anchor cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileLinks {
    pub ecf_prefix: String,
    pub fide_prefix: String,
}

impl ProfileLinks {
    pub fn from_config(config: &Config) -> Self {
        Self {
            ecf_prefix: config.ecf.profile_url.clone(),
            fide_prefix: config.fide.profile_url.clone(),
        }
    }

    pub fn ecf_cell(&self, code: &PlayerCode) -> String {
        anchor(&self.ecf_prefix, code.as_str())
    }

    /// An anchor for a numeric FIDE id; anything else is written as-is.
    pub fn fide_cell(&self, raw_id: &str) -> String {
        match numeric_fide_id(raw_id) {
            Some(id) => anchor(&self.fide_prefix, id),
            None => raw_id.to_string(),
        }
    }
}

impl Default for ProfileLinks {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

fn anchor(prefix: &str, label: &str) -> String {
    format!(r#"<a href="{prefix}{label}" target="_blank">{label}</a>"#)
}

/// Split an ECF full name into `(first, last)`.
///
/// `"Last, First"` splits at the first comma. Otherwise the first whitespace
/// token is the first name and the rest, single-spaced, the last name.
pub fn split_name(full_name: &str) -> (String, String) {
    if let Some((last, first)) = full_name.split_once(',') {
        return (first.trim().to_string(), last.trim().to_string());
    }

    let mut tokens = full_name.split_whitespace();
    let first = tokens.next().unwrap_or_default().to_string();
    let last = tokens.collect::<Vec<_>>().join(" ");
    (first, last)
}

// ---------------------------------------------------------------------------
// RowTransformer
// ---------------------------------------------------------------------------

pub struct RowTransformer<E, F> {
    ecf: E,
    fide: F,
    rating_date: NaiveDate,
    links: ProfileLinks,
    policy: LookupFailurePolicy,
}

impl<E: EcfApi, F: FideApi> RowTransformer<E, F> {
    /// `rating_date` is fixed for the whole run.
    pub fn new(
        ecf: E,
        fide: F,
        rating_date: NaiveDate,
        links: ProfileLinks,
        policy: LookupFailurePolicy,
    ) -> Self {
        Self {
            ecf,
            fide,
            rating_date,
            links,
            policy,
        }
    }

    pub fn rating_date(&self) -> NaiveDate {
        self.rating_date
    }

    pub async fn transform(&self, row: Vec<String>) -> Result<RowOutcome, RowError> {
        if row.is_empty() {
            return Ok(RowOutcome::Blank);
        }

        let Some(code) = extract_code(row[0].trim()) else {
            debug!(cell = %row[0], "no player code, passing row through");
            return Ok(RowOutcome::NoCode(row));
        };

        let player = match lookup_player(&self.ecf, &code, self.rating_date).await {
            Ok(player) => player,
            Err(source) => match self.policy {
                LookupFailurePolicy::Abort => return Err(RowError { code, source }),
                LookupFailurePolicy::KeepRow => {
                    warn!(%code, "ECF lookup failed, keeping row unchanged: {source}");
                    return Ok(RowOutcome::Kept(row));
                }
            },
        };

        let (first, last) = split_name(&player.full_name);
        let fide_rating = secondary_rating(&self.fide, &player.fide_id).await;

        let mut enriched = Vec::with_capacity(row.len().max(ENRICHED_COLUMNS));
        enriched.extend([
            self.links.ecf_cell(&code),
            self.links.fide_cell(&player.fide_id),
            first,
            last,
            player.rating,
            fide_rating.to_string(),
            player.membership,
            player.expiry,
            player.club,
        ]);
        enriched.extend(row.into_iter().skip(ENRICHED_COLUMNS));

        info!(%code, name = %player.full_name, fide = %fide_rating, "row enriched");
        Ok(RowOutcome::Enriched(enriched))
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
