// Configuration loading and validation (config/refresh.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("refresh config {path} does not exist")]
    FileNotFound { path: PathBuf },

    #[error("refresh config {path} is not valid TOML for roster-refresh: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("refresh config setting `{field}` {message}")]
    ValidationError { field: String, message: String },
}

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

/// Location of the config file relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/refresh.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub run: RunConfig,
    pub ecf: EcfConfig,
    pub fide: FideConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Roster CSV read when no input is given on the command line.
    pub input: String,
    pub on_lookup_failure: LookupFailurePolicy,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            input: "entries.csv".into(),
            on_lookup_failure: LookupFailurePolicy::Abort,
        }
    }
}

/// What to do with a row whose ECF profile or rating lookup fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LookupFailurePolicy {
    /// Stop the run with an error. Rows already written stay in the output.
    #[default]
    Abort,
    /// Write the original row unchanged and carry on.
    KeepRow,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EcfConfig {
    pub api_url: String,
    /// Prefix the player code is appended to for the roster link.
    pub profile_url: String,
    /// `S` (standard) or `R` (rapid).
    pub rating_type: String,
    pub timeout_secs: Option<u64>,
}

impl Default for EcfConfig {
    fn default() -> Self {
        Self {
            api_url: "https://rating.englishchess.org.uk/v2/new/api.php?v2".into(),
            profile_url: "https://rating.englishchess.org.uk/players?player_no=".into(),
            rating_type: "S".into(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FideConfig {
    pub api_url: String,
    pub profile_url: String,
    pub timeout_secs: u64,
}

impl Default for FideConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.chesstools.org/fide/".into(),
            profile_url: "https://ratings.fide.com/profile/".into(),
            timeout_secs: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Parse and validate a config from TOML text. `path` is only used in errors.
pub fn parse_config(text: &str, path: &Path) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;
    validate(&config)?;
    Ok(config)
}

/// Load and validate the config file at `path`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })?;
    parse_config(&text, path)
}

/// Load `config/refresh.toml` under `base_dir`, falling back to built-in
/// defaults when the file does not exist.
pub fn load_config(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join(DEFAULT_CONFIG_PATH);
    if path.exists() {
        load_config_from(&path)
    } else {
        Ok(Config::default())
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let urls: &[(&str, &str)] = &[
        ("ecf.api_url", &config.ecf.api_url),
        ("ecf.profile_url", &config.ecf.profile_url),
        ("fide.api_url", &config.fide.api_url),
        ("fide.profile_url", &config.fide.profile_url),
    ];
    for (name, url) in urls {
        if url.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: "must not be empty".into(),
            });
        }
    }

    if !matches!(config.ecf.rating_type.as_str(), "S" | "R") {
        return Err(ConfigError::ValidationError {
            field: "ecf.rating_type".into(),
            message: format!("must be \"S\" or \"R\", got {:?}", config.ecf.rating_type),
        });
    }

    if config.ecf.timeout_secs == Some(0) {
        return Err(ConfigError::ValidationError {
            field: "ecf.timeout_secs".into(),
            message: "must be > 0 when set".into(),
        });
    }

    if config.fide.timeout_secs == 0 {
        return Err(ConfigError::ValidationError {
            field: "fide.timeout_secs".into(),
            message: "must be > 0".into(),
        });
    }

    if config.run.input.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "run.input".into(),
            message: "must not be empty".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const DEFAULTS: &str = include_str!("../../../defaults/refresh.toml");

    fn parse(text: &str) -> Result<Config, ConfigError> {
        parse_config(text, Path::new("test.toml"))
    }

    #[test]
    fn defaults_file_matches_built_in_defaults() {
        let config = parse(DEFAULTS).expect("defaults/refresh.toml should be valid");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config.run.input, "entries.csv");
        assert_eq!(config.run.on_lookup_failure, LookupFailurePolicy::Abort);
        assert_eq!(config.ecf.rating_type, "S");
        assert_eq!(config.ecf.timeout_secs, None);
        assert_eq!(config.fide.timeout_secs, 10);
        assert_eq!(config.fide.api_url, "https://api.chesstools.org/fide/");
    }

    #[test]
    fn partial_sections_merge_with_defaults() {
        let config = parse(
            r#"
            [run]
            on_lookup_failure = "keep-row"

            [ecf]
            rating_type = "R"
            timeout_secs = 30
            "#,
        )
        .unwrap();
        assert_eq!(config.run.on_lookup_failure, LookupFailurePolicy::KeepRow);
        assert_eq!(config.run.input, "entries.csv");
        assert_eq!(config.ecf.rating_type, "R");
        assert_eq!(config.ecf.timeout_secs, Some(30));
        assert_eq!(
            config.ecf.api_url,
            "https://rating.englishchess.org.uk/v2/new/api.php?v2"
        );
    }

    #[test]
    fn unknown_rating_type_rejected() {
        let err = parse("[ecf]\nrating_type = \"B\"\n").unwrap_err();
        match err {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, "ecf.rating_type"),
            other => panic!("expected ValidationError, got {other:?}"),
        }
    }

    #[test]
    fn errors_name_the_refresh_config() {
        let err = parse("[ecf]\nrating_type = \"B\"\n").unwrap_err();
        assert!(
            err.to_string().starts_with("refresh config setting `ecf.rating_type` "),
            "got: {err}"
        );

        let err = load_config_from(Path::new("/nonexistent/refresh.toml")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "refresh config /nonexistent/refresh.toml does not exist"
        );
    }

    #[test]
    fn zero_fide_timeout_rejected() {
        let err = parse("[fide]\ntimeout_secs = 0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::ValidationError { ref field, .. } if field == "fide.timeout_secs"
        ));
    }

    #[test]
    fn zero_ecf_timeout_rejected() {
        let err = parse("[ecf]\ntimeout_secs = 0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::ValidationError { ref field, .. } if field == "ecf.timeout_secs"
        ));
    }

    #[test]
    fn empty_url_rejected() {
        let err = parse("[fide]\nprofile_url = \"\"\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::ValidationError { ref field, .. } if field == "fide.profile_url"
        ));
    }

    #[test]
    fn unknown_policy_is_parse_error() {
        let err = parse("[run]\non_lookup_failure = \"retry\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn unknown_key_is_parse_error() {
        let err = parse("[fide]\nretries = 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn missing_config_file_falls_back_to_defaults() {
        let tmp = std::env::temp_dir().join("roster_refresh_config_missing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();

        let config = load_config(&tmp).expect("missing config should use defaults");
        assert_eq!(config, Config::default());

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn config_file_under_base_dir_is_loaded() {
        let tmp = std::env::temp_dir().join("roster_refresh_config_present");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();
        fs::write(
            tmp.join(DEFAULT_CONFIG_PATH),
            "[run]\ninput = \"league.csv\"\n",
        )
        .unwrap();

        let config = load_config(&tmp).unwrap();
        assert_eq!(config.run.input, "league.csv");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn explicit_missing_path_is_file_not_found() {
        let err = load_config_from(Path::new("/nonexistent/refresh.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }
}
