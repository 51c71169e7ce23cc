// roster-refresh entry point.
//
// Startup sequence:
// 1. Parse arguments and initialize tracing (stderr)
// 2. Load config (--config, else config/refresh.toml, else defaults)
// 3. Fix the rating date for the whole run
// 4. Build the ECF and FIDE clients
// 5. Stream the roster through the row transformer
// 6. Report where the output was written

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use tracing::{error, info};

use roster_refresh_core::config::{self, Config, LookupFailurePolicy};
use roster_refresh_core::driver;
use roster_refresh_core::ecf::EcfClient;
use roster_refresh_core::fide::FideClient;
use roster_refresh_core::transform::{ProfileLinks, RowTransformer};

/// Refresh a chess roster CSV with current ECF and FIDE data.
///
/// Column 0 of each row is searched for an ECF code. Rows with a code get
/// fresh profile links, names, ratings, membership and club in columns 0-8;
/// everything from column 9 on is kept. Other rows are copied unchanged.
#[derive(Debug, Parser)]
#[command(name = "roster-refresh", version, about)]
struct Args {
    /// Roster CSV to refresh [default: run.input from the config]
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Output path [default: <INPUT stem>_updated_<date>.csv next to INPUT]
    #[arg(short = 'o', long = "output", value_name = "PATH")]
    output: Option<PathBuf>,

    /// Config file [default: config/refresh.toml if present]
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Date to request ECF ratings for [default: today]
    #[arg(long = "rating-date", value_name = "YYYY-MM-DD")]
    rating_date: Option<NaiveDate>,

    /// Keep a row unchanged when its ECF lookup fails instead of stopping
    #[arg(long = "keep-failed-rows")]
    keep_failed_rows: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Arguments and tracing
    let args = Args::parse();
    init_tracing()?;

    // 2. Config
    let mut config = load_config(args.config.as_deref())?;
    if args.keep_failed_rows {
        config.run.on_lookup_failure = LookupFailurePolicy::KeepRow;
    }

    // 3. Rating date, captured once
    let rating_date = args
        .rating_date
        .unwrap_or_else(|| chrono::Local::now().date_naive());

    let input = args
        .input
        .unwrap_or_else(|| PathBuf::from(&config.run.input));
    let output = args
        .output
        .unwrap_or_else(|| driver::output_path_for(&input, rating_date));

    // 4. Clients
    let ecf = EcfClient::from_config(&config.ecf).context("failed to build ECF client")?;
    let fide = FideClient::from_config(&config.fide).context("failed to build FIDE client")?;
    let transformer = RowTransformer::new(
        ecf,
        fide,
        rating_date,
        ProfileLinks::from_config(&config),
        config.run.on_lookup_failure,
    );

    // 5. Refresh
    let summary = match driver::refresh_file(&input, &output, &transformer).await {
        Ok(summary) => summary,
        Err(e) => {
            error!("Roster refresh failed: {e}");
            return Err(e).with_context(|| {
                format!(
                    "refresh of {} stopped; {} may be incomplete",
                    input.display(),
                    output.display()
                )
            });
        }
    };

    // 6. Report
    info!(
        "Refreshed {} rows ({} enriched, {} unchanged, {} blank, {} kept after failed lookup)",
        summary.total(),
        summary.enriched,
        summary.no_code,
        summary.blank,
        summary.kept
    );
    println!("Updated file saved as → {}", output.display());
    Ok(())
}

fn load_config(explicit: Option<&Path>) -> anyhow::Result<Config> {
    let config = match explicit {
        Some(path) => config::load_config_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => {
            let cwd = std::env::current_dir().context("failed to read working directory")?;
            config::load_config(&cwd).context("failed to load configuration")?
        }
    };
    info!(
        ecf = %config.ecf.api_url,
        fide = %config.fide.api_url,
        policy = ?config.run.on_lookup_failure,
        "Config loaded"
    );
    Ok(config)
}

/// Initialize tracing to stderr so stdout carries only the result line.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("roster_refresh_core=info,roster_refresh=info,warn")
            }),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_parse_all_flags() {
        let args = Args::try_parse_from([
            "roster-refresh",
            "league.csv",
            "-o",
            "out.csv",
            "--config",
            "my.toml",
            "--rating-date",
            "2025-01-01",
            "--keep-failed-rows",
        ])
        .unwrap();
        assert_eq!(args.input, Some(PathBuf::from("league.csv")));
        assert_eq!(args.output, Some(PathBuf::from("out.csv")));
        assert_eq!(args.config, Some(PathBuf::from("my.toml")));
        assert_eq!(args.rating_date, NaiveDate::from_ymd_opt(2025, 1, 1));
        assert!(args.keep_failed_rows);
    }

    #[test]
    fn args_default_to_none() {
        let args = Args::try_parse_from(["roster-refresh"]).unwrap();
        assert!(args.input.is_none());
        assert!(args.output.is_none());
        assert!(args.rating_date.is_none());
        assert!(!args.keep_failed_rows);
    }

    #[test]
    fn bad_rating_date_rejected() {
        assert!(Args::try_parse_from(["roster-refresh", "--rating-date", "01/01/2025"]).is_err());
    }
}
