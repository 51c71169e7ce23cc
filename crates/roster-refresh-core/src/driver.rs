// Streams a roster CSV through the row transformer into the output file.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, info};

use crate::ecf::EcfApi;
use crate::fide::FideApi;
use crate::transform::{RowError, RowOutcome, RowTransformer};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("failed to read roster {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to create output {path}: {source}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("row {row}: {source}")]
    Lookup { row: usize, source: RowError },
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// Row counts for one run, header excluded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub blank: usize,
    pub no_code: usize,
    pub enriched: usize,
    pub kept: usize,
}

impl RefreshSummary {
    pub fn total(&self) -> usize {
        self.blank + self.no_code + self.enriched + self.kept
    }

    fn record(&mut self, outcome: &RowOutcome) {
        match outcome {
            RowOutcome::Blank => self.blank += 1,
            RowOutcome::NoCode(_) => self.no_code += 1,
            RowOutcome::Enriched(_) => self.enriched += 1,
            RowOutcome::Kept(_) => self.kept += 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Output naming
// ---------------------------------------------------------------------------

/// `<dir>/<stem>_updated_<YYYY-MM-DD>.csv` next to the input file.
pub fn output_path_for(input: &Path, date: NaiveDate) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "entries".to_string());
    input.with_file_name(format!("{stem}_updated_{}.csv", date.format("%Y-%m-%d")))
}

// ---------------------------------------------------------------------------
// Blank line accounting
// ---------------------------------------------------------------------------

/// Count the blank lines in `bytes[start..end]` before the first non-terminator
/// byte. The csv reader skips these silently, but the roster keeps them.
///
/// `start` is where the previous record ended. If that record was terminated
/// by a bare `\r` and this span opens with `\n`, the pair is one CRLF and the
/// `\n` is not a blank line.
fn blank_lines(bytes: &[u8], start: usize, end: usize) -> usize {
    let mut i = start;
    if i > 0 && i < end && bytes[i - 1] == b'\r' && bytes[i] == b'\n' {
        i += 1;
    }

    let mut count = 0;
    while i < end {
        match bytes[i] {
            b'\r' => {
                count += 1;
                if i + 1 < end && bytes[i + 1] == b'\n' {
                    i += 1;
                }
            }
            b'\n' => count += 1,
            _ => break,
        }
        i += 1;
    }
    count
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// UTF-8 byte order mark. It is copied to the output ahead of the header.
const BOM: &str = "\u{feff}";

/// Write one output row. An empty row is a bare line terminator; the csv
/// writer would encode it as `""`.
fn write_row<W: Write>(out: &mut W, row: &[String]) -> Result<(), RefreshError> {
    if row.is_empty() {
        out.write_all(b"\n")?;
    } else {
        let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(&mut *out);
        writer.write_record(row)?;
        writer.flush()?;
    }
    out.flush()?;
    Ok(())
}

/// Copy the header of `input` to `output` verbatim, then write every later
/// row as returned by `transformer`. The header is the first line of the
/// file even when that line is blank. Each row is flushed before the next is
/// read, so a failed run leaves everything up to the failing row on disk.
pub async fn refresh_csv<E, F, W>(
    input: &str,
    output: W,
    transformer: &RowTransformer<E, F>,
) -> Result<RefreshSummary, RefreshError>
where
    E: EcfApi,
    F: FideApi,
    W: Write,
{
    let mut output = output;
    let body = match input.strip_prefix(BOM) {
        Some(rest) => {
            output.write_all(BOM.as_bytes())?;
            rest
        }
        None => input,
    };

    let bytes = body.as_bytes();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut summary = RefreshSummary::default();
    let mut record = csv::StringRecord::new();
    let mut seen_header = false;
    let mut row_number = 0usize;

    loop {
        let start = reader.position().byte() as usize;
        let more = reader.read_record(&mut record)?;
        let end = reader.position().byte() as usize;

        let mut rows: Vec<Vec<String>> = vec![Vec::new(); blank_lines(bytes, start, end)];
        if more {
            rows.push(record.iter().map(str::to_string).collect());
        }

        for row in rows {
            if !seen_header {
                debug!(columns = row.len(), "copying header");
                write_row(&mut output, &row)?;
                seen_header = true;
                continue;
            }

            row_number += 1;
            let outcome = transformer
                .transform(row)
                .await
                .map_err(|source| RefreshError::Lookup {
                    row: row_number,
                    source,
                })?;
            summary.record(&outcome);
            write_row(&mut output, &outcome.into_row())?;
        }

        if !more {
            break;
        }
    }

    info!(
        rows = summary.total(),
        enriched = summary.enriched,
        no_code = summary.no_code,
        blank = summary.blank,
        kept = summary.kept,
        "roster refresh complete"
    );
    Ok(summary)
}

/// Read the roster at `input`, refresh it, and write the result to `output`.
pub async fn refresh_file<E, F>(
    input: &Path,
    output: &Path,
    transformer: &RowTransformer<E, F>,
) -> Result<RefreshSummary, RefreshError>
where
    E: EcfApi,
    F: FideApi,
{
    let text = std::fs::read_to_string(input).map_err(|e| RefreshError::Read {
        path: input.to_path_buf(),
        source: e,
    })?;
    let file = File::create(output).map_err(|e| RefreshError::Create {
        path: output.to_path_buf(),
        source: e,
    })?;
    info!(
        input = %input.display(),
        output = %output.display(),
        rating_date = %transformer.rating_date(),
        "refreshing roster"
    );
    refresh_csv(&text, BufWriter::new(file), transformer).await
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
