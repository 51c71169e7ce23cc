// Library root: roster enrichment against the ECF and FIDE rating APIs.
//
// Pipeline per row: `code` extracts the player code, `ecf` and `fide` fetch
// current data, `transform` rebuilds the row, and `driver` streams the CSV.

pub mod code;
pub mod config;
pub mod driver;
pub mod ecf;
pub mod fide;
pub mod http;
pub mod transform;
