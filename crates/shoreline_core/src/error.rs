//! Error taxonomy for fetching and parsing modem status pages.

/// Errors surfaced by a status scrape.
///
/// Structural problems are fatal and carry enough context to name the table
/// that drifted. Numeric garbage inside a recognized cell is handled at the
/// parse site by leaving the field at its zero value and never reaches this
/// enum. No variant returns a partial report.
#[derive(Debug, thiserror::Error)]
pub enum ModemError {
    /// Transport failure talking to the modem.
    #[error("fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),

    /// A selector literal failed to compile. Selectors are constants, so
    /// hitting this means a code bug, not a device problem.
    #[error("selector {0:?} did not parse")]
    Selector(String),

    #[error("expected {expected} {what}, found {found}")]
    TableCount {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("{table} table truncated at {rows} rows")]
    TruncatedTable { table: &'static str, rows: usize },

    #[error("unhandled row {row} in {table} table")]
    UnexpectedRow { table: &'static str, row: usize },

    #[error("no {direction} channels in report")]
    NoChannels { direction: &'static str },
}
