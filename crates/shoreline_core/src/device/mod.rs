//! Per-family status page parsers.
//!
//! Each family owns a fingerprint, a page path, and a parser for its table
//! layout. Layouts are written down as const position tables, so when a
//! firmware update moves a column the fix is a data edit, not new control
//! flow.

pub mod sb6121;
pub mod sb6183;
pub mod sb8200;

use scraper::{ElementRef, Html};

use crate::dom;
use crate::error::ModemError;

/// Parse the leading numeric token of a cell, e.g. "36.4 dBmV" -> 36.4.
///
/// `None` leaves the field at its zero value. One garbled cell costs one
/// reading; position mismatches are the fatal case, not formatting.
pub(crate) fn leading_float(cell: &str) -> Option<f64> {
    cell.split_whitespace().next()?.parse().ok()
}

/// Join the gateway base with a family's page path.
pub(crate) fn status_url(gateway: &str, path: &str) -> String {
    format!("{}{}", gateway.trim_end_matches('/'), path)
}

/// The three `.simpleTable` tables of the newer firmware layout, returned
/// as (downstream, upstream). The first table carries startup state and is
/// not signal data.
pub(crate) fn simple_tables(doc: &Html) -> Result<(ElementRef<'_>, ElementRef<'_>), ModemError> {
    let sel = dom::selector(".simpleTable")?;
    let tables: Vec<_> = doc.select(&sel).collect();
    if tables.len() != 3 {
        return Err(ModemError::TableCount {
            what: "simpleTable tables",
            expected: 3,
            found: tables.len(),
        });
    }
    Ok((tables[1], tables[2]))
}

/// Data rows of a row-per-channel table: two header rows, then one row per
/// channel. Fewer rows than headers means the table was cut off mid-render.
pub(crate) fn channel_rows(
    table: ElementRef<'_>,
    table_name: &'static str,
) -> Result<Vec<Vec<String>>, ModemError> {
    let rows = dom::direct_rows(table)?;
    if rows.len() <= 2 {
        return Err(ModemError::TruncatedTable {
            table: table_name,
            rows: rows.len(),
        });
    }
    let mut out = Vec::with_capacity(rows.len() - 2);
    for row in &rows[2..] {
        out.push(dom::cells(*row)?.into_iter().map(dom::text).collect());
    }
    Ok(out)
}
