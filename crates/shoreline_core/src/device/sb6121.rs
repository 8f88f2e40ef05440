//! Motorola SURFboard SB6121 signal page parser.
//!
//! Oldest supported layout: three tables sit directly under `<center>`, each
//! in row-per-attribute form. The first data row lists channel identifiers
//! and every later row carries one cell per channel for a single attribute.
//! Codeword counters live in the third table and are folded into the
//! downstream readings. One cell hosts a nested explanatory table, which the
//! dom walkers keep out of rows and cell text.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html};
use tracing::{debug, warn};

use crate::device::{leading_float, status_url};
use crate::dom;
use crate::error::ModemError;
use crate::modem::{Modem, PageSource};
use crate::registry::ModemFamily;
use crate::signal::{Channel, DownstreamReading, SignalReport, UpstreamReading};

pub(crate) const FINGERPRINT: &str =
    r#"<META content="Microsoft FrontPage 4.0" name=GENERATOR>"#;
pub(crate) const STATUS_PATH: &str = "/cmSignalData.htm";

/// Page prints Msym/sec; the model carries sym/sec.
const SYMBOL_RATE_SCALE: f64 = 1_000_000.0;

/// Attribute carried by each downstream table row, in page order.
#[derive(Debug, Clone, Copy)]
enum DownRow {
    ChannelId,
    Frequency,
    Snr,
    Modulation,
    PowerLevel,
}

const DOWNSTREAM_ROWS: &[DownRow] = &[
    DownRow::ChannelId,
    DownRow::Frequency,
    DownRow::Snr,
    DownRow::Modulation,
    DownRow::PowerLevel,
];

/// Attribute carried by each upstream table row, in page order. The ranging
/// service identifier is a recognized position but not part of the model.
#[derive(Debug, Clone, Copy)]
enum UpRow {
    ChannelId,
    Frequency,
    RangingServiceId,
    SymbolRate,
    PowerLevel,
    Modulation,
    RangingStatus,
}

const UPSTREAM_ROWS: &[UpRow] = &[
    UpRow::ChannelId,
    UpRow::Frequency,
    UpRow::RangingServiceId,
    UpRow::SymbolRate,
    UpRow::PowerLevel,
    UpRow::Modulation,
    UpRow::RangingStatus,
];

/// Attribute carried by each codeword stats table row, in page order.
#[derive(Debug, Clone, Copy)]
enum StatsRow {
    ChannelId,
    Unerrored,
    Correctable,
    Uncorrectable,
}

const STATS_ROWS: &[StatsRow] = &[
    StatsRow::ChannelId,
    StatsRow::Unerrored,
    StatsRow::Correctable,
    StatsRow::Uncorrectable,
];

/// SB6121 modem, live or fixture backed.
pub struct Sb6121 {
    source: PageSource,
}

impl Sb6121 {
    pub fn live(gateway: &str) -> Self {
        Self {
            source: PageSource::Live {
                status_url: status_url(gateway, STATUS_PATH),
            },
        }
    }

    pub fn fixture(body: String) -> Self {
        Self {
            source: PageSource::Fixture { body },
        }
    }
}

#[async_trait]
impl Modem for Sb6121 {
    fn name(&self) -> &'static str {
        "SB6121"
    }

    async fn status(&self, client: &Client) -> Result<SignalReport, ModemError> {
        let body = self.source.page(client).await?;
        parse_status(&body)
    }
}

/// Detection hooks for the registry.
pub struct Sb6121Family;

impl ModemFamily for Sb6121Family {
    fn name(&self) -> &'static str {
        "SB6121"
    }

    fn status_path(&self) -> &'static str {
        STATUS_PATH
    }

    fn matches(&self, body: &str) -> bool {
        body.contains(FINGERPRINT)
    }

    fn live(&self, gateway: &str) -> Box<dyn Modem> {
        Box::new(Sb6121::live(gateway))
    }

    fn fixture(&self, body: String) -> Box<dyn Modem> {
        Box::new(Sb6121::fixture(body))
    }
}

/// Parse a full SB6121 signal page.
pub(crate) fn parse_status(body: &str) -> Result<SignalReport, ModemError> {
    debug!("parsing SB6121 signal page");
    let doc = Html::parse_document(body);
    // The nested note table hangs off a td, not off center, so it does not
    // count against this selector.
    let sel = dom::selector("center > table")?;
    let tables: Vec<_> = doc.select(&sel).collect();
    if tables.len() != 3 {
        return Err(ModemError::TableCount {
            what: "signal tables under center",
            expected: 3,
            found: tables.len(),
        });
    }
    let mut downstream = parse_downstream(tables[0])?;
    let upstream = parse_upstream(tables[1])?;
    merge_codeword_stats(tables[2], &mut downstream)?;
    SignalReport::new(downstream, upstream)
}

/// Rows after the table's title row, with the left-hand label cell stripped
/// and nested note tables filtered out.
fn attribute_rows(
    table: ElementRef<'_>,
    table_name: &'static str,
) -> Result<Vec<Vec<String>>, ModemError> {
    let rows = dom::direct_rows(table)?;
    if rows.len() <= 1 {
        return Err(ModemError::TruncatedTable {
            table: table_name,
            rows: rows.len(),
        });
    }
    let mut out = Vec::with_capacity(rows.len() - 1);
    for row in &rows[1..] {
        let cells = dom::cells(*row)?;
        out.push(cells.iter().skip(1).map(|c| dom::cell_text(*c)).collect());
    }
    Ok(out)
}

/// Value rows should be as wide as the channel id row. Narrower rows leave
/// trailing channels at defaults; wider rows have their extras dropped.
fn check_width(table: &str, row: usize, ids: &[Channel], cells: &[String]) {
    if row > 0 && cells.len() != ids.len() {
        warn!(
            "{} row {} has {} cells for {} channels",
            table,
            row,
            cells.len(),
            ids.len()
        );
    }
}

fn parse_downstream(
    table: ElementRef<'_>,
) -> Result<BTreeMap<Channel, DownstreamReading>, ModemError> {
    let rows = attribute_rows(table, "downstream")?;
    let mut ids: Vec<Channel> = Vec::new();
    let mut readings: Vec<DownstreamReading> = Vec::new();
    for (idx, cells) in rows.iter().enumerate() {
        let attr = match DOWNSTREAM_ROWS.get(idx) {
            Some(attr) => *attr,
            None => {
                return Err(ModemError::UnexpectedRow {
                    table: "downstream",
                    row: idx,
                })
            }
        };
        check_width("downstream", idx, &ids, cells);
        match attr {
            DownRow::ChannelId => {
                for cell in cells {
                    ids.push(Channel::new(cell.as_str()));
                    readings.push(DownstreamReading::default());
                }
            }
            DownRow::Frequency => {
                for (r, cell) in readings.iter_mut().zip(cells) {
                    if let Some(token) = cell.split_whitespace().next() {
                        r.frequency = token.to_string();
                    }
                }
            }
            DownRow::Snr => {
                for (r, cell) in readings.iter_mut().zip(cells) {
                    if let Some(v) = leading_float(cell) {
                        r.snr = v;
                    }
                }
            }
            DownRow::Modulation => {
                for (r, cell) in readings.iter_mut().zip(cells) {
                    r.modulation = cell.clone();
                }
            }
            DownRow::PowerLevel => {
                for (r, cell) in readings.iter_mut().zip(cells) {
                    if let Some(v) = leading_float(cell) {
                        r.power_level = v;
                    }
                }
            }
        }
    }
    Ok(ids.into_iter().zip(readings).collect())
}

fn parse_upstream(
    table: ElementRef<'_>,
) -> Result<BTreeMap<Channel, UpstreamReading>, ModemError> {
    let rows = attribute_rows(table, "upstream")?;
    let mut ids: Vec<Channel> = Vec::new();
    let mut readings: Vec<UpstreamReading> = Vec::new();
    for (idx, cells) in rows.iter().enumerate() {
        let attr = match UPSTREAM_ROWS.get(idx) {
            Some(attr) => *attr,
            None => {
                return Err(ModemError::UnexpectedRow {
                    table: "upstream",
                    row: idx,
                })
            }
        };
        check_width("upstream", idx, &ids, cells);
        match attr {
            UpRow::ChannelId => {
                for cell in cells {
                    ids.push(Channel::new(cell.as_str()));
                    readings.push(UpstreamReading::default());
                }
            }
            UpRow::Frequency => {
                for (r, cell) in readings.iter_mut().zip(cells) {
                    if let Some(token) = cell.split_whitespace().next() {
                        r.frequency = token.to_string();
                    }
                }
            }
            UpRow::RangingServiceId => {}
            UpRow::SymbolRate => {
                for (r, cell) in readings.iter_mut().zip(cells) {
                    if let Some(v) = leading_float(cell) {
                        r.symbol_rate = v * SYMBOL_RATE_SCALE;
                    }
                }
            }
            UpRow::PowerLevel => {
                for (r, cell) in readings.iter_mut().zip(cells) {
                    if let Some(v) = leading_float(cell) {
                        r.power_level = v;
                    }
                }
            }
            UpRow::Modulation => {
                // The cell renders one modulation per line.
                for (r, cell) in readings.iter_mut().zip(cells) {
                    r.modulation = cell.replace('\n', " ");
                }
            }
            UpRow::RangingStatus => {
                for (r, cell) in readings.iter_mut().zip(cells) {
                    r.lock_status = cell.clone();
                }
            }
        }
    }
    Ok(ids.into_iter().zip(readings).collect())
}

/// Fold the codeword counters into the downstream readings.
///
/// The stats table repeats the downstream channel line-up; counters for a
/// channel the downstream table never declared are dropped with a warning.
fn merge_codeword_stats(
    table: ElementRef<'_>,
    downstream: &mut BTreeMap<Channel, DownstreamReading>,
) -> Result<(), ModemError> {
    let rows = attribute_rows(table, "signal stats")?;
    let mut ids: Vec<Channel> = Vec::new();
    for (idx, cells) in rows.iter().enumerate() {
        let attr = match STATS_ROWS.get(idx) {
            Some(attr) => *attr,
            None => {
                return Err(ModemError::UnexpectedRow {
                    table: "signal stats",
                    row: idx,
                })
            }
        };
        check_width("signal stats", idx, &ids, cells);
        match attr {
            StatsRow::ChannelId => {
                for cell in cells {
                    let ch = Channel::new(cell.as_str());
                    if !downstream.contains_key(&ch) {
                        warn!("codeword stats for unknown channel {}", ch);
                    }
                    ids.push(ch);
                }
            }
            StatsRow::Unerrored => {
                for (ch, cell) in ids.iter().zip(cells) {
                    if let (Some(v), Some(r)) = (leading_float(cell), downstream.get_mut(ch)) {
                        r.unerrored = Some(v);
                    }
                }
            }
            StatsRow::Correctable => {
                for (ch, cell) in ids.iter().zip(cells) {
                    if let (Some(v), Some(r)) = (leading_float(cell), downstream.get_mut(ch)) {
                        r.correctable = v;
                    }
                }
            }
            StatsRow::Uncorrectable => {
                for (ch, cell) in ids.iter().zip(cells) {
                    if let (Some(v), Some(r)) = (leading_float(cell), downstream.get_mut(ch)) {
                        r.uncorrectable = v;
                    }
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = include_str!("../../testdata/SB6121-signal.html");

    fn down(freq: &str, power: f64, unerrored: f64, correctable: f64) -> DownstreamReading {
        DownstreamReading {
            frequency: freq.to_string(),
            modulation: "QAM256".to_string(),
            power_level: power,
            snr: 37.0,
            correctable,
            uncorrectable: 0.0,
            unerrored: Some(unerrored),
        }
    }

    fn up(freq: &str, symbol_rate: f64, power: f64) -> UpstreamReading {
        UpstreamReading {
            frequency: freq.to_string(),
            symbol_rate,
            power_level: power,
            modulation: "[3] QPSK [3] 64QAM".to_string(),
            lock_status: "Success".to_string(),
        }
    }

    #[test]
    fn test_parse_status_matches_captured_page() {
        let report = parse_status(PAGE).unwrap();

        let want_down: BTreeMap<Channel, DownstreamReading> = [
            ("9", down("603000000", 10.0, 111242.0, 21163.0)),
            ("10", down("609000000", 9.0, 110946.0, 22563.0)),
            ("11", down("615000000", 9.0, 262486.0, 1492144.0)),
            ("12", down("621000000", 9.0, 59971.0, 19024.0)),
        ]
        .into_iter()
        .map(|(ch, r)| (Channel::new(ch), r))
        .collect();

        let want_up: BTreeMap<Channel, UpstreamReading> = [
            ("1", up("30100000", 5_120_000.0, 48.0)),
            ("2", up("36500000", 5_120_000.0, 48.0)),
            ("3", up("18900000", 2_560_000.0, 47.0)),
            ("4", up("23700000", 5_120_000.0, 47.0)),
        ]
        .into_iter()
        .map(|(ch, r)| (Channel::new(ch), r))
        .collect();

        assert_eq!(report.downstream, want_down);
        assert_eq!(report.upstream, want_up);
    }

    #[test]
    fn test_reparse_is_deterministic() {
        let first = parse_status(PAGE).unwrap();
        let second = parse_status(PAGE).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_garbled_snr_cell_zeroes_one_field() {
        // First SNR cell belongs to channel 9.
        let page = PAGE.replacen("37&nbsp;dB", "--&nbsp;dB", 1);
        assert_ne!(page, PAGE);
        let report = parse_status(&page).unwrap();
        let nine = &report.downstream[&Channel::new("9")];
        assert_eq!(nine.snr, 0.0);
        assert_eq!(nine.power_level, 10.0);
        assert_eq!(report.downstream[&Channel::new("10")].snr, 37.0);
    }

    #[test]
    fn test_extra_attribute_row_is_fatal() {
        // The first table-to-table boundary in the page is the end of the
        // downstream table; the nested note table closes inline within its
        // cell and never precedes a new TABLE tag.
        let page = PAGE.replacen(
            "</TABLE>\n<TABLE",
            "<TR><TD>Spare</TD><TD>1</TD><TD>2</TD><TD>3</TD><TD>4</TD></TR></TABLE>\n<TABLE",
            1,
        );
        assert_ne!(page, PAGE);
        let err = parse_status(&page).unwrap_err();
        assert!(matches!(
            err,
            ModemError::UnexpectedRow {
                table: "downstream",
                row: 5,
            }
        ));
    }

    #[test]
    fn test_extra_top_level_table_is_fatal() {
        let page = format!(
            "{}<center><table><tr><td>surprise</td></tr></table></center>",
            PAGE
        );
        let err = parse_status(&page).unwrap_err();
        assert!(matches!(
            err,
            ModemError::TableCount {
                expected: 3,
                found: 4,
                ..
            }
        ));
    }

    #[test]
    fn test_missing_stats_table_is_fatal() {
        let doc = r#"<html><body><center>
            <table><tr><td>Downstream</td></tr>
            <tr><td>Channel ID</td><td>9</td></tr></table>
            <table><tr><td>Upstream</td></tr>
            <tr><td>Channel ID</td><td>1</td></tr></table>
            </center></body></html>"#;
        let err = parse_status(doc).unwrap_err();
        assert!(matches!(
            err,
            ModemError::TableCount {
                expected: 3,
                found: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_family_matches_own_fingerprint_only() {
        let family = Sb6121Family;
        assert!(family.matches(PAGE));
        assert!(!family.matches(include_str!("../../testdata/SB6183.html")));
        assert!(!family.matches(include_str!("../../testdata/SB8200.html")));
        assert!(!family.matches("<html><body>totally different page</body></html>"));
    }
}
