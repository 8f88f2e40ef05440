//! ARRIS SURFboard SB8200 connection status page parser.
//!
//! Same `.simpleTable` shape as the SB6183 but on its own page path, with a
//! rearranged column order and no symbol rate column. Unbonded channels show
//! up with out-of-band identifiers like "159" and keep the page's spelling.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html};
use tracing::{debug, warn};

use crate::device::{channel_rows, leading_float, simple_tables, status_url};
use crate::error::ModemError;
use crate::modem::{Modem, PageSource};
use crate::registry::ModemFamily;
use crate::signal::{Channel, DownstreamReading, SignalReport, UpstreamReading};

pub(crate) const FINGERPRINT: &str = r#"<span id="thisModelNumberIs">SB8200</span>"#;
pub(crate) const STATUS_PATH: &str = "/cmconnectionstatus.html";

/// Downstream table columns, in page order.
#[derive(Debug, Clone, Copy)]
enum DownColumn {
    Channel,
    LockStatus,
    Modulation,
    Frequency,
    Power,
    Snr,
    Corrected,
    Uncorrectables,
}

const DOWNSTREAM_COLUMNS: &[DownColumn] = &[
    DownColumn::Channel,
    DownColumn::LockStatus,
    DownColumn::Modulation,
    DownColumn::Frequency,
    DownColumn::Power,
    DownColumn::Snr,
    DownColumn::Corrected,
    DownColumn::Uncorrectables,
];

/// Upstream table columns, in page order. This firmware does not report a
/// symbol rate, so the reading keeps its zero value.
#[derive(Debug, Clone, Copy)]
enum UpColumn {
    Channel,
    ChannelId,
    LockStatus,
    ChannelType,
    Frequency,
    Width,
    Power,
}

const UPSTREAM_COLUMNS: &[UpColumn] = &[
    UpColumn::Channel,
    UpColumn::ChannelId,
    UpColumn::LockStatus,
    UpColumn::ChannelType,
    UpColumn::Frequency,
    UpColumn::Width,
    UpColumn::Power,
];

/// SB8200 modem, live or fixture backed.
pub struct Sb8200 {
    source: PageSource,
}

impl Sb8200 {
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
impl Modem for Sb8200 {
    fn name(&self) -> &'static str {
        "SB8200"
    }

    async fn status(&self, client: &Client) -> Result<SignalReport, ModemError> {
        let body = self.source.page(client).await?;
        parse_status(&body)
    }
}

/// Detection hooks for the registry.
pub struct Sb8200Family;

impl ModemFamily for Sb8200Family {
    fn name(&self) -> &'static str {
        "SB8200"
    }

    fn status_path(&self) -> &'static str {
        STATUS_PATH
    }

    fn matches(&self, body: &str) -> bool {
        body.contains(FINGERPRINT)
    }

    fn live(&self, gateway: &str) -> Box<dyn Modem> {
        Box::new(Sb8200::live(gateway))
    }

    fn fixture(&self, body: String) -> Box<dyn Modem> {
        Box::new(Sb8200::fixture(body))
    }
}

/// Parse a full SB8200 connection status page.
pub(crate) fn parse_status(body: &str) -> Result<SignalReport, ModemError> {
    debug!("parsing SB8200 connection status page");
    let doc = Html::parse_document(body);
    let (down_table, up_table) = simple_tables(&doc)?;
    let downstream = parse_downstream(down_table)?;
    let upstream = parse_upstream(up_table)?;
    SignalReport::new(downstream, upstream)
}

fn parse_downstream(
    table: ElementRef<'_>,
) -> Result<BTreeMap<Channel, DownstreamReading>, ModemError> {
    let mut readings = BTreeMap::new();
    for (row_idx, cells) in channel_rows(table, "downstream")?.iter().enumerate() {
        let mut r = DownstreamReading::default();
        let mut channel: Option<Channel> = None;
        for (i, cell) in cells.iter().enumerate() {
            let col = match DOWNSTREAM_COLUMNS.get(i) {
                Some(col) => *col,
                None => {
                    warn!("unexpected column {} in downstream table", i);
                    continue;
                }
            };
            match col {
                DownColumn::Channel => channel = Some(Channel::new(cell.as_str())),
                DownColumn::LockStatus => {}
                DownColumn::Modulation => r.modulation = cell.clone(),
                DownColumn::Frequency => r.frequency = cell.clone(),
                DownColumn::Power => {
                    if let Some(v) = leading_float(cell) {
                        r.power_level = v;
                    }
                }
                DownColumn::Snr => {
                    if let Some(v) = leading_float(cell) {
                        r.snr = v;
                    }
                }
                DownColumn::Corrected => {
                    if let Some(v) = leading_float(cell) {
                        r.correctable = v;
                    }
                }
                DownColumn::Uncorrectables => {
                    if let Some(v) = leading_float(cell) {
                        r.uncorrectable = v;
                    }
                }
            }
        }
        match channel {
            Some(ch) => {
                readings.insert(ch, r);
            }
            None => warn!("downstream row {} has no channel cell", row_idx),
        }
    }
    Ok(readings)
}

fn parse_upstream(
    table: ElementRef<'_>,
) -> Result<BTreeMap<Channel, UpstreamReading>, ModemError> {
    let mut readings = BTreeMap::new();
    for (row_idx, cells) in channel_rows(table, "upstream")?.iter().enumerate() {
        let mut r = UpstreamReading::default();
        let mut channel: Option<Channel> = None;
        for (i, cell) in cells.iter().enumerate() {
            let col = match UPSTREAM_COLUMNS.get(i) {
                Some(col) => *col,
                None => {
                    warn!("unexpected column {} in upstream table", i);
                    continue;
                }
            };
            match col {
                UpColumn::Channel => channel = Some(Channel::new(cell.as_str())),
                UpColumn::ChannelId | UpColumn::Width => {}
                UpColumn::LockStatus => r.lock_status = cell.clone(),
                UpColumn::ChannelType => r.modulation = cell.clone(),
                UpColumn::Frequency => r.frequency = cell.clone(),
                UpColumn::Power => {
                    if let Some(v) = leading_float(cell) {
                        r.power_level = v;
                    }
                }
            }
        }
        match channel {
            Some(ch) => {
                readings.insert(ch, r);
            }
            None => warn!("upstream row {} has no channel cell", row_idx),
        }
    }
    Ok(readings)
}
