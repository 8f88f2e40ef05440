//! Vendor-neutral signal readings.
//!
//! Every family parser produces these types, so consumers never see
//! firmware-specific table layouts.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::ModemError;

/// Channel identifier exactly as printed on the status page.
///
/// Kept as text on purpose: firmwares emit identifiers like "159" for
/// unbonded channels, and metric labels need the page's spelling, not a
/// normalized integer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Channel(String);

impl Channel {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One downstream channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DownstreamReading {
    /// Hz, as printed (some firmwares keep a " Hz" suffix).
    pub frequency: String,
    pub modulation: String,
    /// dBmV.
    pub power_level: f64,
    /// dB.
    pub snr: f64,
    pub correctable: f64,
    pub uncorrectable: f64,
    /// Codewords received intact. Only the row-per-attribute firmware
    /// publishes this, so absence is distinct from a zero counter.
    pub unerrored: Option<f64>,
}

/// One upstream channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpstreamReading {
    /// Hz, as printed.
    pub frequency: String,
    /// Symbols per second. Zero when the firmware does not report it.
    pub symbol_rate: f64,
    /// dBmV.
    pub power_level: f64,
    pub modulation: String,
    /// Ranging or lock state, e.g. "Success" or "Locked".
    pub lock_status: String,
}

/// Everything one scrape of a status page produced.
///
/// Channels live in `BTreeMap`s so iteration order is stable between
/// scrapes; exporter output and debug dumps stay diffable.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalReport {
    pub downstream: BTreeMap<Channel, DownstreamReading>,
    pub upstream: BTreeMap<Channel, UpstreamReading>,
}

impl SignalReport {
    /// Build a report, rejecting scrapes with an empty direction.
    ///
    /// A modem always has at least one bonded channel each way. An empty map
    /// means the parser matched a page whose tables drifted, and a report
    /// with silently missing channels is worse than a failed scrape.
    pub fn new(
        downstream: BTreeMap<Channel, DownstreamReading>,
        upstream: BTreeMap<Channel, UpstreamReading>,
    ) -> Result<Self, ModemError> {
        if downstream.is_empty() {
            return Err(ModemError::NoChannels {
                direction: "downstream",
            });
        }
        if upstream.is_empty() {
            return Err(ModemError::NoChannels {
                direction: "upstream",
            });
        }
        Ok(Self {
            downstream,
            upstream,
        })
    }
}
