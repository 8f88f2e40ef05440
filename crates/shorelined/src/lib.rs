//! Shoreline daemon - serves cable modem signal readings as Prometheus
//! metrics.
//!
//! The daemon resolves the modem once at startup, then refreshes readings
//! on every `/metrics` scrape so the time series follow the scrape interval
//! of whatever Prometheus server is watching.

pub mod coalesce;
pub mod metrics;
pub mod server;
