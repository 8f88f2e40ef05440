//! Shoreline core - scrapes signal diagnostics from cable modem status pages.
//!
//! SURFboard modems expose per-channel signal data as firmware-specific HTML
//! tables on the gateway address. This crate autodetects the device family,
//! parses its table layout, and returns readings in a vendor-neutral shape.

pub mod device;
pub mod dom;
pub mod error;
pub mod fetch;
pub mod modem;
pub mod registry;
pub mod signal;

pub use error::ModemError;
pub use modem::Modem;
pub use registry::{ModemFamily, ModemRegistry, DEFAULT_GATEWAY};
pub use signal::{Channel, DownstreamReading, SignalReport, UpstreamReading};
