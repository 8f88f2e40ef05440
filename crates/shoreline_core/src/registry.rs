//! Family registry and modem autodetection.

use std::path::Path;

use reqwest::Client;
use tracing::{debug, warn};

use crate::device::sb6121::Sb6121Family;
use crate::device::sb6183::Sb6183Family;
use crate::device::sb8200::Sb8200Family;
use crate::device::status_url;
use crate::fetch::{decode_body, fetch_capped};
use crate::modem::Modem;

/// Address cable modems answer on regardless of the LAN subnet.
pub const DEFAULT_GATEWAY: &str = "http://192.168.100.1";

/// One supported device family: how to recognize its status page and how to
/// build a scraper for it.
pub trait ModemFamily: Send + Sync {
    /// Family name as printed on the device label.
    fn name(&self) -> &'static str;

    /// Path of the signal status page on the gateway.
    fn status_path(&self) -> &'static str;

    /// Whether `body` is this family's status page.
    fn matches(&self, body: &str) -> bool;

    /// Scraper polling a live device at `gateway`.
    fn live(&self, gateway: &str) -> Box<dyn Modem>;

    /// Scraper that re-parses a captured page instead of the network.
    fn fixture(&self, body: String) -> Box<dyn Modem>;
}

/// Ordered collection of detectable families.
pub struct ModemRegistry {
    families: Vec<Box<dyn ModemFamily>>,
}

impl ModemRegistry {
    /// Create empty registry.
    pub fn new() -> Self {
        Self {
            families: Vec::new(),
        }
    }

    /// Every supported family, in probe order.
    ///
    /// Order only decides which fingerprint is tested first; the markers
    /// are mutually exclusive across firmwares, so it never changes the
    /// outcome.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(Sb6121Family));
        registry.register(Box::new(Sb6183Family));
        registry.register(Box::new(Sb8200Family));
        registry
    }

    /// Register a family programmatically.
    pub fn register(&mut self, family: Box<dyn ModemFamily>) {
        self.families.push(family);
    }

    /// Count families.
    pub fn count(&self) -> usize {
        self.families.len()
    }

    /// Family names in probe order.
    pub fn names(&self) -> Vec<&'static str> {
        self.families.iter().map(|f| f.name()).collect()
    }

    /// Identify the modem, from a captured page or by probing the gateway.
    ///
    /// With a fixture path the file is read once and decoded exactly like a
    /// fetched body, matched against every fingerprint, and no network
    /// traffic happens. Otherwise each family's page is fetched from
    /// `gateway` in turn; fetch failures and non-matching bodies both mean
    /// "try the next family". `None` is an expected outcome while the modem
    /// reboots, so callers retry with backoff instead of treating it as
    /// fatal.
    pub async fn resolve(
        &self,
        client: &Client,
        gateway: &str,
        fixture: Option<&Path>,
    ) -> Option<Box<dyn Modem>> {
        if let Some(path) = fixture {
            let body = match std::fs::read(path) {
                Ok(bytes) => decode_body(&bytes),
                Err(e) => {
                    warn!("failed to read fixture {:?}: {}", path, e);
                    return None;
                }
            };
            for family in &self.families {
                if family.matches(&body) {
                    debug!("fixture {:?} matched {}", path, family.name());
                    return Some(family.fixture(body));
                }
            }
            warn!("fixture {:?} matched no supported family", path);
            return None;
        }

        for family in &self.families {
            let url = status_url(gateway, family.status_path());
            debug!("probing {} for {}", url, family.name());
            let body = match fetch_capped(client, &url).await {
                Ok(body) => body,
                Err(e) => {
                    debug!("probe of {} failed: {}", url, e);
                    continue;
                }
            };
            if family.matches(&body) {
                debug!("{} answered at {}", family.name(), url);
                return Some(family.live(gateway));
            }
        }
        None
    }
}

impl Default for ModemRegistry {
    fn default() -> Self {
        Self::new()
    }
}
