//! The contract every resolved modem fulfils.

use std::borrow::Cow;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::ModemError;
use crate::fetch::fetch_capped;
use crate::signal::SignalReport;

/// A detected modem that can be polled for signal readings.
///
/// Implementations hold no mutable state, so `status` is safe to call
/// repeatedly and concurrently. The HTTP client is owned by the caller;
/// timeouts and connection pooling are configured once, not per family.
#[async_trait]
pub trait Modem: Send + Sync {
    /// Family name as printed on the device label, e.g. "SB6183".
    fn name(&self) -> &'static str;

    /// Fetch and parse the current signal readings.
    async fn status(&self, client: &Client) -> Result<SignalReport, ModemError>;
}

/// Where a modem's status page comes from.
///
/// Live and fixture instances share one parser per family; only the page
/// acquisition differs, which keeps fixture tests representative of live
/// scrapes.
pub enum PageSource {
    /// Poll the device over HTTP.
    Live { status_url: String },
    /// Re-parse a captured page.
    Fixture { body: String },
}

impl PageSource {
    pub async fn page(&self, client: &Client) -> Result<Cow<'_, str>, ModemError> {
        match self {
            Self::Live { status_url } => Ok(Cow::Owned(fetch_capped(client, status_url).await?)),
            Self::Fixture { body } => Ok(Cow::Borrowed(body)),
        }
    }
}
