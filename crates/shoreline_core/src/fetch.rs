//! Bounded status-page fetch.

use reqwest::Client;

use crate::error::ModemError;

/// Upper bound on a status-page body. Real pages are tens of KiB; whatever
/// answers on the gateway address must not grow the heap unbounded.
pub const BODY_CAP: usize = 1 << 20;

/// GET `url` and return at most [`BODY_CAP`] bytes of the body, decoded
/// lossily.
///
/// The HTTP status is deliberately not checked: family detection runs on
/// the body fingerprint, and an error page simply fails to match.
pub async fn fetch_capped(client: &Client, url: &str) -> Result<String, ModemError> {
    let mut response = client.get(url).send().await?;
    let mut body: Vec<u8> = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        let room = BODY_CAP - body.len();
        if chunk.len() >= room {
            body.extend_from_slice(&chunk[..room]);
            break;
        }
        body.extend_from_slice(&chunk);
    }
    Ok(decode_body(&body))
}

/// Decode a page body. The oldest firmware declares windows-1252, so real
/// pages can carry bytes that are not valid UTF-8; fixture reads share this
/// decode so a capture behaves exactly like the fetched body.
pub(crate) fn decode_body(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
