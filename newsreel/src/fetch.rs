use reqwest::Client;
use std::time::Duration;

use crate::error::FeedError;

/// Some origins reject obvious non-browser clients, so the feed request
/// masquerades as a desktop browser.
pub const USER_AGENT: &str = "Mozilla/5.0";

/// Connect and read timeout applied to the feed request (seconds).
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Fetches the raw bytes of a feed from the given URL.
///
/// The response status is intentionally not checked: any body, error pages
/// included, is handed to the parser as-is. There is no retry at this layer.
pub async fn fetch_feed(url: &str, timeout_secs: u64) -> Result<Vec<u8>, FeedError> {
    let client = Client::builder()
        .connect_timeout(Duration::from_secs(timeout_secs))
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(USER_AGENT)
        .build()?;

    let response = client.get(url).send().await?;
    let bytes = response.bytes().await?;
    Ok(bytes.to_vec())
}
