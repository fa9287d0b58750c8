//! One-shot fetch of the backend's `/system_info` panel data.

use crate::types::SystemInfo;

#[derive(Debug, thiserror::Error)]
pub enum InfoError {
    /// The HTTP request itself failed (network, DNS, decoding).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("backend answered {status}: {body}")]
    Status { status: u16, body: String },
}

/// `GET url` and decode a [`SystemInfo`].
pub async fn fetch_system_info(
    client: &reqwest::Client,
    url: &str,
) -> Result<SystemInfo, InfoError> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(InfoError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response.json::<SystemInfo>().await?)
}

/// Fetch once; on failure log and return `None`. Never retries.
pub async fn load_system_info(client: &reqwest::Client, url: &str) -> Option<SystemInfo> {
    match fetch_system_info(client, url).await {
        Ok(info) => {
            tracing::info!(hostname = %info.hostname, version = %info.version, "Loaded system info");
            Some(info)
        }
        Err(e) => {
            tracing::warn!(url, error = %e, "Failed to load system info");
            None
        }
    }
}
