//! GENA HTTP client for event subscription operations.
//!
//! Handles the SUBSCRIBE/UNSUBSCRIBE protocol against a resolved
//! `eventSubURL`. Notification delivery and lease renewal are hosted
//! elsewhere; this client only opens and closes the lease the session
//! holds for its lifetime.

use reqwest::{Client, Method};
use thiserror::Error;

use crate::protocol_constants::EVENT_SUBSCRIPTION_TIMEOUT_SECS;

/// Errors that can occur during GENA subscription operations.
#[derive(Debug, Error)]
pub enum GenaError {
    /// HTTP request to the renderer failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The renderer rejected the subscription.
    #[error("subscription failed with status {0}")]
    SubscriptionFailed(u16),

    /// The renderer accepted the subscription but returned no SID.
    #[error("subscription response carried no SID header")]
    MissingSid,
}

/// Convenient Result alias for GENA operations.
pub type GenaResult<T> = Result<T, GenaError>;

/// Response from a successful GENA subscription.
pub struct SubscribeResponse {
    /// The subscription ID returned by the renderer.
    pub sid: String,
    /// The granted lease in seconds.
    pub timeout_secs: u64,
}

/// HTTP client for GENA (UPnP eventing) operations.
pub struct GenaClient {
    client: Client,
}

impl GenaClient {
    /// Creates a new GENA client over the given HTTP client.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn subscribe_method() -> Method {
        Method::from_bytes(b"SUBSCRIBE").expect("SUBSCRIBE is a valid method")
    }

    fn unsubscribe_method() -> Method {
        Method::from_bytes(b"UNSUBSCRIBE").expect("UNSUBSCRIBE is a valid method")
    }

    /// Extracts the granted lease from a GENA response.
    ///
    /// The `TIMEOUT` header has the form `Second-N`; the requested default
    /// is assumed when the header is missing or malformed.
    fn extract_timeout_secs(response: &reqwest::Response) -> u64 {
        response
            .headers()
            .get("TIMEOUT")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Second-"))
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(EVENT_SUBSCRIPTION_TIMEOUT_SECS)
    }

    /// Opens a subscription on a resolved event URL.
    ///
    /// # Arguments
    /// * `event_url` - Absolute `eventSubURL` from the device description
    /// * `callback_url` - URL where NOTIFY events should be delivered
    ///
    /// # Errors
    /// Transport failures, a non-success status, or a missing SID.
    pub async fn subscribe(
        &self,
        event_url: &str,
        callback_url: &str,
    ) -> GenaResult<SubscribeResponse> {
        let response = self
            .client
            .request(Self::subscribe_method(), event_url)
            .header("CALLBACK", format!("<{callback_url}>"))
            .header("NT", "upnp:event")
            .header(
                "TIMEOUT",
                format!("Second-{EVENT_SUBSCRIPTION_TIMEOUT_SECS}"),
            )
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GenaError::SubscriptionFailed(response.status().as_u16()));
        }

        let sid = response
            .headers()
            .get("SID")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or(GenaError::MissingSid)?;
        let timeout_secs = Self::extract_timeout_secs(&response);

        log::debug!("[GENA] subscribed sid={sid} lease={timeout_secs}s");
        Ok(SubscribeResponse { sid, timeout_secs })
    }

    /// Cancels a subscription.
    ///
    /// Returns `true` on success; on failure the lease is simply left to
    /// expire, so the caller drops its SID either way.
    pub async fn unsubscribe(&self, event_url: &str, sid: &str) -> bool {
        match self
            .client
            .request(Self::unsubscribe_method(), event_url)
            .header("SID", sid)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}
