//! High-level renderer controller.
//!
//! Wraps the SOAP client, device-description resolution, DIDL-Lite
//! formatting and GENA subscription into the handful of operations the
//! session needs. Every operation resolves its control URL from the device
//! description on demand, so the controller holds no renderer state beyond
//! the subscription ID.
//!
//! The [`RendererControl`] trait is the seam the session depends on;
//! tests drive the session with an in-memory implementation.

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;

use crate::error::CastResult;
use crate::protocol_info::{parse_supported_protocols, ProtocolInfo};
use crate::upnp::description::{resolve_service_url, ServiceEndpoint};
use crate::upnp::didl::format_didl_lite;
use crate::upnp::eventing::parse_transport_state;
use crate::upnp::gena::GenaClient;
use crate::upnp::services::UpnpService;
use crate::upnp::soap::SoapAction;
use crate::upnp::xml::extract_xml_text;

/// Renderer operations the session depends on.
#[async_trait]
pub trait RendererControl: Send + Sync {
    /// Queries the formats the renderer's `Sink` side accepts.
    async fn get_protocol_info(&self) -> CastResult<Vec<ProtocolInfo>>;

    /// Opens the RenderingControl event subscription.
    async fn subscribe(&self, callback_url: &str) -> CastResult<()>;

    /// Closes the event subscription, best-effort.
    async fn unsubscribe(&self);

    /// Hands the renderer the transport URI with DIDL-Lite metadata.
    async fn set_av_transport_uri(&self, uri: &str, protocol: &ProtocolInfo) -> CastResult<()>;

    /// Starts playback at the given speed (normally `"1"`).
    async fn play(&self, speed: &str) -> CastResult<()>;

    /// Pauses playback.
    async fn pause(&self) -> CastResult<()>;

    /// Stops playback.
    async fn stop(&self) -> CastResult<()>;
}

/// SOAP-backed controller for one UPnP AV MediaRenderer.
pub struct MediaRenderer {
    client: Client,
    gena: GenaClient,
    device_url: String,
    base_url: String,
    sid: Mutex<Option<String>>,
}

impl MediaRenderer {
    /// Creates a controller for the renderer described at `device_url`.
    ///
    /// Relative service URLs resolve against `base_url`; when absent, the
    /// description URL itself is the base.
    #[must_use]
    pub fn new(client: Client, device_url: String, base_url: Option<String>) -> Self {
        let base_url = base_url.unwrap_or_else(|| device_url.clone());
        Self {
            gena: GenaClient::new(client.clone()),
            client,
            device_url,
            base_url,
            sid: Mutex::new(None),
        }
    }

    /// Base URL service URLs are resolved against.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn control_url(&self, service: UpnpService) -> CastResult<String> {
        Ok(resolve_service_url(
            &self.client,
            &self.device_url,
            &self.base_url,
            service,
            ServiceEndpoint::Control,
        )
        .await?)
    }

    async fn event_url(&self, service: UpnpService) -> CastResult<String> {
        Ok(resolve_service_url(
            &self.client,
            &self.device_url,
            &self.base_url,
            service,
            ServiceEndpoint::EventSub,
        )
        .await?)
    }

    /// Handles one NOTIFY body delivered by the eventing host.
    ///
    /// Transport-state transitions carry no session semantics; the state is
    /// logged for diagnostics only.
    pub fn handle_notify(&self, body: &str) {
        match parse_transport_state(body) {
            Some(state) => log::debug!("[Renderer] transport state: {state:?}"),
            None => log::debug!("[Renderer] notification without transport state"),
        }
    }
}

#[async_trait]
impl RendererControl for MediaRenderer {
    async fn get_protocol_info(&self) -> CastResult<Vec<ProtocolInfo>> {
        let url = self.control_url(UpnpService::ConnectionManager).await?;
        let response = SoapAction::new(UpnpService::ConnectionManager, "GetProtocolInfo")
            .send(&self.client, &url)
            .await?;

        match extract_xml_text(&response, "Sink") {
            Some(sink) => {
                let supported = parse_supported_protocols(&sink);
                log::debug!("[Renderer] {} supported sink formats", supported.len());
                Ok(supported)
            }
            None => {
                log::warn!("[Renderer] GetProtocolInfo response carried no Sink");
                Ok(Vec::new())
            }
        }
    }

    async fn subscribe(&self, callback_url: &str) -> CastResult<()> {
        let url = self.event_url(UpnpService::RenderingControl).await?;
        let response = self.gena.subscribe(&url, callback_url).await?;
        *self.sid.lock() = Some(response.sid);
        Ok(())
    }

    async fn unsubscribe(&self) {
        let Some(sid) = self.sid.lock().take() else {
            return;
        };
        match self.event_url(UpnpService::RenderingControl).await {
            Ok(url) => {
                if !self.gena.unsubscribe(&url, &sid).await {
                    log::debug!("[Renderer] unsubscribe refused, lease will expire");
                }
            }
            Err(err) => log::debug!("[Renderer] unsubscribe skipped: {err}"),
        }
    }

    async fn set_av_transport_uri(&self, uri: &str, protocol: &ProtocolInfo) -> CastResult<()> {
        let url = self.control_url(UpnpService::AVTransport).await?;
        let metadata = format_didl_lite(uri, protocol);
        log::debug!("[Renderer] SetAVTransportURI {uri}");
        SoapAction::new(UpnpService::AVTransport, "SetAVTransportURI")
            .instance_id()
            .arg("CurrentURI", uri)
            .arg("CurrentURIMetaData", metadata)
            .send(&self.client, &url)
            .await?;
        Ok(())
    }

    async fn play(&self, speed: &str) -> CastResult<()> {
        let url = self.control_url(UpnpService::AVTransport).await?;
        SoapAction::new(UpnpService::AVTransport, "Play")
            .instance_id()
            .arg("Speed", speed)
            .send(&self.client, &url)
            .await?;
        Ok(())
    }

    async fn pause(&self) -> CastResult<()> {
        let url = self.control_url(UpnpService::AVTransport).await?;
        SoapAction::new(UpnpService::AVTransport, "Pause")
            .instance_id()
            .send(&self.client, &url)
            .await?;
        Ok(())
    }

    async fn stop(&self) -> CastResult<()> {
        let url = self.control_url(UpnpService::AVTransport).await?;
        SoapAction::new(UpnpService::AVTransport, "Stop")
            .instance_id()
            .send(&self.client, &url)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_defaults_to_device_url() {
        let renderer = MediaRenderer::new(
            Client::new(),
            "http://192.168.1.9:49152/description.xml".to_string(),
            None,
        );
        assert_eq!(renderer.base_url(), "http://192.168.1.9:49152/description.xml");

        let renderer = MediaRenderer::new(
            Client::new(),
            "http://192.168.1.9:49152/description.xml".to_string(),
            Some("http://192.168.1.9:49152/".to_string()),
        );
        assert_eq!(renderer.base_url(), "http://192.168.1.9:49152/");
    }
}
