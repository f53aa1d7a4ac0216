//! Device-description fetch and service URL resolution.
//!
//! The renderer's description XML lists its services as
//! `<root>/<device>/<serviceList>/<service>` entries, each carrying a
//! `<serviceType>`, a `<controlURL>` and an `<eventSubURL>`. The document
//! is downloaded on demand for every action; keeping the client stateless
//! also picks up renderers that rewrite their URLs between requests.

use std::time::Duration;

use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::{Client, Url};
use thiserror::Error;

use crate::protocol_constants::DESCRIPTION_TIMEOUT_SECS;
use crate::upnp::services::UpnpService;

/// Errors raised while resolving a service URL.
#[derive(Debug, Error)]
pub enum DescriptionError {
    /// The description document could not be downloaded.
    #[error("device description fetch failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The description document could not be parsed.
    #[error("device description malformed: {0}")]
    Malformed(String),

    /// No device advertises the requested service.
    #[error("service {0} not present in device description")]
    ServiceNotFound(&'static str),

    /// The base URL or the relative service URL cannot be combined.
    #[error("cannot resolve service URL: {0}")]
    BadUrl(String),
}

/// Which per-service URL to read from the description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceEndpoint {
    /// `<controlURL>`, the target of SOAP actions.
    Control,
    /// `<eventSubURL>`, the target of GENA subscriptions.
    EventSub,
}

impl ServiceEndpoint {
    fn element_name(self) -> &'static str {
        match self {
            Self::Control => "controlURL",
            Self::EventSub => "eventSubURL",
        }
    }
}

/// Finds the (possibly relative) URL of a service in a description
/// document.
///
/// `<serviceType>` is matched by substring so version suffixes
/// (`...:AVTransport:2`) still resolve.
#[must_use]
pub fn find_service_url(
    xml: &str,
    service: UpnpService,
    endpoint: ServiceEndpoint,
) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();

    let mut in_service = false;
    let mut service_type = String::new();
    let mut control_url = String::new();
    let mut event_sub_url = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"service" => {
                    in_service = true;
                    service_type.clear();
                    control_url.clear();
                    event_sub_url.clear();
                }
                b"serviceType" if in_service => {
                    service_type = reader.read_text(e.name()).ok()?.trim().to_string();
                }
                b"controlURL" if in_service => {
                    control_url = reader.read_text(e.name()).ok()?.trim().to_string();
                }
                b"eventSubURL" if in_service => {
                    event_sub_url = reader.read_text(e.name()).ok()?.trim().to_string();
                }
                _ => {}
            },
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"service" => {
                in_service = false;
                if service_type.contains(service.urn()) {
                    let url = match endpoint {
                        ServiceEndpoint::Control => &control_url,
                        ServiceEndpoint::EventSub => &event_sub_url,
                    };
                    if !url.is_empty() {
                        return Some(url.clone());
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    None
}

/// Downloads the description document and resolves one service URL against
/// the base URL.
///
/// # Errors
/// Transport failures, a malformed document, an absent service, or an
/// unresolvable URL pair.
pub async fn resolve_service_url(
    client: &Client,
    device_url: &str,
    base_url: &str,
    service: UpnpService,
    endpoint: ServiceEndpoint,
) -> Result<String, DescriptionError> {
    let response = client
        .get(device_url)
        .timeout(Duration::from_secs(DESCRIPTION_TIMEOUT_SECS))
        .send()
        .await?
        .error_for_status()?;
    let xml = response.text().await?;

    if !xml.contains("<root") {
        return Err(DescriptionError::Malformed(
            "missing <root> element".to_string(),
        ));
    }

    let relative = find_service_url(&xml, service, endpoint)
        .ok_or(DescriptionError::ServiceNotFound(service.name()))?;

    let base = Url::parse(base_url).map_err(|e| DescriptionError::BadUrl(e.to_string()))?;
    let resolved = base
        .join(&relative)
        .map_err(|e| DescriptionError::BadUrl(e.to_string()))?;
    Ok(resolved.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DESCRIPTION: &str = r#"<?xml version="1.0"?>
<root xmlns="urn:schemas-upnp-org:device-1-0">
  <device>
    <deviceType>urn:schemas-upnp-org:device:MediaRenderer:1</deviceType>
    <friendlyName>Living Room</friendlyName>
    <serviceList>
      <service>
        <serviceType>urn:schemas-upnp-org:service:AVTransport:1</serviceType>
        <serviceId>urn:upnp-org:serviceId:AVTransport</serviceId>
        <controlURL>/MediaRenderer/AVTransport/Control</controlURL>
        <eventSubURL>/MediaRenderer/AVTransport/Event</eventSubURL>
      </service>
      <service>
        <serviceType>urn:schemas-upnp-org:service:ConnectionManager:1</serviceType>
        <controlURL>/MediaRenderer/ConnectionManager/Control</controlURL>
        <eventSubURL>/MediaRenderer/ConnectionManager/Event</eventSubURL>
      </service>
      <service>
        <serviceType>urn:schemas-upnp-org:service:RenderingControl:1</serviceType>
        <controlURL>/MediaRenderer/RenderingControl/Control</controlURL>
        <eventSubURL>/MediaRenderer/RenderingControl/Event</eventSubURL>
      </service>
    </serviceList>
  </device>
</root>"#;

    #[test]
    fn finds_control_url_of_each_service() {
        assert_eq!(
            find_service_url(DESCRIPTION, UpnpService::AVTransport, ServiceEndpoint::Control)
                .as_deref(),
            Some("/MediaRenderer/AVTransport/Control")
        );
        assert_eq!(
            find_service_url(
                DESCRIPTION,
                UpnpService::ConnectionManager,
                ServiceEndpoint::Control
            )
            .as_deref(),
            Some("/MediaRenderer/ConnectionManager/Control")
        );
    }

    #[test]
    fn finds_event_url_for_subscriptions() {
        assert_eq!(
            find_service_url(
                DESCRIPTION,
                UpnpService::RenderingControl,
                ServiceEndpoint::EventSub
            )
            .as_deref(),
            Some("/MediaRenderer/RenderingControl/Event")
        );
    }

    #[test]
    fn service_type_matches_by_substring() {
        // Some renderers advertise sub-versioned URNs; the v1 URN stays a
        // substring and still resolves.
        let versioned = DESCRIPTION.replace("AVTransport:1<", "AVTransport:1.0<");
        assert!(find_service_url(
            &versioned,
            UpnpService::AVTransport,
            ServiceEndpoint::Control
        )
        .is_some());
    }

    #[test]
    fn missing_service_returns_none() {
        let audio_only = DESCRIPTION.replace("AVTransport", "SomethingElse");
        assert!(find_service_url(
            &audio_only,
            UpnpService::AVTransport,
            ServiceEndpoint::Control
        )
        .is_none());
    }
}
