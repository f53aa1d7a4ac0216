//! Low-level SOAP protocol implementation for UPnP renderer control.
//!
//! This module handles the raw SOAP envelope building, HTTP transport,
//! and fault parsing. For high-level renderer commands, see `renderer.rs`.

use std::time::Duration;

use reqwest::Client;
use thiserror::Error;

use crate::protocol_constants::SOAP_TIMEOUT_SECS;
use crate::upnp::services::UpnpService;
use crate::upnp::xml::{escape_xml, extract_xml_text};

// ─────────────────────────────────────────────────────────────────────────────
// Error Types
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can occur during SOAP exchanges with a renderer.
#[derive(Debug, Error)]
pub enum SoapError {
    /// HTTP request to the renderer failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The action failed with a non-success HTTP status.
    #[error("action {action} failed with status {status}: {body}")]
    ActionFailed {
        /// The SOAP action name.
        action: String,
        /// HTTP status code.
        status: u16,
        /// Response payload, for diagnostics.
        body: String,
    },

    /// The renderer returned a SOAP fault.
    #[error("SOAP fault from {action}: {fault}")]
    Fault {
        /// The SOAP action name.
        action: String,
        /// Decoded faultstring.
        fault: String,
    },
}

/// Convenient Result alias for SOAP operations.
pub type SoapResult<T> = Result<T, SoapError>;

// ─────────────────────────────────────────────────────────────────────────────
// SOAP Request
// ─────────────────────────────────────────────────────────────────────────────

/// Builds the single-line SOAP 1.1 envelope for an action.
///
/// Must stay a single line with no whitespace before the root element;
/// several renderer firmwares reject leading whitespace.
fn build_envelope(action: &str, urn: &str, args: &[(&str, String)]) -> String {
    let mut body = format!(
        r#"<?xml version="1.0" encoding="utf-8"?><s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/" s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/"><s:Body><u:{action} xmlns:u="{urn}">"#
    );
    for (name, value) in args {
        body.push_str(&format!("<{name}>{}</{name}>", escape_xml(value)));
    }
    body.push_str(&format!("</u:{action}></s:Body></s:Envelope>"));
    body
}

/// Sends one SOAP action to an already-resolved control URL.
///
/// # Arguments
/// * `client` - The HTTP client to use for the request
/// * `control_url` - Absolute control URL from the device description
/// * `service` - The UPnP service the action belongs to
/// * `action` - The SOAP action name (e.g., "Play", "Stop")
/// * `args` - Action arguments in declaration order
///
/// # Returns
/// The response body on success, or a `SoapError` carrying the action
/// name, status and payload.
pub async fn send_soap_request(
    client: &Client,
    control_url: &str,
    service: UpnpService,
    action: &str,
    args: &[(&str, String)],
) -> SoapResult<String> {
    let urn = service.urn();
    let body = build_envelope(action, urn, args);

    log::debug!("[SOAP] {action} -> {control_url} ({} bytes)", body.len());

    let response = client
        .post(control_url)
        .header("Content-Type", "text/xml; charset=\"utf-8\"")
        .header("SOAPAction", format!("\"{urn}#{action}\""))
        .body(body)
        .timeout(Duration::from_secs(SOAP_TIMEOUT_SECS))
        .send()
        .await?;

    let status = response.status();
    let text = response.text().await?;

    // A fault can come with a 500 status; check the body first.
    if text.contains("<s:Fault>") || text.contains("<soap:Fault>") {
        let fault = extract_xml_text(&text, "faultstring")
            .unwrap_or_else(|| "unknown SOAP fault".to_string());
        return Err(SoapError::Fault {
            action: action.to_string(),
            fault,
        });
    }

    if !status.is_success() {
        return Err(SoapError::ActionFailed {
            action: action.to_string(),
            status: status.as_u16(),
            body: text,
        });
    }

    Ok(text)
}

// ─────────────────────────────────────────────────────────────────────────────
// SOAP Action Builder
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for SOAP actions with an ordered argument list.
///
/// # Example
/// ```ignore
/// let response = SoapAction::new(UpnpService::AVTransport, "Play")
///     .instance_id()
///     .arg("Speed", "1")
///     .send(&client, &control_url)
///     .await?;
/// ```
pub struct SoapAction<'a> {
    service: UpnpService,
    action: &'a str,
    args: Vec<(&'a str, String)>,
}

impl<'a> SoapAction<'a> {
    /// Creates a builder for one action of a service.
    #[must_use]
    pub fn new(service: UpnpService, action: &'a str) -> Self {
        Self {
            service,
            action,
            args: Vec::new(),
        }
    }

    /// Adds an argument; arguments keep their insertion order on the wire.
    #[must_use]
    pub fn arg(mut self, name: &'a str, value: impl Into<String>) -> Self {
        self.args.push((name, value.into()));
        self
    }

    /// Adds the standard `InstanceID=0` argument AVTransport actions take.
    #[must_use]
    pub fn instance_id(self) -> Self {
        self.arg("InstanceID", "0")
    }

    /// Sends the action to the resolved control URL.
    ///
    /// # Errors
    /// Propagates transport errors, SOAP faults and non-success statuses.
    pub async fn send(self, client: &Client, control_url: &str) -> SoapResult<String> {
        send_soap_request(client, control_url, self.service, self.action, &self.args).await
    }

    /// Returns the request parts without sending (for testing).
    #[cfg(test)]
    pub fn into_parts(self) -> (UpnpService, &'a str, Vec<(&'a str, String)>) {
        (self.service, self.action, self.args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_keeps_argument_order() {
        let (service, action, args) = SoapAction::new(UpnpService::AVTransport, "SetAVTransportURI")
            .instance_id()
            .arg("CurrentURI", "http://host/stream.mp4")
            .arg("CurrentURIMetaData", "<DIDL-Lite/>")
            .into_parts();

        assert_eq!(service, UpnpService::AVTransport);
        assert_eq!(action, "SetAVTransportURI");
        assert_eq!(args.len(), 3);
        assert_eq!(args[0], ("InstanceID", "0".to_string()));
        assert_eq!(args[1].0, "CurrentURI");
        assert_eq!(args[2].0, "CurrentURIMetaData");
    }

    #[test]
    fn envelope_is_single_line_and_escaped() {
        let envelope = build_envelope(
            "SetAVTransportURI",
            UpnpService::AVTransport.urn(),
            &[("CurrentURIMetaData", "<item id=\"0\"/>".to_string())],
        );
        assert!(!envelope.contains('\n'));
        assert!(envelope.starts_with("<?xml"));
        assert!(envelope.contains("&lt;item id=&quot;0&quot;/&gt;"));
        assert!(envelope.contains("<u:SetAVTransportURI xmlns:u=\"urn:schemas-upnp-org:service:AVTransport:1\">"));
        assert!(envelope.ends_with("</u:SetAVTransportURI></s:Body></s:Envelope>"));
    }

    #[test]
    fn envelope_without_args_has_empty_action_element() {
        let envelope = build_envelope(
            "GetProtocolInfo",
            UpnpService::ConnectionManager.urn(),
            &[],
        );
        assert!(envelope
            .contains("<u:GetProtocolInfo xmlns:u=\"urn:schemas-upnp-org:service:ConnectionManager:1\"></u:GetProtocolInfo>"));
    }
}
