//! UPnP AV service definitions.
//!
//! Single source of truth for the service URNs the renderer controller
//! talks to. Unlike fixed-endpoint devices, generic renderers publish their
//! control and event URLs in the device description, so only the URN is
//! static here; see `description` for URL resolution.

/// UPnP AV services used for control and event subscriptions.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum UpnpService {
    /// Transport control (SetAVTransportURI, Play, Stop).
    AVTransport,
    /// Supported-format reporting (GetProtocolInfo).
    ConnectionManager,
    /// Volume/mute state; subscribed to for eventing only.
    RenderingControl,
}

impl UpnpService {
    /// Returns the service URN used in SOAP requests and for matching
    /// `<serviceType>` entries of the device description.
    #[must_use]
    pub fn urn(&self) -> &'static str {
        match self {
            Self::AVTransport => "urn:schemas-upnp-org:service:AVTransport:1",
            Self::ConnectionManager => "urn:schemas-upnp-org:service:ConnectionManager:1",
            Self::RenderingControl => "urn:schemas-upnp-org:service:RenderingControl:1",
        }
    }

    /// Returns a human-readable name for this service.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::AVTransport => "AVTransport",
            Self::ConnectionManager => "ConnectionManager",
            Self::RenderingControl => "RenderingControl",
        }
    }
}
