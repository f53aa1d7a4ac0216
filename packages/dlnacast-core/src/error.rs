//! Centralized error types for the DLNA cast core.
//!
//! Each protocol layer defines its own `thiserror` enum next to the code
//! that produces it (`SoapError`, `DescriptionError`, `GenaError`,
//! `ChainError`). This module converges them into the crate-wide
//! [`CastError`] surfaced by the session entry points.

use thiserror::Error;

use crate::context::NetworkError;
use crate::pipeline::ChainError;
use crate::upnp::description::DescriptionError;
use crate::upnp::gena::GenaError;
use crate::upnp::soap::SoapError;

/// Application-wide error type for the cast session.
#[derive(Debug, Error)]
pub enum CastError {
    /// A required configuration value is absent (notably the device URL).
    #[error("missing configuration: {0}")]
    ConfigMissing(&'static str),

    /// The UPnP transport could not be constructed.
    #[error("UPnP transport unavailable: {0}")]
    UpnpUnavailable(String),

    /// A SOAP exchange with the renderer failed.
    #[error("renderer unreachable: {0}")]
    RendererUnreachable(String),

    /// The device description could not be parsed.
    #[error("malformed device XML: {0}")]
    XmlMalformed(String),

    /// No bindable local IPv4/IPv6 address was found.
    #[error("no local address to publish the stream on")]
    NoLocalAddress,

    /// The sub-pipeline refused the chain specification.
    #[error("output chain build failed: {0}")]
    ChainBuildFailed(String),

    /// The planner ran out of encoder candidates.
    #[error("no usable video encoder")]
    EncoderUnavailable,

    /// The chain refused every declared elementary stream.
    #[error("all elementary streams refused by the output chain")]
    StreamRefused,

    /// The user declined the conversion performance warning.
    #[error("conversion declined by the user")]
    ConversionDeclined,
}

impl CastError {
    /// Returns a machine-readable code for diagnostics.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigMissing(_) => "config_missing",
            Self::UpnpUnavailable(_) => "upnp_unavailable",
            Self::RendererUnreachable(_) => "renderer_unreachable",
            Self::XmlMalformed(_) => "xml_malformed",
            Self::NoLocalAddress => "no_local_address",
            Self::ChainBuildFailed(_) => "chain_build_failed",
            Self::EncoderUnavailable => "encoder_unavailable",
            Self::StreamRefused => "stream_refused",
            Self::ConversionDeclined => "conversion_declined",
        }
    }
}

impl From<SoapError> for CastError {
    fn from(err: SoapError) -> Self {
        Self::RendererUnreachable(err.to_string())
    }
}

impl From<DescriptionError> for CastError {
    fn from(err: DescriptionError) -> Self {
        match err {
            DescriptionError::Malformed(msg) => Self::XmlMalformed(msg),
            other => Self::RendererUnreachable(other.to_string()),
        }
    }
}

impl From<GenaError> for CastError {
    fn from(err: GenaError) -> Self {
        Self::RendererUnreachable(err.to_string())
    }
}

impl From<ChainError> for CastError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::Refused(_) => Self::StreamRefused,
            other => Self::ChainBuildFailed(other.to_string()),
        }
    }
}

impl From<NetworkError> for CastError {
    fn from(_: NetworkError) -> Self {
        Self::NoLocalAddress
    }
}

/// Convenient Result alias for session-level operations.
pub type CastResult<T> = Result<T, CastError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_refusal_maps_to_stream_refused() {
        let err: CastError = ChainError::Refused("cast-proxy:http{}".into()).into();
        assert!(matches!(err, CastError::StreamRefused));
        assert_eq!(err.code(), "stream_refused");
    }

    #[test]
    fn description_parse_failure_maps_to_xml_malformed() {
        let err: CastError = DescriptionError::Malformed("truncated".into()).into();
        assert!(matches!(err, CastError::XmlMalformed(_)));
    }
}
