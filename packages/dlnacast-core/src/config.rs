//! Session configuration types.
//!
//! All fields except the device description URL have usable defaults.
//! The only piece of state written back is the `show_perf_warning` flag,
//! persisted through [`SettingsStore`] when the user dismisses the
//! conversion warning permanently.

use serde::{Deserialize, Serialize};

use crate::error::{CastError, CastResult};
use crate::protocol_constants::DEFAULT_HTTP_PORT;
use crate::transcode::ConversionQuality;

fn default_http_port() -> u16 {
    DEFAULT_HTTP_PORT
}

fn default_true() -> bool {
    true
}

/// Configuration for one cast session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Absolute URL of the renderer's description document. Required;
    /// opening a session without it fails.
    #[serde(default)]
    pub device_url: String,

    /// Renderer IP address, kept for diagnostics.
    #[serde(default)]
    pub device_ip: Option<String>,

    /// Renderer UPnP port, kept for diagnostics.
    #[serde(default)]
    pub device_port: Option<u16>,

    /// Port of the local HTTP server the renderer pulls from.
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Whether the renderer can receive video. When false, video streams
    /// are refused at admission.
    #[serde(default = "default_true")]
    pub supports_video: bool,

    /// Muxer descriptor override; the profile's muxer is used when unset.
    #[serde(default)]
    pub mux: Option<String>,

    /// MIME type override; the profile's MIME is used when unset.
    #[serde(default)]
    pub mime: Option<String>,

    /// Base URL for resolving relative service URLs from the device
    /// description; the description URL itself when unset.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Quality tier applied when transcoding is required.
    #[serde(default)]
    pub quality: ConversionQuality,

    /// Gate for the one-shot conversion performance warning.
    #[serde(default = "default_true")]
    pub show_perf_warning: bool,
}

impl SessionConfig {
    /// Creates a configuration for the given description URL.
    #[must_use]
    pub fn new(device_url: impl Into<String>) -> Self {
        Self {
            device_url: device_url.into(),
            ..Self::default()
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// [`CastError::ConfigMissing`] when the device URL is unset.
    pub fn validate(&self) -> CastResult<()> {
        if self.device_url.is_empty() {
            return Err(CastError::ConfigMissing("device description URL"));
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            device_url: String::new(),
            device_ip: None,
            device_port: None,
            http_port: DEFAULT_HTTP_PORT,
            supports_video: true,
            mux: None,
            mime: None,
            base_url: None,
            quality: ConversionQuality::default(),
            show_perf_warning: true,
        }
    }
}

/// Write-back sink for settings the user changes mid-session.
pub trait SettingsStore: Send + Sync {
    /// Persists the `show_perf_warning` flag.
    fn set_show_perf_warning(&self, value: bool);
}

/// Store that discards writes, for hosts without persistent settings.
pub struct NullSettingsStore;

impl SettingsStore for NullSettingsStore {
    fn set_show_perf_warning(&self, _value: bool) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_device_url_fails_validation() {
        let config = SessionConfig::default();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, CastError::ConfigMissing(_)));
    }

    #[test]
    fn minimal_config_passes_validation() {
        let config = SessionConfig::new("http://192.168.1.9:49152/description.xml");
        assert!(config.validate().is_ok());
        assert_eq!(config.http_port, DEFAULT_HTTP_PORT);
        assert!(config.supports_video);
        assert!(config.show_perf_warning);
    }
}
