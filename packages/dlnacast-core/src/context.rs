//! Network configuration context for the published stream endpoint.
//!
//! Bundles the local HTTP port with local-IP detection so the session can
//! compose the URL handed to the renderer. Detection is behind a trait so
//! tests can pin a fixed address.

use std::net::IpAddr;
use std::sync::Arc;

use thiserror::Error;

/// Errors raised while resolving the published endpoint.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// No bindable local IPv4/IPv6 address was found.
    #[error("no local IP address available")]
    NoLocalAddress,
}

/// Detector for the local address renderers can reach us at.
pub trait IpDetector: Send + Sync {
    /// Returns the local address, preferring IPv4.
    fn detect(&self) -> Result<IpAddr, NetworkError>;
}

/// Default detector backed by the OS routing table.
pub struct LocalIpDetector;

impl IpDetector for LocalIpDetector {
    fn detect(&self) -> Result<IpAddr, NetworkError> {
        local_ip_address::local_ip()
            .or_else(|_| local_ip_address::local_ipv6())
            .map_err(|_| NetworkError::NoLocalAddress)
    }
}

/// Network configuration shared by the session and the output chain.
#[derive(Clone)]
pub struct NetworkContext {
    http_port: u16,
    detector: Arc<dyn IpDetector>,
}

impl NetworkContext {
    /// Creates a context with the given HTTP port and detector.
    #[must_use]
    pub fn new(http_port: u16, detector: Arc<dyn IpDetector>) -> Self {
        Self {
            http_port,
            detector,
        }
    }

    /// Creates a context with a fixed address, for tests.
    #[cfg(test)]
    pub fn fixed(http_port: u16, addr: IpAddr) -> Self {
        struct Fixed(IpAddr);
        impl IpDetector for Fixed {
            fn detect(&self) -> Result<IpAddr, NetworkError> {
                Ok(self.0)
            }
        }
        Self::new(http_port, Arc::new(Fixed(addr)))
    }

    /// Returns the local HTTP port the chain binds to.
    #[must_use]
    pub fn http_port(&self) -> u16 {
        self.http_port
    }

    /// Composes the absolute URL of a published root path.
    ///
    /// IPv6 addresses are bracketed per RFC 3986.
    ///
    /// # Errors
    /// [`NetworkError::NoLocalAddress`] when detection fails.
    pub fn stream_url(&self, root_path: &str) -> Result<String, NetworkError> {
        let ip = self.detector.detect()?;
        Ok(match ip {
            IpAddr::V4(v4) => format!("http://{}:{}{}", v4, self.http_port, root_path),
            IpAddr::V6(v6) => format!("http://[{}]:{}{}", v6, self.http_port, root_path),
        })
    }
}
