//! UPnP renderer control (SOAP, GENA, DIDL-Lite).
//!
//! # Module Structure
//!
//! - `services` - service URN definitions
//! - `soap` - low-level SOAP envelope build/send and action builder
//! - `description` - device-description fetch and service URL resolution
//! - `gena` - event subscription HTTP operations
//! - `eventing` - LastChange notification parsing
//! - `didl` - DIDL-Lite metadata formatting
//! - `renderer` - high-level renderer controller
//! - `xml` - shared escape/extract helpers

pub mod description;
pub mod didl;
pub mod eventing;
pub mod gena;
pub mod renderer;
pub mod services;
pub mod soap;
pub mod xml;

// Re-export the types the session works with
pub use renderer::{MediaRenderer, RendererControl};
pub use services::UpnpService;
