//! Fixed protocol constants that should NOT be changed.
//!
//! These values are defined by external specifications (UPnP, DLNA, the
//! chain spec syntax) and changing them would break protocol compliance.

// ─────────────────────────────────────────────────────────────────────────────
// UPnP / SOAP
// ─────────────────────────────────────────────────────────────────────────────

/// Timeout for SOAP HTTP requests (seconds).
///
/// 10 seconds is reasonable for LAN operations.
pub const SOAP_TIMEOUT_SECS: u64 = 10;

/// Timeout for the device-description download (seconds).
pub const DESCRIPTION_TIMEOUT_SECS: u64 = 10;

/// Event subscription lease requested from the renderer (seconds).
///
/// Renewal before expiry is the responsibility of whoever hosts the
/// notification endpoint; the session only holds the lease for its lifetime.
pub const EVENT_SUBSCRIPTION_TIMEOUT_SECS: u64 = 300;

// ─────────────────────────────────────────────────────────────────────────────
// DLNA.ORG_FLAGS (primary flags, bits 31..20 of the first 32-bit word)
// ─────────────────────────────────────────────────────────────────────────────

/// Content is delivered at the sender's pace.
pub const DLNA_FLAG_SENDER_PACED: u32 = 1 << 31;
/// Streaming transfer mode (paced real-time delivery).
pub const DLNA_FLAG_STREAMING_TRANSFER_MODE: u32 = 1 << 24;
/// Interactive transfer mode.
pub const DLNA_FLAG_INTERACTIVE_TRANSFER_MODE: u32 = 1 << 23;
/// Background transfer mode.
pub const DLNA_FLAG_BACKGROUND_TRANSFER_MODE: u32 = 1 << 22;
/// The connection may stall without being torn down.
pub const DLNA_FLAG_CONNECTION_STALL: u32 = 1 << 21;
/// Content complies with DLNA v1.5.
pub const DLNA_FLAG_DLNA_V15: u32 = 1 << 20;

/// Flags advertised for every published stream.
pub const DLNA_PUBLISHED_FLAGS: u32 = DLNA_FLAG_STREAMING_TRANSFER_MODE
    | DLNA_FLAG_BACKGROUND_TRANSFER_MODE
    | DLNA_FLAG_CONNECTION_STALL
    | DLNA_FLAG_DLNA_V15;

/// The reserved tail of `DLNA.ORG_FLAGS`: 24 zero hex digits following the
/// 8-digit primary flags word.
pub const DLNA_FLAGS_RESERVED: &str = "000000000000000000000000";

// ─────────────────────────────────────────────────────────────────────────────
// Local HTTP endpoint
// ─────────────────────────────────────────────────────────────────────────────

/// Default port of the local HTTP server the renderer pulls from.
pub const DEFAULT_HTTP_PORT: u16 = 7070;

// ─────────────────────────────────────────────────────────────────────────────
// Encoder probing and output caps
// ─────────────────────────────────────────────────────────────────────────────

/// Width of the dummy stream used to probe encoder candidates.
pub const ENCODER_PROBE_WIDTH: u32 = 1920;
/// Height of the dummy stream used to probe encoder candidates.
pub const ENCODER_PROBE_HEIGHT: u32 = 1080;
/// Frame rate of the dummy stream used to probe encoder candidates.
pub const ENCODER_PROBE_FPS: u32 = 30;

/// Output frame rates above this are capped.
pub const OUTPUT_FPS_LIMIT: u32 = 30;
/// Frame rate applied when the input rate is unknown or above the limit.
pub const OUTPUT_FPS_CAPPED: u32 = 24;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn published_flags_match_wire_value() {
        // The first flags word rendered in protocolInfo strings.
        assert_eq!(format!("{DLNA_PUBLISHED_FLAGS:08X}"), "01700000");
    }
}
