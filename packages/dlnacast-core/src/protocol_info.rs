//! Parsing and serialization of UPnP `protocolInfo` strings.
//!
//! A renderer's `GetProtocolInfo` response lists the formats its `Sink` side
//! accepts as a comma-separated list of colon-delimited entries:
//! `<transport>:<network>:<mime>:<attributes>`. Only 4-field `http-get`
//! entries are usable here; each accepted entry is joined against the
//! profile catalog, expanding into one [`ProtocolInfo`] record per
//! compatible row.

use crate::profiles::{
    matching_rows, DlnaProfile, DEFAULT_AUDIO_PROFILE, DEFAULT_VIDEO_PROFILE,
};
use crate::protocol_constants::{DLNA_FLAGS_RESERVED, DLNA_PUBLISHED_FLAGS};

/// The only transport this module serves.
pub const TRANSPORT_HTTP_GET: &str = "http-get";

/// DLNA attribute bag from the fourth `protocolInfo` field.
///
/// A field consisting of a single `"*"` carries no attributes at all and
/// leaves every member unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DlnaAttributes {
    /// `DLNA.ORG_PN`, the profile name.
    pub pn: Option<String>,
    /// `DLNA.ORG_OP`, supported seek operations.
    pub op: Option<String>,
    /// `DLNA.ORG_CI`, the conversion indicator.
    pub ci: Option<String>,
    /// `DLNA.ORG_FLAGS`, primary flags plus reserved tail.
    pub flags: Option<String>,
}

impl DlnaAttributes {
    fn parse(field: &str) -> Self {
        if field == "*" {
            return Self::default();
        }
        Self {
            pn: attribute_value(field, "DLNA.ORG_PN="),
            op: attribute_value(field, "DLNA.ORG_OP="),
            ci: attribute_value(field, "DLNA.ORG_CI="),
            flags: attribute_value(field, "DLNA.ORG_FLAGS="),
        }
    }
}

/// Extracts the value of one `KEY=` token, sliced at the next `;`.
fn attribute_value(field: &str, key: &str) -> Option<String> {
    let start = field.find(key)? + key.len();
    let rest = &field[start..];
    let end = rest.find(';').unwrap_or(rest.len());
    Some(rest[..end].to_string())
}

/// One accepted `Sink` entry before catalog resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkEntry {
    /// Transport token, always [`TRANSPORT_HTTP_GET`] after filtering.
    pub transport: String,
    /// Network field, `"*"` in practice.
    pub network: String,
    /// MIME type.
    pub mime: String,
    /// Parsed DLNA attribute bag.
    pub attributes: DlnaAttributes,
}

impl SinkEntry {
    /// Re-serializes the entry in wire form.
    ///
    /// Attributes are emitted in canonical order; an empty bag collapses to
    /// the unconstrained `"*"` field.
    #[must_use]
    pub fn to_wire(&self) -> String {
        let mut attrs = Vec::new();
        if let Some(pn) = &self.attributes.pn {
            attrs.push(format!("DLNA.ORG_PN={pn}"));
        }
        if let Some(op) = &self.attributes.op {
            attrs.push(format!("DLNA.ORG_OP={op}"));
        }
        if let Some(ci) = &self.attributes.ci {
            attrs.push(format!("DLNA.ORG_CI={ci}"));
        }
        if let Some(flags) = &self.attributes.flags {
            attrs.push(format!("DLNA.ORG_FLAGS={flags}"));
        }
        let attrs = if attrs.is_empty() {
            "*".to_string()
        } else {
            attrs.join(";")
        };
        format!("{}:{}:{}:{}", self.transport, self.network, self.mime, attrs)
    }
}

/// Splits a `GetProtocolInfo` CSV into accepted entries.
///
/// Entries that are not exactly four fields, or whose transport is not
/// `http-get`, are dropped.
#[must_use]
pub fn parse_sink_entries(csv: &str) -> Vec<SinkEntry> {
    csv.split(',')
        .filter_map(|entry| {
            let entry = entry.trim();
            if entry.is_empty() {
                return None;
            }
            let fields: Vec<&str> = entry.split(':').collect();
            if fields.len() != 4 {
                log::debug!("[ProtocolInfo] skipping malformed entry: {entry}");
                return None;
            }
            if fields[0] != TRANSPORT_HTTP_GET {
                log::debug!("[ProtocolInfo] skipping transport {}: {entry}", fields[0]);
                return None;
            }
            Some(SinkEntry {
                transport: fields[0].to_string(),
                network: fields[1].to_string(),
                mime: fields[2].to_string(),
                attributes: DlnaAttributes::parse(fields[3]),
            })
        })
        .collect()
}

/// One renderer-supported format, resolved against the profile catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolInfo {
    /// The accepted `Sink` entry this record came from.
    pub entry: SinkEntry,
    /// Copy of the catalog row satisfying the entry.
    pub profile: DlnaProfile,
}

impl ProtocolInfo {
    /// Built-in fallback when no audio profile matches: MP3 over MPEG-TS.
    #[must_use]
    pub fn default_audio() -> Self {
        Self {
            entry: SinkEntry {
                transport: TRANSPORT_HTTP_GET.to_string(),
                network: "*".to_string(),
                mime: DEFAULT_AUDIO_PROFILE.mime.to_string(),
                attributes: DlnaAttributes {
                    pn: Some(DEFAULT_AUDIO_PROFILE.name.to_string()),
                    ..DlnaAttributes::default()
                },
            },
            profile: DEFAULT_AUDIO_PROFILE,
        }
    }

    /// Built-in fallback when no A/V profile matches: H.264 + AAC in MP4.
    #[must_use]
    pub fn default_video() -> Self {
        Self {
            entry: SinkEntry {
                transport: TRANSPORT_HTTP_GET.to_string(),
                network: "*".to_string(),
                mime: DEFAULT_VIDEO_PROFILE.mime.to_string(),
                attributes: DlnaAttributes {
                    pn: Some(DEFAULT_VIDEO_PROFILE.name.to_string()),
                    ci: Some("0".to_string()),
                    ..DlnaAttributes::default()
                },
            },
            profile: DEFAULT_VIDEO_PROFILE,
        }
    }

    /// Rebuilds the `protocolInfo` string published to the renderer.
    ///
    /// The string is reconstructed from the resolved profile rather than
    /// echoed from the device: the renderer must see the exact format the
    /// local chain produces. Flags advertise a streaming, stall-tolerant
    /// DLNA 1.5 transfer.
    #[must_use]
    pub fn published_string(&self) -> String {
        let op = self.entry.attributes.op.as_deref().unwrap_or("01");
        let ci = self.entry.attributes.ci.as_deref().unwrap_or("0");
        format!(
            "{}:*:{}:DLNA.ORG_PN={};DLNA.ORG_OP={};DLNA.ORG_CI={};DLNA.ORG_FLAGS={:08X}{}",
            TRANSPORT_HTTP_GET,
            self.profile.mime,
            self.profile.name,
            op,
            ci,
            DLNA_PUBLISHED_FLAGS,
            DLNA_FLAGS_RESERVED,
        )
    }
}

/// Parses a `GetProtocolInfo` `Sink` CSV into supported-format records.
///
/// Every accepted entry is joined against the full catalog; all matching
/// rows are kept, so an unconstrained advertisement expands into each
/// compatible wildcard row. Entries whose MIME no row serves are dropped.
#[must_use]
pub fn parse_supported_protocols(csv: &str) -> Vec<ProtocolInfo> {
    let mut supported = Vec::new();
    for entry in parse_sink_entries(csv) {
        let pn = entry.attributes.pn.as_deref();
        let rows: Vec<&'static DlnaProfile> = matching_rows(&entry.mime, pn).collect();
        if rows.is_empty() {
            log::debug!(
                "[ProtocolInfo] no catalog row for mime {} (PN {:?})",
                entry.mime,
                pn
            );
            continue;
        }
        for profile in rows {
            supported.push(ProtocolInfo {
                entry: entry.clone(),
                profile: *profile,
            });
        }
    }
    supported
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fourcc::{CODEC_A52, CODEC_H264, CODEC_MP3};
    use crate::profiles::MediaClass;

    #[test]
    fn rejects_non_http_get_and_short_entries() {
        let csv = "rtsp-rtp-udp:*:video/mpeg:*,http-get:*:audio/mpeg,\
                   http-get:*:audio/mpeg:DLNA.ORG_PN=MP3";
        let entries = parse_sink_entries(csv);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].mime, "audio/mpeg");
        assert_eq!(entries[0].attributes.pn.as_deref(), Some("MP3"));
    }

    #[test]
    fn wire_round_trip_preserves_accepted_subset() {
        let inputs = [
            "http-get:*:audio/mpeg:DLNA.ORG_PN=MP3",
            "rtsp-rtp-udp:*:video/mpeg:*",
            "http-get:*:video/mpeg:DLNA.ORG_PN=AVC_TS_NA_T;DLNA.ORG_OP=01;DLNA.ORG_CI=0;DLNA.ORG_FLAGS=8D500000000000000000000000000000",
            "http-get:*:video/mp4:*",
            "http-get:*:broken",
        ];
        let csv = inputs.join(",");

        let reserialized: Vec<String> = parse_sink_entries(&csv)
            .iter()
            .map(SinkEntry::to_wire)
            .collect();

        let accepted: Vec<&str> = inputs
            .iter()
            .copied()
            .filter(|e| e.starts_with("http-get") && e.split(':').count() == 4)
            .collect();
        assert_eq!(reserialized, accepted);
    }

    #[test]
    fn attribute_values_slice_at_semicolon() {
        let attrs = DlnaAttributes::parse(
            "DLNA.ORG_PN=AVC_TS_NA_T;DLNA.ORG_OP=01;DLNA.ORG_CI=1;DLNA.ORG_FLAGS=01700000000000000000000000000000",
        );
        assert_eq!(attrs.pn.as_deref(), Some("AVC_TS_NA_T"));
        assert_eq!(attrs.op.as_deref(), Some("01"));
        assert_eq!(attrs.ci.as_deref(), Some("1"));
        assert_eq!(
            attrs.flags.as_deref(),
            Some("01700000000000000000000000000000")
        );
    }

    #[test]
    fn star_advertisement_expands_into_wildcard_rows() {
        let supported = parse_supported_protocols("http-get:*:video/mpeg:*");
        // Four wildcard video/mpeg rows in the catalog.
        assert_eq!(supported.len(), 4);
        assert!(supported.iter().all(|p| p.profile.is_wildcard()));
    }

    #[test]
    fn named_advertisement_resolves_all_codec_pairs() {
        let supported =
            parse_supported_protocols("http-get:*:video/mpeg:DLNA.ORG_PN=AVC_TS_NA_T");
        assert_eq!(supported.len(), 3);
        assert!(supported
            .iter()
            .all(|p| p.profile.video_codec == CODEC_H264));
        assert!(supported.iter().any(|p| p.profile.audio_codec == CODEC_A52));
    }

    #[test]
    fn unknown_mime_yields_no_records() {
        assert!(parse_supported_protocols("http-get:*:video/quicktime:*").is_empty());
    }

    #[test]
    fn published_string_is_rebuilt_from_profile() {
        let proto = ProtocolInfo::default_video();
        assert_eq!(
            proto.published_string(),
            "http-get:*:video/mp4:DLNA.ORG_PN=AVC_MP4_MP_SD;DLNA.ORG_OP=01;\
             DLNA.ORG_CI=0;DLNA.ORG_FLAGS=01700000000000000000000000000000"
        );
    }

    #[test]
    fn default_audio_is_mp3_over_ts() {
        let proto = ProtocolInfo::default_audio();
        assert_eq!(proto.profile.mux, "ts");
        assert_eq!(proto.profile.mime, "audio/mpeg");
        assert_eq!(proto.profile.audio_codec, CODEC_MP3);
        assert_eq!(proto.profile.media_class(), MediaClass::Audio);
    }
}
