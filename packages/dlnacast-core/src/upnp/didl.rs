//! DIDL-Lite metadata for SetAVTransportURI.
//!
//! Renderers want the transport URI accompanied by a DIDL-Lite item
//! describing the media class and the exact `protocolInfo` of the resource;
//! several refuse to play without it. The item here is minimal: one entry
//! whose title and class follow the media class of the selected profile.

use crate::profiles::MediaClass;
use crate::protocol_info::ProtocolInfo;
use crate::upnp::xml::escape_xml;

/// Formats the DIDL-Lite document sent as `CurrentURIMetaData`.
#[must_use]
pub fn format_didl_lite(stream_url: &str, protocol: &ProtocolInfo) -> String {
    let (title, upnp_class) = match protocol.profile.media_class() {
        MediaClass::Audio => ("Audio", "object.item.audioItem"),
        MediaClass::AudioVideo => ("Video", "object.item.videoItem"),
    };

    let mut didl = String::from(
        r#"<DIDL-Lite xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:upnp="urn:schemas-upnp-org:metadata-1-0/upnp/" xmlns="urn:schemas-upnp-org:metadata-1-0/DIDL-Lite/">"#,
    );
    didl.push_str(r#"<item id="0" parentID="-1" restricted="1">"#);
    didl.push_str(&format!("<dc:title>{title}</dc:title>"));
    didl.push_str(&format!("<upnp:class>{upnp_class}</upnp:class>"));
    didl.push_str(&format!(
        r#"<res protocolInfo="{}">{}</res>"#,
        escape_xml(&protocol.published_string()),
        escape_xml(stream_url)
    ));
    didl.push_str("</item>");
    didl.push_str("</DIDL-Lite>");
    didl
}
