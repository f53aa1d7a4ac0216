//! Parsing of GENA NOTIFY bodies for transport-state changes.
//!
//! AVTransport and RenderingControl publish a single eventable variable,
//! `LastChange`, whose value is an entity-escaped XML document. The state
//! extracted here is informational only: the session's behavior is driven
//! by its own producer-side state machine, not by renderer events.

use quick_xml::events::Event;
use quick_xml::Reader;

/// Transport states an AVTransport instance reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Playing,
    Transitioning,
    PausedPlayback,
    Stopped,
    NoMediaPresent,
}

impl TransportState {
    fn from_value(value: &str) -> Option<Self> {
        match value {
            "PLAYING" => Some(Self::Playing),
            "TRANSITIONING" => Some(Self::Transitioning),
            "PAUSED_PLAYBACK" => Some(Self::PausedPlayback),
            "STOPPED" => Some(Self::Stopped),
            "NO_MEDIA_PRESENT" => Some(Self::NoMediaPresent),
            _ => None,
        }
    }
}

/// Extracts the transport state from a NOTIFY property set.
///
/// The body nests twice: the property set carries a `LastChange` element
/// whose text is itself an escaped `<Event>` document with
/// `<InstanceID><TransportState val="..."/></InstanceID>`.
#[must_use]
pub fn parse_transport_state(notify_body: &str) -> Option<TransportState> {
    let last_change = crate::upnp::xml::extract_xml_text(notify_body, "LastChange")?;

    let mut reader = Reader::from_str(&last_change);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e))
                if e.local_name().as_ref() == b"TransportState" =>
            {
                let value = e
                    .attributes()
                    .flatten()
                    .find(|a| a.key.as_ref() == b"val")
                    .map(|a| String::from_utf8_lossy(&a.value).to_string())?;
                return TransportState::from_value(&value);
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Sample AVTransport NOTIFY body with a PLAYING LastChange.
    const NOTIFY_PLAYING: &str = r#"<?xml version="1.0"?>
<e:propertyset xmlns:e="urn:schemas-upnp-org:event-1-0">
  <e:property>
    <LastChange>&lt;Event xmlns=&quot;urn:schemas-upnp-org:metadata-1-0/AVT/&quot;&gt;
      &lt;InstanceID val=&quot;0&quot;&gt;
        &lt;TransportState val=&quot;PLAYING&quot;/&gt;
      &lt;/InstanceID&gt;
    &lt;/Event&gt;</LastChange>
  </e:property>
</e:propertyset>"#;

    #[test]
    fn parses_playing_state() {
        assert_eq!(
            parse_transport_state(NOTIFY_PLAYING),
            Some(TransportState::Playing)
        );
    }

    #[test]
    fn parses_stopped_and_transitioning() {
        let stopped = NOTIFY_PLAYING.replace("PLAYING", "STOPPED");
        assert_eq!(
            parse_transport_state(&stopped),
            Some(TransportState::Stopped)
        );
        let transitioning = NOTIFY_PLAYING.replace("PLAYING", "TRANSITIONING");
        assert_eq!(
            parse_transport_state(&transitioning),
            Some(TransportState::Transitioning)
        );
    }

    #[test]
    fn unknown_state_returns_none() {
        let custom = NOTIFY_PLAYING.replace("PLAYING", "CUSTOM_VENDOR_STATE");
        assert_eq!(parse_transport_state(&custom), None);
    }

    #[test]
    fn body_without_last_change_returns_none() {
        assert_eq!(parse_transport_state("<e:propertyset/>"), None);
    }
}
