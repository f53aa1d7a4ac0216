//! Capability matching between input streams and renderer-supported formats.
//!
//! Given the admitted elementary streams and the parsed `GetProtocolInfo`
//! list, picks the first supported protocol the input can be remuxed into,
//! or falls back to a built-in default profile and flags the codecs that
//! must be transcoded to reach it.

use crate::fourcc::FourCc;
use crate::pipeline::{EsCategory, EsFormat};
use crate::profiles::MediaClass;
use crate::protocol_info::ProtocolInfo;

/// Result of matching the input set against the supported list.
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    /// The protocol the output chain will produce.
    pub protocol: ProtocolInfo,
    /// True when no supported protocol accepts the input as-is.
    pub needs_transcode: bool,
    /// The audio track must be re-encoded to the protocol's audio codec.
    pub transcode_audio: bool,
    /// The video track must be re-encoded to the protocol's video codec.
    pub transcode_video: bool,
}

/// Matches the admitted streams against the renderer's supported protocols.
///
/// Only the first-seen codec of each category is considered; additional
/// same-category streams follow the selected protocol. Returns `None` when
/// the input carries neither audio nor video.
#[must_use]
pub fn match_capabilities(
    streams: &[EsFormat],
    supported: &[ProtocolInfo],
) -> Option<MatchOutcome> {
    let mut audio_codec: Option<FourCc> = None;
    let mut video_codec: Option<FourCc> = None;
    for es in streams {
        match es.category {
            EsCategory::Audio => {
                if audio_codec.is_none() {
                    audio_codec = Some(es.codec);
                }
            }
            EsCategory::Video => {
                if video_codec.is_none() {
                    video_codec = Some(es.codec);
                }
            }
            EsCategory::Subtitle => {}
        }
    }

    match (audio_codec, video_codec) {
        (None, None) => None,
        (Some(audio), None) => Some(match_audio_only(audio, supported)),
        (audio, Some(video)) => Some(match_with_video(audio, video, supported)),
    }
}

fn match_audio_only(audio: FourCc, supported: &[ProtocolInfo]) -> MatchOutcome {
    let hit = supported.iter().find(|p| {
        p.profile.media_class() == MediaClass::Audio && p.profile.audio_codec == audio
    });
    match hit {
        Some(protocol) => MatchOutcome {
            protocol: protocol.clone(),
            needs_transcode: false,
            transcode_audio: false,
            transcode_video: false,
        },
        None => {
            log::debug!("[Match] no audio protocol for {audio}, converting");
            MatchOutcome {
                protocol: ProtocolInfo::default_audio(),
                needs_transcode: true,
                transcode_audio: true,
                transcode_video: false,
            }
        }
    }
}

fn match_with_video(
    audio: Option<FourCc>,
    video: FourCc,
    supported: &[ProtocolInfo],
) -> MatchOutcome {
    let wanted_audio = audio.unwrap_or(FourCc::NONE);
    let hit = supported.iter().find(|p| {
        p.profile.media_class() == MediaClass::AudioVideo
            && p.profile.video_codec == video
            && p.profile.audio_codec == wanted_audio
    });
    match hit {
        Some(protocol) => MatchOutcome {
            protocol: protocol.clone(),
            needs_transcode: false,
            transcode_audio: false,
            transcode_video: false,
        },
        None => {
            let protocol = ProtocolInfo::default_video();
            let transcode_audio =
                audio.is_some_and(|a| a != protocol.profile.audio_codec);
            let transcode_video = video != protocol.profile.video_codec;
            log::debug!(
                "[Match] no A/V protocol for {video}/{wanted_audio}, converting \
                 (audio: {transcode_audio}, video: {transcode_video})"
            );
            MatchOutcome {
                protocol,
                needs_transcode: true,
                transcode_audio,
                transcode_video,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fourcc::{CODEC_A52, CODEC_H264, CODEC_MP3, CODEC_VORBIS, CODEC_VP8};
    use crate::protocol_info::parse_supported_protocols;

    fn mp3_sink() -> Vec<ProtocolInfo> {
        parse_supported_protocols("http-get:*:audio/mpeg:DLNA.ORG_PN=MP3")
    }

    #[test]
    fn direct_audio_match_needs_no_transcode() {
        let streams = [EsFormat::audio(CODEC_MP3, 44100, 2)];
        let outcome = match_capabilities(&streams, &mp3_sink()).unwrap();
        assert!(!outcome.needs_transcode);
        assert_eq!(outcome.protocol.profile.name, "MP3");
        assert_eq!(outcome.protocol.profile.mime, "audio/mpeg");
    }

    #[test]
    fn unsupported_audio_falls_back_to_mp3_default() {
        let streams = [EsFormat::audio(CODEC_VORBIS, 48000, 2)];
        let outcome = match_capabilities(&streams, &mp3_sink()).unwrap();
        assert!(outcome.needs_transcode);
        assert!(outcome.transcode_audio);
        assert!(!outcome.transcode_video);
        assert_eq!(outcome.protocol.profile.audio_codec, CODEC_MP3);
    }

    #[test]
    fn av_match_takes_first_supported_row() {
        let supported = parse_supported_protocols(
            "http-get:*:video/mpeg:DLNA.ORG_PN=AVC_TS_NA_T",
        );
        let streams = [
            EsFormat::audio(CODEC_A52, 48000, 6),
            EsFormat::video(CODEC_H264, 1920, 1080, 25),
        ];
        let outcome = match_capabilities(&streams, &supported).unwrap();
        assert!(!outcome.needs_transcode);
        assert_eq!(outcome.protocol.profile.name, "AVC_TS_NA_T");
    }

    #[test]
    fn av_fallback_flags_only_mismatched_codecs() {
        let supported = parse_supported_protocols(
            "http-get:*:video/mp4:DLNA.ORG_PN=AVC_MP4_MP_SD_EAC3",
        );
        // VP8 + Vorbis against an AVC/EAC3 sink: both sides mismatch the
        // default AVC_MP4_MP_SD profile.
        let streams = [
            EsFormat::audio(CODEC_VORBIS, 48000, 2),
            EsFormat::video(CODEC_VP8, 1280, 720, 30),
        ];
        let outcome = match_capabilities(&streams, &supported).unwrap();
        assert!(outcome.needs_transcode);
        assert!(outcome.transcode_audio);
        assert!(outcome.transcode_video);
        assert_eq!(outcome.protocol.profile.name, "AVC_MP4_MP_SD");

        // H.264 + Vorbis: the video track is kept as-is.
        let streams = [
            EsFormat::audio(CODEC_VORBIS, 48000, 2),
            EsFormat::video(CODEC_H264, 1280, 720, 30),
        ];
        let outcome = match_capabilities(&streams, &supported).unwrap();
        assert!(outcome.needs_transcode);
        assert!(outcome.transcode_audio);
        assert!(!outcome.transcode_video);
    }

    #[test]
    fn video_only_falls_back_without_audio_flag() {
        let streams = [EsFormat::video(CODEC_VP8, 640, 360, 30)];
        let outcome = match_capabilities(&streams, &[]).unwrap();
        assert!(outcome.needs_transcode);
        assert!(outcome.transcode_video);
        assert!(!outcome.transcode_audio);
    }

    #[test]
    fn subtitle_only_input_matches_nothing() {
        let streams = [EsFormat::subtitle(crate::fourcc::FourCc::new(b"subt"))];
        assert!(match_capabilities(&streams, &mp3_sink()).is_none());
    }

    #[test]
    fn matcher_ignores_second_stream_of_same_category() {
        let streams = [
            EsFormat::audio(CODEC_MP3, 44100, 2),
            EsFormat::audio(CODEC_VORBIS, 48000, 2),
        ];
        let outcome = match_capabilities(&streams, &mp3_sink()).unwrap();
        assert!(!outcome.needs_transcode);
    }
}
