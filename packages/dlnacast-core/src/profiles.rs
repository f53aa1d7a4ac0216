//! Static catalog of DLNA media format profiles.
//!
//! Each row maps a DLNA profile name to the muxer descriptor, MIME type and
//! codec pair the local pipeline must produce for a renderer advertising
//! that profile. Rows named `"*"` are catch-all entries: they match device
//! entries that advertise an unconstrained `DLNA.ORG_PN`, so one wildcard
//! advertisement expands into every compatible catalog row.
//!
//! The table is scanned linearly and in order; earlier rows win when the
//! capability matcher takes the first hit.

use crate::fourcc::{
    FourCc, CODEC_A52, CODEC_EAC3, CODEC_H264, CODEC_HEVC, CODEC_MP2, CODEC_MP2V, CODEC_MP3,
    CODEC_MP4A, CODEC_MPGA, CODEC_OPUS, CODEC_VORBIS,
};

/// Media class of a profile row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaClass {
    /// Audio-only content (`object.item.audioItem`).
    Audio,
    /// Combined audio/video content (`object.item.videoItem`).
    AudioVideo,
}

/// One immutable row of the profile catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DlnaProfile {
    /// DLNA profile name, `"*"` for catch-all rows.
    pub name: &'static str,
    /// Muxer descriptor passed verbatim to the chain builder.
    pub mux: &'static str,
    /// MIME type advertised for the published stream.
    pub mime: &'static str,
    /// Expected video codec, [`FourCc::NONE`] for audio-only rows.
    pub video_codec: FourCc,
    /// Expected audio codec, [`FourCc::NONE`] for video-only rows.
    pub audio_codec: FourCc,
}

impl DlnaProfile {
    /// Returns the media class implied by the codec pair.
    #[must_use]
    pub fn media_class(&self) -> MediaClass {
        if self.video_codec.is_none() {
            MediaClass::Audio
        } else {
            MediaClass::AudioVideo
        }
    }

    /// Returns true for catch-all rows.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.name == "*"
    }
}

const fn row(
    name: &'static str,
    mux: &'static str,
    mime: &'static str,
    video: FourCc,
    audio: FourCc,
) -> DlnaProfile {
    DlnaProfile {
        name,
        mux,
        mime,
        video_codec: video,
        audio_codec: audio,
    }
}

/// Muxer descriptor for live Matroska output.
const MKV_LIVE_MUX: &str = "avformat{mux=matroska,options={live=1}}";

/// The ordered profile catalog.
pub static PROFILE_LIST: &[DlnaProfile] = &[
    // ── Audio ────────────────────────────────────────────────────────────
    row("*", "ts", "audio/mpeg", FourCc::NONE, CODEC_MP3),
    row("*", "ogg", "application/ogg", FourCc::NONE, CODEC_VORBIS),
    row("*", "ogg", "application/ogg", FourCc::NONE, CODEC_OPUS),
    row("*", "ogg", "audio/x-vorbis", FourCc::NONE, CODEC_VORBIS),
    row("*", "ogg", "audio/x-vorbis+ogg", FourCc::NONE, CODEC_VORBIS),
    row("*", "ogg", "audio/ogg", FourCc::NONE, CODEC_OPUS),
    row("*", "ogg", "audio/ogg", FourCc::NONE, CODEC_VORBIS),
    row("MP3", "ts", "audio/mpeg", FourCc::NONE, CODEC_MP3),
    row("MP3X", "ts", "audio/mpeg", FourCc::NONE, CODEC_MP3),
    // ── Video ────────────────────────────────────────────────────────────
    row("*", "ts", "video/mpeg", CODEC_MP2V, CODEC_MP3),
    row("*", "ts", "video/mpeg", CODEC_MP2V, CODEC_MPGA),
    row("*", "ts", "video/mpeg", CODEC_H264, CODEC_MP3),
    row("*", "ts", "video/mpeg", CODEC_H264, CODEC_MPGA),
    row("*", "mp4stream", "video/mp4", CODEC_H264, CODEC_MPGA),
    row("*", "mp4stream", "video/mp4", CODEC_H264, CODEC_MP3),
    row("*", MKV_LIVE_MUX, "video/x-mkv", CODEC_H264, CODEC_MP3),
    row("*", MKV_LIVE_MUX, "video/x-mkv", CODEC_H264, CODEC_MPGA),
    // MPEG-2 SD/HD in MPEG-2 TS per SCTE-43, AC-3 audio, no timestamp field.
    row("MPEG_TS_NA_ISO", "ts", "video/mpeg", CODEC_MP2V, CODEC_A52),
    // North-America MPEG-2 HD 3D frame-compatible, AC-3, no timestamp field.
    row("MPEG_TS_NA_3DFC_ISO", "ts", "video/mpeg", CODEC_MP2V, CODEC_A52),
    // MPEG-2 Main/SD in TS with AC-3, without a timestamp field.
    row("MPEG_TS_SD_EU_AC3_ISO", "ts", "video/mpeg", CODEC_MP2V, CODEC_A52),
    // MPEG-2 Main/SD in TS with AC-3, with a valid timestamp field.
    row("MPEG_TS_SD_EU_AC3_T", "ts", "video/mpeg", CODEC_MP2V, CODEC_A52),
    // MPEG-2 Main@Main in TS with MPEG-1 L2 audio, timestamped.
    row("MPEG_TS_SD_JP_MPEG1_L2_T", "ts", "video/mpeg", CODEC_MP2V, CODEC_MP2),
    // AVC in MPEG-2 TS per SCTE, AC-3 family or MPEG-1 L2 audio, timestamped.
    row("AVC_TS_NA_T", "ts", "video/mpeg", CODEC_H264, CODEC_A52),
    row("AVC_TS_NA_T", "ts", "video/mpeg", CODEC_H264, CODEC_EAC3),
    row("AVC_TS_NA_T", "ts", "video/mpeg", CODEC_H264, CODEC_MP2),
    // Same codec family, without a timestamp field.
    row("AVC_TS_NA_ISO", "ts", "video/mpeg", CODEC_H264, CODEC_A52),
    row("AVC_TS_NA_ISO", "ts", "video/mpeg", CODEC_H264, CODEC_EAC3),
    row("AVC_TS_NA_ISO", "ts", "video/mpeg", CODEC_H264, CODEC_MP2),
    // AVC high-profile HD 3D frame-compatible in TS, AC-3 family audio.
    row("AVC_TS_NA_3DFC_ISO", "ts", "video/mpeg", CODEC_H264, CODEC_A52),
    row("AVC_TS_NA_3DFC_ISO", "ts", "video/mpeg", CODEC_H264, CODEC_EAC3),
    // AVC in TS per DVB constraints, AC-3 family audio.
    row("AVC_TS_EU_ISO", "ts", "video/mpeg", CODEC_H264, CODEC_A52),
    row("AVC_TS_EU_ISO", "ts", "video/mpeg", CODEC_H264, CODEC_EAC3),
    // European HD/SD scalable-high-profile AVC in TS, AC-3, timestamped.
    row("AVC_TS_SHP_HD_EU_AC3_T", "ts", "video/mpeg", CODEC_H264, CODEC_A52),
    // AVC HD/SD with AC-3 incl. dual-mono, timestamped, 50 Hz systems.
    row("AVC_TS_HD_50_AC3_X_T", "ts", "video/mpeg", CODEC_H264, CODEC_A52),
    // AVC HD/SD with AC-3 incl. dual-mono, timestamped, 60 Hz systems.
    row("AVC_TS_HD_60_AC3_X_T", "ts", "video/mpeg", CODEC_H264, CODEC_A52),
    // AVC with HE-AAC v2 or Enhanced AC-3 in MP4.
    row("AVC_MP4_EU", "mp4stream", "video/mp4", CODEC_H264, CODEC_A52),
    // AVC Main Profile with Enhanced AC-3 in MP4.
    row("AVC_MP4_MP_SD_EAC3", "mp4stream", "video/mp4", CODEC_H264, CODEC_EAC3),
    // AVC High Profile with Enhanced AC-3 in MP4.
    row("AVC_MP4_HP_HD_EAC3", "mp4stream", "video/mp4", CODEC_H264, CODEC_EAC3),
    // AVC Main Profile with MP3 audio in Matroska.
    row("AVC_MKV_MP_HD_MPEG1_L3", MKV_LIVE_MUX, "video/x-matroska", CODEC_H264, CODEC_MPGA),
    // AVC High Profile with MP3 audio in Matroska.
    row("AVC_MKV_HP_HD_MPEG1_L3", MKV_LIVE_MUX, "video/x-matroska", CODEC_H264, CODEC_MPGA),
    // HEVC HD/UHD with AC-3 family or MPEG-1 L2 audio in MP4.
    row("DASH_HEVC_MP4_UHD_NA", "mp4stream", "video/x-matroska", CODEC_HEVC, CODEC_MP2),
];

/// Fallback profile when no audio match exists: MP3 in an MPEG-TS container.
pub static DEFAULT_AUDIO_PROFILE: DlnaProfile =
    row("MP3", "ts", "audio/mpeg", FourCc::NONE, CODEC_MP3);

/// Fallback profile when no A/V match exists: H.264 + AAC in MP4.
pub static DEFAULT_VIDEO_PROFILE: DlnaProfile =
    row("AVC_MP4_MP_SD", "mp4stream", "video/mp4", CODEC_H264, CODEC_MP4A);

/// Iterates every catalog row compatible with a device-advertised entry.
///
/// `pn` is the device's `DLNA.ORG_PN` value; `None` or `"*"` means the
/// device left the profile unconstrained, which only catch-all rows may
/// match. A named value matches every row carrying exactly that name, so
/// profiles listed with several codec pairs accumulate.
pub fn matching_rows<'a>(
    mime: &'a str,
    pn: Option<&'a str>,
) -> impl Iterator<Item = &'static DlnaProfile> + 'a {
    let unconstrained = matches!(pn, None | Some("*"));
    PROFILE_LIST.iter().filter(move |p| {
        if p.mime != mime {
            return false;
        }
        if unconstrained {
            p.is_wildcard()
        } else {
            Some(p.name) == pn
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_class_follows_video_codec() {
        assert_eq!(DEFAULT_AUDIO_PROFILE.media_class(), MediaClass::Audio);
        assert_eq!(DEFAULT_VIDEO_PROFILE.media_class(), MediaClass::AudioVideo);
    }

    #[test]
    fn named_pn_accumulates_all_codec_pairs() {
        let rows: Vec<_> = matching_rows("video/mpeg", Some("AVC_TS_NA_T")).collect();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|p| p.video_codec == CODEC_H264));
    }

    #[test]
    fn unconstrained_pn_only_matches_wildcard_rows() {
        let rows: Vec<_> = matching_rows("audio/mpeg", Some("*")).collect();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].is_wildcard());

        // Absent PN behaves like "*".
        let rows: Vec<_> = matching_rows("audio/mpeg", None).collect();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn named_pn_never_matches_wildcard_rows() {
        assert!(matching_rows("audio/mpeg", Some("MP3"))
            .all(|p| !p.is_wildcard()));
    }

    #[test]
    fn unknown_mime_matches_nothing() {
        assert_eq!(matching_rows("video/quicktime", Some("*")).count(), 0);
    }
}
