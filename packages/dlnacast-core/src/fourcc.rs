//! Four-character codec tags.
//!
//! Elementary streams and DLNA profile rows identify codecs by a four-byte
//! tag (the same convention muxers and the transcode builder consume). The
//! tag is rendered without trailing padding when embedded in chain
//! specification strings.

use std::fmt;

/// A four-character codec tag.
///
/// Tags shorter than four characters are padded with spaces (`"mp3 "`).
/// The all-zero tag means "no codec" and marks audio-only or video-only
/// profile rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCc([u8; 4]);

impl FourCc {
    /// The absent codec, used for profile rows that carry no audio or video.
    pub const NONE: FourCc = FourCc([0; 4]);

    /// Creates a tag from a four-byte literal.
    #[must_use]
    pub const fn new(tag: &[u8; 4]) -> Self {
        Self(*tag)
    }

    /// Returns true if this is the absent codec.
    #[must_use]
    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }

    /// Returns the raw four bytes of the tag.
    #[must_use]
    pub fn bytes(&self) -> [u8; 4] {
        self.0
    }
}

impl fmt::Display for FourCc {
    /// Writes the tag with trailing padding stripped, as consumed by the
    /// chain spec syntax (`acodec=mp4a`).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            if b == 0 || b == b' ' {
                break;
            }
            write!(f, "{}", b as char)?;
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Codec tags
// ─────────────────────────────────────────────────────────────────────────────

/// MPEG-1/2 layer III audio.
pub const CODEC_MP3: FourCc = FourCc::new(b"mp3 ");
/// MPEG-1/2 layer I/II audio (generic MPEG audio).
pub const CODEC_MPGA: FourCc = FourCc::new(b"mpga");
/// MPEG-1 layer II audio.
pub const CODEC_MP2: FourCc = FourCc::new(b"mp2 ");
/// MPEG-4 AAC audio.
pub const CODEC_MP4A: FourCc = FourCc::new(b"mp4a");
/// AC-3 (Dolby Digital) audio.
pub const CODEC_A52: FourCc = FourCc::new(b"a52 ");
/// Enhanced AC-3 audio.
pub const CODEC_EAC3: FourCc = FourCc::new(b"eac3");
/// Vorbis audio.
pub const CODEC_VORBIS: FourCc = FourCc::new(b"vorb");
/// Opus audio.
pub const CODEC_OPUS: FourCc = FourCc::new(b"Opus");

/// H.264 / AVC video.
pub const CODEC_H264: FourCc = FourCc::new(b"h264");
/// H.265 / HEVC video.
pub const CODEC_HEVC: FourCc = FourCc::new(b"hevc");
/// MPEG-2 video.
pub const CODEC_MP2V: FourCc = FourCc::new(b"mpgv");
/// VP8 video.
pub const CODEC_VP8: FourCc = FourCc::new(b"VP80");
/// Planar 4:2:0 YUV, the raw chroma used for encoder probing.
pub const CODEC_I420: FourCc = FourCc::new(b"I420");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_strips_trailing_padding() {
        assert_eq!(CODEC_MP3.to_string(), "mp3");
        assert_eq!(CODEC_MP4A.to_string(), "mp4a");
        assert_eq!(CODEC_A52.to_string(), "a52");
    }

    #[test]
    fn none_renders_empty() {
        assert_eq!(FourCc::NONE.to_string(), "");
        assert!(FourCc::NONE.is_none());
    }

    #[test]
    fn tags_compare_by_bytes() {
        assert_eq!(CODEC_H264, FourCc::new(b"h264"));
        assert_ne!(CODEC_H264, CODEC_HEVC);
    }
}
