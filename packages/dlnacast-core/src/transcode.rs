//! Transcode planning and encoder selection.
//!
//! When the capability matcher decides the input cannot be remuxed as-is,
//! this module builds the `transcode{...}:` prefix of the chain spec. Video
//! encoder candidates are tried in order (platform hardware encoders first,
//! then x264, then a terminal accept-as-is entry); each candidate except the
//! terminal one is probed by building a one-shot dummy chain and adding a
//! 1080p test stream. The winning index is cached so later chain rebuilds
//! skip the probe.

use async_trait::async_trait;

use crate::capability::MatchOutcome;
use crate::error::{CastError, CastResult};
use crate::fourcc::{FourCc, CODEC_H264, CODEC_I420, CODEC_VP8};
use crate::pipeline::{EsFormat, PipelineBuilder, VideoFormat};
use crate::protocol_constants::{
    ENCODER_PROBE_FPS, ENCODER_PROBE_HEIGHT, ENCODER_PROBE_WIDTH, OUTPUT_FPS_CAPPED,
    OUTPUT_FPS_LIMIT,
};

// ─────────────────────────────────────────────────────────────────────────────
// Conversion quality
// ─────────────────────────────────────────────────────────────────────────────

/// Quality tier for transcoded output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionQuality {
    /// High quality and high bandwidth.
    High,
    /// Medium quality and medium bandwidth.
    Medium,
    /// Low quality and low bandwidth.
    Low,
    /// Low quality but cheap to encode.
    LowCpu,
}

impl ConversionQuality {
    /// Maps the 0..=3 configuration level to a tier.
    #[must_use]
    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            0 => Some(Self::High),
            1 => Some(Self::Medium),
            2 => Some(Self::Low),
            3 => Some(Self::LowCpu),
            _ => None,
        }
    }

    /// Returns the configuration level of this tier.
    #[must_use]
    pub fn level(self) -> u8 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
            Self::LowCpu => 3,
        }
    }

    /// Maximum output dimensions for this tier.
    #[must_use]
    pub fn max_dimensions(self) -> (u32, u32) {
        match self {
            Self::High | Self::Medium => (1920, 1080),
            Self::Low | Self::LowCpu => (1280, 720),
        }
    }
}

impl Default for ConversionQuality {
    /// Medium on desktop, Low on mobile/ARM targets where encoding is
    /// expensive.
    fn default() -> Self {
        if cfg!(any(
            target_os = "android",
            target_os = "ios",
            target_arch = "arm",
            target_arch = "aarch64"
        )) {
            Self::Low
        } else {
            Self::Medium
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Performance warning dialog
// ─────────────────────────────────────────────────────────────────────────────

/// User's answer to the conversion performance warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningChoice {
    /// Continue with the conversion.
    Proceed,
    /// Continue and never warn again.
    ProceedDontWarnAgain,
    /// Abort the output update.
    Cancel,
}

/// Dialog collaborator shown before the first H.264 conversion.
///
/// Software H.264 encoding can drain batteries on portable devices; the
/// host player surfaces this once, gated by the `show_perf_warning`
/// configuration flag.
#[async_trait]
pub trait PerfWarningDialog: Send + Sync {
    /// Asks the user to confirm a CPU-heavy conversion.
    async fn confirm_conversion(&self) -> WarningChoice;
}

/// Headless default that accepts every conversion.
pub struct AcceptConversions;

#[async_trait]
impl PerfWarningDialog for AcceptConversions {
    async fn confirm_conversion(&self) -> WarningChoice {
        WarningChoice::Proceed
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Video encoder candidates
// ─────────────────────────────────────────────────────────────────────────────

type VencOptions = fn(Option<&VideoFormat>, ConversionQuality) -> String;

/// One encoder configuration candidate.
///
/// `options` is `None` for the terminal accept-as-is entry, which is taken
/// without probing and leaves encoder selection to the chain core.
struct VencCandidate {
    codec: FourCc,
    options: Option<VencOptions>,
}

#[cfg(target_os = "macos")]
static H264_CANDIDATES: &[VencCandidate] = &[
    VencCandidate {
        codec: CODEC_H264,
        options: Some(videotoolbox_options),
    },
    VencCandidate {
        codec: CODEC_H264,
        options: Some(qsv_options),
    },
    VencCandidate {
        codec: CODEC_H264,
        options: Some(x264_options),
    },
    VencCandidate {
        codec: CODEC_H264,
        options: None,
    },
];

#[cfg(not(target_os = "macos"))]
static H264_CANDIDATES: &[VencCandidate] = &[
    VencCandidate {
        codec: CODEC_H264,
        options: Some(qsv_options),
    },
    VencCandidate {
        codec: CODEC_H264,
        options: Some(x264_options),
    },
    VencCandidate {
        codec: CODEC_H264,
        options: None,
    },
];

static VP8_CANDIDATES: &[VencCandidate] = &[
    VencCandidate {
        codec: CODEC_VP8,
        options: Some(vpx_options),
    },
    VencCandidate {
        codec: CODEC_VP8,
        options: None,
    },
];

fn venc_candidates(target: FourCc) -> &'static [VencCandidate] {
    if target == CODEC_H264 {
        H264_CANDIDATES
    } else if target == CODEC_VP8 {
        VP8_CANDIDATES
    } else {
        &[]
    }
}

fn x264_options(input: Option<&VideoFormat>, quality: ConversionQuality) -> String {
    let (preset, crf_hd, crf_720p) = match quality {
        ConversionQuality::High => ("veryfast", 21, 21),
        ConversionQuality::Medium => ("veryfast", 23, 21),
        ConversionQuality::Low => ("veryfast", 23, 23),
        ConversionQuality::LowCpu => ("ultrafast", 23, 23),
    };
    // Unknown height counts as HD: the safer (higher) crf wins.
    let hd = input.map_or(true, |v| v.height == 0 || v.height >= 800);
    let crf = if hd { crf_hd } else { crf_720p };
    format!("venc=x264{{preset={preset},crf={crf}}}")
}

fn qsv_options(_input: Option<&VideoFormat>, quality: ConversionQuality) -> String {
    let (target_usage, bitrate) = match quality {
        ConversionQuality::High => ("quality", 8_000_000),
        ConversionQuality::Medium => ("balanced", 8_000_000),
        ConversionQuality::Low => ("balanced", 3_000_000),
        ConversionQuality::LowCpu => ("speed", 3_000_000),
    };
    format!("venc=qsv{{target-usage={target_usage}}},vb={bitrate}")
}

fn vpx_options(_input: Option<&VideoFormat>, _quality: ConversionQuality) -> String {
    "venc=vpx{quality-mode=1}".to_string()
}

#[cfg(target_os = "macos")]
fn videotoolbox_options(_input: Option<&VideoFormat>, quality: ConversionQuality) -> String {
    let mut opts = String::from("venc=avcodec{codec=h264_videotoolbox,options{realtime=1}}");
    match quality {
        ConversionQuality::High => {}
        ConversionQuality::Medium => opts.push_str(",vb=8000000"),
        ConversionQuality::Low | ConversionQuality::LowCpu => opts.push_str(",vb=3000000"),
    }
    opts
}

/// Checks whether the chain core can encode with the given options by
/// building a one-shot dummy chain and offering it the probe stream.
fn probe_encoder(builder: &dyn PipelineBuilder, venc_opts: &str) -> bool {
    let spec = format!("transcode{{{venc_opts}}}:dummy");
    let mut node = match builder.build(&spec) {
        Ok(node) => node,
        Err(err) => {
            log::debug!("[Transcode] probe chain rejected ({venc_opts}): {err}");
            return false;
        }
    };
    let fmt = EsFormat::video(
        CODEC_I420,
        ENCODER_PROBE_WIDTH,
        ENCODER_PROBE_HEIGHT,
        ENCODER_PROBE_FPS,
    );
    match node.add_stream(&fmt) {
        Some(id) => {
            node.remove_stream(id);
            true
        }
        None => false,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Planner
// ─────────────────────────────────────────────────────────────────────────────

/// Builds the transcode prefix of the chain spec, caching the encoder pick.
#[derive(Default)]
pub struct TranscodePlanner {
    /// Index of the last winning candidate, skipping re-probes on rebuilds.
    venc_idx: Option<usize>,
}

impl TranscodePlanner {
    /// Creates a planner with no cached encoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the `transcode{...}:` chain prefix for the match outcome,
    /// or an empty string when no conversion is required.
    ///
    /// # Errors
    /// [`CastError::EncoderUnavailable`] when every candidate fails the
    /// probe.
    pub fn plan(
        &mut self,
        builder: &dyn PipelineBuilder,
        outcome: &MatchOutcome,
        video_input: Option<&VideoFormat>,
        quality: ConversionQuality,
    ) -> CastResult<String> {
        if !outcome.transcode_audio && !outcome.transcode_video {
            return Ok(String::new());
        }

        let mut parts: Vec<String> = Vec::new();
        if outcome.transcode_audio {
            let acodec = outcome.protocol.profile.audio_codec;
            log::debug!("[Transcode] converting audio to {acodec}");
            parts.push(format!("acodec={acodec}"));
        }
        if outcome.transcode_video {
            let vcodec = outcome.protocol.profile.video_codec;
            log::debug!("[Transcode] converting video to {vcodec}");
            parts.push(self.video_encoder_options(builder, vcodec, video_input, quality)?);

            let (max_width, max_height) = quality.max_dimensions();
            parts.push(format!("maxwidth={max_width}"));
            parts.push(format!("maxheight={max_height}"));

            let fps = video_input.map_or(0, VideoFormat::fps);
            if fps == 0 || fps > OUTPUT_FPS_LIMIT {
                parts.push(format!("fps={OUTPUT_FPS_CAPPED}"));
            }
        }
        Ok(format!("transcode{{{}}}:", parts.join(",")))
    }

    fn video_encoder_options(
        &mut self,
        builder: &dyn PipelineBuilder,
        target: FourCc,
        input: Option<&VideoFormat>,
        quality: ConversionQuality,
    ) -> CastResult<String> {
        let candidates = venc_candidates(target);
        if candidates.is_empty() {
            // No tuned encoder for this codec, let the chain core pick one.
            return Ok(format!("vcodec={target}"));
        }

        let start = self.venc_idx.unwrap_or(0);
        for (i, candidate) in candidates.iter().enumerate().skip(start) {
            let mut opts = format!("vcodec={}", candidate.codec);
            if let Some(build_opts) = candidate.options {
                opts.push(',');
                opts.push_str(&build_opts(input, quality));
            }

            // The terminal entry and a cached winner are taken as-is.
            if candidate.options.is_none() || self.venc_idx == Some(i) {
                self.venc_idx = Some(i);
                return Ok(opts);
            }

            if probe_encoder(builder, &opts) {
                log::debug!("[Transcode] encoder candidate {i} accepted: {opts}");
                self.venc_idx = Some(i);
                return Ok(opts);
            }
        }
        Err(CastError::EncoderUnavailable)
    }
}
