//! Abstract contract between the session and the local sub-pipeline.
//!
//! The muxer, transcoder and HTTP server are external modules; this crate
//! only drives them through the [`PipelineNode`] trait, built from a chain
//! specification string by a [`PipelineBuilder`]. Data flows as timestamped
//! [`Block`]s on per-stream sub-identities issued by the node.
//!
//! # Module Structure
//!
//! - `chain` - output-chain lifecycle and spec-string construction
//! - `gate` - cast-proxy admission gate in front of the HTTP sink

pub mod chain;
pub mod gate;

use bytes::Bytes;
use thiserror::Error;

use crate::fourcc::FourCc;

/// Block flag marking an intra-coded (key) frame.
pub const BLOCK_FLAG_TYPE_I: u32 = 1 << 1;

/// One unit of elementary-stream payload with its timing and flags.
#[derive(Debug, Clone)]
pub struct Block {
    /// Raw payload bytes.
    pub data: Bytes,
    /// Presentation timestamp in microseconds.
    pub pts: i64,
    /// Flag bits, see [`BLOCK_FLAG_TYPE_I`].
    pub flags: u32,
}

impl Block {
    /// Creates a block with the given payload, timestamp and flags.
    #[must_use]
    pub fn new(data: Bytes, pts: i64, flags: u32) -> Self {
        Self { data, pts, flags }
    }

    /// Returns true when the block carries an intra-coded frame.
    #[must_use]
    pub fn is_keyframe(&self) -> bool {
        self.flags & BLOCK_FLAG_TYPE_I != 0
    }

    /// Clears the intra-coded flag.
    pub fn clear_keyframe(&mut self) {
        self.flags &= !BLOCK_FLAG_TYPE_I;
    }
}

/// Category of an elementary stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EsCategory {
    Audio,
    Video,
    Subtitle,
}

/// Original video format snapshot taken at stream admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VideoFormat {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
    pub frame_rate_base: u32,
}

impl VideoFormat {
    /// Returns the frame rate in frames per second, 0 when unknown.
    #[must_use]
    pub fn fps(&self) -> u32 {
        if self.frame_rate_base == 0 {
            0
        } else {
            self.frame_rate / self.frame_rate_base
        }
    }
}

/// Original audio format snapshot taken at stream admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

/// Descriptor of one elementary stream offered to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EsFormat {
    /// Stream category.
    pub category: EsCategory,
    /// Codec tag.
    pub codec: FourCc,
    /// Video parameters, set for video streams.
    pub video: Option<VideoFormat>,
    /// Audio parameters, set for audio streams.
    pub audio: Option<AudioFormat>,
}

impl EsFormat {
    /// Creates an audio stream descriptor.
    #[must_use]
    pub fn audio(codec: FourCc, sample_rate: u32, channels: u16) -> Self {
        Self {
            category: EsCategory::Audio,
            codec,
            video: None,
            audio: Some(AudioFormat {
                sample_rate,
                channels,
            }),
        }
    }

    /// Creates a video stream descriptor.
    #[must_use]
    pub fn video(codec: FourCc, width: u32, height: u32, frame_rate: u32) -> Self {
        Self {
            category: EsCategory::Video,
            codec,
            video: Some(VideoFormat {
                width,
                height,
                frame_rate,
                frame_rate_base: 1,
            }),
            audio: None,
        }
    }

    /// Creates a subtitle stream descriptor.
    #[must_use]
    pub fn subtitle(codec: FourCc) -> Self {
        Self {
            category: EsCategory::Subtitle,
            codec,
            video: None,
            audio: None,
        }
    }
}

/// Opaque per-stream identity inside one pipeline node.
///
/// Sub-identities are only meaningful for the node instance that issued
/// them; tearing the node down invalidates all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubStreamId(pub u64);

/// Errors raised by the sub-pipeline.
#[derive(Debug, Error)]
pub enum ChainError {
    /// The builder rejected the chain specification.
    #[error("could not create chain: {0}")]
    Build(String),

    /// The node refused every declared elementary stream.
    #[error("chain refused all streams: {0}")]
    Refused(String),

    /// A block could not be delivered into the node.
    #[error("send into chain failed: {0}")]
    Send(String),

    /// An operation referenced a sub-identity the node does not know.
    #[error("unknown sub-stream")]
    UnknownStream,
}

/// One built sub-pipeline (`[transcode]:mux:http`) accepting blocks.
///
/// Implementations are external; the session treats the node as a sink
/// that either accepts a stream at `add_stream` time or refuses it.
pub trait PipelineNode: Send {
    /// Declares an elementary stream; `None` means the node cannot carry it.
    fn add_stream(&mut self, fmt: &EsFormat) -> Option<SubStreamId>;

    /// Withdraws a previously added stream.
    fn remove_stream(&mut self, id: SubStreamId);

    /// Delivers one block on a declared stream.
    ///
    /// # Errors
    /// [`ChainError::Send`] when the node cannot accept the block, or
    /// [`ChainError::UnknownStream`] for a stale identity.
    fn send(&mut self, id: SubStreamId, block: Block) -> Result<(), ChainError>;

    /// Discards buffered data on a declared stream.
    fn flush(&mut self, id: SubStreamId);
}

/// Factory turning a chain specification string into a live node.
pub trait PipelineBuilder: Send + Sync {
    /// Builds the node described by `spec`.
    ///
    /// # Errors
    /// [`ChainError::Build`] when the specification cannot be satisfied.
    fn build(&self, spec: &str) -> Result<Box<dyn PipelineNode>, ChainError>;
}
