//! Cast-proxy admission gate in front of the HTTP sink.
//!
//! The renderer starts pulling the published URL as soon as it is told to
//! play, so the first bytes it sees must be decodable. The gate holds
//! blocks back until every declared non-subtitle stream has been opened in
//! the sink and, for video sessions, a keyframe has arrived; everything
//! older than that keyframe is discarded.
//!
//! State machine: `Idle → WaitingStreams → WaitingKeyframe → Streaming`.
//! Chain teardown returns the gate to `Idle`.

use crate::pipeline::{Block, EsCategory};

/// Admission state of the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// No output chain exists.
    Idle,
    /// Declared streams are still being opened in the sink.
    WaitingStreams,
    /// All streams open; waiting for the first video keyframe.
    WaitingKeyframe,
    /// Playback ordered; every block passes.
    Streaming,
}

/// Admission gate between the session and the output chain's sink.
pub struct CastProxyGate {
    state: GateState,
    expected_streams: usize,
    spu_streams: usize,
    streams_added: usize,
    has_video: bool,
    first_keyframe_pts: Option<i64>,
}

impl CastProxyGate {
    /// Creates an idle gate.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: GateState::Idle,
            expected_streams: 0,
            spu_streams: 0,
            streams_added: 0,
            has_video: false,
            first_keyframe_pts: None,
        }
    }

    /// Current admission state.
    #[must_use]
    pub fn state(&self) -> GateState {
        self.state
    }

    /// Timestamp of the first admitted video keyframe, if any.
    #[must_use]
    pub fn first_keyframe_pts(&self) -> Option<i64> {
        self.first_keyframe_pts
    }

    /// Arms the gate for a freshly built chain.
    ///
    /// `expected_streams` counts every declared stream including subtitles;
    /// `spu_streams` counts the subtitle subset, which is exempt from the
    /// completeness condition.
    pub fn configure(&mut self, expected_streams: usize, spu_streams: usize, has_video: bool) {
        self.state = GateState::WaitingStreams;
        self.expected_streams = expected_streams;
        self.spu_streams = spu_streams;
        self.streams_added = 0;
        self.has_video = has_video;
        self.first_keyframe_pts = None;
        self.advance_if_complete();
    }

    /// Records one stream opened in the sink.
    pub fn on_stream_added(&mut self) {
        self.streams_added += 1;
        self.advance_if_complete();
    }

    /// Returns the gate to `Idle`; called on chain teardown.
    pub fn reset(&mut self) {
        self.state = GateState::Idle;
        self.expected_streams = 0;
        self.spu_streams = 0;
        self.streams_added = 0;
        self.has_video = false;
        self.first_keyframe_pts = None;
    }

    /// Marks playback as ordered; called once the first admitted block has
    /// been delivered and the renderer told to play.
    pub fn mark_streaming(&mut self) {
        self.state = GateState::Streaming;
    }

    fn advance_if_complete(&mut self) {
        let needed = self.expected_streams.saturating_sub(self.spu_streams);
        if self.state == GateState::WaitingStreams && self.streams_added >= needed {
            self.state = GateState::WaitingKeyframe;
        }
    }

    /// Filters one block, returning it (possibly with adjusted flags) when
    /// it may enter the sink.
    ///
    /// Video sessions clear the keyframe flag on non-video blocks so the
    /// muxer sees exactly one synchronization point.
    pub fn admit(&mut self, category: EsCategory, mut block: Block) -> Option<Block> {
        match self.state {
            GateState::Idle | GateState::WaitingStreams => None,
            GateState::Streaming => {
                if self.has_video && category != EsCategory::Video {
                    block.clear_keyframe();
                }
                Some(block)
            }
            GateState::WaitingKeyframe => {
                if !self.has_video {
                    return Some(block);
                }
                if category == EsCategory::Video {
                    match self.first_keyframe_pts {
                        None => {
                            if !block.is_keyframe() {
                                log::debug!(
                                    "[Gate] dropping pre-keyframe video block (pts {})",
                                    block.pts
                                );
                                return None;
                            }
                            self.first_keyframe_pts = Some(block.pts);
                            Some(block)
                        }
                        Some(first) => (block.pts >= first).then_some(block),
                    }
                } else {
                    block.clear_keyframe();
                    match self.first_keyframe_pts {
                        None => None,
                        Some(first) => (block.pts >= first).then_some(block),
                    }
                }
            }
        }
    }
}

impl Default for CastProxyGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::BLOCK_FLAG_TYPE_I;
    use bytes::Bytes;

    fn block(pts: i64, flags: u32) -> Block {
        Block::new(Bytes::from_static(b"payload"), pts, flags)
    }

    fn armed_video_gate() -> CastProxyGate {
        let mut gate = CastProxyGate::new();
        gate.configure(2, 0, true);
        gate.on_stream_added();
        gate.on_stream_added();
        gate
    }

    #[test]
    fn idle_gate_admits_nothing() {
        let mut gate = CastProxyGate::new();
        assert!(gate.admit(EsCategory::Audio, block(0, 0)).is_none());
    }

    #[test]
    fn waits_for_all_non_subtitle_streams() {
        let mut gate = CastProxyGate::new();
        gate.configure(2, 0, false);
        assert_eq!(gate.state(), GateState::WaitingStreams);
        assert!(gate.admit(EsCategory::Audio, block(1, 0)).is_none());

        gate.on_stream_added();
        assert_eq!(gate.state(), GateState::WaitingStreams);
        gate.on_stream_added();
        assert_eq!(gate.state(), GateState::WaitingKeyframe);
        assert!(gate.admit(EsCategory::Audio, block(2, 0)).is_some());
    }

    #[test]
    fn subtitle_streams_do_not_block_completeness() {
        let mut gate = CastProxyGate::new();
        gate.configure(3, 1, false);
        gate.on_stream_added();
        gate.on_stream_added();
        assert_eq!(gate.state(), GateState::WaitingKeyframe);
    }

    #[test]
    fn drops_video_until_first_keyframe() {
        let mut gate = armed_video_gate();
        for pts in 1..=5 {
            assert!(gate.admit(EsCategory::Video, block(pts, 0)).is_none());
        }
        let admitted = gate
            .admit(EsCategory::Video, block(6, BLOCK_FLAG_TYPE_I))
            .unwrap();
        assert!(admitted.is_keyframe());
        assert_eq!(gate.first_keyframe_pts(), Some(6));
    }

    #[test]
    fn drops_blocks_older_than_the_keyframe() {
        let mut gate = armed_video_gate();
        assert!(gate
            .admit(EsCategory::Video, block(100, BLOCK_FLAG_TYPE_I))
            .is_some());
        assert!(gate.admit(EsCategory::Audio, block(90, 0)).is_none());
        assert!(gate.admit(EsCategory::Video, block(99, 0)).is_none());
        assert!(gate.admit(EsCategory::Audio, block(100, 0)).is_some());
        assert!(gate.admit(EsCategory::Video, block(101, 0)).is_some());
    }

    #[test]
    fn audio_before_any_keyframe_is_dropped() {
        let mut gate = armed_video_gate();
        assert!(gate.admit(EsCategory::Audio, block(1, 0)).is_none());
    }

    #[test]
    fn audio_keyframe_flag_is_cleared() {
        let mut gate = armed_video_gate();
        gate.admit(EsCategory::Video, block(10, BLOCK_FLAG_TYPE_I));
        let audio = gate
            .admit(EsCategory::Audio, block(11, BLOCK_FLAG_TYPE_I))
            .unwrap();
        assert!(!audio.is_keyframe());

        gate.mark_streaming();
        let audio = gate
            .admit(EsCategory::Audio, block(12, BLOCK_FLAG_TYPE_I))
            .unwrap();
        assert!(!audio.is_keyframe());
    }

    #[test]
    fn streaming_state_never_drops() {
        let mut gate = armed_video_gate();
        gate.admit(EsCategory::Video, block(100, BLOCK_FLAG_TYPE_I));
        gate.mark_streaming();
        // Even stale timestamps pass once playback has been ordered.
        assert!(gate.admit(EsCategory::Video, block(1, 0)).is_some());
        assert!(gate.admit(EsCategory::Audio, block(1, 0)).is_some());
    }

    #[test]
    fn audio_only_session_skips_keyframe_wait() {
        let mut gate = CastProxyGate::new();
        gate.configure(1, 0, false);
        gate.on_stream_added();
        let admitted = gate
            .admit(EsCategory::Audio, block(1, BLOCK_FLAG_TYPE_I))
            .unwrap();
        // No video in the session, flags pass through untouched.
        assert!(admitted.is_keyframe());
    }

    #[test]
    fn reset_returns_to_idle() {
        let mut gate = armed_video_gate();
        gate.admit(EsCategory::Video, block(5, BLOCK_FLAG_TYPE_I));
        gate.reset();
        assert_eq!(gate.state(), GateState::Idle);
        assert_eq!(gate.first_keyframe_pts(), None);
        assert!(gate.admit(EsCategory::Video, block(6, BLOCK_FLAG_TYPE_I)).is_none());
    }
}
