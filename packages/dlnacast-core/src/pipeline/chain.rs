//! Output-chain lifecycle: the local `[transcode]:mux:http` sub-pipeline.
//!
//! Each chain instance publishes the muxed output under a root path that is
//! never reused: `/dlna/<monotonic_us>/<random_u64>/stream.mp4`. Rebuilding
//! after an elementary-stream change therefore always hands the renderer a
//! fresh URL, which keeps stale pull connections from replaying old data.

use std::sync::OnceLock;
use std::time::Instant;

use crate::pipeline::{
    Block, ChainError, EsFormat, PipelineBuilder, PipelineNode, SubStreamId,
};

/// Microseconds elapsed on a process-wide monotonic clock.
fn monotonic_us() -> u64 {
    static START: OnceLock<Instant> = OnceLock::new();
    START.get_or_init(Instant::now).elapsed().as_micros() as u64
}

/// Generates a unique root path for one chain instance.
#[must_use]
pub fn generate_root_path() -> String {
    format!(
        "/dlna/{}/{}/stream.mp4",
        monotonic_us(),
        rand::random::<u64>()
    )
}

/// Composes the chain specification string consumed by the builder.
///
/// `transcode_prefix` is either empty or a `transcode{...}:` element from
/// the planner. The cast-proxy element always leads so every block passes
/// the admission gate before reaching the sinks.
#[must_use]
pub fn chain_spec(
    transcode_prefix: &str,
    http_port: u16,
    root_path: &str,
    mux: &str,
    mime: &str,
) -> String {
    format!(
        "cast-proxy:{transcode_prefix}http{{dst=:{http_port}{root_path},mux={mux},access=http{{mime={mime}}}}}"
    )
}

/// One live sub-pipeline with its published root path and sub-identities.
///
/// Dropping the chain withdraws every sub-stream in reverse declaration
/// order and then releases the node, so teardown-before-rebuild is enforced
/// by ownership: the session replaces its `Option<OutputChain>`.
pub struct OutputChain {
    node: Option<Box<dyn PipelineNode>>,
    spec: String,
    root_path: String,
    subs: Vec<SubStreamId>,
}

impl OutputChain {
    /// Builds the chain described by `spec`.
    ///
    /// # Errors
    /// Propagates [`ChainError::Build`] from the builder.
    pub fn build(
        builder: &dyn PipelineBuilder,
        spec: String,
        root_path: String,
    ) -> Result<Self, ChainError> {
        log::debug!("[Chain] creating chain {spec}");
        let node = builder.build(&spec)?;
        Ok(Self {
            node: Some(node),
            spec,
            root_path,
            subs: Vec::new(),
        })
    }

    /// Returns the root path this chain publishes under.
    #[must_use]
    pub fn root_path(&self) -> &str {
        &self.root_path
    }

    /// Returns the chain specification string.
    #[must_use]
    pub fn spec(&self) -> &str {
        &self.spec
    }

    /// Number of streams currently declared in the chain.
    #[must_use]
    pub fn stream_count(&self) -> usize {
        self.subs.len()
    }

    /// Declares an elementary stream; `None` when the chain refuses it.
    pub fn add_stream(&mut self, fmt: &EsFormat) -> Option<SubStreamId> {
        let sub = self.node.as_mut()?.add_stream(fmt)?;
        self.subs.push(sub);
        Some(sub)
    }

    /// Withdraws a declared stream.
    pub fn remove_stream(&mut self, id: SubStreamId) {
        if let Some(node) = self.node.as_mut() {
            node.remove_stream(id);
        }
        self.subs.retain(|&sub| sub != id);
    }

    /// Delivers one block on a declared stream.
    ///
    /// # Errors
    /// Propagates send failures from the node.
    pub fn send(&mut self, id: SubStreamId, block: Block) -> Result<(), ChainError> {
        match self.node.as_mut() {
            Some(node) => node.send(id, block),
            None => Err(ChainError::UnknownStream),
        }
    }

    /// Discards buffered data on a declared stream.
    pub fn flush(&mut self, id: SubStreamId) {
        if let Some(node) = self.node.as_mut() {
            node.flush(id);
        }
    }
}

impl Drop for OutputChain {
    fn drop(&mut self) {
        if let Some(mut node) = self.node.take() {
            for &sub in self.subs.iter().rev() {
                node.remove_stream(sub);
            }
        }
        self.subs.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Journal {
        events: Mutex<Vec<String>>,
    }

    struct RecordingNode {
        journal: Arc<Journal>,
        next_sub: u64,
    }

    impl PipelineNode for RecordingNode {
        fn add_stream(&mut self, _fmt: &EsFormat) -> Option<SubStreamId> {
            let id = SubStreamId(self.next_sub);
            self.next_sub += 1;
            self.journal
                .events
                .lock()
                .unwrap()
                .push(format!("add {}", id.0));
            Some(id)
        }
        fn remove_stream(&mut self, id: SubStreamId) {
            self.journal
                .events
                .lock()
                .unwrap()
                .push(format!("del {}", id.0));
        }
        fn send(&mut self, _id: SubStreamId, _block: Block) -> Result<(), ChainError> {
            Ok(())
        }
        fn flush(&mut self, _id: SubStreamId) {}
    }

    struct RecordingBuilder {
        journal: Arc<Journal>,
    }

    impl PipelineBuilder for RecordingBuilder {
        fn build(&self, _spec: &str) -> Result<Box<dyn PipelineNode>, ChainError> {
            Ok(Box::new(RecordingNode {
                journal: self.journal.clone(),
                next_sub: 0,
            }))
        }
    }

    #[test]
    fn spec_places_cast_proxy_first() {
        let spec = chain_spec(
            "transcode{acodec=mp4a}:",
            7070,
            "/dlna/1/2/stream.mp4",
            "mp4stream",
            "video/mp4",
        );
        assert_eq!(
            spec,
            "cast-proxy:transcode{acodec=mp4a}:http{dst=:7070/dlna/1/2/stream.mp4,\
             mux=mp4stream,access=http{mime=video/mp4}}"
        );
    }

    #[test]
    fn spec_without_transcode_keeps_http_element() {
        let spec = chain_spec("", 8080, "/dlna/3/4/stream.mp4", "ts", "audio/mpeg");
        assert!(spec.starts_with("cast-proxy:http{dst=:8080/dlna/3/4/stream.mp4"));
        assert!(spec.contains("mime=audio/mpeg"));
    }

    #[test]
    fn root_paths_never_repeat() {
        let a = generate_root_path();
        let b = generate_root_path();
        assert_ne!(a, b);
        assert!(a.starts_with("/dlna/"));
        assert!(a.ends_with("/stream.mp4"));
    }

    #[test]
    fn drop_withdraws_streams_in_reverse_order() {
        let journal = Arc::new(Journal::default());
        let builder = RecordingBuilder {
            journal: journal.clone(),
        };
        let mut chain = OutputChain::build(
            &builder,
            "cast-proxy:http{}".into(),
            "/dlna/0/0/stream.mp4".into(),
        )
        .unwrap();
        chain
            .add_stream(&EsFormat::audio(crate::fourcc::CODEC_MP3, 44100, 2))
            .unwrap();
        chain
            .add_stream(&EsFormat::video(crate::fourcc::CODEC_H264, 1280, 720, 30))
            .unwrap();
        drop(chain);

        let events = journal.events.lock().unwrap();
        assert_eq!(*events, vec!["add 0", "add 1", "del 1", "del 0"]);
    }

    #[test]
    fn explicit_removal_is_not_repeated_on_drop() {
        let journal = Arc::new(Journal::default());
        let builder = RecordingBuilder {
            journal: journal.clone(),
        };
        let mut chain = OutputChain::build(
            &builder,
            "cast-proxy:http{}".into(),
            "/dlna/0/0/stream.mp4".into(),
        )
        .unwrap();
        let sub = chain
            .add_stream(&EsFormat::audio(crate::fourcc::CODEC_MP3, 44100, 2))
            .unwrap();
        chain.remove_stream(sub);
        assert_eq!(chain.stream_count(), 0);
        drop(chain);

        let events = journal.events.lock().unwrap();
        assert_eq!(*events, vec!["add 0", "del 0"]);
    }
}
