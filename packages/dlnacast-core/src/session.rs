//! Cast-session orchestration.
//!
//! The host player drives one [`CastSession`] per renderer: it declares
//! elementary streams, pushes blocks, and eventually deletes the streams
//! again. The session reacts to changes of the declared set by rebuilding
//! the output chain, and defers telling the renderer to play until the
//! cast-proxy gate admits the first decodable block.
//!
//! All operations run on the producer task; SOAP calls are awaited inline,
//! so a `send` may block while an output update is in flight.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;

use crate::capability::{match_capabilities, MatchOutcome};
use crate::config::{SessionConfig, SettingsStore};
use crate::context::NetworkContext;
use crate::error::{CastError, CastResult};
use crate::fourcc::CODEC_H264;
use crate::pipeline::chain::{chain_spec, generate_root_path, OutputChain};
use crate::pipeline::gate::{CastProxyGate, GateState};
use crate::pipeline::{Block, ChainError, EsCategory, EsFormat, PipelineBuilder, SubStreamId};
use crate::protocol_info::ProtocolInfo;
use crate::transcode::{PerfWarningDialog, TranscodePlanner, WarningChoice};
use crate::upnp::{MediaRenderer, RendererControl};

/// Session-local handle of one admitted elementary stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EsId(u64);

/// The capability set the outer player consumes.
///
/// Mirrors the player's stream-output surface: admit a stream, forward
/// blocks, flush, and withdraw the stream again.
#[async_trait]
pub trait StreamOutput: Send {
    /// Admits an elementary stream; `None` when the session refuses it.
    async fn add_stream(&mut self, fmt: EsFormat) -> Option<EsId>;

    /// Forwards one block of an admitted stream.
    async fn send(&mut self, id: EsId, block: Block) -> CastResult<()>;

    /// Flushes buffered data of an admitted stream.
    async fn flush(&mut self, id: EsId);

    /// Withdraws an admitted stream.
    async fn del_stream(&mut self, id: EsId);
}

/// Collaborators a session is opened with.
///
/// Everything is a trait object so hosts and tests can swap transports,
/// pipelines and dialogs independently.
pub struct SessionHandles {
    /// Renderer controller (SOAP-backed in production).
    pub renderer: Arc<dyn RendererControl>,
    /// Factory for the local sub-pipeline.
    pub builder: Arc<dyn PipelineBuilder>,
    /// Local endpoint configuration.
    pub network: NetworkContext,
    /// Conversion performance-warning dialog.
    pub dialog: Arc<dyn PerfWarningDialog>,
    /// Write-back sink for the warning gate.
    pub settings: Arc<dyn SettingsStore>,
}

struct EsEntry {
    id: EsId,
    fmt: EsFormat,
    sub: Option<SubStreamId>,
}

/// One live cast session towards a single renderer.
pub struct CastSession {
    config: SessionConfig,
    renderer: Arc<dyn RendererControl>,
    builder: Arc<dyn PipelineBuilder>,
    network: NetworkContext,
    dialog: Arc<dyn PerfWarningDialog>,
    settings: Arc<dyn SettingsStore>,

    planner: TranscodePlanner,
    gate: CastProxyGate,
    streams: Vec<EsEntry>,
    chain: Option<OutputChain>,
    es_changed: bool,
    next_es: u64,

    supported: Vec<ProtocolInfo>,
    protocol: Option<ProtocolInfo>,
    transport_uri: Option<String>,
    cc_has_input: bool,
    perf_warned: bool,
}

impl std::fmt::Debug for CastSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CastSession").finish_non_exhaustive()
    }
}

impl CastSession {
    /// Builds the SOAP-backed renderer controller for a configuration.
    ///
    /// # Errors
    /// [`CastError::ConfigMissing`] without a device URL,
    /// [`CastError::UpnpUnavailable`] when the HTTP transport cannot be
    /// constructed.
    pub fn renderer_for(config: &SessionConfig) -> CastResult<Arc<dyn RendererControl>> {
        config.validate()?;
        let client = Client::builder()
            .build()
            .map_err(|e| CastError::UpnpUnavailable(e.to_string()))?;
        Ok(Arc::new(MediaRenderer::new(
            client,
            config.device_url.clone(),
            config.base_url.clone(),
        )))
    }

    /// Opens a session: validates the configuration, queries the
    /// renderer's supported formats and opens the event subscription.
    ///
    /// Renderer failures at open time are logged and tolerated; the
    /// capability matcher simply falls back to the default profiles.
    ///
    /// # Errors
    /// [`CastError::ConfigMissing`] when the device URL is unset.
    pub async fn open(config: SessionConfig, handles: SessionHandles) -> CastResult<Self> {
        config.validate()?;

        let supported = match handles.renderer.get_protocol_info().await {
            Ok(supported) => supported,
            Err(err) => {
                log::warn!("[Session] GetProtocolInfo failed: {err}");
                Vec::new()
            }
        };

        match handles.network.stream_url("/events") {
            Ok(callback) => {
                if let Err(err) = handles.renderer.subscribe(&callback).await {
                    log::warn!("[Session] event subscription failed: {err}");
                }
            }
            Err(err) => log::warn!("[Session] no callback address for eventing: {err}"),
        }

        Ok(Self {
            config,
            renderer: handles.renderer,
            builder: handles.builder,
            network: handles.network,
            dialog: handles.dialog,
            settings: handles.settings,
            planner: TranscodePlanner::new(),
            gate: CastProxyGate::new(),
            streams: Vec::new(),
            chain: None,
            es_changed: true,
            next_es: 0,
            supported,
            protocol: None,
            transport_uri: None,
            cc_has_input: false,
            perf_warned: false,
        })
    }

    /// URI the renderer is (or will be) pulling from.
    #[must_use]
    pub fn transport_uri(&self) -> Option<&str> {
        self.transport_uri.as_deref()
    }

    /// Protocol selected for the current chain.
    #[must_use]
    pub fn protocol(&self) -> Option<&ProtocolInfo> {
        self.protocol.as_ref()
    }

    /// Fast-path emptiness query: true when no output chain exists, so the
    /// host can skip draining without consulting the sub-pipeline.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chain.is_none()
    }

    /// Pauses playback on the renderer.
    ///
    /// A no-op until playback has been ordered; the chain keeps serving so
    /// the renderer can resume from its pull position.
    ///
    /// # Errors
    /// [`CastError::RendererUnreachable`] when the SOAP action fails. The
    /// session stays usable either way.
    pub async fn pause(&self) -> CastResult<()> {
        if !self.cc_has_input {
            return Ok(());
        }
        self.renderer.pause().await
    }

    /// Resumes paused playback without re-sending the transport URI.
    ///
    /// A no-op until playback has been ordered.
    ///
    /// # Errors
    /// [`CastError::RendererUnreachable`] when the SOAP action fails.
    pub async fn resume(&self) -> CastResult<()> {
        if !self.cc_has_input {
            return Ok(());
        }
        self.renderer.play("1").await
    }

    /// Closes the session: tears the chain down, stops playback if it was
    /// ever ordered, and releases the event subscription.
    pub async fn close(mut self) {
        let had_input = self.cc_has_input;
        self.teardown_chain();
        if had_input {
            if let Err(err) = self.renderer.stop().await {
                log::warn!("[Session] Stop at close failed: {err}");
            }
        }
        self.renderer.unsubscribe().await;
    }

    fn teardown_chain(&mut self) {
        if let Some(chain) = self.chain.take() {
            log::debug!("[Session] tearing down chain {}", chain.spec());
        }
        for entry in &mut self.streams {
            entry.sub = None;
        }
        self.gate.reset();
        self.cc_has_input = false;
    }

    /// Surfaces the one-shot performance warning before the first H.264
    /// conversion.
    async fn confirm_conversion(&mut self, outcome: &MatchOutcome) -> CastResult<()> {
        if self.perf_warned || !self.config.show_perf_warning {
            return Ok(());
        }
        if !(outcome.transcode_video && outcome.protocol.profile.video_codec == CODEC_H264) {
            return Ok(());
        }
        self.perf_warned = true;
        match self.dialog.confirm_conversion().await {
            WarningChoice::Proceed => Ok(()),
            WarningChoice::ProceedDontWarnAgain => {
                self.config.show_perf_warning = false;
                self.settings.set_show_perf_warning(false);
                Ok(())
            }
            WarningChoice::Cancel => Err(CastError::ConversionDeclined),
        }
    }

    /// Rebuilds the output chain after a change of the declared stream set.
    ///
    /// The renderer is NOT told to play here; the cast-proxy gate orders
    /// playback once the first decodable block has entered the sink.
    async fn update_output(&mut self) -> CastResult<()> {
        if !self.es_changed {
            return Ok(());
        }
        self.es_changed = false;

        let fmts: Vec<EsFormat> = self.streams.iter().map(|e| e.fmt).collect();
        let Some(outcome) = match_capabilities(&fmts, &self.supported) else {
            return Ok(());
        };

        if outcome.needs_transcode {
            self.confirm_conversion(&outcome).await?;
        }

        let video_input = self
            .streams
            .iter()
            .find(|e| e.fmt.category == EsCategory::Video)
            .and_then(|e| e.fmt.video);
        let prefix = self.planner.plan(
            self.builder.as_ref(),
            &outcome,
            video_input.as_ref(),
            self.config.quality,
        )?;

        let mux = self
            .config
            .mux
            .clone()
            .unwrap_or_else(|| outcome.protocol.profile.mux.to_string());
        let mime = self
            .config
            .mime
            .clone()
            .unwrap_or_else(|| outcome.protocol.profile.mime.to_string());
        let root_path = generate_root_path();
        let spec = chain_spec(&prefix, self.config.http_port, &root_path, &mux, &mime);

        // The old chain goes first; two chains must never coexist. A
        // renderer that was already playing gets a Stop before it is handed
        // the next URI.
        let had_input = self.cc_has_input;
        self.teardown_chain();
        if had_input {
            if let Err(err) = self.renderer.stop().await {
                log::warn!("[Session] Stop before rebuild failed: {err}");
            }
        }

        if let Err(err) = self.build_chain(spec, root_path) {
            self.teardown_chain();
            return Err(err);
        }

        let uri = match self
            .network
            .stream_url(self.chain.as_ref().map_or("", |c| c.root_path()))
        {
            Ok(uri) => uri,
            Err(err) => {
                log::warn!("[Session] could not get the local address: {err}");
                self.teardown_chain();
                return Err(err.into());
            }
        };

        log::debug!("[Session] publishing {uri}");
        self.transport_uri = Some(uri);
        self.protocol = Some(outcome.protocol);
        Ok(())
    }

    fn build_chain(&mut self, spec: String, root_path: String) -> CastResult<()> {
        let mut chain = OutputChain::build(self.builder.as_ref(), spec, root_path)?;

        let mut accepted = 0usize;
        let mut spu_streams = 0usize;
        let mut has_video = false;
        for entry in &mut self.streams {
            entry.sub = chain.add_stream(&entry.fmt);
            match entry.sub {
                Some(_) => {
                    accepted += 1;
                    match entry.fmt.category {
                        EsCategory::Subtitle => spu_streams += 1,
                        EsCategory::Video => has_video = true,
                        EsCategory::Audio => {}
                    }
                }
                None => {
                    log::warn!("[Session] chain can't handle {} stream", entry.fmt.codec);
                }
            }
        }

        if accepted == 0 {
            return Err(CastError::StreamRefused);
        }

        self.gate.configure(accepted, spu_streams, has_video);
        for _ in 0..accepted.saturating_sub(spu_streams) {
            self.gate.on_stream_added();
        }
        self.chain = Some(chain);
        Ok(())
    }

    /// Orders playback of the published URI, exactly once per chain.
    ///
    /// Renderer failures are logged and non-fatal: the stream keeps
    /// flowing and the user can retry from the renderer side.
    async fn start_playback(&mut self) {
        let (Some(uri), Some(protocol)) = (self.transport_uri.clone(), self.protocol.clone())
        else {
            return;
        };
        log::debug!("[Session] AVTransportURI: {uri}");
        if let Err(err) = self.renderer.set_av_transport_uri(&uri, &protocol).await {
            log::warn!("[Session] SetAVTransportURI failed: {err}");
        }
        if let Err(err) = self.renderer.play("1").await {
            log::warn!("[Session] Play failed: {err}");
        }
        self.cc_has_input = true;
        self.gate.mark_streaming();
    }
}

#[async_trait]
impl StreamOutput for CastSession {
    async fn add_stream(&mut self, fmt: EsFormat) -> Option<EsId> {
        if !self.config.supports_video && fmt.category != EsCategory::Audio {
            log::warn!(
                "[Session] refusing {} stream, renderer is audio-only",
                fmt.codec
            );
            return None;
        }
        let id = EsId(self.next_es);
        self.next_es += 1;
        self.streams.push(EsEntry {
            id,
            fmt,
            sub: None,
        });
        self.es_changed = true;
        Some(id)
    }

    async fn send(&mut self, id: EsId, block: Block) -> CastResult<()> {
        self.update_output().await?;

        let Some(entry) = self.streams.iter().find(|e| e.id == id) else {
            log::warn!("[Session] unknown stream handle");
            return Err(ChainError::UnknownStream.into());
        };
        let category = entry.fmt.category;
        let Some(sub) = entry.sub else {
            return Err(ChainError::UnknownStream.into());
        };

        let Some(block) = self.gate.admit(category, block) else {
            // Held back or discarded by the gate; not an error.
            return Ok(());
        };

        let chain = self.chain.as_mut().ok_or(ChainError::UnknownStream)?;
        chain.send(sub, block)?;

        if self.gate.state() != GateState::Streaming {
            self.start_playback().await;
        }
        Ok(())
    }

    async fn flush(&mut self, id: EsId) {
        let Some(entry) = self.streams.iter().find(|e| e.id == id) else {
            return;
        };
        if let (Some(sub), Some(chain)) = (entry.sub, self.chain.as_mut()) {
            chain.flush(sub);
        }
    }

    async fn del_stream(&mut self, id: EsId) {
        let Some(pos) = self.streams.iter().position(|e| e.id == id) else {
            return;
        };
        let entry = self.streams.remove(pos);
        if let Some(sub) = entry.sub {
            if let Some(chain) = self.chain.as_mut() {
                chain.remove_stream(sub);
            }
        }

        let out_remaining = self.streams.iter().filter(|e| e.sub.is_some()).count();
        if out_remaining == 0 && self.chain.is_some() {
            self.teardown_chain();
            if let Err(err) = self.renderer.stop().await {
                log::warn!("[Session] Stop failed: {err}");
            }
        }
    }
}
