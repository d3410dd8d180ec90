//! The bridge: host-facing entry points over one scripting context.
//!
//! A [`Bridge`] is created by [`Bridge::init`] and then driven by the host
//! through `start`, `on_frame` and the input entry points. Every entry point
//! returns a [`Status`]; script failures are reported through the error
//! channel and never escape as panics or leave a drawing surface open.

use crate::alloc::AllocatorAdapter;
use crate::capability::Host;
use crate::channel::ErrorChannel;
use crate::config::BridgeConfig;
use crate::context::ScriptContext;
use crate::dispatch::{self, DispatchOutcome, Event};
use crate::draw::DrawSubsystem;
use crate::error::{DispatchError, Result, Status};
use crate::frame::{FrameController, FrameState};
use crate::host_functions;
use crate::metrics::{BridgeMetrics, BridgeStats, DispatchTimer};
use crate::registry::EventKind;
use std::alloc::{GlobalAlloc, System};
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Outcome of a single dispatch as seen by the bridge
pub type DispatchResult = std::result::Result<DispatchOutcome, DispatchError>;

/// Host-facing bridge over one scripting context
pub struct Bridge {
    /// Bridge configuration
    config: BridgeConfig,
    /// The scripting context
    context: ScriptContext,
    /// Bridge-to-host capabilities
    host: Rc<dyn Host>,
    /// Drawing collaborator
    draw: Rc<dyn DrawSubsystem>,
    /// Per-frame state machine
    frames: FrameController,
    /// Failure reporting
    channel: ErrorChannel,
    /// Metrics collector
    metrics: Arc<BridgeMetrics>,
}

impl Bridge {
    /// Create the scripting context backed by the system allocator and
    /// install the registry, error channel, capability surface and drawing
    /// primitives.
    pub fn init(
        config: BridgeConfig,
        host: Rc<dyn Host>,
        draw: Rc<dyn DrawSubsystem>,
    ) -> Result<Self> {
        Self::init_with_allocator(config, System, host, draw)
    }

    /// Like [`Bridge::init`], drawing all script memory from `allocator`
    pub fn init_with_allocator(
        config: BridgeConfig,
        allocator: impl GlobalAlloc + 'static,
        host: Rc<dyn Host>,
        draw: Rc<dyn DrawSubsystem>,
    ) -> Result<Self> {
        config.validate()?;

        let context = ScriptContext::new(AllocatorAdapter::new(allocator, config.memory_limit()))?;

        info!(
            context_id = %context.id(),
            memory_limit = config.memory_limit_bytes,
            chunk_name = %config.chunk_name,
            "Initializing bridge"
        );

        host_functions::register_all(context.lua(), Rc::clone(&host))?;
        draw.install(context.lua())?;

        Ok(Self {
            channel: ErrorChannel::from_config(&config),
            config,
            context,
            host,
            draw,
            frames: FrameController::new(),
            metrics: Arc::new(BridgeMetrics::new()),
        })
    }

    /// Run the bootstrap script, then `OnInit`, then one full frame.
    ///
    /// Stops at the first failure.
    #[instrument(skip(self, boot_source), fields(context_id = %self.context.id()))]
    pub async fn start(&mut self, boot_source: &str) -> Status {
        if self.run_boot(boot_source).await.is_err() {
            return Status::Failure;
        }
        if self.dispatch(Event::Init).await.is_err() {
            return Status::Failure;
        }
        Status::from(&self.frame().await)
    }

    /// Run one frame
    #[instrument(skip(self), fields(context_id = %self.context.id()))]
    pub async fn on_frame(&mut self) -> Status {
        Status::from(&self.frame().await)
    }

    /// Dispatch `OnKeyDown(key, is_repeat)`
    #[instrument(skip(self), fields(context_id = %self.context.id()))]
    pub async fn on_key_down(&mut self, key: &str, is_repeat: bool) -> Status {
        Status::from(&self.dispatch(Event::key_down(key, is_repeat)).await)
    }

    /// Dispatch `OnKeyUp(key)` or `OnKeyUp(key, is_repeat)`.
    ///
    /// Without a repeat flag the callback receives only the key name.
    #[instrument(skip(self), fields(context_id = %self.context.id()))]
    pub async fn on_key_up(&mut self, key: &str, is_repeat: Option<bool>) -> Status {
        Status::from(&self.dispatch(Event::key_up(key, is_repeat)).await)
    }

    /// Dispatch `OnChar(text, is_repeat)`
    #[instrument(skip(self), fields(context_id = %self.context.id()))]
    pub async fn on_char(&mut self, text: &str, is_repeat: bool) -> Status {
        Status::from(&self.dispatch(Event::char(text, is_repeat)).await)
    }

    /// Dispatch an arbitrary event.
    ///
    /// [`Event::Frame`] runs a full frame, surface bracket included.
    /// Failures are already reported when this returns.
    pub async fn dispatch(&mut self, event: Event) -> DispatchResult {
        if event == Event::Frame {
            return self.frame().await;
        }

        let kind = event.kind();
        self.ensure_live(Some(kind))?;

        let timer = DispatchTimer::start();
        let outcome = dispatch::dispatch(self.context.lua(), &event).await;
        self.metrics.record_dispatch(kind, &outcome, timer.elapsed());
        self.settle(kind, &outcome);
        outcome
    }

    /// The scripting context
    pub fn context(&self) -> &ScriptContext {
        &self.context
    }

    /// Bridge configuration
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Current frame state; `Idle` between entry points
    pub fn frame_state(&self) -> FrameState {
        self.frames.state()
    }

    /// Metrics collector
    pub fn metrics(&self) -> Arc<BridgeMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Activity snapshot
    pub fn stats(&self) -> BridgeStats {
        self.metrics.snapshot(self.context.memory())
    }

    /// Prometheus-format metrics
    pub fn prometheus_metrics(&self) -> String {
        self.metrics.to_prometheus(&self.context.memory())
    }

    async fn run_boot(&mut self, boot_source: &str) -> std::result::Result<(), DispatchError> {
        self.ensure_live(None)?;

        let result = self
            .context
            .lua()
            .load(boot_source)
            .set_name(self.config.chunk_name.as_str())
            .exec_async()
            .await
            .map_err(|e| DispatchError::from_lua(&e));

        if let Err(err) = &result {
            self.report(err);
        } else {
            debug!(chunk_name = %self.config.chunk_name, "Bootstrap script loaded");
        }
        result
    }

    async fn frame(&mut self) -> DispatchResult {
        self.ensure_live(Some(EventKind::OnFrame))?;

        let timer = DispatchTimer::start();
        let report = self
            .frames
            .run_frame(self.context.lua(), self.draw.as_ref(), self.host.as_ref())
            .await;
        self.metrics
            .record_dispatch(EventKind::OnFrame, &report.outcome, timer.elapsed());
        self.metrics.record_frame(report.bytes_handed_off);
        self.settle(EventKind::OnFrame, &report.outcome);
        report.outcome
    }

    /// Fail fast once the context is poisoned
    fn ensure_live(&mut self, event: Option<EventKind>) -> std::result::Result<(), DispatchError> {
        if !self.context.is_poisoned() {
            return Ok(());
        }
        let err = match event {
            Some(kind) => DispatchError::context_poisoned().with_event(kind),
            None => DispatchError::context_poisoned(),
        };
        self.metrics.record_error(&err.code.to_string());
        self.channel.report(self.host.as_ref(), &err);
        Err(err)
    }

    fn settle(&mut self, kind: EventKind, outcome: &DispatchResult) {
        match outcome {
            Ok(outcome) if self.config.debug => {
                debug!(event = %kind, ?outcome, "Dispatch finished")
            }
            Ok(_) => {}
            Err(err) => self.report(err),
        }
    }

    fn report(&mut self, err: &DispatchError) {
        self.channel.report(self.host.as_ref(), err);
        if err.is_fatal() {
            self.context.poison();
        }
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("config", &self.config)
            .field("context", &self.context)
            .field("frames", &self.frames)
            .finish()
    }
}
