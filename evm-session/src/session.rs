//! # Session Orchestration
//!
//! Owns the lifecycle of one engine connection: bring-up (initialize → load
//! image → reset → first snapshot), then stepping/running under caller
//! control. The presentation layer talks only to [`Session`]; it never sees
//! frames or the pending table.

use evm_protocol::{mask_address, Address, Command, CpuState, Response};
use evm_srec::{build_image, DecodeOptions, LoadStats};
use std::fmt;
use std::time::Duration;

use crate::channel::{ChannelConfig, EngineChannel, EngineTransport};
use crate::error::{ChannelError, Result, SessionError, SourceError};

/// Where the session currently stands. Every transition is pushed to the
/// registered observer, so a consumer can always tell waiting from failed
/// from succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleStatus {
    Uninitialized,
    Initializing,
    ImageLoading,
    ResettingForVectors,
    Ready,
    Running,
    Paused,
    Faulted,
}

impl fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleStatus::Uninitialized => "uninitialized",
            LifecycleStatus::Initializing => "initializing",
            LifecycleStatus::ImageLoading => "loading image",
            LifecycleStatus::ResettingForVectors => "resetting",
            LifecycleStatus::Ready => "ready",
            LifecycleStatus::Running => "running",
            LifecycleStatus::Paused => "paused",
            LifecycleStatus::Faulted => "faulted",
        };
        write!(f, "{name}")
    }
}

/// The byte source collaborator: yields the full object-format text before
/// decoding begins. Transport is the implementer's business.
pub trait ImageSource {
    fn fetch(&mut self) -> std::result::Result<String, SourceError>;
}

impl ImageSource for &str {
    fn fetch(&mut self) -> std::result::Result<String, SourceError> {
        Ok((*self).to_string())
    }
}

impl ImageSource for String {
    fn fetch(&mut self) -> std::result::Result<String, SourceError> {
        Ok(self.clone())
    }
}

/// Receives every lifecycle transition, with the latest snapshot and error
/// message when one exists.
pub trait StatusObserver {
    fn on_status(&mut self, status: LifecycleStatus, state: Option<&CpuState>, error: Option<&str>);
}

/// Session knobs
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub channel: ChannelConfig,
    pub decode: DecodeOptions,
    /// Instructions per `run_burst` call
    pub run_batch: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            channel: ChannelConfig::default(),
            decode: DecodeOptions::default(),
            run_batch: evm_protocol::DEFAULT_RUN_BATCH,
        }
    }
}

/// What bring-up accomplished
#[derive(Debug, Clone)]
pub struct BringUpReport {
    pub stats: LoadStats,
    pub segments_loaded: usize,
    /// The image produced an all-zero reset vector; the engine is up but
    /// almost certainly has nowhere sensible to start executing.
    pub zero_vector_warning: bool,
    pub state: CpuState,
}

/// One engine connection plus its lifecycle state machine.
pub struct Session {
    channel: EngineChannel,
    status: LifecycleStatus,
    last_state: Option<CpuState>,
    last_error: Option<String>,
    decode: DecodeOptions,
    run_batch: u32,
    observer: Option<Box<dyn StatusObserver>>,
}

impl Session {
    /// Open a session over the given transport.
    pub fn open(transport: Box<dyn EngineTransport>, config: SessionConfig) -> Self {
        Self {
            channel: EngineChannel::open(transport, config.channel),
            status: LifecycleStatus::Uninitialized,
            last_state: None,
            last_error: None,
            decode: config.decode,
            run_batch: config.run_batch,
            observer: None,
        }
    }

    /// Register the status observer, replacing any previous one.
    pub fn with_observer(mut self, observer: Box<dyn StatusObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn status(&self) -> LifecycleStatus {
        self.status
    }

    pub fn cpu_state(&self) -> Option<&CpuState> {
        self.last_state.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn response_timeout(&self) -> Duration {
        self.channel.response_timeout()
    }

    /// Close the underlying channel; every in-flight and future operation
    /// fails with `Closed`.
    pub fn close(&mut self) {
        self.channel.close();
    }

    /// Full bring-up: initialize the engine, fetch and decode the object
    /// text, push every segment, reset for vectors, and capture the first
    /// snapshot. Any failure faults the session.
    pub async fn bring_up(&mut self, source: &mut dyn ImageSource) -> Result<BringUpReport> {
        if !matches!(
            self.status,
            LifecycleStatus::Uninitialized | LifecycleStatus::Faulted
        ) {
            return Err(SessionError::BadState {
                operation: "bring up",
                status: self.status,
            });
        }

        match self.bring_up_inner(source).await {
            Ok(report) => Ok(report),
            Err(err) => {
                self.last_error = Some(err.to_string());
                self.set_status(LifecycleStatus::Faulted);
                Err(err)
            }
        }
    }

    async fn bring_up_inner(&mut self, source: &mut dyn ImageSource) -> Result<BringUpReport> {
        self.set_status(LifecycleStatus::Initializing);
        self.expect_ready(Command::Init).await?;

        let text = source.fetch()?;
        let (image, stats) = build_image(&text, &self.decode)?;

        self.set_status(LifecycleStatus::ImageLoading);
        let mut segments_loaded = 0;
        for (addr, run) in image.entries() {
            self.expect_ready(Command::LoadImage {
                addr,
                data: run.to_vec(),
            })
            .await?;
            segments_loaded += 1;
        }
        tracing::debug!(
            segments = segments_loaded,
            bytes = stats.payload_bytes,
            "image pushed to engine"
        );

        self.set_status(LifecycleStatus::ResettingForVectors);
        let state = self.expect_state(Command::Reset).await?;

        let zero_vector_warning = state.has_zero_vector();
        if zero_vector_warning {
            tracing::warn!("reset produced an all-zero start vector; image may lack one");
        }

        self.last_state = Some(state.clone());
        self.set_status(LifecycleStatus::Ready);

        Ok(BringUpReport {
            stats,
            segments_loaded,
            zero_vector_warning,
            state,
        })
    }

    /// Execute one instruction.
    pub async fn step(&mut self) -> Result<CpuState> {
        self.ensure_active("step")?;
        let state = self.expect_state(Command::Step).await?;
        self.last_state = Some(state.clone());
        Ok(state)
    }

    /// Execute a burst of `count` instructions. The next burst may only be
    /// issued once this one's snapshot has arrived.
    pub async fn run(&mut self, count: u32) -> Result<CpuState> {
        self.ensure_active("run")?;
        self.set_status(LifecycleStatus::Running);
        let state = self.expect_state(Command::Run { count }).await?;
        self.last_state = Some(state.clone());
        Ok(state)
    }

    /// Execute one configured batch of instructions.
    pub async fn run_burst(&mut self) -> Result<CpuState> {
        self.run(self.run_batch).await
    }

    /// Ask the engine to stop the current burst. Fire-and-forget: no
    /// response is defined, so the session flips to `Paused` on send.
    pub fn pause(&mut self) -> Result<()> {
        self.ensure_active("pause")?;
        self.channel.post(Command::Pause)?;
        self.set_status(LifecycleStatus::Paused);
        Ok(())
    }

    /// Re-read the reset vector and restart.
    pub async fn reset(&mut self) -> Result<CpuState> {
        self.ensure_active("reset")?;
        let state = self.expect_state(Command::Reset).await?;
        self.last_state = Some(state.clone());
        self.set_status(LifecycleStatus::Ready);
        Ok(state)
    }

    /// Fetch the current register file without touching execution.
    pub async fn get_state(&mut self) -> Result<CpuState> {
        self.ensure_active("read state")?;
        let state = self.expect_state(Command::GetState).await?;
        self.last_state = Some(state.clone());
        Ok(state)
    }

    /// Read `size` bytes of engine memory starting at `addr`.
    pub async fn read_memory(&mut self, addr: Address, size: u32) -> Result<Vec<u8>> {
        self.ensure_active("read memory")?;
        let addr = mask_address(addr);
        let response = self.issue(Command::ReadMemory { addr, size }).await?;
        match response {
            Response::Memory { data, .. } => Ok(data),
            _ => Err(SessionError::UnexpectedResponse {
                expected: "memory data",
            }),
        }
    }

    /// Write bytes into engine memory.
    pub async fn write_memory(&mut self, addr: Address, data: Vec<u8>) -> Result<()> {
        self.ensure_active("write memory")?;
        let addr = mask_address(addr);
        self.expect_ready(Command::WriteMemory { addr, data }).await
    }

    /// Load one raw segment at an absolute address.
    pub async fn load_image(&mut self, addr: Address, data: Vec<u8>) -> Result<()> {
        self.ensure_active("load image")?;
        let addr = mask_address(addr);
        self.expect_ready(Command::LoadImage { addr, data }).await
    }

    /// Decode S-record text at runtime and push each segment, exactly as
    /// bring-up does for the boot image.
    pub async fn load_program(&mut self, text: &str) -> Result<(LoadStats, usize)> {
        self.ensure_active("load program")?;
        let (image, stats) = build_image(text, &self.decode)?;
        let mut segments_loaded = 0;
        for (addr, run) in image.entries() {
            self.expect_ready(Command::LoadImage {
                addr,
                data: run.to_vec(),
            })
            .await?;
            segments_loaded += 1;
        }
        Ok((stats, segments_loaded))
    }

    fn ensure_active(&self, operation: &'static str) -> Result<()> {
        match self.status {
            LifecycleStatus::Ready | LifecycleStatus::Running | LifecycleStatus::Paused => Ok(()),
            status => Err(SessionError::BadState { operation, status }),
        }
    }

    /// Issue one command, propagate its response, and fault the session on
    /// an engine-reported error.
    async fn issue(&mut self, command: Command) -> Result<Response> {
        let future = self.channel.request(command)?;
        match future.await {
            Ok(response) => Ok(response),
            Err(err) => {
                if let ChannelError::Engine { message } = &err {
                    self.last_error = Some(message.clone());
                    self.set_status(LifecycleStatus::Faulted);
                }
                Err(err.into())
            }
        }
    }

    async fn expect_ready(&mut self, command: Command) -> Result<()> {
        match self.issue(command).await? {
            Response::Ready => Ok(()),
            _ => Err(SessionError::UnexpectedResponse { expected: "ready" }),
        }
    }

    async fn expect_state(&mut self, command: Command) -> Result<CpuState> {
        match self.issue(command).await? {
            Response::State(state) => Ok(state),
            _ => Err(SessionError::UnexpectedResponse {
                expected: "state snapshot",
            }),
        }
    }

    fn set_status(&mut self, status: LifecycleStatus) {
        if self.status == status {
            return;
        }
        self.status = status;
        tracing::debug!(%status, "session status");
        if let Some(observer) = self.observer.as_mut() {
            observer.on_status(status, self.last_state.as_ref(), self.last_error.as_deref());
        }
    }
}
