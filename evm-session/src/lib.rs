//! # EVM Engine Session
//!
//! Drives an external 68K execution engine through an asynchronous
//! command/response channel, and sequences bring-up: initialize → load the
//! decoded memory image segment by segment → reset for vectors → first
//! snapshot. Consumers observe a lifecycle status and the latest CPU
//! snapshot; they never handle frames directly.
//!
//! ## Example
//!
//! ```rust,no_run
//! use evm_session::{block_on, Session, SessionConfig};
//! # struct Engine;
//! # impl evm_session::EngineTransport for Engine {
//! #     fn send(&mut self, _: evm_protocol::CommandFrame) -> Result<(), evm_session::TransportError> { Ok(()) }
//! #     fn poll_response(&mut self) -> Option<evm_protocol::ResponseFrame> { None }
//! # }
//!
//! let mut session = Session::open(Box::new(Engine), SessionConfig::default());
//! let mut source = "S9030000FC";
//! let report = block_on(session.bring_up(&mut source)).unwrap();
//! println!("loaded {} segments", report.segments_loaded);
//! ```

pub mod channel;
pub mod driver;
pub mod error;
pub mod session;

pub use channel::{ChannelConfig, EngineChannel, EngineTransport, ResponseFuture};
pub use driver::block_on;
pub use error::{ChannelError, SessionError, SourceError, TransportError};
pub use session::{
    BringUpReport, ImageSource, LifecycleStatus, Session, SessionConfig, StatusObserver,
};
