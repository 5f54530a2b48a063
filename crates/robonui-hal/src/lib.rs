//! `robonui-hal` – servo-controller hardware layer.
//!
//! Layers, bottom-up:
//!
//! - [`protocol`]: command groups and the SSC-32 / Mini-SSC II framings.
//! - [`transport`]: serial exchange with timeout and degraded mode.
//! - [`worker`]: a thread owning the transport, reached over a queue.
//! - [`controller`]: the [`Consumer<AngleSet>`][robonui_middleware::Consumer]
//!   that turns angles into movement commands.
//! - [`sim`]: an in-memory serial link for tests and hardware-less runs.

pub mod controller;
pub mod protocol;
pub mod sim;
pub mod transport;
pub mod worker;

pub use controller::{ServoController, validate_channel_map};
pub use protocol::{ChannelTarget, ServoCommandGroup, ServoCommandType, ServoProtocol};
pub use sim::SimServoLink;
pub use transport::{DEFAULT_READ_TIMEOUT, ServoLink, ServoTransport};
pub use worker::{DEFAULT_QUEUE_DEPTH, TransportHandle, TransportWorker};
