//! Request inspection subsystem.
//!
//! # Data Flow
//! ```text
//! InspectRequest
//!     → dispatcher.rs (select engine via policy)
//!     → resilience::timeouts (borrow, detect, race the deadline)
//!     → Verdict::Block(result) | Verdict::Forward(reason) | DispatchError
//! ```
//!
//! # Design Decisions
//! - Fail open on every engine-side fault or timeout
//! - Only an explicit block verdict stops a request
//! - An empty engine pool is a hard error, not a fail-open case

pub mod dispatcher;

pub use dispatcher::{DispatchError, Dispatcher, ForwardReason, Verdict};
