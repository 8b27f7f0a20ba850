//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Detection call:
//!     → timeouts.rs (spawn borrow + detect, race against the deadline)
//!     → Verdict | Failed | TimedOut
//!     → Caller fails open on anything but a verdict
//! ```
//!
//! # Design Decisions
//! - Every engine call has a deadline
//! - No retries: one detection attempt per request
//! - Engine faults never cost the protected application its availability

pub mod timeouts;
