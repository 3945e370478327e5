//! Tracks in-flight asynchronous storage operations issued by an otherwise
//! synchronous object-handle API.
//!
//! An [`EventSet`] lets a caller batch-submit operations against some
//! external async storage runtime, later [`EventSet::wait`] on their joint
//! completion under a shared deadline, and inspect per-operation failure
//! diagnostics afterward with [`EventSet::get_err_info`]. It does not
//! perform any I/O itself; `Token` and the [`AsyncRuntime`] trait are the
//! only points of contact with whatever actually issues and completes the
//! operations.

#[macro_use]
extern crate macros;

mod clock;
mod err_info;
mod error;
mod event_set;
mod list;
mod record;
mod runtime;
mod wait;

pub use clock::Budget;
pub use err_info::ErrorInfo;
pub use error::EventSetError;
pub use event_set::{EventSet, NoopCallbacks, SetCallbacks, SetReport};
pub use record::{AppSite, Status};
pub use runtime::{AsyncRuntime, DiagnosticFrame, DiagnosticStack, PollResult};
pub use wait::WaitOutcome;
