//! Two-phase leave/trap error propagation.
//!
//! Leavetrap emulates a structured, stack-based error model on top of the
//! host unwinder: an operation that fails *leaves* with a numeric reason
//! code, control transfers to the nearest enclosing *trap* level, and every
//! pending resource-release obligation recorded since that level was entered
//! is disposed on the way, most recently pushed first.
//!
//! The model is aimed at code that manages raw resources — allocations,
//! handles, registrations — whose release cannot ride ordinary Rust
//! ownership, and at ports of systems built around reason-coded non-local
//! error returns.
//!
//! # Usage
//!
//! Enter a trap level with [`trap`], record obligations with [`push`],
//! [`defer`] and friends, and signal failure with [`leave`],
//! [`leave_if_null`] or [`leave_if_error`]:
//!
//! ```rust
//! use leavetrap::{defer, leave, trap, Reason};
//!
//! let result = trap(|| {
//!     defer(|| println!("released"));
//!     leave(Reason::NOT_READY);
//! });
//! assert_eq!(result, Err(Reason::NOT_READY));
//! ```
//!
//! Obligations a caller takes back over are removed with [`pop`]; ones no
//! longer needed are released immediately with [`pop_and_dispose`]. A trap
//! level must exit with its obligations balanced.
//!
//! # Backends
//!
//! The control transfer itself is a compile-time-selected backend. The
//! default rides the host unwinder and coexists with ordinary panics (which
//! pass through trap levels untouched). Targets built with
//! `panic = "abort"` degrade to a non-recoverable backend where a leave
//! terminates the process; set the `LEAVETRAP_BACKEND` environment variable
//! at build time to override the selection.
//!
//! # Threading
//!
//! All engine state is per thread: trap levels, cleanup entries and reason
//! delivery never cross thread boundaries. The [`registry`] hands each
//! thread its own engine state and, separately, provides the process-wide
//! facility table with test-and-set registration.

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(
    clippy::cargo,
    clippy::pedantic,
    clippy::alloc_instead_of_core,
    clippy::allow_attributes,
    clippy::as_underscore,
    clippy::clone_on_ref_ptr,
    clippy::else_if_without_else,
    clippy::infinite_loop,
    clippy::mem_forget,
    clippy::missing_assert_message,
    clippy::multiple_unsafe_ops_per_block,
    clippy::mutex_atomic,
    clippy::rc_mutex,
    clippy::redundant_type_annotations,
    clippy::same_name_method,
    clippy::semicolon_inside_block,
    clippy::shadow_unrelated,
    clippy::std_instead_of_core,
    clippy::tests_outside_test_module,
    clippy::undocumented_unsafe_blocks,
    clippy::unnecessary_safety_comment,
    clippy::wildcard_enum_match_arm,
)]

mod backend;
mod cleanup;
mod leave;
pub mod mem;
mod reason;
pub mod registry;
mod state;
mod trap;

pub use cleanup::{
    CleanupEntry, cleanup_depth, defer, pop, pop_and_dispose, pop_and_dispose_many, pop_many,
    push, push_fn, push_raw,
};
pub use leave::{OrLeave, leave, leave_if_error, leave_if_null};
pub use reason::Reason;
pub use trap::{MAX_TRAP_DEPTH, teardown_thread, trap, trap_depth};
