//! Core domain model for webhookd.
//!
//! Provides the hook entity and its identifiers, the persistence port with
//! its in-memory implementation, the invocation dispatcher, and the clock
//! abstraction shared by every other crate in the workspace.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod dispatch;
pub mod error;
pub mod models;
pub mod service;
pub mod storage;
pub mod time;

pub use dispatch::{Invocation, InvocationDispatcher, Replay};
pub use error::{CoreError, Result};
pub use models::{Hook, HookId, HookMethod};
pub use service::{CreatedHook, HookService, HOOK_PATH_PREFIX};
pub use storage::{memory::HookRegistry, HookRepository, NewHook};
pub use time::{Clock, RealClock, TestClock};
