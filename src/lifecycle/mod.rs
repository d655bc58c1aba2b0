//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     Load config → Validate → ProxyPool::new (initial reconcile)
//!
//! Reload (reload.rs):
//!     ConfigWatcher update → ProxyPool::reconcile → log report
//!
//! Shutdown (shutdown.rs):
//!     Ctrl-C → broadcast → reload loop exits → ProxyPool::shutdown
//! ```
//!
//! # Design Decisions
//! - The reload loop is the single administrative actor driving reconcile
//! - A failed reload keeps the current membership
//! - The pool is shut down after the reload loop has stopped

pub mod reload;
pub mod shutdown;

pub use reload::{apply_update, run_reload_loop, ReloadError};
pub use shutdown::Shutdown;
