//! Plugin-facing API: the context handed to each plugin instance and the
//! per-instance registration ledger behind it.

pub mod context;
pub mod session;

pub use context::PluginContext;
pub use session::{RevocationReport, SessionLedger};
