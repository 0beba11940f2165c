//! Process-level helpers.
//!
//! `bootstrap` installs the global tracing subscriber for hosts embedding
//! the gateway; `retry` builds the polling schedules used by table deletion.

pub mod bootstrap;
pub mod retry;
