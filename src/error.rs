//! Error kinds surfaced to RPC callers (spec §7).
//!
//! These map onto the master's `(status, statusMessage, value)` return
//! convention at the facade boundary; nothing below this layer ever needs
//! to know about XML-RPC status codes.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MasterError {
    #[error("parameter {0} not found")]
    ParamNotFound(String),

    #[error("node {0} not found")]
    NodeNotFound(String),

    #[error("no providers for service {0}")]
    ServiceNotFound(String),

    #[error("setting {0} requires a mapping value")]
    InvalidValue(String),
}

/// The `(status, statusMessage, value)` triple used by every RPC method
/// (spec §6/§7). `status == 1` on success, `status == -1` on a recognized
/// failure.
pub type RpcResult<T> = Result<T, MasterError>;

impl MasterError {
    /// Status code for this error under the master's RPC convention.
    /// Every kind here is a "known failure" per spec §7, so this is
    /// always -1; kept as a method rather than a constant so the mapping
    /// stays visible at call sites.
    pub fn status(&self) -> i32 {
        -1
    }
}
