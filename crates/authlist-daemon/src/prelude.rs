//! Prelude module - commonly used types for convenient import.
//!
//! Use `use authlist_daemon::prelude::*;` to import all essential types.

pub use crate::{
    AuthlistRpcClient, ComponentRpcClient, ComponentRpcServer, DaemonError, DaemonResult,
    DaemonServer, DaemonStatus, RpcCommander, SubmissionInfo, error_codes,
};
