//! Authlist Daemon - JSON-RPC front end for the authorization broker.
//!
//! This crate provides:
//! - The [`AuthlistRpc`] API (`authlist_*` methods) served by `authlistd`
//!   and consumed by the `authlist` CLI
//! - The [`ComponentRpc`] contract each target component serves, and the
//!   [`RpcCommander`] that calls it
//! - [`config_bridge`], turning configuration sections into broker types
//! - [`DaemonServer`], which wires everything together
//!
//! # Error codes
//!
//! | code | broker error |
//! |------|--------------|
//! | -32010 | invalid request |
//! | -32011 | duplicate request |
//! | -32012 | submission failed |
//! | -32013 | not accepting (faulted) |
//! | -32014 | internal or shut down |

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod commander;
pub mod config_bridge;
pub mod error;
pub mod rpc;
pub mod server;

pub use commander::RpcCommander;
pub use error::{DaemonError, DaemonResult};
pub use rpc::{
    AuthlistRpcClient, AuthlistRpcServer, ComponentRpcClient, ComponentRpcServer, DaemonStatus,
    SubmissionInfo, error_codes,
};
pub use server::DaemonServer;
