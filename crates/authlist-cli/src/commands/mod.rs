//! Subcommand implementations.

pub(crate) mod broker;
pub(crate) mod request;
pub(crate) mod watch;
