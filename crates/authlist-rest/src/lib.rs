//! Authlist REST - Client for the external approval service.
//!
//! Implements [`authlist_broker::ApprovalService`] over HTTP:
//!
//! | call | endpoint |
//! |------|----------|
//! | login | `POST manager/api/get-token/` |
//! | submit | `POST manager/api/authlistrequest/` |
//! | poll | `GET manager/api/authlistrequest/{id}/` |
//! | report | `PUT manager/api/authlistrequest/{id}/execute` |
//!
//! Whether the client logs in before every call or caches its token is a
//! [`TokenPolicy`].

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod client;
pub mod error;
pub mod messages;

pub use client::{RestApprovalService, RestSettings, TokenPolicy};
pub use error::{RestError, RestResult};
pub use messages::{ExecutionReport, ExecutionStatus, SubmitBody};
