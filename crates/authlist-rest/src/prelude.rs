//! Prelude module - commonly used types for convenient import.
//!
//! Use `use authlist_rest::prelude::*;` to import all essential types.

pub use crate::{RestApprovalService, RestError, RestResult, RestSettings, TokenPolicy};
