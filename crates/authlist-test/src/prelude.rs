//! Prelude module - commonly used types for convenient import.
//!
//! Use `use authlist_test::prelude::*;` to import all essential types.

pub use crate::fixtures::{
    test_principal, test_raw_request, test_registry, test_request, test_request_for,
};
pub use crate::mocks::{MockApprovalService, MockCommander, RecordingReporter, SentUpdate};
