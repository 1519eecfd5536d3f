//! Core data model of the credential issuer.
//!
//! `policy` holds the process-wide constraints, `upload` the per-request
//! types that flow from validation to issuance, and `content_type` the
//! static MIME lookup both of them rely on.

pub mod content_type;
pub mod policy;
pub mod upload;
