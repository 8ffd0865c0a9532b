//! Demo middleware.

pub mod deadline;

pub use deadline::{deadline_middleware, with_deadline, REQUEST_DEADLINE};
