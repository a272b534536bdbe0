//! Version 1 API routes

/// Queue manager endpoints
pub mod queue;
