// Feature schema, request records and labels
pub mod ml;

// Domain-specific error types
pub mod errors;
