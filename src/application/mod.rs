// Model artifacts and backends
pub mod ml;

// Request-handling core and process-wide state
pub mod prediction;
