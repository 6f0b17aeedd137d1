pub mod config;
pub mod logging;

// Retry executor: policy, classification, messages, and the attempt loop.
pub mod retry;
