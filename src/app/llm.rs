/// Executes generated requests with reqwest.
pub mod executor;

#[cfg(feature = "openai")]
pub mod openai;
