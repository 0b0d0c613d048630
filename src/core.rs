//! The core module defines the business logic of docassist.
//! It provides the traits and models upstream adapters need to implement.

pub mod embedder;
pub mod handler;
pub mod llm;
pub mod memory;
pub mod model;
pub mod pipeline;
pub mod provider;
pub mod service;
pub mod store;
pub mod swagger;
