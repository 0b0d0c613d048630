pub mod assistant;
pub mod memory;
pub mod search;
