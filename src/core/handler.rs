//! Pipeline steps.

mod extract;
mod partition;
mod save;

pub use extract::TextExtractionHandler;
pub use partition::{PartitionOutcome, SwaggerPartitioningHandler};
pub use save::SaveRecordsHandler;

/// Step writing the text content of uploaded files.
pub const EXTRACT_STEP: &str = "extract";
/// Step splitting extracted documents into per endpoint partitions.
pub const PARTITION_STEP: &str = "partition";
/// Step embedding partitions and storing them in the memory.
pub const SAVE_RECORDS_STEP: &str = "save_records";

/// Steps of a swagger import, in order.
pub const SWAGGER_STEPS: [&str; 3] = [EXTRACT_STEP, PARTITION_STEP, SAVE_RECORDS_STEP];
