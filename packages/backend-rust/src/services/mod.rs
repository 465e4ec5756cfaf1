pub mod dictionary;
pub mod ingestion;
pub mod progress;
pub mod recommendation;
