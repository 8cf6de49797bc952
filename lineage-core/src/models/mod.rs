pub mod extracted;
pub mod log_record;
pub mod mapping;

pub use extracted::ExtractedInfo;
pub use log_record::LogRecord;
pub use mapping::{MappingRecord, StoredMapping};
