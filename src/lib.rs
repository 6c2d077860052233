pub mod comments;
pub mod config;
pub mod csv_sink;
pub mod discovery;
pub mod driver;
pub mod error;
pub mod json_utils;
pub mod merge;
pub mod prompt;

// Convenient re-exports
pub use comments::{map_envelope, map_payload, CommentRecord, MappedPayload, TimeFormat};
pub use config::AppConfig;
pub use driver::{run, Converter, RunOutcome};
pub use json_utils::{extract_objects, ExtractStrategy};
pub use merge::merge_csv_files;
