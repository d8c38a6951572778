pub mod collection;
pub mod document;
pub mod error;
pub mod ids;
pub mod legacy;
pub mod records;

pub use collection::Collection;
pub use document::*;
pub use error::CoreError;
pub use records::*;

/// One relational row, keyed by column name.
pub type Row = serde_json::Map<String, serde_json::Value>;
