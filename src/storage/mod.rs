mod schema;
mod source;
pub mod writer;

pub use schema::get_meta;
pub use source::StackSource;
pub use writer::{ImportStats, QuerySummary, StackQuery, Storage, load_tree, query_summaries};
