pub mod config;
pub mod db;
pub mod error;
pub mod output;
pub mod query;
pub mod search;

pub use error::FilterError;
pub use query::{ColumnRef, Schema, SelectQuery};
pub use search::filters::{Filter, FilterKind, FilterOptions, FilterValue, SearchFilter};
pub use search::{assemble, FilterSet, SearchRequest};
