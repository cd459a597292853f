pub mod fields;
pub mod meta;
pub mod repository;

pub use fields::FieldStore;
pub use meta::{MemoryMetaStore, MetaStore, Scope, SqliteMetaStore};
