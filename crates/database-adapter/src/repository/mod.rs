//! Persistence Adapters - Store implementations
//!
//! These implement the `Collection` and `Database` traits from `database`.

pub mod in_memory;
pub mod mongo;
pub mod query;
