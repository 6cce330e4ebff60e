// omnisync/src/store/mod.rs
pub(crate) mod cases;  // Idempotent case upserts
pub(crate) mod schema; // DDL and the tracked column list

pub use cases::CaseStore;
