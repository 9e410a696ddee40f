//! Repository layer for database persistence.
//!
//! Record access goes through the [`RecordStore`] capability so the embedded
//! SQLite file, the hosted PostgreSQL database and the in-memory store are
//! interchangeable. Diesel provides the SQL for both database backends.

pub mod cached;
pub mod credentials;
pub mod diesel_analysis;
pub mod diesel_context;
pub mod diesel_models;
pub mod diesel_record;
pub mod diesel_user;
pub mod memory;
pub mod migrations;
#[cfg(feature = "postgres")]
pub mod pg_tls;
pub mod pool;
pub mod store;
pub mod util;

pub use cached::CachedRecordStore;
pub use credentials::{CredentialRefresher, CredentialSource};
pub use diesel_analysis::DieselAnalysisRepository;
pub use diesel_context::DieselDbContext;
pub use diesel_record::DieselRecordStore;
pub use diesel_user::DieselUserRepository;
pub use memory::MemoryRecordStore;
pub use pool::{DbError, DbPool};
pub use store::{RecordColumn, RecordQuery, RecordStore, SearchScope, SubstringQuery};
