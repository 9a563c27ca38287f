//! Database

pub mod connection;
pub mod store;

#[allow(missing_docs, unused_imports)]
pub mod schema;

pub use connection::{connect, pool, run_migrations, Conn, Pool, MIGRATIONS};
pub use store::PgStore;
