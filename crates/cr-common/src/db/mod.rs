pub mod migrations;
pub mod pool;
pub mod ranking_runs;

pub use migrations::{MigrationError, run_migrations};
pub use pool::{DbPoolError, PgPool, create_pool_from_url, create_pool_from_url_checked};
pub use ranking_runs::PgRankingStore;
