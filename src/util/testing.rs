// src/util/testing.rs
//! Test environment bootstrap: logging plus throwaway databases.

use std::env;
use std::sync::OnceLock;
use tempfile::TempDir;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::infrastructure::repositories::sqlite::bookmark_repository::SqliteBookmarkRepository;
use crate::infrastructure::repositories::sqlite::collection_repository::SqliteCollectionRepository;
use crate::infrastructure::repositories::sqlite::connection::{init_pool, ConnectionPool};

static TEST_LOGGING: OnceLock<()> = OnceLock::new();

/// Initializes logging for tests exactly once. The library itself never
/// installs a subscriber; tests opt in here.
pub fn init_test_env() {
    TEST_LOGGING.get_or_init(|| {
        if env::var("RUST_LOG").is_err() {
            env::set_var("RUST_LOG", "debug");
        }

        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        debug!("Test logging initialized");
    });
}

/// A migrated database in a temp directory. The directory lives as long as
/// this struct; dropping it deletes the database file.
#[derive(Debug)]
pub struct TestDb {
    pub pool: ConnectionPool,
    _dir: TempDir,
}

impl TestDb {
    pub fn bookmarks(&self) -> SqliteBookmarkRepository {
        SqliteBookmarkRepository::new(self.pool.clone())
    }

    pub fn collections(&self) -> SqliteCollectionRepository {
        SqliteCollectionRepository::new(self.pool.clone())
    }
}

/// Creates a fresh database with all migrations applied.
pub fn setup_test_db() -> TestDb {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = dir.path().join("linkstash-test.db");
    let pool = init_pool(db_path.to_str().expect("UTF-8 temp path"))
        .expect("Failed to initialize test database");

    TestDb { pool, _dir: dir }
}
