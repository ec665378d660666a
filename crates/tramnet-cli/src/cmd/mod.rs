pub mod completions;
pub mod conn;
pub mod graph;
pub mod import;
pub mod init;
pub mod lines;
pub mod route;
pub mod serve;
pub mod stats;
pub mod stops;
pub mod traffic;

use std::path::Path;

use rusqlite::Connection;
use tramnet_core::config::EffectiveConfig;
use tramnet_core::db;
use tramnet_core::error::ErrorCode;

use crate::output::{CliError, OutputMode, fail};

/// Everything a command needs besides its own arguments.
#[derive(Debug)]
pub struct Context {
    pub output: OutputMode,
    pub config: EffectiveConfig,
}

impl Context {
    pub fn db_path(&self) -> &Path {
        &self.config.db_path
    }

    /// Open an existing store. A missing database file is reported as
    /// not initialized rather than silently created.
    pub fn open_existing(&self) -> anyhow::Result<Connection> {
        let path = self.db_path();
        if !path.exists() {
            return Err(fail(
                self.output,
                CliError::from_code(
                    ErrorCode::NotInitialized,
                    format!("no network database at {}", path.display()),
                ),
            ));
        }
        self.open_or_create()
    }

    /// Open the store, creating and migrating it when absent.
    pub fn open_or_create(&self) -> anyhow::Result<Connection> {
        db::open_store(self.db_path()).map_err(|e| {
            fail(
                self.output,
                CliError::from_code(ErrorCode::StorageFailure, format!("{e:#}")),
            )
        })
    }
}
