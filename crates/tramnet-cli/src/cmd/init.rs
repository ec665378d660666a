use anyhow::{Context as _, Result};
use clap::Args;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tramnet_core::config::PROJECT_CONFIG_FILE;
use tramnet_core::db::migrations::current_schema_version;

use super::Context;
use crate::output::{pretty_kv, render};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Rewrite `tramnet.toml` even if it already exists.
    #[arg(long)]
    pub force: bool,
}

const CONFIG_TOML: &str = "[database]\n\
    path = \"tram_data.db\"\n\
    \n\
    [server]\n\
    host = \"127.0.0.1\"\n\
    port = 8080\n";

#[derive(Debug, Serialize)]
struct InitReport {
    config_path: PathBuf,
    config_written: bool,
    db_path: PathBuf,
    schema_version: u32,
}

/// Execute `tram init`: write a default `tramnet.toml` when absent and
/// create (or migrate) the network database.
///
/// # Errors
///
/// Returns an error if the config file cannot be written or the store
/// cannot be opened.
pub fn run_init(args: &InitArgs, ctx: &Context, project_root: &Path) -> Result<()> {
    let config_path = project_root.join(PROJECT_CONFIG_FILE);
    let config_written = args.force || !config_path.exists();
    if config_written {
        std::fs::write(&config_path, CONFIG_TOML)
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
    }

    let conn = ctx.open_or_create()?;
    let schema_version = current_schema_version(&conn).context("read schema version")?;

    let report = InitReport {
        config_path,
        config_written,
        db_path: ctx.db_path().to_path_buf(),
        schema_version,
    };
    render(ctx.output, &report, |r, w| {
        if r.config_written {
            writeln!(w, "✓ wrote {}", r.config_path.display())?;
        }
        pretty_kv(w, "database", r.db_path.display().to_string())?;
        pretty_kv(w, "schema", format!("v{}", r.schema_version))
    })
}
