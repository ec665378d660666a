//! `tram import`: load timetables and traffic history into the store.

use anyhow::Result;
use clap::{Args, Subcommand};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tramnet_core::import::{self, ScheduleOptions};

use super::Context;
use crate::output::{fail, pretty_kv, pretty_section, render};

#[derive(Args, Debug)]
pub struct ImportArgs {
    #[command(subcommand)]
    pub command: ImportCommand,
}

#[derive(Subcommand, Debug)]
pub enum ImportCommand {
    /// Import per-line timetable XML files (`<dir>/<line>/*.xml`).
    Schedule {
        /// Root directory holding one folder per line.
        dir: PathBuf,
        /// Stop coordinates CSV (code in column 2, lat/lon in columns 4 and 5).
        #[arg(long, value_name = "CSV")]
        coords: Option<PathBuf>,
        /// Empty the network before importing.
        #[arg(long)]
        fresh: bool,
    },
    /// Import a traffic history JSON document, replacing earlier samples.
    Traffic {
        /// JSON file with `location` / `traffic_data` entries.
        file: PathBuf,
    },
}

/// Dispatch `tram import <subcommand>`.
///
/// # Errors
///
/// Returns an error if an input cannot be read as a whole or the store
/// rejects the write.
pub fn run_import(args: &ImportArgs, ctx: &Context) -> Result<()> {
    match &args.command {
        ImportCommand::Schedule { dir, coords, fresh } => {
            run_schedule(ctx, dir, coords.as_deref(), *fresh)
        }
        ImportCommand::Traffic { file } => run_traffic(ctx, file),
    }
}

fn run_schedule(ctx: &Context, dir: &Path, coords: Option<&Path>, fresh: bool) -> Result<()> {
    let coordinates = match coords {
        Some(path) => import::load_coordinates(path).map_err(|e| fail(ctx.output, &e))?,
        None => HashMap::new(),
    };
    let options = ScheduleOptions { coordinates, fresh };

    let conn = ctx.open_or_create()?;
    let summary = import::import_schedule(&conn, dir, &options).map_err(|e| fail(ctx.output, &e))?;

    render(ctx.output, &summary, |s, w| {
        pretty_section(w, "Schedule import")?;
        pretty_kv(w, "files", s.files_read.to_string())?;
        pretty_kv(w, "lines", s.lines.to_string())?;
        pretty_kv(w, "new stops", s.stops_added.to_string())?;
        pretty_kv(w, "located", s.stops_with_coordinates.to_string())?;
        pretty_kv(w, "connections", s.connections.to_string())?;
        for (path, reason) in &s.skipped {
            writeln!(w, "  skipped {}: {reason}", path.display())?;
        }
        Ok(())
    })
}

fn run_traffic(ctx: &Context, file: &Path) -> Result<()> {
    let conn = ctx.open_existing()?;
    let summary = import::import_traffic_file(&conn, file).map_err(|e| fail(ctx.output, &e))?;

    render(ctx.output, &summary, |s, w| {
        pretty_section(w, "Traffic import")?;
        pretty_kv(w, "samples", s.inserted.to_string())?;
        pretty_kv(w, "locations", s.locations_matched.to_string())?;
        pretty_kv(w, "skipped", s.skipped_entries.to_string())?;
        if !s.missing.is_empty() {
            let missing: Vec<&str> = s.missing.iter().map(String::as_str).collect();
            pretty_kv(w, "unmatched", missing.join(", "))?;
        }
        Ok(())
    })
}
