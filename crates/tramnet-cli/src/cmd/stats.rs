//! `tram stats`: network totals.

use anyhow::Result;
use clap::Args;
use std::io::Write;
use tramnet_core::db::query;

use super::Context;
use crate::output::{fail, pretty_kv, pretty_section, render_mode};

/// Arguments for `tram stats`.
#[derive(Args, Debug, Default)]
pub struct StatsArgs {}

/// Execute `tram stats`.
///
/// # Errors
///
/// Returns an error if the store is missing or cannot be read.
pub fn run_stats(_args: &StatsArgs, ctx: &Context) -> Result<()> {
    let conn = ctx.open_existing()?;
    let stats = query::network_stats(&conn).map_err(|e| fail(ctx.output, &e))?;

    render_mode(
        ctx.output,
        &stats,
        |s, w| {
            writeln!(w, "stops\t{}", s.total_stops)?;
            writeln!(w, "active_stops\t{}", s.active_stops)?;
            writeln!(w, "connections\t{}", s.total_connections)?;
            writeln!(w, "lines\t{}", s.total_lines)
        },
        |s, w| {
            pretty_section(w, "Network")?;
            pretty_kv(w, "stops", format!("{} ({} active)", s.total_stops, s.active_stops))?;
            pretty_kv(w, "connections", s.total_connections.to_string())?;
            pretty_kv(w, "lines", s.total_lines.to_string())
        },
    )
}
