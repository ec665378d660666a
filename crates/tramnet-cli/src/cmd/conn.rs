//! `tram conn`: list, add and remove connections.

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;
use std::io::Write;
use tramnet_core::db::query;
use tramnet_core::model::MANUAL_LINE;
use tramnet_core::ops::{self, NewConnection};

use super::Context;
use crate::output::{fail, pretty_section, render, render_mode};

#[derive(Args, Debug)]
pub struct ConnArgs {
    #[command(subcommand)]
    pub command: ConnCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConnCommand {
    /// List stored connections.
    List {
        /// Only connections whose endpoints are both active.
        #[arg(long)]
        active: bool,
        /// Only connections touching this stop.
        #[arg(long)]
        stop: Option<String>,
    },
    /// Connect two stops. Either direction counts as the same connection.
    Add {
        from: String,
        to: String,
        /// Travel time in whole minutes.
        #[arg(allow_negative_numbers = true)]
        weight: i64,
        /// Owning line.
        #[arg(long, default_value = MANUAL_LINE)]
        line: String,
    },
    /// Remove every connection between two stops, in both directions.
    Rm {
        from: String,
        to: String,
    },
}

/// Dispatch `tram conn <subcommand>`.
///
/// # Errors
///
/// Returns an error if the store is missing or the operation is rejected.
pub fn run_conn(args: &ConnArgs, ctx: &Context) -> Result<()> {
    match &args.command {
        ConnCommand::List { active, stop } => run_list(ctx, *active, stop.as_deref()),
        ConnCommand::Add {
            from,
            to,
            weight,
            line,
        } => run_add(ctx, line, from, to, *weight),
        ConnCommand::Rm { from, to } => run_rm(ctx, from, to),
    }
}

fn run_list(ctx: &Context, active_only: bool, stop: Option<&str>) -> Result<()> {
    let conn = ctx.open_existing()?;
    let mut links = query::list_connections(&conn, active_only).map_err(|e| fail(ctx.output, &e))?;
    if let Some(stop) = stop {
        links.retain(|c| c.from == stop || c.to == stop);
    }

    render_mode(
        ctx.output,
        &links,
        |links, w| {
            for c in links {
                writeln!(w, "{}\t{}\t{}\t{}", c.line, c.from, c.to, c.weight)?;
            }
            Ok(())
        },
        |links, w| {
            pretty_section(w, &format!("Connections ({})", links.len()))?;
            for c in links {
                writeln!(w, "  {:<8} {} — {}  {} min", c.line, c.from, c.to, c.weight)?;
            }
            Ok(())
        },
    )
}

#[derive(Debug, Serialize)]
struct Added<'a> {
    line: &'a str,
    from: &'a str,
    to: &'a str,
    weight: i64,
}

fn run_add(ctx: &Context, line: &str, from: &str, to: &str, weight: i64) -> Result<()> {
    let conn = ctx.open_existing()?;
    let new = NewConnection {
        line: line.to_string(),
        from: from.to_string(),
        to: to.to_string(),
        weight,
    };
    ops::add_connection(&conn, &new).map_err(|e| fail(ctx.output, &e))?;
    let added = Added {
        line,
        from,
        to,
        weight,
    };
    render(ctx.output, &added, |a, w| {
        writeln!(w, "✓ connected {} and {} ({} min, line {})", a.from, a.to, a.weight, a.line)
    })
}

#[derive(Debug, Serialize)]
struct Removed<'a> {
    from: &'a str,
    to: &'a str,
    removed: usize,
}

fn run_rm(ctx: &Context, from: &str, to: &str) -> Result<()> {
    let conn = ctx.open_existing()?;
    let removed = ops::delete_connection(&conn, from, to).map_err(|e| fail(ctx.output, &e))?;
    render(ctx.output, &Removed { from, to, removed }, |r, w| {
        writeln!(w, "removed {} connection(s) between {} and {}", r.removed, r.from, r.to)
    })
}
