//! `tram route`: fastest route between two stops.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::io::Write;
use tramnet_core::ops;

use super::Context;
use crate::output::{fail, pretty_kv, render_mode};

#[derive(Args, Debug)]
pub struct RouteArgs {
    /// Start stop id.
    pub start: String,
    /// End stop id.
    pub end: String,
    /// Print stop ids instead of names.
    #[arg(long)]
    pub ids: bool,
}

#[derive(Debug, Serialize)]
struct RouteReport {
    path: Vec<String>,
    ids: Vec<String>,
    duration: String,
    total_minutes: u64,
    #[serde(skip)]
    show_ids: bool,
}

impl RouteReport {
    fn stops(&self) -> &[String] {
        if self.show_ids { &self.ids } else { &self.path }
    }
}

/// Execute `tram route <start> <end>`.
///
/// # Errors
///
/// Returns an error for unknown or inactive endpoints, when no route
/// exists, or if the store cannot be read.
pub fn run_route(args: &RouteArgs, ctx: &Context) -> Result<()> {
    let conn = ctx.open_existing()?;
    let route = ops::find_route(&conn, &args.start, &args.end)
        .map_err(|e| fail(ctx.output, &e))?
        .map_err(|e| fail(ctx.output, &e))?;

    let report = RouteReport {
        path: route.names().into_iter().map(str::to_string).collect(),
        ids: route.ids().into_iter().map(str::to_string).collect(),
        duration: route.duration_label(),
        total_minutes: route.total_minutes,
        show_ids: args.ids,
    };

    render_mode(
        ctx.output,
        &report,
        |r, w| {
            writeln!(w, "{}", r.stops().join(" -> "))?;
            writeln!(w, "{}", r.duration)
        },
        |r, w| {
            pretty_kv(w, "route", r.stops().join(" → "))?;
            pretty_kv(w, "stops", r.ids.len().to_string())?;
            pretty_kv(w, "duration", &r.duration)
        },
    )
}
