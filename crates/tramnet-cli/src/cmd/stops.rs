//! `tram stops`: list, inspect and edit stops.

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;
use std::io::Write;
use tramnet_core::db::query;
use tramnet_core::error::ErrorCode;
use tramnet_core::model::{Coordinate, Stop, StopConnection, StopSummary, TrafficSample};
use tramnet_core::ops::{self, NewStop};

use super::Context;
use crate::output::{CliError, fail, pretty_kv, pretty_rule, pretty_section, render, render_mode};

#[derive(Args, Debug)]
pub struct StopsArgs {
    #[command(subcommand)]
    pub command: StopsCommand,
}

#[derive(Subcommand, Debug)]
pub enum StopsCommand {
    /// List stops ordered by name.
    List {
        /// Split the listing into active and inactive stops.
        #[arg(long)]
        status: bool,
    },
    /// Show one stop with its lines, connections and traffic.
    Show {
        id: String,
    },
    /// Add a stop, or update name and coordinate of an existing one.
    Add {
        /// Display name.
        name: String,
        /// Stop id; defaults to the upper-cased name.
        #[arg(long)]
        id: Option<String>,
        /// Latitude in degrees.
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,
        /// Longitude in degrees.
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,
    },
    /// Delete a stop and every connection touching it.
    Rm {
        id: String,
    },
    /// Mark a stop active (routable).
    Activate {
        id: String,
    },
    /// Mark a stop inactive; routes avoid it.
    Deactivate {
        id: String,
    },
}

/// Dispatch `tram stops <subcommand>`.
///
/// # Errors
///
/// Returns an error if the store is missing or the operation is rejected.
pub fn run_stops(args: &StopsArgs, ctx: &Context) -> Result<()> {
    match &args.command {
        StopsCommand::List { status } => run_list(ctx, *status),
        StopsCommand::Show { id } => run_show(ctx, id),
        StopsCommand::Add { name, id, lat, lon } => run_add(ctx, name, id.as_deref(), *lat, *lon),
        StopsCommand::Rm { id } => run_rm(ctx, id),
        StopsCommand::Activate { id } => run_set_active(ctx, id, true),
        StopsCommand::Deactivate { id } => run_set_active(ctx, id, false),
    }
}

fn run_list(ctx: &Context, by_status: bool) -> Result<()> {
    let conn = ctx.open_existing()?;
    if by_status {
        let split = query::list_stops_by_status(&conn).map_err(|e| fail(ctx.output, &e))?;
        return render_mode(
            ctx.output,
            &split,
            |s, w| {
                for stop in &s.active {
                    writeln!(w, "active\t{}\t{}", stop.id, stop.name)?;
                }
                for stop in &s.inactive {
                    writeln!(w, "inactive\t{}\t{}", stop.id, stop.name)?;
                }
                Ok(())
            },
            |s, w| {
                write_summary_section(w, "Active", &s.active)?;
                writeln!(w)?;
                write_summary_section(w, "Inactive", &s.inactive)
            },
        );
    }

    let mut stops = query::list_stop_details(&conn).map_err(|e| fail(ctx.output, &e))?;
    stops.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.id.cmp(&b.id))
    });
    render_mode(
        ctx.output,
        &stops,
        |stops, w| {
            for stop in stops {
                writeln!(
                    w,
                    "{}\t{}\t{}\t{}",
                    stop.id,
                    stop.name,
                    if stop.active { "active" } else { "inactive" },
                    coordinate_label(stop.coordinate)
                )?;
            }
            Ok(())
        },
        |stops, w| {
            pretty_section(w, &format!("Stops ({})", stops.len()))?;
            for stop in stops {
                let marker = if stop.active { ' ' } else { '✗' };
                writeln!(w, "{marker} {:<24} {}", stop.id, stop.name)?;
            }
            Ok(())
        },
    )
}

fn write_summary_section(w: &mut dyn Write, heading: &str, stops: &[StopSummary]) -> std::io::Result<()> {
    pretty_section(w, &format!("{heading} ({})", stops.len()))?;
    for stop in stops {
        writeln!(w, "  {:<24} {}", stop.id, stop.name)?;
    }
    Ok(())
}

fn coordinate_label(coordinate: Option<Coordinate>) -> String {
    coordinate.map_or_else(|| "-".to_string(), |c| format!("{:.6},{:.6}", c.lat, c.lon))
}

#[derive(Debug, Serialize)]
struct StopDetail {
    info: Stop,
    lines: Vec<String>,
    connections: Vec<StopConnection>,
    traffic: Vec<TrafficSample>,
}

fn run_show(ctx: &Context, id: &str) -> Result<()> {
    let conn = ctx.open_existing()?;
    let Some(info) = query::get_stop(&conn, id).map_err(|e| fail(ctx.output, &e))? else {
        return Err(fail(
            ctx.output,
            CliError::from_code(ErrorCode::UnknownStop, format!("stop '{id}' does not exist")),
        ));
    };
    let detail = StopDetail {
        lines: query::lines_for_stop(&conn, id).map_err(|e| fail(ctx.output, &e))?,
        connections: query::connections_for_stop(&conn, id).map_err(|e| fail(ctx.output, &e))?,
        traffic: query::traffic_for(&conn, id).map_err(|e| fail(ctx.output, &e))?,
        info,
    };

    render(ctx.output, &detail, |d, w| {
        pretty_section(w, &format!("{} ({})", d.info.name, d.info.id))?;
        pretty_kv(w, "status", if d.info.active { "active" } else { "inactive" })?;
        pretty_kv(w, "coordinate", coordinate_label(d.info.coordinate))?;
        pretty_kv(w, "lines", d.lines.join(", "))?;
        pretty_kv(w, "traffic", format!("{} samples", d.traffic.len()))?;
        pretty_rule(w)?;
        for c in &d.connections {
            writeln!(
                w,
                "  {} → {}  {} min  (line {})",
                c.from_name, c.to_name, c.weight, c.line
            )?;
        }
        Ok(())
    })
}

fn run_add(
    ctx: &Context,
    name: &str,
    id: Option<&str>,
    lat: Option<f64>,
    lon: Option<f64>,
) -> Result<()> {
    let coordinate = Coordinate::from_parts(lat, lon).map_err(|e| fail(ctx.output, &e))?;
    let mut new_stop = NewStop::named(name, coordinate);
    if let Some(id) = id {
        new_stop.id = id.trim().to_string();
    }

    let conn = ctx.open_or_create()?;
    let stop = ops::add_stop(&conn, &new_stop).map_err(|e| fail(ctx.output, &e))?;
    render(ctx.output, &stop, |s, w| writeln!(w, "✓ stop {} ({}) saved", s.id, s.name))
}

#[derive(Debug, Serialize)]
struct Deleted<'a> {
    id: &'a str,
    deleted: bool,
}

fn run_rm(ctx: &Context, id: &str) -> Result<()> {
    let conn = ctx.open_existing()?;
    let deleted = ops::delete_stop(&conn, id).map_err(|e| fail(ctx.output, &e))?;
    render(ctx.output, &Deleted { id, deleted }, |d, w| {
        if d.deleted {
            writeln!(w, "✓ stop {} deleted", d.id)
        } else {
            writeln!(w, "stop {} did not exist; nothing deleted", d.id)
        }
    })
}

#[derive(Debug, Serialize)]
struct StatusChange<'a> {
    id: &'a str,
    active: bool,
}

fn run_set_active(ctx: &Context, id: &str, active: bool) -> Result<()> {
    let conn = ctx.open_existing()?;
    ops::set_active(&conn, id, active).map_err(|e| fail(ctx.output, &e))?;
    render(ctx.output, &StatusChange { id, active }, |s, w| {
        let state = if s.active { "active" } else { "inactive" };
        writeln!(w, "✓ stop {} is now {state}", s.id)
    })
}
