//! `tram traffic`: historical congestion for one stop.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::io::Write;
use tramnet_core::db::query;
use tramnet_core::error::ErrorCode;
use tramnet_core::model::weekday_name;

use super::Context;
use crate::output::{CliError, fail, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct TrafficArgs {
    /// Stop id.
    pub stop: String,
}

#[derive(Debug, Serialize)]
struct TrafficRow {
    day: &'static str,
    hour: u8,
    congestion: f64,
}

/// Execute `tram traffic <stop>`.
///
/// # Errors
///
/// Returns an error for an unknown stop or if the store cannot be read.
pub fn run_traffic(args: &TrafficArgs, ctx: &Context) -> Result<()> {
    let conn = ctx.open_existing()?;
    if !query::stop_exists(&conn, &args.stop).map_err(|e| fail(ctx.output, &e))? {
        return Err(fail(
            ctx.output,
            CliError::from_code(
                ErrorCode::UnknownStop,
                format!("stop '{}' does not exist", args.stop),
            ),
        ));
    }

    let rows: Vec<TrafficRow> = query::traffic_for(&conn, &args.stop)
        .map_err(|e| fail(ctx.output, &e))?
        .into_iter()
        .map(|s| TrafficRow {
            day: weekday_name(s.day),
            hour: s.hour,
            congestion: s.congestion,
        })
        .collect();
    let stop = args.stop.as_str();

    render_mode(
        ctx.output,
        &rows,
        |rows, w| {
            for r in rows {
                writeln!(w, "{}\t{:02}\t{:.1}", r.day, r.hour, r.congestion)?;
            }
            Ok(())
        },
        |rows, w| {
            pretty_section(w, &format!("Traffic at {stop}"))?;
            if rows.is_empty() {
                return writeln!(w, "  no samples");
            }
            let mut current_day = "";
            for r in rows {
                if r.day != current_day {
                    writeln!(w, "{}", r.day)?;
                    current_day = r.day;
                }
                writeln!(w, "  {:02}:00  {:>5.1}%", r.hour, r.congestion)?;
            }
            Ok(())
        },
    )
}
