//! `tram lines`: tram lines and their route variants.

use anyhow::Result;
use clap::Args;
use std::io::Write;
use tramnet_core::db::query;
use tramnet_core::error::{EntityKind, NetworkError};

use super::Context;
use crate::output::{fail, pretty_section, render_mode};

#[derive(Args, Debug, Default)]
pub struct LinesArgs {
    /// Show a single line.
    pub number: Option<String>,
}

/// Execute `tram lines [number]`.
///
/// # Errors
///
/// Returns an error for an unknown line number or if the store cannot be
/// read.
pub fn run_lines(args: &LinesArgs, ctx: &Context) -> Result<()> {
    let conn = ctx.open_existing()?;
    let lines = match &args.number {
        Some(number) => match query::get_line(&conn, number).map_err(|e| fail(ctx.output, &e))? {
            Some(line) => vec![line],
            None => {
                let missing = NetworkError::Reference {
                    kind: EntityKind::Line,
                    id: number.clone(),
                };
                return Err(fail(ctx.output, &missing));
            }
        },
        None => query::list_lines(&conn).map_err(|e| fail(ctx.output, &e))?,
    };

    render_mode(
        ctx.output,
        &lines,
        |lines, w| {
            for line in lines {
                writeln!(w, "{}\t{}", line.number, line.route_description)?;
            }
            Ok(())
        },
        |lines, w| {
            pretty_section(w, &format!("Lines ({})", lines.len()))?;
            for line in lines {
                writeln!(w, "{}", line.number)?;
                for variant in line.variants() {
                    writeln!(w, "    {variant}")?;
                }
            }
            Ok(())
        },
    )
}
