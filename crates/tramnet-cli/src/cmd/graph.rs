//! `tram graph`: the routable network as nodes and folded edges.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::io::Write;
use tramnet_core::graph::{EdgeView, NodeView};
use tramnet_core::ops;

use super::Context;
use crate::output::{fail, pretty_kv, pretty_section, render_mode};

#[derive(Args, Debug, Default)]
pub struct GraphArgs {
    /// Print only node/edge counts and the fingerprint.
    #[arg(long)]
    pub summary: bool,
}

#[derive(Debug, Serialize)]
struct GraphReport {
    nodes: Vec<NodeView>,
    edges: Vec<EdgeView>,
    fingerprint: String,
}

/// Execute `tram graph`.
///
/// # Errors
///
/// Returns an error if the store is missing or cannot be read.
pub fn run_graph(args: &GraphArgs, ctx: &Context) -> Result<()> {
    let conn = ctx.open_existing()?;
    let (view, fingerprint) = ops::network_view(&conn).map_err(|e| fail(ctx.output, &e))?;
    let report = GraphReport {
        nodes: view.nodes,
        edges: view.edges,
        fingerprint,
    };
    let summary = args.summary;

    render_mode(
        ctx.output,
        &report,
        |g, w| {
            writeln!(w, "nodes\t{}\nedges\t{}\nfingerprint\t{}", g.nodes.len(), g.edges.len(), g.fingerprint)?;
            if !summary {
                for e in &g.edges {
                    writeln!(w, "{}\t{}\t{}", e.from, e.to, e.weight)?;
                }
            }
            Ok(())
        },
        |g, w| {
            pretty_section(w, "Network graph")?;
            let active = g.nodes.iter().filter(|n| n.active).count();
            pretty_kv(w, "nodes", format!("{} ({active} active)", g.nodes.len()))?;
            pretty_kv(w, "edges", g.edges.len().to_string())?;
            pretty_kv(w, "fingerprint", &g.fingerprint)?;
            if !summary {
                writeln!(w)?;
                for e in &g.edges {
                    writeln!(w, "  {} — {}  {} min", e.from, e.to, e.weight)?;
                }
            }
            Ok(())
        },
    )
}
