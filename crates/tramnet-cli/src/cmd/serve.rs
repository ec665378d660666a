//! `tram serve`: run the HTTP API.

use anyhow::{Context as _, Result};
use clap::Args;

use super::Context;

#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Bind address; defaults to `[server] host` in `tramnet.toml`.
    #[arg(long)]
    pub host: Option<String>,
    /// Port; defaults to `[server] port` in `tramnet.toml`.
    #[arg(long)]
    pub port: Option<u16>,
}

/// Execute `tram serve`. Blocks until the server stops.
///
/// # Errors
///
/// Returns an error if the store cannot be opened or the address cannot be
/// bound.
pub fn run_serve(args: &ServeArgs, ctx: &Context) -> Result<()> {
    let server = &ctx.config.project.server;
    let host = args.host.clone().unwrap_or_else(|| server.host.clone());
    let port = args.port.unwrap_or(server.port);

    // Migrate before the first request arrives.
    drop(ctx.open_or_create()?);

    let db_path = ctx.db_path().to_path_buf();
    eprintln!("tramnet API listening on http://{host}:{port}");
    actix_web::rt::System::new()
        .block_on(tramnet_web::run(&host, port, db_path))
        .with_context(|| format!("serve on {host}:{port}"))
}
