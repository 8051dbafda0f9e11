pub mod commands;
pub mod core;

use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Parse the command line, run it and return the process exit code.
pub fn run() -> i32 {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,minepack_lib=debug")),
        )
        .init();

    let cli = commands::Cli::parse();
    tracing::debug!("minepack {} starting", env!("CARGO_PKG_VERSION"));

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("error: cannot start async runtime: {e}");
            return 1;
        }
    };

    match runtime.block_on(cli.execute()) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("error: {e}");
            e.exit_code()
        }
    }
}
