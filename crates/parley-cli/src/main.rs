//! Parley terminal client entry point.
//!
//! # Usage
//!
//! ```bash
//! parley --user alice --room product-42
//! parley --server wss://chat.example.com/ws --api https://chat.example.com/api/ --user alice
//! ```

use clap::Parser;
use parley_cli::{Args, CliError, Runtime, SystemEnv, TerminalDriver};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    // stdout belongs to the chat view
    tracing_subscriber::registry().with(fmt::layer().with_writer(std::io::stderr)).with(filter).init();

    let user_id = args.user_id()?;
    tracing::info!(user_id = %user_id, server = %args.server, api = %args.api, "parley starting");

    let driver = TerminalDriver::new(&args.api, args.transport_config())?;
    let mut runtime = Runtime::with_config(
        driver,
        SystemEnv::new(),
        user_id,
        args.server.clone(),
        args.app_config(),
        args.client_config(),
    );
    if let Some(room_id) = args.initial_room() {
        runtime = runtime.with_initial_room(room_id);
    }

    runtime.run().await?;
    Ok(())
}
