use std::path::PathBuf;

use brindle_router::{BorderRouter, ConfigError, RouterConfig, RouterStatus};
use brindle_stack::{SimOptions, SimStack};
use clap::Parser;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(name = "brindled", about = "Two-sided border router daemon", version)]
struct Args {
    /// Router configuration file.
    #[arg(long, default_value = "brindle.toml")]
    config: PathBuf,

    /// Start with the backhaul cable unplugged.
    #[arg(long)]
    no_link: bool,

    /// Start without a mesh radio attached.
    #[arg(long)]
    no_radio: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    if let Err(err) = run(args).await {
        eprintln!("brindled error: {}", err);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), ConfigError> {
    let config = RouterConfig::from_path(&args.config)?;
    log::info!("brindled: loaded {}", args.config.display());

    let stack = SimStack::new(SimOptions {
        link_present: !args.no_link,
        radio_present: !args.no_radio,
        ..SimOptions::default()
    });

    let (events, queue) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    let router = BorderRouter::new(&config, stack, events, cancel.clone())?;

    tokio::spawn(log_status_changes(router.status()));
    let run = tokio::spawn(router.run(queue));

    if tokio::signal::ctrl_c().await.is_err() {
        log::warn!("brindled: signal handler unavailable, stopping");
    }
    log::info!("brindled: shutting down");
    cancel.cancel();
    let _ = run.await;
    Ok(())
}

/// Logs every distinct connectivity snapshot the dispatcher publishes.
async fn log_status_changes(mut status: watch::Receiver<RouterStatus>) {
    let mut last = *status.borrow();
    while status.changed().await.is_ok() {
        let current = *status.borrow_and_update();
        if current == last {
            continue;
        }
        match current.backhaul_address {
            Some(address) => log::info!(
                "status: mesh {}, backhaul {} ({address})",
                current.mesh_state,
                current.backhaul_state
            ),
            None => log::info!(
                "status: mesh {}, backhaul {}",
                current.mesh_state,
                current.backhaul_state
            ),
        }
        last = current;
    }
}
