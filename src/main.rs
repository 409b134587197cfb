//! layerwm
//!
//! A stacking X11 window manager: layered stacking, frames, EWMH/ICCCM
//! hints, struts, virtual desktops and interactive move/resize.

mod config;
mod shared;
mod wm;
mod x11;
mod x11_async;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::wm::settings::Settings;
use crate::wm::WindowManager;
use crate::x11::X11Display;
use crate::x11_async::X11EventStream;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Replace the running window manager
    #[arg(long)]
    replace: bool,

    /// Configuration file (default: ~/.config/layerwm/config.toml)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// X display to manage (default: $DISPLAY)
    #[arg(long, short)]
    display: Option<String>,

    /// Debug logging
    #[arg(long, short)]
    verbose: bool,

    /// Print the default configuration and exit
    #[arg(long)]
    print_default_config: bool,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "layerwm=debug" } else { "layerwm=info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Sleep until the next timer, or forever when none is armed
async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await,
        None => std::future::pending().await,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_default_config {
        print!("{}", Config::default_toml()?);
        return Ok(());
    }

    init_logging(args.verbose);
    info!("Starting layerwm {}", env!("CARGO_PKG_VERSION"));

    let config = Config::load(args.config.as_deref())?;
    let settings = Settings::from_config(&config);
    debug!("Settings: {:?}", settings);

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::mpsc::channel::<()>(1);
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        tokio::spawn(async move {
            tokio::select! {
                _ = sigterm.recv() => info!("Received SIGTERM, shutting down gracefully"),
                _ = sigint.recv() => info!("Received SIGINT, shutting down gracefully"),
            }
            let _ = shutdown_tx.send(()).await;
        });
    }

    let display = X11Display::connect(args.display.as_deref(), args.replace)?;
    let stream = X11EventStream::new(display.connection())?;

    let mut wm = WindowManager::new(display, settings).context("Failed to initialize window manager")?;
    wm.start(Instant::now())?;
    // Events that arrived while adopting existing windows
    wm.process_pending(Instant::now())?;
    info!("Starting main event loop");

    let result = loop {
        if wm.exit_requested() {
            info!("Exit requested");
            break Ok(());
        }
        tokio::select! {
            () = stream.wait_readable() => {}
            () = sleep_until(wm.next_deadline()) => {}
            _ = shutdown_rx.recv() => {
                info!("Shutdown signal received, cleaning up...");
                break Ok(());
            }
        }
        if let Err(e) = wm.process_pending(Instant::now()) {
            error!("X11 connection failed: {:#}", e);
            break Err(e);
        }
    };

    if let Err(e) = wm.shutdown() {
        error!("Failed to release clients: {:#}", e);
    }
    info!("layerwm exited");
    result
}
