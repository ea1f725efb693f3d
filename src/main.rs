// Main entry point - Dependency injection and console setup
use std::io::BufRead;
use std::sync::Arc;
use tokio::sync::mpsc;

use growbox_console::infrastructure::config::load_console_config;
use growbox_console::infrastructure::http_client::GrowBoxHttpClient;
use growbox_console::presentation::commands::{self, Command};
use growbox_console::presentation::console::{Console, ConsoleOptions};
use growbox_console::presentation::surface::LogSurface;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("growbox_console=info")),
        )
        .init();

    // Load configuration
    let config = load_console_config()?;

    // Create the service client (infrastructure layer)
    let client = Arc::new(GrowBoxHttpClient::new(
        &config.service.base_url,
        config.timeout(),
    )?);

    // Create the console (presentation layer)
    let mut console = Console::new(
        LogSurface::new(),
        client.clone(),
        client,
        ConsoleOptions {
            intervals: config.intervals(),
            window: config.charts.default_window,
            daily_days: config.charts.daily_days,
            export_dir: config.export.directory.clone(),
        },
    );

    let (tx, rx) = mpsc::channel(16);
    // Stdin is read off the runtime; shutdown must not wait on a blocked read.
    let stdin_tx = tx.clone();
    std::thread::spawn(move || read_commands(stdin_tx));
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = tx.send(Command::Quit).await;
        }
    });

    println!(
        "Connected to grow box at {} (type 'help' for commands)",
        config.service.base_url
    );
    console.run(rx).await
}

/// Forwards parsed operator commands until stdin closes.
fn read_commands(tx: mpsc::Sender<Command>) {
    for line in std::io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::error!(error = %e, "failed to read stdin");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match commands::parse(&line) {
            Ok(command) => {
                if tx.blocking_send(command).is_err() {
                    return;
                }
            }
            Err(e) => println!("{} (type 'help' for commands)", e),
        }
    }
    let _ = tx.blocking_send(Command::Quit);
}
