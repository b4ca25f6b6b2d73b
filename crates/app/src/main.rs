mod args;
mod commands;
mod logging;

use args::{Args, EnvDefaults, prepare_sqlite_file, print_usage};
use log::info;
use services::{AppServices, Clock};

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let parsed = match Args::parse(std::env::args().skip(1), &EnvDefaults::from_env()) {
        Ok(Some(parsed)) => parsed,
        Ok(None) => {
            print_usage();
            return Ok(());
        }
        Err(err) => {
            eprintln!("{err}");
            print_usage();
            return Err(err.into());
        }
    };

    let level = std::env::var("ATTENDANCE_LOG")
        .unwrap_or_else(|_| logging::DEFAULT_LOG_LEVEL.to_string());
    let _logger = logging::init_logging(&level)?;

    // Open + migrate SQLite at startup; core and services never touch the filesystem.
    prepare_sqlite_file(&parsed.db_url)?;
    let clock = Clock::default_clock();
    let services = AppServices::new_sqlite(&parsed.db_url, clock).await?;
    info!(
        "event=cli_command module=app status=start command={:?}",
        parsed.command
    );

    let mut store = services.dashboard(parsed.user);
    store.load().await?;
    commands::execute(parsed.command, &services, &mut store, clock).await
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
