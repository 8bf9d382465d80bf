//! Blindstick device simulator.
//!
//! Writes synthetic stick data to the configured store so the dashboard can
//! be exercised without hardware.
//!
//! ```text
//! blindstick-sim populate --interval 5
//! blindstick-sim emergency single
//! blindstick-sim emergency repeat --count 3
//! blindstick-sim emergency auto --interval 10
//! blindstick-sim emergency            # interactive menu
//! ```

use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use dialoguer::{Input, Select};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use blindstick::config::Config;
use blindstick::simulator::{
    self, AUTO_INTERVAL, EmergencyReport, POPULATE_INTERVAL, REPEAT_GAP, SimulationMode,
};

#[derive(Debug, Parser)]
#[command(
    name = "blindstick-sim",
    version,
    about = "Feed synthetic smart blind stick data into the dashboard store",
    subcommand_required = true,
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Overwrite every section with random readings on a fixed period
    Populate {
        /// Seconds between writes
        #[arg(long, default_value_t = POPULATE_INTERVAL.as_secs())]
        interval: u64,
    },

    /// Simulate emergencies at random locations
    Emergency {
        #[command(subcommand)]
        mode: Option<EmergencyMode>,
    },
}

#[derive(Debug, Subcommand)]
enum EmergencyMode {
    /// One alert
    Single,

    /// Several alerts a few seconds apart
    Repeat {
        /// Number of alerts
        #[arg(long, default_value_t = 3)]
        count: u32,
    },

    /// One alert every interval until Ctrl+C
    Auto {
        /// Seconds between alerts
        #[arg(long, default_value_t = AUTO_INTERVAL.as_secs())]
        interval: u64,
    },
}

impl From<EmergencyMode> for SimulationMode {
    fn from(mode: EmergencyMode) -> Self {
        match mode {
            EmergencyMode::Single => SimulationMode::Single,
            EmergencyMode::Repeat { count } => SimulationMode::Repeat {
                count: count.max(1),
                gap: REPEAT_GAP,
            },
            EmergencyMode::Auto { interval } => SimulationMode::Auto {
                interval: Duration::from_secs(interval.max(1)),
            },
        }
    }
}

/// Ask for a mode on the terminal.
fn prompt_mode() -> anyhow::Result<SimulationMode> {
    let choices = &[
        "Single alert",
        "Multiple alerts (testing mode)",
        "Auto mode (every 10 seconds)",
    ];
    let selection = Select::new()
        .with_prompt("Choose emergency mode")
        .items(choices)
        .default(0)
        .interact()
        .context("failed to read mode selection")?;

    let mode = match selection {
        0 => SimulationMode::Single,
        1 => {
            let count: u32 = Input::new()
                .with_prompt("How many alerts?")
                .default(3)
                .interact_text()
                .context("failed to read alert count")?;
            SimulationMode::Repeat {
                count: count.max(1),
                gap: REPEAT_GAP,
            }
        }
        _ => SimulationMode::Auto {
            interval: AUTO_INTERVAL,
        },
    };
    Ok(mode)
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Ctrl+C received, stopping");
}

fn summarize(reports: &[EmergencyReport]) {
    let ok = reports.iter().filter(|r| r.all_ok()).count();
    if ok == reports.len() {
        info!(alerts = reports.len(), "Emergency simulation complete");
    } else {
        warn!(
            alerts = reports.len(),
            complete = ok,
            "Emergency simulation finished with failed steps"
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("blindstick=info".parse()?))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    let store = config.build_store().await?;

    match cli.command {
        Command::Populate { interval } => {
            let period = Duration::from_secs(interval.max(1));
            info!(interval_secs = period.as_secs(), "Populating store, Ctrl+C to stop");
            simulator::populate_loop(store.as_ref(), period, shutdown_signal()).await;
        }
        Command::Emergency { mode } => {
            let mode = match mode {
                Some(mode) => mode.into(),
                None => tokio::task::spawn_blocking(prompt_mode).await??,
            };
            let channel = config.build_channel();
            let reports = simulator::run_simulation(
                store.as_ref(),
                channel.as_ref(),
                mode,
                shutdown_signal(),
            )
            .await;
            summarize(&reports);
        }
    }

    Ok(())
}
