use std::io::Write as _;
use std::path::PathBuf;

use anyhow::Context;
use chrono::Local;
use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

mod config;
mod dashboard;
mod db;
mod fixtures;
mod models;
mod pacing;
mod report;
mod rest;
mod store;

use config::{LogFormat, Settings};
use dashboard::{Dashboard, Intervals};
use models::Sdr;

#[derive(Parser)]
#[command(name = "pacing-board")]
#[command(about = "SDR appointment pacing board for the sales floor TV", long_about = None)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the board once
    Board {
        /// Emit the computed board as JSON
        #[arg(long)]
        json: bool,
    },
    /// Keep the board on screen, refreshing on a timer
    Watch,
    /// Book a quick-entry appointment for an SDR
    Add {
        /// SDR name (Renata, Lucas, Maria Eduarda or Duda)
        #[arg(long, value_parser = parse_sdr)]
        sdr: Sdr,
    },
    /// Write a markdown report of the board
    Report {
        #[arg(long, default_value = "pacing-report.md")]
        out: PathBuf,
    },
    /// Create or upgrade the database schema
    InitDb,
    /// Insert the default quota for each SDR
    Seed,
    /// Import appointments from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
}

fn parse_sdr(value: &str) -> Result<Sdr, String> {
    Sdr::parse_loose(value).ok_or_else(|| {
        let known: Vec<&str> = Sdr::ALL.iter().map(|sdr| sdr.name()).collect();
        format!("unknown SDR `{value}`, expected one of: {}", known.join(", "))
    })
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.settings.log_format);

    match cli.command {
        Commands::Board { json } => {
            let mut dashboard = Dashboard::new(store::open_store(&cli.settings)?);
            let now = Local::now();
            dashboard.refresh(now.date_naive()).await;
            let board = dashboard
                .board(now.date_naive())
                .context("board has no data after refresh")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&board)?);
            } else {
                print!("{}", report::render_board(&board, now));
            }
        }
        Commands::Watch => {
            let mut dashboard = Dashboard::new(store::open_store(&cli.settings)?);
            let intervals = Intervals {
                refresh: cli.settings.refresh_interval(),
                clock: cli.settings.clock_interval(),
            };
            dashboard::watch(&mut dashboard, intervals, |board, now| {
                let mut stdout = std::io::stdout().lock();
                let _ = write!(stdout, "{CLEAR_SCREEN}{}", report::render_board(board, now));
                let _ = stdout.flush();
            })
            .await?;
        }
        Commands::Add { sdr } => {
            let mut dashboard = Dashboard::new(store::open_store(&cli.settings)?);
            let now = Local::now();
            dashboard.refresh(now.date_naive()).await;

            let result = dashboard
                .record_appointment(sdr, now, |celebration| {
                    print!("{}", report::render_celebration(celebration));
                })
                .await;

            match result {
                Ok(created) => {
                    println!(
                        "Agendamento de {} registrado às {}.",
                        sdr.display_name(),
                        created.scheduled_time.format("%H:%M")
                    );
                    if let Some(board) = dashboard.board(now.date_naive()) {
                        println!();
                        print!("{}", report::render_board(&board, now));
                    }
                }
                Err(err) => {
                    error!(error = %err, sdr = sdr.name(), "failed to save appointment");
                    return Err(anyhow::Error::new(err).context("Erro ao salvar agendamento"));
                }
            }
        }
        Commands::Report { out } => {
            let mut dashboard = Dashboard::new(store::open_store(&cli.settings)?);
            let now = Local::now();
            dashboard.refresh(now.date_naive()).await;
            let board = dashboard
                .board(now.date_naive())
                .context("board has no data after refresh")?;
            std::fs::write(&out, report::build_report(&board, now))
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::InitDb => {
            let pool = db::connect(required_database_url(&cli.settings)?).await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = db::connect(required_database_url(&cli.settings)?).await?;
            db::seed(&pool).await?;
            println!("Quotas seeded.");
        }
        Commands::Import { csv } => {
            let pool = db::connect(required_database_url(&cli.settings)?).await?;
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} appointments from {}.", csv.display());
        }
    }

    Ok(())
}

fn required_database_url(settings: &Settings) -> anyhow::Result<&str> {
    settings
        .database_url()
        .context("DATABASE_URL must be set to a Postgres instance")
}
