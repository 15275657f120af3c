use std::path::PathBuf;

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use rollcall::{
    build_report, report::write_json, CaptureDirSource, Database, QuircDecoder, ScanConfig,
    ScanController, Subject,
};

#[derive(Parser)]
#[command(name = "rollcall", about = "QR-code attendance scanning", version)]
struct Cli {
    /// Path to the SQLite database
    #[arg(long, default_value = "rollcall.sqlite3")]
    db: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Register a subject and its QR payload
    Register {
        #[arg(long)]
        name: String,
        #[arg(long = "class")]
        class_name: String,
        #[arg(long)]
        section: String,
        #[arg(long)]
        payload: String,
    },
    /// List registered subjects
    List,
    /// Run a scanning session over a capture directory
    Scan {
        /// Directory a capture process drops frame images into
        #[arg(long)]
        frames: PathBuf,
        /// Debounce cooldown in seconds
        #[arg(long, default_value_t = 3)]
        cooldown_secs: i64,
    },
    /// Build the per-class attendance report for a date
    Report {
        /// Date to report on, YYYY-MM-DD
        #[arg(long)]
        date: NaiveDate,
        /// Write the JSON artifact here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cli = Cli::parse();
    let db = Database::new(cli.db)?;

    match cli.command {
        Command::Register {
            name,
            class_name,
            section,
            payload,
        } => {
            let subject = Subject {
                id: Uuid::new_v4().to_string(),
                name,
                class_name,
                section,
                code_payload: payload,
                created_at: Utc::now(),
            };
            db.insert_subject(&subject).await?;
            println!("registered {} ({})", subject.name, subject.id);
        }
        Command::List => {
            for subject in db.list_subjects().await? {
                println!(
                    "{}\tclass {} section {}\tpayload {}\t{}",
                    subject.name, subject.class_name, subject.section, subject.code_payload,
                    subject.id
                );
            }
        }
        Command::Scan {
            frames,
            cooldown_secs,
        } => {
            run_scan(db, frames, cooldown_secs).await?;
        }
        Command::Report { date, out } => {
            let report = build_report(&db, date).await?;
            match out {
                Some(path) => {
                    write_json(&report, &path)?;
                    println!(
                        "wrote {} records in {} sections to {}",
                        report.total_records(),
                        report.sections.len(),
                        path.display()
                    );
                }
                None => println!("{}", serde_json::to_string_pretty(&report)?),
            }
        }
    }

    Ok(())
}

async fn run_scan(db: Database, frames: PathBuf, cooldown_secs: i64) -> Result<()> {
    let config = ScanConfig {
        cooldown: chrono::Duration::seconds(cooldown_secs),
        ..ScanConfig::default()
    };

    let mut controller = ScanController::new(db.clone());
    let mut status_rx = controller
        .start_scan(
            Box::new(CaptureDirSource::new(frames)),
            Box::new(QuircDecoder::new()),
            config,
        )
        .await?;

    // Rendering layer: the pipeline only publishes the status line, printing
    // it is entirely this side's concern.
    let printer = tokio::spawn(async move {
        while status_rx.changed().await.is_ok() {
            let line = status_rx.borrow_and_update().clone();
            println!("[{}] {}", line.set_at.format("%H:%M:%S"), line.text);
        }
    });

    if let Some(stop) = controller.stop_signal() {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::info!("ctrl-c received, stopping scan session");
                stop.cancel();
            }
        });
    }

    let session_id = controller.session_id().map(str::to_string);
    controller.wait().await?;
    printer.abort();

    if let Some(session_id) = session_id {
        if let Some(session) = db.get_scan_session(&session_id).await? {
            println!(
                "session {}: {} frames, {} detections, {} marked ({})",
                session.id,
                session.frames,
                session.detections,
                session.marked,
                session.status.as_str()
            );
        }
    }

    Ok(())
}
