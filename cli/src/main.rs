mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use util::config;

#[derive(Parser, Debug)]
#[command(name = "eduflow", version, about = "QR attendance tokens: issue and verify")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the session id for a subject in the current two-hour slot
    SessionId {
        subject: String,
    },
    /// Issue a signed attendance token and its QR code
    Issue {
        #[arg(long)]
        roll_no: String,
        #[arg(long)]
        subject: String,
        /// Defaults to the derived session id for the subject
        #[arg(long)]
        session_id: Option<String>,
        /// Device latitude; without both coordinates the classroom location is used
        #[arg(long, requires = "lng", allow_negative_numbers = true)]
        lat: Option<f64>,
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lng: Option<f64>,
        /// Write the QR code as an SVG file
        #[arg(long)]
        svg_out: Option<PathBuf>,
        /// Draw the QR code in the terminal
        #[arg(long)]
        terminal: bool,
    },
    /// Verify a token's JSON text (reads stdin when omitted or "-")
    Verify {
        payload: Option<String>,
        /// Verifier latitude; omit both coordinates to skip the geofence
        #[arg(long, requires = "lng", allow_negative_numbers = true)]
        lat: Option<f64>,
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lng: Option<f64>,
        /// Record the attendance when the token is valid
        #[arg(long)]
        mark: bool,
    },
    /// Show a student's attendance summary
    Student {
        roll_no: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    if let Err(err) =
        common::logger::init_logger(&config::log_level(), &config::log_file(), config::log_to_stdout())
    {
        eprintln!("Logging disabled: {err}");
    }
    log::debug!("{} ({}) starting", config::project_name(), config::env());

    match args.command {
        Command::SessionId { subject } => commands::session_id(&subject),
        Command::Issue {
            roll_no,
            subject,
            session_id,
            lat,
            lng,
            svg_out,
            terminal,
        } => {
            commands::issue(commands::IssueArgs {
                roll_no,
                subject,
                session_id,
                lat,
                lng,
                svg_out,
                terminal,
            })
            .await
        }
        Command::Verify {
            payload,
            lat,
            lng,
            mark,
        } => commands::verify(payload, lat, lng, mark).await,
        Command::Student { roll_no } => commands::student(&roll_no).await,
    }
}
