use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use serde_json::json;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use sheetgrade_core::{convert_drive_url, GradeLookup, SheetConfig, StudentRecord};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const VERSION_LONG: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (profile: ",
    env!("SHEETGRADE_BUILD_PROFILE"),
    ")"
);

#[derive(Parser, Debug)]
#[command(name = "sheetgrade", version = VERSION, long_version = VERSION_LONG, about = "Look up a student's grade in the grades sheet")]
struct Cli {
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Search {
        #[arg(long)]
        id: String,
        #[arg(long = "birth-date")]
        birth_date: String,
        #[arg(long, action = ArgAction::SetTrue)]
        json: bool,
    },
    ConvertUrl {
        url: String,
    },
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::ConvertUrl { url } => {
            println!("{}", convert_drive_url(&url));
            Ok(ExitCode::SUCCESS)
        }
        Commands::CheckConfig => {
            let lookup = open_lookup(cli.config)?;
            let valid = lookup.validate_config();
            println!(
                "mode: {}\nconfig: {}",
                lookup.mode().as_str(),
                if valid { "ok" } else { "invalid" }
            );
            Ok(if valid {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Search {
            id,
            birth_date,
            json,
        } => {
            let lookup = open_lookup(cli.config)?;
            let (id, birth_date) = (id.trim(), birth_date.trim());
            if id.is_empty() || birth_date.is_empty() {
                anyhow::bail!("student id and birth date are both required");
            }
            let found = lookup
                .search_student(id, birth_date)
                .await
                .context("could not reach the grades sheet")?;
            let Some(record) = found else {
                eprintln!("no result matches this student id and birth date");
                return Ok(ExitCode::from(2));
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&record_json(&record))?);
            } else {
                print!("{}", render_record(&record));
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn open_lookup(config: Option<PathBuf>) -> Result<GradeLookup> {
    let config = SheetConfig::load(config.as_deref()).context("failed to load sheet config")?;
    debug!(demo = config.is_demo(), sheet = %config.sheet_name, "config loaded");
    Ok(GradeLookup::from_config(config)?)
}

fn record_json(record: &StudentRecord) -> serde_json::Value {
    json!({
        "studentId": record.student_id,
        "birthDate": record.birth_date,
        "studentName": record.student_name,
        "subject": record.subject,
        "grade": record.grade,
        "displayGrade": record.formatted_grade(),
        "imageUrl": convert_drive_url(&record.image_url),
    })
}

fn render_record(record: &StudentRecord) -> String {
    let image = if !record.has_image() {
        "none".to_string()
    } else if record.image_url.starts_with("data:") {
        format!("embedded ({} bytes of base64)", record.image_url.len())
    } else {
        convert_drive_url(&record.image_url)
    };
    format!(
        "name:    {}\nid:      {}\nsubject: {}\ngrade:   {} / 20\nimage:   {}\n",
        record.student_name,
        record.student_id,
        record.subject,
        record.formatted_grade(),
        image
    )
}
