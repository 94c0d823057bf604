#![cfg(not(tarpaulin_include))]

//! Command-line access to the portal dashboards and reminder lists.

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

use claims_portal::config::PortalConfig;
use claims_portal::dashboard;
use claims_portal::documents::{DocumentKind, document_file_name};
use claims_portal::normalize::find_project;
use claims_portal::reminders::{FileStore, ReminderKind, ReminderStore, newest_first};
use claims_portal::sheets::SheetLoader;

#[derive(Parser)]
#[command(name = "portal-cli")]
#[command(author, version, about = "Claims portal dashboards from the command line", long_about = None)]
struct Cli {
    /// Config file (JSON); built-in defaults when omitted
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Headline financial numbers for a tenant
    Financials {
        tenant: String,
    },

    /// Project listing for a tenant
    Projects {
        tenant: String,
    },

    /// One project by id
    Project {
        tenant: String,
        id: String,
    },

    /// Process stages
    Stages,

    /// To-dos and adjuster meetings
    Tasks,

    /// Follow-up and update reminders
    Reminders {
        #[command(subcommand)]
        action: ReminderAction,
    },

    /// Print an Argon2 hash for a gate password (needs the `web` feature)
    HashPassword {
        password: String,
    },

    /// File name for a generated document
    DocName {
        /// inspection-report, contract or certificate
        kind: String,
        customer: String,
        claim_number: String,

        /// Date as YYYY-MM-DD; today when omitted
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
}

#[derive(Subcommand)]
enum ReminderAction {
    /// List reminders, newest first
    List { kind: String },

    /// Add a reminder
    Add { kind: String, description: String },

    /// Delete a reminder by id
    Delete { kind: String, id: String },
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn reminder_kind(segment: &str) -> Result<ReminderKind, String> {
    ReminderKind::from_segment(segment)
        .ok_or_else(|| format!("Unknown reminder list \"{}\" (use follow-ups or updates)", segment))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => PortalConfig::load(path)?,
        None => PortalConfig::default(),
    };
    let loader = SheetLoader::new(&config);

    let tenant = |key: &str| {
        config
            .tenant(key)
            .cloned()
            .ok_or_else(|| format!("Unknown tenant \"{}\"", key))
    };

    match cli.command {
        Commands::Financials { tenant: key } => {
            let metrics = dashboard::load_financials(&loader, &tenant(&key)?).await?;
            print_json(&metrics.formatted())?;
        }
        Commands::Projects { tenant: key } => {
            let projects = dashboard::load_projects(&loader, &tenant(&key)?).await?;
            print_json(&projects)?;
        }
        Commands::Project { tenant: key, id } => {
            let projects = dashboard::load_projects(&loader, &tenant(&key)?).await?;
            match find_project(&projects, &id) {
                Some(project) => print_json(project)?,
                None => return Err(format!("Project not found: {}", id).into()),
            }
        }
        Commands::Stages => {
            print_json(&dashboard::load_stages(&loader, &config).await?)?;
        }
        Commands::Tasks => {
            print_json(&dashboard::load_tasks(&loader, &config).await?)?;
        }
        Commands::Reminders { action } => {
            let storage = FileStore::new(&config.reminders_path);
            match action {
                ReminderAction::List { kind } => {
                    let store = ReminderStore::new(&storage, reminder_kind(&kind)?);
                    print_json(&newest_first(store.load()))?;
                }
                ReminderAction::Add { kind, description } => {
                    if description.trim().is_empty() {
                        return Err("Description cannot be empty".into());
                    }
                    let store = ReminderStore::new(&storage, reminder_kind(&kind)?);
                    print_json(&store.add(&description)?)?;
                }
                ReminderAction::Delete { kind, id } => {
                    let store = ReminderStore::new(&storage, reminder_kind(&kind)?);
                    if !store.remove(&id)? {
                        return Err(format!("Reminder not found: {}", id).into());
                    }
                    println!("Deleted {}", id);
                }
            }
        }
        Commands::HashPassword { password } => {
            #[cfg(feature = "web")]
            println!("{}", claims_portal::login::hash_password(&password)?);
            #[cfg(not(feature = "web"))]
            {
                let _ = password;
                return Err("hash-password requires the `web` feature".into());
            }
        }
        Commands::DocName {
            kind,
            customer,
            claim_number,
            date,
        } => {
            let kind = DocumentKind::from_segment(&kind)
                .ok_or_else(|| format!("Unknown document kind \"{}\"", kind))?;
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            println!("{}", document_file_name(&customer, &claim_number, kind, date));
        }
    }

    Ok(())
}
