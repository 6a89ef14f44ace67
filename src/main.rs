use clap::{Parser, Subcommand};
use colored::Colorize;
use dotenv::dotenv;
use fund_advisor_rag::api::{self, AppState};
use fund_advisor_rag::commands;
use fund_advisor_rag::config::AppConfig;
use fund_advisor_rag::database::Database;
use fund_advisor_rag::services::Services;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Role-aware question answering over fund reports", long_about = None)]
struct Args {
    /// Results returned per search (overrides RETRIEVAL_TOP_K)
    #[arg(long, global = true)]
    top_k: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load, chunk, tag and index the fund report
    Ingest {
        /// PDF to ingest instead of FUND_PDF_PATH
        #[arg(long)]
        pdf: Option<PathBuf>,
    },
    /// Answer a question from the reports only
    Ask {
        #[arg(long, default_value = "intern")]
        role: String,
        question: String,
    },
    /// Let the planner agent research and calculate
    Agent {
        #[arg(long, default_value = "intern")]
        role: String,
        question: String,
    },
    /// Run the HTTP API
    Serve {
        #[arg(long, default_value = "8000")]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut config = AppConfig::from_env()?;
    if let Some(top_k) = args.top_k {
        config.top_k = top_k;
    }

    let services = Services::build(config).await?;

    let outcome = match args.command {
        Command::Ingest { pdf } => commands::handle_ingest(&services, pdf).await,
        Command::Ask { role, question } => commands::handle_ask(&services, &role, &question).await,
        Command::Agent { role, question } => commands::handle_agent(&services, &role, &question).await,
        Command::Serve { port } => {
            let audit = match Database::new(&services.config.audit_db_path).await {
                Ok(db) => Some(db),
                Err(e) => {
                    log::error!("Audit log unavailable, continuing without it: {}", e);
                    None
                }
            };
            api::serve(AppState::new(services, audit), port)
                .await
                .map_err(|e| format!("Server error: {}", e))
        }
    };

    if let Err(e) = outcome {
        eprintln!("{}", e.red());
        std::process::exit(1);
    }
    Ok(())
}
