use chrono::NaiveDate;
use clap::{Parser, Subcommand, builder::styling};
use eyre::Result;
use owo_colors::OwoColorize;
use tableau_exporter::client::TableauClient;
use tableau_exporter::config::Config;
use tableau_exporter::summary::{RunSummary, error_document, render};
use tableau_exporter::{PatCredentials, pipeline};

// CLI Styling
const STYLES: styling::Styles = styling::Styles::styled()
    .header(styling::AnsiColor::BrightWhite.on_default())
    .usage(styling::AnsiColor::BrightWhite.on_default())
    .literal(styling::AnsiColor::Green.on_default())
    .placeholder(styling::AnsiColor::Cyan.on_default());

/// Tableau Exporter: --{tabx}-> ships data source tables out of Tableau Server as dated CSV blobs
#[derive(Parser)]
#[command(name = "tabx", version, styles = STYLES)]
struct Cli {
    /// The dotenv file to source credentials from
    #[arg(short, long, global = true, default_value = ".env")]
    env: String,

    /// More verbose logging
    #[arg(long, global = true)]
    debug: bool,

    /// Command to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute one extraction run against the configured site
    Run {
        /// Run date used in blob names, YYYY-MM-DD (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Test sign-in against the configured Tableau Server
    Auth,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let dotenv = dotenvy::from_filename(&cli.env);

    let log_level = match cli.debug {
        true => "debug",
        false => "info",
    };
    let env = env_logger::Env::default().filter_or("LOG_LEVEL", log_level);
    env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .init();

    if let Err(error) = dotenv {
        // Scheduled environments usually inject variables directly.
        log::debug!("No dotenv file loaded from {}: {}", cli.env, error);
    }

    match cli.command {
        Commands::Run { date } => {
            let date = date.unwrap_or_else(|| chrono::Local::now().date_naive());
            log::info!("Starting export run for {}", date.to_string().bright_black());

            match execute_run(date).await {
                Ok(summary) => {
                    log::info!("{}", render(&summary.success_document()));
                    log::info!("✓ Run complete, {} summary record(s)", summary.len());
                }
                Err(error) => {
                    log::error!("{}", render(&error_document(&error)));
                    std::process::exit(1);
                }
            }
        }
        Commands::Auth => {
            log::info!("Testing authorization");
            let config = Config::from_env()?;
            let client = TableauClient::try_new(config.server_url.clone())?;
            let credentials = PatCredentials::new(&config.token_name, &config.token_secret);

            let session = client.sign_in(&credentials, &config.site_name).await?;
            log::info!("✓ Signed in to {}", session.to_string().bright_black());
            session.sign_out().await?;
            log::info!("✓ Signed out, credentials are valid");
        }
    }

    Ok(())
}

/// The timer-trigger body: load configuration, run the pipeline.
///
/// Configuration errors flow into the same error document as pipeline
/// failures, so the logged JSON is the run's single failure signal.
async fn execute_run(date: NaiveDate) -> Result<RunSummary> {
    let config = Config::from_env()?;
    pipeline::run(&config, date).await
}
