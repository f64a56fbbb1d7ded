use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use dotenv::dotenv;

use reservoir_service::config::{Overrides, Settings};
use reservoir_service::logging;
use reservoir_service::server::{self, AppState};

#[derive(Debug, Parser)]
#[command(
    name = "reservoir_service",
    about = "Daily reservoir storage proxy for the SafetyData OpenAPI"
)]
struct Cli {
    #[command(flatten)]
    options: Options,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Args)]
struct Options {
    /// data.go.kr service key (decoded form)
    #[arg(long, env = "SAFETYDATA_SERVICE_KEY", hide_env_values = true, global = true)]
    service_key: Option<String>,

    /// Server port
    #[arg(long, env = "PORT", global = true)]
    port: Option<u16>,

    /// Date served when a request names none (YYYY-MM-DD)
    #[arg(long, env = "TARGET_DATE", global = true)]
    target_date: Option<String>,

    /// Region-code prefix to keep (41 = 경기도)
    #[arg(long, env = "GG_PREFIX", global = true)]
    region_prefix: Option<String>,

    /// Province name to match instead of the registry name for the prefix
    #[arg(long, env = "PROVINCE_NAME", global = true)]
    province_name: Option<String>,

    /// TOML config file (default ./reservoir_service.toml, optional)
    #[arg(long, env = "RESERVOIR_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Directory of static files served as a fallback
    #[arg(long, env = "STATIC_DIR", global = true)]
    static_dir: Option<PathBuf>,

    /// Append log output to this file as well as the console
    #[arg(long, env = "RESERVOIR_LOG_FILE", global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Fetch one day once and print the JSON report
    Fetch {
        /// Date to fetch (YYYY-MM-DD); defaults like the HTTP endpoint
        #[arg(long)]
        date: Option<String>,
    },
}

impl Options {
    fn overrides(&self) -> Overrides {
        Overrides {
            service_key: self.service_key.clone(),
            port: self.port,
            target_date: self.target_date.clone(),
            region_prefix: self.region_prefix.clone(),
            province_name: self.province_name.clone(),
            static_dir: self.static_dir.clone(),
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::load(cli.options.config.as_deref(), cli.options.overrides())?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => server::serve(settings).await?,
        Command::Fetch { date } => {
            let state = AppState::new(settings)?;
            let report = server::load_report(&state, date.as_deref()).await?;

            println!("{}", serde_json::to_string_pretty(&report)?);
            eprintln!(
                "{} rows for {} (region prefix {})",
                report.count, report.date, state.settings.region.code_prefix
            );
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    let cli = Cli::parse();
    logging::init_logging(cli.options.log_file.as_deref());

    if let Err(err) = run(cli).await {
        tracing::error!(error = %err, "reservoir_service failed");
        std::process::exit(1);
    }
}
