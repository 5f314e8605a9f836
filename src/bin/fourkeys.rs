use clap::{Parser, Subcommand};

use fourkeys::{Config, Credential, Dashboard, MetricResult};

#[derive(Parser)]
#[command(name = "fourkeys", about = "DORA four-keys and issue-tracker metrics")]
struct Cli {
    /// Config file (default: ~/.fourkeys/config.json)
    #[arg(long)]
    config: Option<String>,

    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// GitHub personal access token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    /// Jira personal access token
    #[arg(long, env = "JIRA_TOKEN", hide_env_values = true)]
    jira_token: Option<String>,

    /// Page size for upstream API requests (max 100)
    #[arg(long)]
    page_size: Option<u32>,

    /// Restrict ticket metrics to one Jira project key
    #[arg(long)]
    jira_project: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// DORA four-keys metrics from GitHub over the last 30 days
    FourKeys {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Issue-tracker metrics from Jira over the last 30 days
    Tickets {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Both metric sets
    Dashboard {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            let mut config = Config::load_from(path)?;
            config.apply_env(|key| std::env::var(key).ok())?;
            config
        }
        None => Config::load()?,
    };
    if let Some(size) = cli.page_size {
        config.page_size = size;
    }
    if let Some(project) = &cli.jira_project {
        config.jira_project = Some(project.clone());
    }
    config.validate()?;
    Ok(config)
}

fn print_metrics(title: &str, entries: &[(&'static str, MetricResult)]) {
    println!("{title}");
    for (name, metric) in entries {
        println!("  {:<26} {metric}", name.replace('_', " "));
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = load_config(&cli)?;
    let github = Credential::from_option(cli.github_token.as_deref());
    let jira = Credential::from_option(cli.jira_token.as_deref());
    let dashboard = Dashboard::new(&config)?;

    match cli.command {
        Commands::FourKeys { json } => {
            let metrics = dashboard.source().four_keys_metrics(github.as_ref()).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&metrics)?);
            } else {
                print_metrics("Four keys (last 30 days)", &metrics.entries());
            }
        }
        Commands::Tickets { json } => {
            let metrics = dashboard.tracker().metrics(jira.as_ref()).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&metrics)?);
            } else {
                print_metrics("Tickets (last 30 days)", &metrics.entries());
            }
        }
        Commands::Dashboard { json } => {
            let metrics = dashboard.metrics(github.as_ref(), jira.as_ref()).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&metrics)?);
            } else {
                print_metrics("Four keys (last 30 days)", &metrics.github_metrics.entries());
                println!();
                print_metrics("Tickets (last 30 days)", &metrics.jira_metrics.entries());
            }
        }
    }

    Ok(())
}
