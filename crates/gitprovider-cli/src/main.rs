//! gitprovider CLI - reconcile repositories, deploy keys and team access
//! on GitHub and GitLab.

mod commands;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use gitprovider_core::config::{Config, ProviderConfig, ProviderKind};
use gitprovider_github::GitHubClient;
use gitprovider_gitlab::GitLabClient;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use crate::commands::{
    DeployKeyCommands, OrgCommands, ProviderCommand, RepoCommands, TeamAccessCommands,
};

#[derive(Parser)]
#[command(name = "gitprovider")]
#[command(
    author,
    version,
    about = "Declarative management of Git hosting resources",
    long_about = None
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Read or change configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Organizations (GitHub orgs, GitLab groups)
    Org {
        #[command(subcommand)]
        command: OrgCommands,
    },

    /// Repositories
    Repo {
        #[command(subcommand)]
        command: RepoCommands,
    },

    /// Repository deploy keys
    DeployKey {
        #[command(subcommand)]
        command: DeployKeyCommands,
    },

    /// Team access to organization repositories
    TeamAccess {
        #[command(subcommand)]
        command: TeamAccessCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Set a value, e.g. `gitlab.domain gitlab.example.com`
    Set { key: String, value: String },

    /// Print one value
    Get { key: String },

    /// Show current configuration
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load().context("Failed to load configuration")?;

    let command = match cli.command {
        Some(Commands::Config { command }) => return run_config(config, command),
        Some(Commands::Org { command }) => ProviderCommand::Org(command),
        Some(Commands::Repo { command }) => ProviderCommand::Repo(command),
        Some(Commands::DeployKey { command }) => ProviderCommand::DeployKey(command),
        Some(Commands::TeamAccess { command }) => ProviderCommand::TeamAccess(command),
        None => {
            println!("gitprovider - declarative management of Git hosting resources");
            println!("Run with --help for usage information");
            return Ok(());
        }
    };

    let domain = command.domain()?;
    let (kind, provider) = select_provider(&config, &domain)?;
    let token = token_for(kind);
    debug!(provider = %kind, domain = %domain, "Selected provider");

    match kind {
        ProviderKind::GitHub => {
            let client = GitHubClient::new(token, provider.client_options())?;
            commands::run(&client, command).await
        }
        ProviderKind::GitLab => {
            let client = GitLabClient::new(token, provider.client_options())?;
            commands::run(&client, command).await
        }
    }
}

/// Backend serving `domain`, with its settings pointed at that domain.
fn select_provider(
    config: &Config,
    domain: &str,
) -> anyhow::Result<(ProviderKind, ProviderConfig)> {
    let kind = config
        .provider_for_domain(domain)
        .ok_or_else(|| anyhow!("No provider configured for domain {}", domain))?;

    let mut provider = config.provider(kind);
    if !provider.domain.eq_ignore_ascii_case(domain) {
        // Public domain of a backend configured for a self-hosted one
        provider = ProviderConfig {
            domain: domain.to_string(),
            ..provider
        };
    }
    Ok((kind, provider))
}

fn token_for(kind: ProviderKind) -> String {
    match std::env::var(kind.token_env_var()) {
        Ok(token) => token,
        Err(_) => {
            warn!(
                variable = kind.token_env_var(),
                "No token set, sending unauthenticated requests"
            );
            String::new()
        }
    }
}

fn run_config(mut config: Config, command: ConfigCommands) -> anyhow::Result<()> {
    match command {
        ConfigCommands::Set { key, value } => {
            config.set(&key, &value)?;
            config.save()?;
            println!("{} = {}", key, value);
        }
        ConfigCommands::Get { key } => match config.get(&key)? {
            Some(value) => println!("{}", value),
            None => println!("{} is not set", key),
        },
        ConfigCommands::Show => {
            println!("Config file: {}", Config::config_path()?.display());
            let providers = config.configured_providers();
            if providers.is_empty() {
                println!("No providers configured; using github.com and gitlab.com");
            } else {
                println!("Configured providers: {}", providers.join(", "));
            }
            for kind in [ProviderKind::GitHub, ProviderKind::GitLab] {
                let provider = config.provider(kind);
                let token = if std::env::var(kind.token_env_var()).is_ok() {
                    "set"
                } else {
                    "not set"
                };
                let timeout = provider
                    .timeout_secs
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "none".to_string());
                println!("[{}]", kind);
                println!("  domain = {}", provider.domain);
                println!("  destructive_actions = {}", provider.destructive_actions);
                println!("  timeout_secs = {}", timeout);
                println!("  conditional_requests = {}", provider.conditional_requests);
                println!("  {} = {}", kind.token_env_var(), token);
            }
        }
    }
    Ok(())
}
