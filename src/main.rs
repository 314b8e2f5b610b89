use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::BTreeSet;
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reporule::{Config, GovernanceEngine, RepoTarget, Repository, RulesetOutcome, RulesetRequest};

#[derive(Parser)]
#[command(name = "reporule")]
#[command(about = "Apply GitHub branch protection rulesets across an organization")]
#[command(version)]
#[command(arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (defaults to XDG config location)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory containing ruleset definitions and repos_exception.yml
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a ruleset to one repository or to every eligible repository
    Ruleset {
        /// GitHub organization or user name
        account: String,

        /// Repository name (must belong to the account)
        #[arg(short, long)]
        repo: Option<String>,

        /// Apply the ruleset to every repository not on the exception list
        #[arg(short, long)]
        all: bool,

        /// Ruleset (from the data directory) to apply
        #[arg(long)]
        ruleset: Option<String>,

        /// Report what would be applied without changing anything
        #[arg(long)]
        dryrun: bool,
    },

    /// List the repositories of an organization or user
    List {
        /// GitHub organization or user name
        account: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = load_config(cli.config)?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir.to_string_lossy().into_owned();
    }

    init_logging(cli.verbose, &config)?;
    debug!("Starting reporule v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Ruleset {
            account,
            repo,
            all,
            ruleset,
            dryrun,
        } => cmd_ruleset(account, repo, all, ruleset, dryrun, &config).await,
        Commands::List { account } => cmd_list(account, &config).await,
    }
}

/// Initialize logging based on verbosity level and configuration
fn init_logging(verbose: bool, config: &Config) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env()
            .or_else(|_| {
                std::env::var("LOG_LEVEL")
                    .map(|level| EnvFilter::new(level.to_lowercase()))
            })
            .unwrap_or_else(|_| EnvFilter::new(config.logging.level.to_lowercase()))
    };

    let json = match config.logging.format.as_str() {
        "json" => true,
        "pretty" => false,
        _ => !std::io::stderr().is_terminal(),
    };

    let registry = tracing_subscriber::registry();
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .try_init()
            .context("Failed to initialize logging")?;
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .try_init()
            .context("Failed to initialize logging")?;
    }

    Ok(())
}

/// Load configuration from specified path or default location
fn load_config(config_path: Option<PathBuf>) -> Result<Config> {
    match config_path {
        Some(path) => Config::load(&path),
        None => Config::load_or_default(),
    }
}

fn build_engine(config: &Config) -> Result<GovernanceEngine> {
    let token = config.token_from_env();
    if token.is_none() {
        warn!(
            "{} is not set, GitHub API requests will be unauthenticated and heavily rate-limited",
            config.github.token_env
        );
    }
    Ok(GovernanceEngine::from_config(config, token)?)
}

/// Apply a ruleset to the selected repositories
async fn cmd_ruleset(
    account: String,
    repo: Option<String>,
    all: bool,
    ruleset: Option<String>,
    dry_run: bool,
    config: &Config,
) -> Result<()> {
    // Argument combinations are checked before any network activity
    let target = RepoTarget::from_flags(repo, all)?;
    let ruleset_name = ruleset.unwrap_or_else(|| config.github.default_ruleset.clone());

    let engine = build_engine(config)?;
    let request = RulesetRequest {
        account,
        target,
        ruleset_name,
        dry_run,
    };

    info!(
        account = %request.account,
        ruleset = %request.ruleset_name,
        dry_run,
        "Resolving ruleset eligibility"
    );
    let outcome = engine.run_ruleset(&request).await?;

    print_outcome(&outcome);
    Ok(())
}

/// List repositories of an organization or user
async fn cmd_list(account: String, config: &Config) -> Result<()> {
    info!("Listing repositories...");

    let engine = build_engine(config)?;
    let repositories = engine.list(&account).await?;

    print_repository_table(&account, repositories);
    info!("Repository report complete");
    Ok(())
}

fn print_skipped(title: &str, repos: &BTreeSet<String>) {
    if repos.is_empty() {
        return;
    }
    println!("⏭️  Skipping {} {}:", repos.len(), title);
    for repo in repos {
        println!("   • {}", repo);
    }
}

/// Print the result of a ruleset run to stdout
fn print_outcome(outcome: &RulesetOutcome) {
    let status = &outcome.status;
    let name = &outcome.ruleset_name;

    println!("📋 Ruleset: {}", name);
    print_skipped("archived repositories", &status.archived);
    print_skipped(
        "repositories on the exception list",
        &status.skipped_exceptions(),
    );
    print_skipped(
        &format!("repositories that already have {}", name),
        &status.existing_ruleset,
    );

    if outcome.dry_run {
        println!(
            "\n🔍 Dry run - would apply {} to {} repositories:",
            name,
            outcome.would_apply()
        );
        for repo in &status.eligible_repos {
            println!("   • {}", repo);
        }
        return;
    }

    for repo in &outcome.summary.applied {
        println!("   • {}: applied ruleset", repo);
    }

    println!(
        "\n✅ Applied {} to {} repositories.",
        name,
        outcome.summary.count_applied()
    );

    if !outcome.summary.failures.is_empty() {
        println!(
            "\n❌ Failed to apply {} to {} repositories:",
            name,
            outcome.summary.failures.len()
        );
        for failure in &outcome.summary.failures {
            println!("   ❌ {}: {}", failure.repository, failure.error);
        }
    }
}

/// Print repositories as a table sorted by name
fn print_repository_table(account: &str, mut repositories: Vec<Repository>) {
    repositories.sort_by(|a, b| a.name.cmp(&b.name));

    let rows: Vec<[String; 5]> = repositories
        .iter()
        .map(|repo| {
            [
                repo.name.clone(),
                repo.created_at
                    .map(|created| created.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_default(),
                repo.archived.to_string(),
                repo.fork.to_string(),
                repo.id.to_string(),
            ]
        })
        .collect();

    let headers = ["name", "created_at", "archived", "fork", "gh_id"];
    let mut widths = headers.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let render = |cells: [&str; 5]| -> String {
        cells
            .iter()
            .zip(widths.iter())
            .map(|(cell, width)| format!("{:<width$}", cell, width = width))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    println!("Repositories in {} ({}):", account, rows.len());
    println!("{}", render(headers));
    println!(
        "{}",
        widths
            .iter()
            .map(|width| "-".repeat(*width))
            .collect::<Vec<_>>()
            .join("  ")
    );
    for row in &rows {
        let [name, created_at, archived, fork, id] = row;
        println!(
            "{}",
            render([
                name.as_str(),
                created_at.as_str(),
                archived.as_str(),
                fork.as_str(),
                id.as_str()
            ])
        );
    }
}
