//! Thin CLI glue over the `gitsavvy` core.
//!
//! Argument parsing, the TUI, the self-updater, and the AI feature are
//! external collaborators layered on top of this binary; what lives here
//! is only the dispatch needed to exercise the core's documented contracts
//! from a terminal.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};

use gitsavvy::config::GitsavvyConfig;
use gitsavvy::git::GitGateway;
use gitsavvy::index::{Index, SearchParams};
use gitsavvy::store::{ListFilter, LoadRef, WorkflowStore};

#[derive(Parser)]
#[command(name = "gsv", about = "Terminal-first workflow/runbook tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Initialize the workflow repo at the current directory.
    Init,
    /// List known workflows.
    List {
        #[arg(long)]
        identity: Option<String>,
    },
    /// View a workflow by slug.
    View { slug: String },
    /// Search the index.
    Search { query: String },
    /// Show git status of the workflow repo.
    Status,
}

fn main() -> ExitCode {
    init_logging();

    let cli = Cli::parse();
    let repo_path = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    let result = run(&cli.command, &repo_path);

    match result {
        Ok(()) => ExitCode::from(gitsavvy::exit_code::SUCCESS as u8),
        Err(e) => {
            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "error: {e:#}");
            ExitCode::from(gitsavvy::exit_code::GIT_FAILURE as u8)
        }
    }
}

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
        .init();
}

fn run(command: &Command, repo_path: &std::path::Path) -> anyhow::Result<()> {
    let config_path =
        GitsavvyConfig::default_path().unwrap_or_else(|| repo_path.join(".gitsavvy.toml"));
    let config = GitsavvyConfig::load(&config_path).context("loading configuration")?;

    match command {
        Command::Init => {
            let gateway = GitGateway::new(repo_path);
            gateway
                .init(false, Some(&config.git.pr_base_branch))
                .context("initializing workflow repo")?;
            println!("Initialized workflow repo at {}", repo_path.display());
            Ok(())
        }
        Command::List { identity } => {
            let store = WorkflowStore::new(repo_path);
            let filter = ListFilter {
                identity_path: identity.clone(),
                tags: Vec::new(),
            };
            for workflow_ref in store.list(&filter).context("listing workflows")? {
                println!("{}\t{}", workflow_ref.slug, workflow_ref.path);
            }
            Ok(())
        }
        Command::View { slug } => {
            let store = WorkflowStore::new(repo_path);
            let workflow = store
                .load(&LoadRef::by_slug(slug.clone()))
                .context("loading workflow")?;
            print!(
                "{}",
                gitsavvy::export::render(&workflow, gitsavvy::export::ExportFormat::Markdown)
                    .context("rendering workflow")?
            );
            Ok(())
        }
        Command::Search { query } => {
            let index = Index::load(repo_path, None);
            let params = SearchParams {
                query: Some(query.clone()),
                fuzzy: true,
                ..Default::default()
            };
            for entry in index.search(&params) {
                println!("{}\t{}", entry.slug, entry.title);
            }
            Ok(())
        }
        Command::Status => {
            let gateway = GitGateway::new(repo_path);
            let status = gateway.status().context("reading git status")?;
            println!(
                "branch={} dirty={} ahead={} behind={} conflicted={}",
                status.branch, status.dirty, status.ahead, status.behind, status.conflicted
            );
            Ok(())
        }
    }
}
