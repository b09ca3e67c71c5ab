mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "infohub")]
#[command(about = "Self-contained team information hub")]
#[command(version)]
struct Cli {
    /// Path to the hub config directory (default: ~/.infohub)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in by username, email, or display name
    Login {
        identifier: String,
        /// Password (or set INFOHUB_PASSWORD). Prompts if absent.
        #[arg(long, env = "INFOHUB_PASSWORD")]
        password: Option<String>,
    },

    /// End the current session
    Logout,

    /// Register a view-only account and sign in
    Signup {
        name: String,
        email: String,
        #[arg(long, env = "INFOHUB_PASSWORD")]
        password: Option<String>,
    },

    /// Show the signed-in user and their permissions
    Whoami,

    /// List sections visible to the signed-in user
    Sections,

    /// List resources in a section
    List {
        section: String,
        /// Resource kind: playbooks, boxLinks, dashboards, or a custom name
        #[arg(long, default_value = "playbooks")]
        kind: String,
    },

    /// Add a resource to a section
    Add {
        section: String,
        title: String,
        url: String,
        #[arg(long, default_value = "playbooks")]
        kind: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "process")]
        category: String,
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Edit fields of an existing resource
    Edit {
        section: String,
        id: String,
        #[arg(long, default_value = "playbooks")]
        kind: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long = "tag")]
        tags: Option<Vec<String>>,
    },

    /// Delete a resource
    Delete {
        section: String,
        id: String,
        #[arg(long, default_value = "playbooks")]
        kind: String,
    },

    /// Record a view of a resource and print its link
    Open { section: String, id: String },

    /// Show the activity log (newest first)
    Audit {
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },

    /// Export a snapshot (or a full backup with --full) as JSON
    Export {
        /// Write to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
        /// Include raw local state so the export can be re-imported
        #[arg(long)]
        full: bool,
    },

    /// Restore a full backup produced by `export --full`
    Import { input: PathBuf },

    /// Show the active configuration
    Config,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("infohub=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let base_dir = match cli.config_dir {
        Some(ref dir) => dir.clone(),
        None => infohub_core::config::HubConfig::default_base_dir()?,
    };

    let rt = tokio::runtime::Runtime::new()?;

    match cli.command {
        Commands::Login {
            ref identifier,
            ref password,
        } => rt.block_on(commands::auth::login(&base_dir, identifier, password)),
        Commands::Logout => rt.block_on(commands::auth::logout(&base_dir)),
        Commands::Signup {
            ref name,
            ref email,
            ref password,
        } => rt.block_on(commands::auth::signup(&base_dir, name, email, password)),
        Commands::Whoami => rt.block_on(commands::auth::whoami(&base_dir)),
        Commands::Sections => rt.block_on(commands::sections::run(&base_dir)),
        Commands::List {
            ref section,
            ref kind,
        } => rt.block_on(commands::resource::list(&base_dir, section, kind)),
        Commands::Add {
            ref section,
            ref title,
            ref url,
            ref kind,
            ref description,
            ref category,
            ref tags,
        } => rt.block_on(commands::resource::add(
            &base_dir,
            section,
            kind,
            title,
            url,
            description,
            category,
            tags,
        )),
        Commands::Edit {
            ref section,
            ref id,
            ref kind,
            ref title,
            ref url,
            ref description,
            ref category,
            ref tags,
        } => rt.block_on(commands::resource::edit(
            &base_dir,
            section,
            kind,
            id,
            commands::resource::EditArgs {
                title: title.clone(),
                url: url.clone(),
                description: description.clone(),
                category: category.clone(),
                tags: tags.clone(),
            },
        )),
        Commands::Delete {
            ref section,
            ref id,
            ref kind,
        } => rt.block_on(commands::resource::delete(&base_dir, section, kind, id)),
        Commands::Open {
            ref section,
            ref id,
        } => rt.block_on(commands::resource::open(&base_dir, section, id)),
        Commands::Audit { limit } => rt.block_on(commands::audit::run(&base_dir, limit)),
        Commands::Export { ref output, full } => {
            rt.block_on(commands::backup::export(&base_dir, output.as_deref(), full))
        }
        Commands::Import { ref input } => rt.block_on(commands::backup::import(&base_dir, input)),
        Commands::Config => commands::config::run(&base_dir),
    }
}
