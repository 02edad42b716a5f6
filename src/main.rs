use clap::{Args, Parser, Subcommand};
use configuration::{OutputFormat, Settings, init_tracing, load_settings};
use database::{MongoStore, connect, with_session};
use indicatif::{ProgressBar, ProgressStyle};
use maintenance::{MigrationRunner, operations, report};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

/// The main entry point for the TinyTots Boutique maintenance tool.
#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine; the settings have defaults.
    dotenvy::dotenv().ok();

    // Parse command-line arguments
    let cli = Cli::parse();

    let settings = match resolve_settings(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error loading configuration: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let _log_guard = match init_tracing(&settings.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error initialising logging: {e}");
            return ExitCode::FAILURE;
        }
    };

    match run(cli.command, &settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Inspects and repairs the TinyTots Boutique database.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the settings file. Missing files fall back to defaults.
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    /// MongoDB connection string (overrides settings and MONGODB_URI).
    #[arg(long, global = true)]
    uri: Option<String>,

    /// Database name (overrides settings and MONGODB_DATABASE).
    #[arg(long, global = true)]
    database: Option<String>,

    /// Report format.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the database answers.
    Ping,
    /// List the collections in the database.
    Collections,
    /// Show every role in a collection.
    Roles(CollectionArgs),
    /// Show the default role of a collection.
    DefaultRole(CollectionArgs),
    /// Show every user.
    Users,
    /// Show the raw documents of a collection that match an equality filter.
    Find(FindArgs),
    /// Create the default role in the roles collection if none exists.
    CreateDefaultRole,
    /// Copy the default role from roles into userroles if userroles has none.
    FixDefaultRole,
    /// Rename a role in userroles.
    RenameRole(RenameArgs),
    /// Apply every pending maintenance task, in order.
    Migrate,
    /// Show which maintenance tasks have been applied.
    Status,
    /// Print the effective settings as JSON, without connecting.
    Config,
}

#[derive(Args)]
struct CollectionArgs {
    /// The collection to read (defaults to the roles collection).
    #[arg(long)]
    collection: Option<String>,
}

#[derive(Args)]
struct FindArgs {
    /// The collection to read.
    #[arg(long)]
    collection: String,

    /// Equality filter as a JSON object, e.g. '{"isDefault": true}'.
    #[arg(long, default_value = "{}")]
    filter: String,

    /// Stop at the first match.
    #[arg(long)]
    one: bool,
}

#[derive(Args)]
struct RenameArgs {
    /// Current role name (defaults to rename.from).
    #[arg(long)]
    from: Option<String>,

    /// New role name (defaults to rename.to).
    #[arg(long)]
    to: Option<String>,
}

/// Loads settings and applies the global command-line overrides.
fn resolve_settings(cli: &Cli) -> anyhow::Result<Settings> {
    let mut settings = load_settings(&cli.config)?;

    if let Some(uri) = &cli.uri {
        settings.database.uri = uri.clone();
    }
    if let Some(database) = &cli.database {
        settings.database.name = database.clone();
    }
    if let Some(format) = cli.format {
        settings.output.format = format;
    }
    if let Commands::RenameRole(args) = &cli.command {
        if let Some(from) = &args.from {
            settings.rename.from = from.clone();
        }
        if let Some(to) = &args.to {
            settings.rename.to = to.clone();
        }
    }

    settings.validate()?;
    Ok(settings)
}

// ==============================================================================
// Command Logic
// ==============================================================================

/// Connects, runs one command inside a session, and disconnects.
async fn run(command: Commands, settings: &Settings) -> anyhow::Result<()> {
    // Settings are printed without a connection, so a bad URI can still be inspected.
    if let Commands::Config = command {
        println!("{}", render_settings(settings)?);
        return Ok(());
    }

    let store = connect(&settings.database.uri, &settings.database.name).await?;

    with_session(store, async move |store: &MongoStore| {
        execute(command, store, settings).await
    })
    .await
}

async fn execute(command: Commands, store: &MongoStore, settings: &Settings) -> anyhow::Result<()> {
    let format = settings.output.format;
    let collections = &settings.collections;

    let output = match command {
        Commands::Ping => {
            operations::check_connection(store).await?;
            match format {
                OutputFormat::Json => serde_json::to_string_pretty(&serde_json::json!({
                    "database": store.database_name(),
                    "environment": settings.environment.0,
                    "reachable": true,
                }))?,
                OutputFormat::Text => format!(
                    "Connected to database '{}' ({})",
                    store.database_name(),
                    settings.environment.0
                ),
            }
        }
        Commands::Collections => {
            let names = operations::list_collections(store).await?;
            report::render_collections(&names, format)?
        }
        Commands::Roles(args) => {
            let collection = args.collection.as_deref().unwrap_or(&collections.roles);
            let roles = operations::show_roles(store, collection).await?;
            report::render_roles(&roles, collection, format)?
        }
        Commands::DefaultRole(args) => {
            let collection = args.collection.as_deref().unwrap_or(&collections.roles);
            let role = operations::show_default_role(store, collection).await?;
            report::render_role(role.as_ref(), collection, format)?
        }
        Commands::Users => {
            let users = operations::show_users(store, &collections.users).await?;
            report::render_users(&users, format)?
        }
        Commands::Find(args) => {
            let filter: serde_json::Value = serde_json::from_str(&args.filter)?;
            let filter = bson::to_document(&filter)?;
            let docs: Vec<bson::Document> = if args.one {
                operations::find_one(store, &args.collection, filter)
                    .await?
                    .into_iter()
                    .collect()
            } else {
                operations::find_all(store, &args.collection, filter).await?
            };
            report::render_documents(&docs, format)?
        }
        Commands::CreateDefaultRole => {
            let outcome =
                operations::create_default_role(store, &collections.roles, &settings.default_role).await?;
            report::render_outcome("create-default-role", &outcome, format)?
        }
        Commands::FixDefaultRole => {
            let outcome =
                operations::fix_default_role(store, &collections.roles, &collections.user_roles).await?;
            report::render_outcome("fix-default-role", &outcome, format)?
        }
        Commands::RenameRole(_) => {
            let outcome =
                operations::update_role_name(store, &collections.user_roles, &settings.rename).await?;
            report::render_outcome("rename-role", &outcome, format)?
        }
        Commands::Migrate => handle_migrate(store, settings).await?,
        Commands::Status => {
            let status = MigrationRunner::from_settings(settings).status(store).await?;
            report::render_status(&status, format)?
        }
        Commands::Config => render_settings(settings)?,
    };

    println!("{output}");
    Ok(())
}

/// The effective settings as pretty JSON, with credentials removed from the URI.
fn render_settings(settings: &Settings) -> anyhow::Result<String> {
    let mut shown = settings.clone();
    shown.database.uri = settings.database.redacted_uri();
    Ok(serde_json::to_string_pretty(&shown)?)
}

/// Applies the pending maintenance tasks with a progress bar.
async fn handle_migrate(store: &MongoStore, settings: &Settings) -> anyhow::Result<String> {
    let runner = MigrationRunner::from_settings(settings);
    info!(tasks = runner.len(), "running maintenance tasks");

    let progress_bar = if runner.is_empty() {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(runner.len() as u64)
    };
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let result = runner
        .run_pending(store, |task_report| {
            progress_bar.set_message(task_report.name.clone());
            progress_bar.inc(1);
        })
        .await;

    match result {
        Ok(reports) => {
            progress_bar.finish_with_message("maintenance complete");
            Ok(report::render_task_reports(&reports, settings.output.format)?)
        }
        Err(e) => {
            progress_bar.abandon_with_message("maintenance stopped");
            Err(e.into())
        }
    }
}
