use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use revtrail::cli::{
    handle_audit_command, handle_export_command, handle_revision_command, AuditCommands,
    ExportCommands, RevisionCommands,
};
use revtrail::config::{paths::TrailPaths, schema::SchemaConfig, settings::Settings};
use revtrail::storage::Storage;

#[derive(Parser)]
#[command(
    name = "revtrail",
    author = "Kaylee Beyene",
    version,
    about = "Versioned audit trail with revision reconstruction",
    long_about = "revtrail records every create, update and destroy of your entities as \
                  versioned audit records, rebuilds any entity as of an earlier version \
                  or point in time, and renders each change as readable text."
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Record and query audit history
    #[command(subcommand)]
    Audit(AuditCommands),

    /// Reconstruct past revisions of an entity
    #[command(subcommand, alias = "rev")]
    Revision(RevisionCommands),

    /// Export the audit log
    #[command(subcommand)]
    Export(ExportCommands),

    /// Initialize the data directory
    Init,

    /// Show current configuration and paths
    Config,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Initialize paths, settings and the tracked-type registry
    let paths = TrailPaths::new()?;
    let settings = Settings::load_or_create(&paths)?;
    let types = SchemaConfig::load(&paths)?.into_registry()?;

    match cli.command {
        Some(Commands::Audit(cmd)) => {
            let storage = Storage::open(&paths, types)?;
            handle_audit_command(&storage, &settings, cmd)?;
        }
        Some(Commands::Revision(cmd)) => {
            let storage = Storage::open(&paths, types)?;
            handle_revision_command(&storage, &settings, cmd)?;
        }
        Some(Commands::Export(cmd)) => {
            let storage = Storage::open(&paths, types)?;
            handle_export_command(&storage, cmd)?;
        }
        Some(Commands::Init) => {
            println!("Initializing revtrail at: {}", paths.base_dir().display());
            paths.ensure_directories()?;
            settings.save(&paths)?;
            if !paths.schema_file().exists() {
                SchemaConfig::default().save(&paths)?;
            }
            println!("Initialization complete!");
            println!();
            println!(
                "Describe your tracked types in {} to enable rendering.",
                paths.schema_file().display()
            );
            println!("Run 'revtrail audit record --help' to record your first change.");
        }
        Some(Commands::Config) => {
            println!("revtrail Configuration");
            println!("======================");
            println!("Base directory: {}", paths.base_dir().display());
            println!("Settings file:  {}", paths.settings_file().display());
            println!("Schema file:    {}", paths.schema_file().display());
            println!("Audit log:      {}", paths.audit_log().display());
            println!();
            println!("Settings:");
            println!("  Default actor:    {}", settings.default_actor);
            println!("  Version retries:  {}", settings.version_retries);
            println!("  Timestamp format: {}", settings.timestamp_format);
            println!("  Tracked types:    {}", types.names().len());
        }
        None => {
            println!("revtrail - Versioned audit trail");
            println!();
            println!("Run 'revtrail --help' for usage information.");
        }
    }

    Ok(())
}
