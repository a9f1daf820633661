//! Command-line front end
//!
//! The toolkit does not discover migration or seed files at runtime. An
//! application builds a [`Project`] from units compiled into it and hands it
//! to [`main_with`]:
//!
//! ```rust,no_run
//! use std::process::ExitCode;
//! use worksonmydb::cli::{self, Project};
//! use worksonmydb::core::SqlMigration;
//!
//! fn main() -> ExitCode {
//!     let project = Project::new().migration(SqlMigration::new(
//!         "001_init",
//!         "CREATE TABLE users (id INTEGER PRIMARY KEY)",
//!         "DROP TABLE users",
//!     ));
//!     cli::main_with(project)
//! }
//! ```
//!
//! Progress is logged through `tracing` on stderr; results are printed on
//! stdout.

use crate::backends;
use crate::config::{ToolkitConfig, DEFAULT_CONFIG_FILE};
use crate::core::error::Result;
use crate::core::migration::{self, Migration, MigrationSet, MigrationStatus, Migrator};
use crate::core::schema::Schema;
use crate::core::seed::{self, Seed, SeedSet, Seeder};
use crate::logging::{self, LogFormat};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error};

#[derive(Parser, Debug)]
#[command(name = "worksonmydb")]
#[command(about = "WorksOnMyDB CLI", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(short, long)]
    pub verbosity: Option<String>,

    /// Log format; overrides the config file
    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Print CREATE TABLE statements for the project schema
    Generate,

    /// Apply pending migrations
    Migrate,

    /// Roll back the last applied migration
    Rollback,

    /// Run all seeders
    Seed,

    /// Show which migrations are applied and which are pending
    Status,
}

/// Units and schema compiled into the application
#[derive(Default)]
pub struct Project {
    migrations: Vec<Box<dyn Migration>>,
    seeds: Vec<Box<dyn Seed>>,
    schema: Schema,
}

impl Project {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn migration(mut self, migration: impl Migration + 'static) -> Self {
        self.migrations.push(Box::new(migration));
        self
    }

    #[must_use]
    pub fn seed(mut self, seed: impl Seed + 'static) -> Self {
        self.seeds.push(Box::new(seed));
        self
    }

    #[must_use]
    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }
}

/// Parse arguments, run one command, and map the result to an exit code
pub fn main_with(project: Project) -> ExitCode {
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: cannot start async runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli, project)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Load configuration and dispatch a parsed command line
pub async fn run(cli: Cli, project: Project) -> Result<()> {
    let config = ToolkitConfig::load(&cli.config)?;

    let level = cli.verbosity.as_deref().unwrap_or(&config.log_level);
    let format = cli.log_format.unwrap_or(config.log_format);
    if let Err(e) = logging::init(level, format) {
        // a host application may already own the global subscriber
        debug!("keeping existing logger: {}", e);
    }

    execute(&cli.command, &config, project, &|line: &str| println!("{}", line)).await
}

/// Run one command, handing each output line to `out` as soon as it is known.
///
/// Migrate, rollback and seed announce every unit before it runs, so a
/// failure part way through still leaves a record of what was attempted.
pub async fn execute(
    command: &Commands,
    config: &ToolkitConfig,
    project: Project,
    out: &(dyn Fn(&str) + Send + Sync),
) -> Result<()> {
    let dialect = config.dialect.dialect();

    match command {
        Commands::Generate => {
            let statements = project.schema.create_statements(dialect)?;
            if statements.is_empty() {
                out("No tables defined in schema.");
            }
            for sql in statements {
                out(&format!("{};", sql));
            }
            Ok(())
        }

        Commands::Migrate => {
            let set = MigrationSet::new(project.migrations)?;
            if set.is_empty() {
                out("No migrations found.");
                return Ok(());
            }

            let driver = backends::connect(config.dialect, &config.database).await?;
            let migrator = Migrator::new(driver.as_ref(), dialect)
                .with_table_name(config.migrations_table())
                .with_progress(out);
            migration::migrate_with(migrator, &set).await?;
            Ok(())
        }

        Commands::Rollback => {
            let set = MigrationSet::new(project.migrations)?;
            if set.is_empty() {
                out("No migration files found.");
                return Ok(());
            }

            let driver = backends::connect(config.dialect, &config.database).await?;
            let migrator = Migrator::new(driver.as_ref(), dialect)
                .with_table_name(config.migrations_table())
                .with_progress(out);
            migration::rollback_with(migrator, &set).await?;
            Ok(())
        }

        Commands::Seed => {
            let set = SeedSet::new(project.seeds)?;
            if set.is_empty() {
                out("No seeders found.");
                return Ok(());
            }

            let driver = backends::connect(config.dialect, &config.database).await?;
            let seeder = Seeder::new(driver.as_ref(), dialect).with_progress(out);
            seed::seed_with(seeder, &set).await?;
            Ok(())
        }

        Commands::Status => {
            let set = MigrationSet::new(project.migrations)?;
            if set.is_empty() {
                out("No migrations found.");
                return Ok(());
            }

            let driver = backends::connect(config.dialect, &config.database).await?;
            let migrator =
                Migrator::new(driver.as_ref(), dialect).with_table_name(config.migrations_table());
            let status = migrator.status(&set).await;
            let status = migration::release(driver.as_ref(), status).await?;

            for unit in status {
                let line = match (unit.status, unit.applied_at) {
                    (MigrationStatus::Applied, Some(at)) => {
                        format!("[applied] {} ({})", unit.name, at.to_rfc3339())
                    }
                    (MigrationStatus::Applied, None) => format!("[applied] {}", unit.name),
                    (MigrationStatus::Pending, _) => format!("[pending] {}", unit.name),
                };
                out(&line);
            }
            Ok(())
        }
    }
}
