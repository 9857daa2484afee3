//! metagen CLI - schema validation and SQL artifact generation
//!
//! Loads YAML schema definitions, verifies the model, runs constraint
//! synthesis, and either reports, prints, or writes the results.

use clap::{Parser, Subcommand};
use metagen::error::ConfigError;
use metagen::model::SchemaSet;
use metagen::{loader, sql};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "metagen")]
#[command(version, about = "Metadata-driven schema modeling and code generation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate schema definitions without generating anything
    Validate {
        /// Path to directory containing schema YAML files
        #[arg(short, long, default_value = "config")]
        config: PathBuf,
    },

    /// Print the synthesized SQL artifact listing to stdout
    DumpSql {
        /// Path to directory containing schema YAML files
        #[arg(short, long, default_value = "config")]
        config: PathBuf,
    },

    /// Write one SQL artifact listing per schema
    Generate {
        /// Path to directory containing schema YAML files
        #[arg(short, long, default_value = "config")]
        config: PathBuf,

        /// Output directory for generated listings
        #[arg(short, long, default_value = "generated")]
        output: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    metagen::init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Validate { config } => validate(&config),
        Commands::DumpSql { config } => dump_sql(&config),
        Commands::Generate { config, output } => generate(&config, &output),
    };
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Load, verify, and synthesize the full schema set.
fn load(config: &Path) -> Result<SchemaSet, ConfigError> {
    let set = loader::load_schema_set(config)?;
    sql::post_verify(&set)?;
    Ok(set)
}

fn validate(config: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let set = load(config)?;
    let object_types: usize = set.schemas().iter().map(|s| s.object_types().len()).sum();
    println!(
        "✓ {} schema(s), {} object type(s) validated",
        set.schemas().len(),
        object_types
    );
    Ok(())
}

fn dump_sql(config: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let set = load(config)?;
    print!("{}", sql::script(&set)?);
    Ok(())
}

fn generate(config: &Path, output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let set = load(config)?;

    // Render everything before touching the output directory, so a
    // failure never leaves partial output behind.
    let mut rendered = Vec::new();
    for schema in set.schemas() {
        let listing = sql::schema_script(&set, schema)?;
        rendered.push((output.join(format!("{}.sql", schema.name())), listing));
    }

    fs::create_dir_all(output)?;
    for (path, listing) in rendered {
        fs::write(&path, listing)?;
        println!("  ✓ {}", path.display());
    }
    println!("✨ Generation complete!");
    Ok(())
}
