//! ddlgen: generate Go data access code from SQL DDL
//!
//! # Usage
//!
//! ```bash
//! # Generate models for every .sql file under ./model
//! ddlgen model --src model
//!
//! # Separate source and destination, mongo driver
//! ddlgen model --src sql,legacy/sql --dst model --driver mongodb
//!
//! # Show what a statement file parses into
//! ddlgen inspect model/user.sql
//! ```

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use ddlgen::config::CONFIG_ENV;
use ddlgen::generate::read_schema;
use ddlgen::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ddlgen")]
#[command(version)]
#[command(about = "Generate Go data access code from SQL DDL", long_about = None)]
#[command(after_help = "EXAMPLES:
    ddlgen model --src model
    ddlgen model --src sql --dst model --driver mongodb --force
    ddlgen inspect model/user.sql --format json")]
struct Cli {
    /// Config file (default: ./ddlgen.toml, then the user config dir)
    #[arg(long, global = true, env = CONFIG_ENV)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum DriverArg {
    Postgres,
    Mongodb,
}

impl From<DriverArg> for Driver {
    fn from(arg: DriverArg) -> Self {
        match arg {
            DriverArg::Postgres => Driver::Postgres,
            DriverArg::Mongodb => Driver::Mongodb,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Pretty,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate internal, custom and registry files
    Model {
        /// Source roots, comma separated
        #[arg(short, long, value_delimiter = ',')]
        src: Vec<PathBuf>,

        /// Destination root (default: the first source root)
        #[arg(short, long)]
        dst: Option<PathBuf>,

        /// Target store
        #[arg(long, value_enum)]
        driver: Option<DriverArg>,

        /// Overwrite existing custom files
        #[arg(short, long)]
        force: bool,
    },
    /// Parse one statement file and print its schema
    Inspect {
        file: PathBuf,

        #[arg(long, value_enum, default_value = "pretty")]
        format: OutputFormat,
    },
    /// Print the effective SQL -> Go type table
    Types,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = dispatch(&cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "ddlgen=debug" } else { "ddlgen=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn dispatch(cli: &Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref()).context("loading config")?;
    let types = TypeMap::with_overrides(&config.types);

    match &cli.command {
        Commands::Model {
            src,
            dst,
            driver,
            force,
        } => generate_models(config, types, src, dst.as_deref(), *driver, *force, cli.verbose),
        Commands::Inspect { file, format } => inspect(file, *format, &types),
        Commands::Types => {
            show_types(&types);
            Ok(())
        }
    }
}

fn generate_models(
    config: Config,
    types: TypeMap,
    src: &[PathBuf],
    dst: Option<&Path>,
    driver: Option<DriverArg>,
    force: bool,
    verbose: bool,
) -> Result<()> {
    let model = config.model;
    let src = if src.is_empty() { model.src } else { src.to_vec() };
    let Some(first) = src.first() else {
        anyhow::bail!("no source roots. Use --src or set [model] src in ddlgen.toml");
    };
    let dst = dst
        .map(Path::to_path_buf)
        .or(model.dst)
        .unwrap_or_else(|| first.clone());

    let mut options = GenerateOptions::new(src, dst);
    options.driver = driver.map(Driver::from).or(model.driver).unwrap_or_default();
    options.force = force || model.force;
    options.module = model.module;
    options.db_package = model.db_package;
    options.template_dir = model.template_dir;
    options.format_command = model.format_command;
    options.types = types;

    if verbose {
        println!(
            "{} {} -> {} ({})",
            "Input:".dimmed(),
            options
                .src
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
                .yellow(),
            options.dst.display().to_string().yellow(),
            options.driver
        );
    }

    let report = run(&options).context("generating models")?;
    for path in &report.written {
        println!("{} {}", "✓".green(), path.display().to_string().cyan());
    }
    for path in &report.skipped {
        println!(
            "{} {} {}",
            "•".dimmed(),
            path.display().to_string().white(),
            "(exists, use --force to overwrite)".dimmed()
        );
    }
    println!();
    println!(
        "{} schema(s), {} file(s) written, {} skipped",
        report.schemas.to_string().cyan(),
        report.written.len().to_string().cyan(),
        report.skipped.len().to_string().cyan()
    );
    Ok(())
}

fn inspect(file: &Path, format: OutputFormat, types: &TypeMap) -> Result<()> {
    let schema = read_schema(file, types)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }
        OutputFormat::Pretty => print_schema(&schema),
    }
    Ok(())
}

fn print_schema(schema: &Schema) {
    println!(
        "{} {} {}",
        "Table:".green().bold(),
        schema.table_name.white().bold(),
        format!("({})", schema.sql_name).dimmed()
    );
    println!();

    let name_width = schema.fields.iter().map(|f| f.name.len()).max().unwrap_or(0).max(4);
    let type_width = schema.fields.iter().map(|f| f.go_type.len()).max().unwrap_or(0).max(4);
    println!(
        "  {:name_width$} {:type_width$} {}",
        "Name".white().bold(),
        "Type".white().bold(),
        "Tag".white().bold(),
    );
    println!("  {}", "─".repeat(name_width + type_width + 40).dimmed());
    for field in &schema.fields {
        let mut line = format!(
            "  {:name_width$} {:type_width$} {}",
            field.name.cyan(),
            field.go_type.yellow(),
            field.tag
        );
        if !field.comment.is_empty() {
            line.push_str(&format!(" {}", format!("// {}", field.comment).dimmed()));
        }
        println!("{}", line);
    }

    if let Some(pk) = schema.primary
        && let Some(field) = schema.primary_field()
    {
        println!();
        let mut flags = Vec::new();
        if pk.autoincrement {
            flags.push("autoincrement");
        }
        if pk.short_id {
            flags.push("short id");
        }
        println!(
            "{} {} {}",
            "Primary key:".green().bold(),
            field.name.cyan(),
            flags.join(", ").dimmed()
        );
    }

    if !schema.indexes.is_empty() {
        println!();
        println!("{}", "Indexes:".green().bold());
        for index in &schema.indexes {
            let columns: Vec<&str> = index
                .fields
                .iter()
                .map(|&p| schema.fields[p].column.as_str())
                .collect();
            println!(
                "  {} {} ({})",
                index.kind.tag_key().yellow(),
                schema.index_name(index).white(),
                columns.join(", ")
            );
        }
    }
}

fn show_types(types: &TypeMap) {
    println!("{}", "SQL → Go types".cyan().bold());
    println!();
    let width = types.iter().map(|(sql, _)| sql.len()).max().unwrap_or(0);
    for (sql, go) in types.iter() {
        println!("  {:width$}  {}", sql.white(), go.yellow());
    }
    println!();
    println!(
        "  {} {}",
        "deleted_at".white(),
        "is always gorm.DeletedAt".dimmed()
    );
}
