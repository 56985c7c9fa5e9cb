use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use shopsql_adapter::{AdminDatabase, AdminTable};
use shopsql_client::{DEFAULT_CONFIG_FILE, EntityRegistry, HttpAdminApi, ShopConfig};
use shopsql_core::{Database, QueryContext, Row, Table, TableDefinition, delete_matching, scan};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Output format of row listings.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliOutputFormat {
    Json,
    Table,
}

#[derive(Debug, Parser)]
#[command(name = "shopsql")]
#[command(about = "Query and bulk-delete shop entities as SQL tables")]
#[command(version)]
struct Cli {
    /// Project configuration file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    /// Read the entity schema from a saved entity-schema.json instead of the shop.
    #[arg(long, global = true)]
    schema_file: Option<PathBuf>,
    /// Enable debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List all tables.
    Tables,
    /// Show the columns of a table.
    Describe(DescribeArgs),
    /// Print the rows of a table.
    Select(SelectArgs),
    /// Delete matching rows locally and in the shop.
    Delete(DeleteArgs),
}

#[derive(Debug, Args)]
struct DescribeArgs {
    /// Table name (case-insensitive).
    table: String,
}

#[derive(Debug, Args)]
struct SelectArgs {
    /// Table name (case-insensitive).
    table: String,
    /// Maximum number of rows to print.
    #[arg(long)]
    limit: Option<usize>,
    /// Output format.
    #[arg(long, default_value = "table")]
    format: CliOutputFormat,
}

#[derive(Debug, Args)]
struct DeleteArgs {
    /// Table name (case-insensitive).
    table: String,
    /// Column filter as `column=value`; repeat to require several matches.
    #[arg(long = "where", value_name = "COLUMN=VALUE", required = true)]
    filters: Vec<String>,
    /// Only report how many rows would be deleted.
    #[arg(long)]
    dry_run: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match &cli.command {
        Command::Tables => run_tables(&cli),
        Command::Describe(args) => run_describe(&cli, args),
        Command::Select(args) => run_select(&cli, args),
        Command::Delete(args) => run_delete(&cli, args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("shopsql=debug,shopsql_client=debug,shopsql_adapter=debug")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

// ---------------------------------------------------------------------------
// Schema commands
// ---------------------------------------------------------------------------

fn run_tables(cli: &Cli) -> Result<(), String> {
    let registry = load_registry(cli)?;
    for (name, definition) in registry.table_definitions() {
        let marker = if definition.is_mapping { " (mapping)" } else { "" };
        println!("{name}{marker}");
    }
    Ok(())
}

fn run_describe(cli: &Cli, args: &DescribeArgs) -> Result<(), String> {
    let registry = load_registry(cli)?;
    let definitions = registry.table_definitions();
    let wanted = args.table.to_ascii_lowercase();
    let definition = definitions
        .values()
        .find(|d| d.name.to_ascii_lowercase() == wanted)
        .ok_or_else(|| format!("table not found: {}", args.table))?;
    print_definition(definition);
    Ok(())
}

fn print_definition(definition: &TableDefinition) {
    println!("Table: {}", definition.name);
    if definition.is_mapping {
        println!("Mapping entity: yes");
    }
    let width = definition
        .columns
        .iter()
        .map(|c| c.name.len())
        .max()
        .unwrap_or(0);
    for column in &definition.columns {
        let mut notes = Vec::new();
        if column.primary_key {
            notes.push("PRIMARY KEY".to_string());
        }
        if !column.nullable {
            notes.push("NOT NULL".to_string());
        }
        if let Some(comment) = &column.comment {
            notes.push(format!("-- {comment}"));
        }
        println!(
            "  {:<width$}  {:<8} {}",
            column.name,
            column.column_type.sql_name(),
            notes.join(" ")
        );
    }
}

// ---------------------------------------------------------------------------
// Row commands
// ---------------------------------------------------------------------------

fn run_select(cli: &Cli, args: &SelectArgs) -> Result<(), String> {
    let ctx = QueryContext::new();
    let table = open_table(cli, &ctx, &args.table)?;
    let mut rows = scan(&table, &ctx).map_err(|e| format!("Failed to read {}: {e}", args.table))?;
    if let Some(limit) = args.limit {
        rows.truncate(limit);
    }

    match args.format {
        CliOutputFormat::Json => {
            let objects: Vec<BTreeMap<&str, serde_json::Value>> = rows
                .iter()
                .map(|row| row_object(&table, row))
                .collect();
            let text = serde_json::to_string_pretty(&objects)
                .map_err(|e| format!("Failed to serialize rows: {e}"))?;
            println!("{text}");
        }
        CliOutputFormat::Table => print_rows(&table, &rows),
    }
    Ok(())
}

fn run_delete(cli: &Cli, args: &DeleteArgs) -> Result<(), String> {
    let ctx = QueryContext::new();
    let table = open_table(cli, &ctx, &args.table)?;
    let filters = parse_filters(table.definition(), &args.filters)?;
    let matches = |row: &Row| {
        filters
            .iter()
            .all(|(index, value)| row.get(*index).is_some_and(|v| v.to_string() == *value))
    };

    if args.dry_run {
        let rows = scan(&table, &ctx).map_err(|e| format!("Failed to read {}: {e}", args.table))?;
        let count = rows.iter().filter(|&row| matches(row)).count();
        println!("Would delete {count} rows from {}.", table.name());
        return Ok(());
    }

    let deleted = delete_matching(&table, &ctx, matches)
        .map_err(|e| format!("Delete from {} failed: {e}", args.table))?;
    println!("Deleted {deleted} rows from {}.", table.name());
    Ok(())
}

/// Resolves `column=value` filters to column ordinals.
fn parse_filters(definition: &TableDefinition, raw: &[String]) -> Result<Vec<(usize, String)>, String> {
    raw.iter()
        .map(|filter| {
            let (column, value) = filter
                .split_once('=')
                .ok_or_else(|| format!("invalid filter '{filter}': expected COLUMN=VALUE"))?;
            let index = definition
                .index_of(column.trim())
                .ok_or_else(|| format!("unknown column '{}' in {}", column.trim(), definition.name))?;
            Ok((index, value.to_string()))
        })
        .collect()
}

fn row_object<'a>(table: &'a AdminTable, row: &Row) -> BTreeMap<&'a str, serde_json::Value> {
    table
        .schema()
        .iter()
        .zip(row.values())
        .map(|(column, value)| (column.name.as_str(), value.to_json()))
        .collect()
}

fn print_rows(table: &AdminTable, rows: &[Row]) {
    let headers: Vec<&str> = table.schema().iter().map(|c| c.name.as_str()).collect();
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.values().iter().map(ToString::to_string).collect())
        .collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, header)| {
            cells
                .iter()
                .filter_map(|row| row.get(i))
                .map(|cell| cell.chars().count())
                .chain(std::iter::once(header.len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |values: Vec<&str>| {
        values
            .iter()
            .zip(&widths)
            .map(|(value, &width)| format!("{value:<width$}"))
            .collect::<Vec<_>>()
            .join(" | ")
    };

    println!("{}", line(headers.clone()));
    println!(
        "{}",
        widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("-+-")
    );
    for row in &cells {
        println!("{}", line(row.iter().map(String::as_str).collect()));
    }
    println!("({} rows)", rows.len());
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn load_config(cli: &Cli) -> Result<ShopConfig, String> {
    let config = ShopConfig::load(&cli.config)
        .map_err(|e| format!("Failed to load config '{}': {e}", cli.config.display()))?;
    config
        .validate()
        .map_err(|e| format!("Invalid config '{}': {e}", cli.config.display()))?;
    Ok(config)
}

/// Loads the entity registry from `--schema-file` if given, otherwise from
/// the shop configured in `--config`.
fn load_registry(cli: &Cli) -> Result<EntityRegistry, String> {
    if let Some(path) = &cli.schema_file {
        debug!(path = %path.display(), "reading entity schema from file");
        return EntityRegistry::from_file(path)
            .map_err(|e| format!("Failed to read schema file '{}': {e}", path.display()));
    }
    let config = load_config(cli)?;
    let api = HttpAdminApi::new(&config).map_err(|e| format!("Failed to create API client: {e}"))?;
    EntityRegistry::load(&api, &QueryContext::new())
        .map_err(|e| format!("Failed to load entity schema: {e}"))
}

fn open_table(cli: &Cli, ctx: &QueryContext, name: &str) -> Result<AdminTable, String> {
    let config = load_config(cli)?;
    let api = Arc::new(
        HttpAdminApi::new(&config).map_err(|e| format!("Failed to create API client: {e}"))?,
    );
    let db = match &cli.schema_file {
        Some(_) => {
            let registry = load_registry(cli)?;
            AdminDatabase::new(&config.adapter.database_name, &registry, api, &config.adapter)
        }
        None => AdminDatabase::connect(api, ctx, &config.adapter)
            .map_err(|e| format!("Failed to load entity schema: {e}"))?,
    };
    db.table_insensitive(ctx, name).map_err(|e| e.to_string())
}
