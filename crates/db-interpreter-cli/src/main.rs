//! dbinterp CLI - Dialect-aware schema and data scripting.

use clap::{Parser, Subcommand};
use db_interpreter::{
    translate_snapshot, Config, ConvertPlan, DbConnection, DbConverter, DbInterpreter, Dialect,
    DialectImpl, FeedbackInfo, GeneratedScript, InterpretError, ProgressSink, QueryExecutor,
    SchemaInfo, SchemaInfoFilter,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

#[derive(Parser)]
#[command(name = "dbinterp")]
#[command(about = "Dialect-aware schema and data scripting for MySQL, PostgreSQL and SQL Server")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    /// Print progress updates as JSON lines to stderr
    #[arg(long)]
    progress: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the schema script of the source database
    Schema {
        /// Render for this dialect instead of the source's (mysql, postgres, mssql)
        #[arg(long)]
        target_dialect: Option<String>,

        /// Comma-separated list of tables to include
        #[arg(long, value_delimiter = ',')]
        tables: Vec<String>,

        /// Write the script into this folder
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Dump the schema snapshot as JSON instead of a script
        #[arg(long)]
        json: bool,
    },

    /// Generate INSERT data scripts from the source database
    Data {
        /// Render for this dialect instead of the source's (mysql, postgres, mssql)
        #[arg(long)]
        target_dialect: Option<String>,

        /// Comma-separated list of tables to include
        #[arg(long, value_delimiter = ',')]
        tables: Vec<String>,

        /// Write the script into this folder
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Convert the source schema (and data) into the target database
    Convert {
        /// Comma-separated list of tables to include
        #[arg(long, value_delimiter = ',')]
        tables: Vec<String>,

        /// Execute the generated schema script on the target
        #[arg(long)]
        execute: bool,

        /// Skip the data transfer
        #[arg(long)]
        no_data: bool,

        /// Log and count failing statements instead of aborting
        #[arg(long)]
        skip_script_error: bool,

        /// Write the schema script into this folder
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List databases on the source server
    Databases,

    /// Test database connections
    HealthCheck,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), InterpretError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format).map_err(InterpretError::Config)?;

    let mut config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    // SIGINT and SIGTERM cancel every long-running call
    let cancel_token = setup_signal_handler();

    match cli.command {
        Commands::Schema {
            target_dialect,
            tables,
            output,
            json,
        } => {
            apply_output(&mut config, output);
            let mut source = open(&config, Side::Source, &cancel_token, cli.progress).await?;
            let schema = source.get_schema_info(&table_filter(tables)).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&schema)?);
                return Ok(());
            }

            let (renderer, schema) = retarget(source, schema, target_dialect.as_deref(), &config)?;
            let script = renderer.generate_schema_scripts(&schema).await?;
            report_script(&script, cli.output_json)?;
        }

        Commands::Data {
            target_dialect,
            tables,
            output,
        } => {
            apply_output(&mut config, output);
            let mut source = open(&config, Side::Source, &cancel_token, cli.progress).await?;
            let schema = source.get_schema_info(&table_filter(tables)).await?;

            let script = match target_dialect {
                Some(name) => {
                    let dialect = DialectImpl::from_config(&name, &config.settings)?;
                    source.generate_data_scripts_for(&schema, &dialect).await?
                }
                None => source.generate_data_scripts(&schema).await?,
            };
            report_script(&script, cli.output_json)?;
        }

        Commands::Convert {
            tables,
            execute,
            no_data,
            skip_script_error,
            output,
        } => {
            apply_output(&mut config, output);
            config.options.skip_script_error |= skip_script_error;

            let source = open(&config, Side::Source, &cancel_token, false).await?;
            let target = open(&config, Side::Target, &cancel_token, cli.progress).await?;
            let mut converter = DbConverter::new(source, target, cancel_token.clone());

            let plan = ConvertPlan {
                tables,
                execute_script: execute,
                transfer_data: !no_data,
            };
            let result = converter.run(&plan).await?;

            if cli.output_json {
                println!("{}", result.to_json()?);
            } else {
                println!("\nConversion {}!", result.status);
                println!("  Run ID: {}", result.run_id);
                println!("  Dialects: {} -> {}", result.source_dialect, result.target_dialect);
                println!("  Duration: {:.2}s", result.duration_seconds);
                println!("  Tables: {}", result.tables_total);
                println!(
                    "  Statements: {} executed, {} failed",
                    result.statements_executed, result.statements_failed
                );
                println!("  Rows: {}", result.rows_transferred);
                if let Some(ref file) = result.script_file {
                    println!("  Script: {}", file.display());
                }
                if !result.lossy_columns.is_empty() {
                    println!("  Lossy columns:");
                    for column in &result.lossy_columns {
                        println!("    {}", column);
                    }
                }
            }

            if result.cancelled {
                return Err(InterpretError::Cancelled);
            }
        }

        Commands::Databases => {
            let mut source = open(&config, Side::Source, &cancel_token, false).await?;
            let databases = source.get_databases().await?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&databases)?);
            } else {
                for database in &databases {
                    println!("{}", database.name);
                }
            }
        }

        Commands::HealthCheck => {
            let source = check_connection(&config, Side::Source).await;
            let target = check_connection(&config, Side::Target).await;
            let healthy = source.connected && target.connected;

            if cli.output_json {
                let report = serde_json::json!({
                    "healthy": healthy,
                    "source": source,
                    "target": target,
                });
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Health Check Results:");
                for (label, check) in [("Source", &source), ("Target", &target)] {
                    println!(
                        "  {} ({}): {} ({}ms)",
                        label,
                        check.dialect,
                        if check.connected { "OK" } else { "FAILED" },
                        check.latency_ms
                    );
                    if let Some(ref err) = check.error {
                        println!("    Error: {}", err);
                    }
                }
                println!("\n  Overall: {}", if healthy { "HEALTHY" } else { "UNHEALTHY" });
            }

            if !healthy {
                return Err(InterpretError::connection(
                    "Health check failed",
                    "dbinterp health-check",
                ));
            }
        }
    }

    Ok(())
}

#[derive(Clone, Copy)]
enum Side {
    Source,
    Target,
}

async fn open(
    config: &Config,
    side: Side,
    cancel: &CancellationToken,
    progress: bool,
) -> Result<DbInterpreter<DbConnection>, InterpretError> {
    let connection = match side {
        Side::Source => &config.source,
        Side::Target => &config.target,
    };
    let mut interpreter = DbInterpreter::connect(connection, &config.settings, config.options.clone())
        .await?
        .with_cancel(cancel.clone());
    if progress {
        interpreter = interpreter.with_progress(Arc::new(JsonProgress));
    }
    Ok(interpreter)
}

fn apply_output(config: &mut Config, output: Option<PathBuf>) {
    if let Some(folder) = output {
        config.options.write_to_file = true;
        config.options.output_folder = folder;
    }
}

fn table_filter(tables: Vec<String>) -> SchemaInfoFilter {
    if tables.is_empty() {
        SchemaInfoFilter::default()
    } else {
        SchemaInfoFilter::tables(tables)
    }
}

/// Rebind the source connection to another dialect for rendering only.
fn retarget(
    source: DbInterpreter<DbConnection>,
    mut schema: SchemaInfo,
    target_dialect: Option<&str>,
    config: &Config,
) -> Result<(DbInterpreter<DbConnection>, SchemaInfo), InterpretError> {
    let Some(name) = target_dialect else {
        return Ok((source, schema));
    };
    let dialect = DialectImpl::from_config(name, &config.settings)?;
    if dialect.name() == source.dialect().name() {
        return Ok((source, schema));
    }

    translate_snapshot(&mut schema, source.dialect().name(), dialect.name())?;
    let database = source.database().to_string();
    let owner = match config.options.target_owner.as_deref() {
        Some(owner) if !owner.is_empty() => owner.to_string(),
        _ if !dialect.default_owner().is_empty() => dialect.default_owner().to_string(),
        _ => database.clone(),
    };
    schema.rehome(&owner);

    let cancel = source.cancel_token().clone();
    let renderer = DbInterpreter::new(
        source.into_executor(),
        dialect,
        config.options.clone(),
        database,
        owner,
    )
    .with_cancel(cancel);
    Ok((renderer, schema))
}

fn report_script(script: &GeneratedScript, output_json: bool) -> Result<(), InterpretError> {
    if output_json {
        let statements = script.builder.statements();
        let report = serde_json::json!({
            "completed": script.completed,
            "file": script.file,
            "statements": statements.iter().map(|s| &s.sql).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if let Some(ref text) = script.text {
        print!("{}", text);
    } else if let Some(ref file) = script.file {
        println!("Script written to {}", file.display());
    }

    if !script.completed {
        return Err(InterpretError::Cancelled);
    }
    Ok(())
}

#[derive(serde::Serialize)]
struct ConnectionCheck {
    dialect: String,
    connected: bool,
    latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

async fn check_connection(config: &Config, side: Side) -> ConnectionCheck {
    let connection = match side {
        Side::Source => &config.source,
        Side::Target => &config.target,
    };
    let start = Instant::now();
    let outcome = async {
        let mut interpreter =
            DbInterpreter::connect(connection, &config.settings, config.options.clone()).await?;
        interpreter.executor_mut().query("SELECT 1").await?;
        Ok::<_, InterpretError>(())
    }
    .await;

    ConnectionCheck {
        dialect: connection.r#type.clone(),
        connected: outcome.is_ok(),
        latency_ms: start.elapsed().as_millis() as u64,
        error: outcome.err().map(|e| e.to_string()),
    }
}

/// Progress events as JSON lines on stderr.
struct JsonProgress;

impl ProgressSink for JsonProgress {
    fn on_feedback(&self, info: &FeedbackInfo) {
        if let Ok(line) = serde_json::to_string(info) {
            eprintln!("{}", line);
        }
    }
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        other => return Err(format!("Unknown verbosity '{}'", other)),
    };

    // Logs go to stderr so scripts on stdout stay clean
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}

/// Cancel the returned token on SIGINT (Ctrl-C) or SIGTERM.
#[cfg(unix)]
fn setup_signal_handler() -> CancellationToken {
    let cancel_token = CancellationToken::new();

    for (kind, label) in [
        (SignalKind::interrupt(), "SIGINT"),
        (SignalKind::terminate(), "SIGTERM"),
    ] {
        let token = cancel_token.clone();
        match signal(kind) {
            Ok(mut stream) => {
                tokio::spawn(async move {
                    stream.recv().await;
                    eprintln!("\nReceived {}. Cancelling...", label);
                    token.cancel();
                });
            }
            Err(e) => eprintln!("Failed to install {} handler: {}", label, e),
        }
    }

    cancel_token
}

/// Windows only delivers Ctrl-C.
#[cfg(not(unix))]
fn setup_signal_handler() -> CancellationToken {
    let cancel_token = CancellationToken::new();
    let token = cancel_token.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nReceived Ctrl-C. Cancelling...");
            token.cancel();
        }
    });

    cancel_token
}
