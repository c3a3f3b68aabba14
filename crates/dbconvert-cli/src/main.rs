//! dbconvert CLI - SQL dialect conversion between Oracle, SQL Server, MySQL and PostgreSQL.

use clap::{Parser, Subcommand, ValueEnum};
use dbconvert::dialect::map_data_type;
use dbconvert::schema::{terminate, ObjectType};
use dbconvert::{
    function, ConversionOptions, ConvertError, DatabaseType, InfoType, TranslateEngine,
    TranslateObject,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

#[derive(Parser)]
#[command(name = "dbconvert")]
#[command(about = "SQL dialect conversion between Oracle, SQL Server, MySQL and PostgreSQL")]
#[command(version)]
struct Cli {
    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "warn")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate views, routines and triggers to another dialect
    Translate {
        /// Source dialect (oracle, sqlserver, mysql, postgres)
        #[arg(long, value_parser = parse_dialect)]
        from: DatabaseType,

        /// Target dialect (oracle, sqlserver, mysql, postgres)
        #[arg(long, value_parser = parse_dialect)]
        to: DatabaseType,

        /// Kind of object in each input file
        #[arg(long, value_enum, default_value = "auto")]
        kind: ObjectKind,

        /// Keep translating after a file fails
        #[arg(long)]
        continue_on_error: bool,

        /// Leave declarations where they appear instead of hoisting them
        #[arg(long)]
        no_hoist: bool,

        /// Write the translated script to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Input files, one object per file; stdin when omitted
        files: Vec<PathBuf>,
    },

    /// Translate the function calls of a single expression
    Function {
        #[arg(long, value_parser = parse_dialect)]
        from: DatabaseType,

        #[arg(long, value_parser = parse_dialect)]
        to: DatabaseType,

        /// Expression text, e.g. "NVL(a, 0)"
        expression: String,
    },

    /// Map a column data type to another dialect
    MapType {
        #[arg(long, value_parser = parse_dialect)]
        from: DatabaseType,

        #[arg(long, value_parser = parse_dialect)]
        to: DatabaseType,

        /// Data type text, e.g. "NVARCHAR(50)"
        data_type: String,
    },

    /// Load and validate a conversion options file
    CheckConfig {
        /// Path to YAML options file
        #[arg(default_value = "dbconvert.yaml")]
        path: PathBuf,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ObjectKind {
    /// Read the kind from the CREATE header
    Auto,
    View,
    Procedure,
    Function,
    Trigger,
}

impl ObjectKind {
    fn object_type(self) -> Option<ObjectType> {
        match self {
            ObjectKind::Auto => None,
            ObjectKind::View => Some(ObjectType::View),
            ObjectKind::Procedure => Some(ObjectType::Procedure),
            ObjectKind::Function => Some(ObjectType::Function),
            ObjectKind::Trigger => Some(ObjectType::Trigger),
        }
    }
}

fn parse_dialect(s: &str) -> Result<DatabaseType, String> {
    s.parse::<DatabaseType>().map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<ExitCode, ConvertError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format);

    match cli.command {
        Commands::Translate {
            from,
            to,
            kind,
            continue_on_error,
            no_hoist,
            output,
            files,
        } => {
            let objects = read_objects(&files, kind)?;
            info!("Translating {} objects from {} to {}", objects.len(), from, to);

            let cancel_token = setup_signal_handler();
            let mut engine = TranslateEngine::new(from, to)
                .with_continue_on_error(continue_on_error)
                .with_hoist_declarations(!no_hoist);
            let summary = engine.translate_all(&objects, &cancel_token).await?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                let script = summary
                    .succeeded()
                    .filter_map(|r| r.script.as_deref())
                    .map(|s| terminate(to, s))
                    .collect::<Vec<_>>()
                    .join("\n\n");
                match output {
                    Some(path) => {
                        write_atomic(&path, &script)?;
                        eprintln!("Wrote {} objects to {:?}", summary.succeeded().count(), path);
                    }
                    None => println!("{}", script),
                }
                for failure in summary.failure_messages() {
                    eprintln!("Failed: {}", failure);
                }
            }

            Ok(match summary.status {
                InfoType::Information => ExitCode::SUCCESS,
                InfoType::Warning => ExitCode::from(4),
                InfoType::Error => ExitCode::from(3),
            })
        }

        Commands::Function { from, to, expression } => {
            println!("{}", function::translate(&expression, from, to));
            Ok(ExitCode::SUCCESS)
        }

        Commands::MapType { from, to, data_type } => {
            let mapping = map_data_type(from, to, &data_type);
            if cli.output_json {
                println!(
                    "{}",
                    serde_json::json!({
                        "source": data_type,
                        "target": mapping.target_type,
                        "lossy": mapping.is_lossy,
                    })
                );
            } else {
                println!("{}", mapping.target_type);
                if mapping.is_lossy {
                    eprintln!("Warning: {} cannot hold every {} value exactly", mapping.target_type, data_type);
                }
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::CheckConfig { path } => {
            let options = ConversionOptions::load(&path)?;
            info!("Loaded configuration from {:?}", path);
            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&options)?);
            } else {
                println!("Configuration is valid: {:?}", path);
                println!("  Mode: {}", options.generate_script_mode.as_str());
                println!("  Execute on target: {}", options.execute_script_on_target_server);
                println!("  Continue on error: {}", options.continue_on_error_occurs);
                println!("  Batch size: {}", options.data_batch_size);
                println!("  Schema mappings: {}", options.schema_mappings.len());
                println!("  Table name mappings: {}", options.table_name_mappings.len());
                println!("  Hash: {}", options.hash());
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Build one translation object per input file, or one from stdin.
fn read_objects(files: &[PathBuf], kind: ObjectKind) -> Result<Vec<TranslateObject>, ConvertError> {
    let inputs = if files.is_empty() {
        let text = std::io::read_to_string(std::io::stdin())?;
        vec![("stdin".to_string(), text)]
    } else {
        files
            .iter()
            .map(|path| {
                let text = std::fs::read_to_string(path)?;
                let name = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                Ok((name, text))
            })
            .collect::<Result<Vec<_>, ConvertError>>()?
    };

    inputs
        .into_iter()
        .map(|(name, text)| {
            let object_type = match kind.object_type() {
                Some(t) => t,
                None => detect_object_type(&text).ok_or_else(|| {
                    ConvertError::Config(format!(
                        "cannot tell the object kind of '{}' from its header; pass --kind",
                        name
                    ))
                })?,
            };
            debug!(object = %name, kind = %object_type, "read input");
            Ok(TranslateObject::new(object_type, "", name, text))
        })
        .collect()
}

/// Object kind named by a `CREATE ... VIEW|PROCEDURE|FUNCTION|TRIGGER` header.
fn detect_object_type(text: &str) -> Option<ObjectType> {
    let mut words = text.split_whitespace().map(|w| w.to_ascii_uppercase());
    if words.next().as_deref() != Some("CREATE") {
        return None;
    }
    // OR REPLACE, DEFINER=..., ALGORITHM=... and similar modifiers come first.
    words.take(6).find_map(|w| match w.as_str() {
        "VIEW" => Some(ObjectType::View),
        "PROCEDURE" | "PROC" => Some(ObjectType::Procedure),
        "FUNCTION" => Some(ObjectType::Function),
        "TRIGGER" => Some(ObjectType::Trigger),
        _ => None,
    })
}

/// Write through a temp file and rename, so readers never see a partial script.
fn write_atomic(path: &Path, content: &str) -> Result<(), ConvertError> {
    let temp_path = path.with_extension("tmp");
    std::fs::write(&temp_path, content)?;
    std::fs::rename(&temp_path, path)?;
    Ok(())
}

fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    // Logs go to stderr; stdout carries the translated script.
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
}

/// Cancel the returned token on SIGINT (Ctrl-C) or SIGTERM.
#[cfg(unix)]
fn setup_signal_handler() -> CancellationToken {
    let cancel_token = CancellationToken::new();

    for kind in [SignalKind::interrupt(), SignalKind::terminate()] {
        let token = cancel_token.clone();
        match signal(kind) {
            Ok(mut stream) => {
                tokio::spawn(async move {
                    stream.recv().await;
                    eprintln!("\nReceived signal. Stopping after the current object...");
                    token.cancel();
                });
            }
            Err(e) => tracing::warn!("Failed to install signal handler: {}", e),
        }
    }

    cancel_token
}

/// Cancel the returned token on Ctrl-C.
#[cfg(not(unix))]
fn setup_signal_handler() -> CancellationToken {
    let cancel_token = CancellationToken::new();
    let token = cancel_token.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nReceived Ctrl-C. Stopping after the current object...");
            token.cancel();
        }
    });

    cancel_token
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_object_type_from_header() {
        assert_eq!(
            detect_object_type("CREATE OR REPLACE PROCEDURE p AS BEGIN NULL; END;"),
            Some(ObjectType::Procedure)
        );
        assert_eq!(
            detect_object_type("create definer=`root`@`%` function f() returns int return 1"),
            Some(ObjectType::Function)
        );
        assert_eq!(detect_object_type("CREATE VIEW v AS SELECT 1"), Some(ObjectType::View));
        assert_eq!(detect_object_type("BEGIN NULL; END;"), None);
    }

    #[test]
    fn test_parse_dialect_aliases() {
        assert_eq!(parse_dialect("mssql").unwrap(), DatabaseType::SqlServer);
        assert_eq!(parse_dialect("pg").unwrap(), DatabaseType::Postgres);
        assert!(parse_dialect("db2").is_err());
    }
}
