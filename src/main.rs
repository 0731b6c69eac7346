use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use zpa_lookup::config::ProviderConfig;
use zpa_lookup::datasource::{AttrValue, ConfigValues, DataSource, Diagnostics};
use zpa_lookup::provider::ZpaProvider;
use zpa_lookup::VERSION;

/// Look up Zscaler Private Access entities by id or name
#[derive(Parser, Debug)]
#[command(name = "zpa-lookup", version, about, long_about = None)]
struct Args {
    /// ZPA cloud (PRODUCTION, BETA, GOV, GOVUS, PREVIEW, ZPATWO)
    #[arg(long)]
    cloud: Option<String>,

    /// Tenant customer ID
    #[arg(long)]
    customer_id: Option<String>,

    /// Scope every lookup to this microtenant
    #[arg(long)]
    microtenant_id: Option<String>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off")]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List data source type names
    List,

    /// Print the schema of a data source
    Schema {
        /// Type name, e.g. zpa_segment_group
        type_name: String,
    },

    /// Read one data source
    Read {
        /// Type name, e.g. zpa_segment_group
        type_name: String,

        #[arg(long)]
        id: Option<String>,

        #[arg(long)]
        name: Option<String>,

        /// Extra attribute as key=value; JSON lists and objects are parsed
        #[arg(long = "set", value_parser = parse_key_value)]
        set: Vec<(String, String)>,

        #[arg(long, value_enum, default_value = "json")]
        output: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Yaml,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}

fn attr_from_cli(value: &str) -> AttrValue {
    let trimmed = value.trim_start();
    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        if let Ok(json) = serde_json::from_str::<Value>(value) {
            return AttrValue::from_json(&json);
        }
    }
    AttrValue::string(value)
}

fn setup_logging(level: LogLevel) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(tracing_level) = level.to_tracing_level() else {
        return Ok(None);
    };

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {:?}", log_path))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("zpa-lookup {} started with log level: {:?}", VERSION, level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("zpa-lookup").join("zpa-lookup.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".zpa-lookup").join("zpa-lookup.log");
    }
    PathBuf::from("zpa-lookup.log")
}

fn print_diagnostics(diags: &Diagnostics) {
    for diag in diags.iter() {
        eprintln!("{}", diag);
    }
}

fn print_value<T: serde::Serialize>(value: &T, format: OutputFormat) -> Result<()> {
    let text = match format {
        OutputFormat::Json => serde_json::to_string_pretty(value).context("Failed to render JSON")?,
        OutputFormat::Yaml => serde_yaml::to_string(value).context("Failed to render YAML")?,
    };
    println!("{}", text.trim_end());
    Ok(())
}

async fn run(args: Args) -> Result<ExitCode> {
    match args.command {
        Command::List => {
            for name in ZpaProvider::data_source_names() {
                println!("{}", name);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Schema { type_name } => {
            let provider = ZpaProvider::new(VERSION);
            let Some(source) = provider.data_source(&type_name) else {
                eprintln!("Error: unknown data source type '{}'", type_name);
                return Ok(ExitCode::FAILURE);
            };
            print_value(&source.schema(), OutputFormat::Json)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Read {
            type_name,
            id,
            name,
            set,
            output,
        } => {
            let mut provider = ZpaProvider::new(VERSION);
            let diags = provider.configure(ProviderConfig {
                cloud: args.cloud,
                customer_id: args.customer_id,
                microtenant_id: args.microtenant_id.clone(),
                ..Default::default()
            });
            if diags.has_error() {
                print_diagnostics(&diags);
                return Ok(ExitCode::FAILURE);
            }

            let mut config = ConfigValues::new();
            if let Some(id) = id {
                config.insert("id".to_string(), AttrValue::String(id));
            }
            if let Some(name) = name {
                config.insert("name".to_string(), AttrValue::String(name));
            }
            for (key, value) in &set {
                config.insert(key.clone(), attr_from_cli(value));
            }

            // the global scope applies to data sources that accept one
            if let (Some(microtenant_id), Some(source)) =
                (&args.microtenant_id, provider.data_source(&type_name))
            {
                if source.schema().attribute("microtenant_id").is_some() {
                    config
                        .entry("microtenant_id".to_string())
                        .or_insert_with(|| AttrValue::string(microtenant_id.as_str()));
                }
            }

            match provider.read(&type_name, &config).await {
                Ok(record) => {
                    print_value(&record, output)?;
                    Ok(ExitCode::SUCCESS)
                }
                Err(diags) => {
                    print_diagnostics(&diags);
                    Ok(ExitCode::FAILURE)
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level)?;

    run(args).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("application_type=INSPECT").unwrap(),
            ("application_type".to_string(), "INSPECT".to_string())
        );
        assert_eq!(
            parse_key_value("search=a=b").unwrap(),
            ("search".to_string(), "a=b".to_string())
        );
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn test_attr_from_cli() {
        assert_eq!(attr_from_cli("123"), AttrValue::string("123"));
        assert_eq!(attr_from_cli("true"), AttrValue::string("true"));
        assert_eq!(
            attr_from_cli("[\"a\"]"),
            AttrValue::List(vec![AttrValue::string("a")])
        );
    }

    #[test]
    fn test_cli_parses_read() {
        let args = Args::try_parse_from([
            "zpa-lookup",
            "--microtenant-id",
            "mt-1",
            "read",
            "zpa_segment_group",
            "--name",
            "web",
            "--output",
            "yaml",
        ])
        .unwrap();
        assert_eq!(args.microtenant_id.as_deref(), Some("mt-1"));
        assert!(matches!(args.command, Command::Read { .. }));
    }
}
