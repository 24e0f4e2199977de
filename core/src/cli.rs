use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::document::Document;
use crate::host::{MemoryHost, WidgetRef};
use crate::interpreter::executor::InvokeOutcome;
use crate::runtime::Runtime;
use crate::types::Scalar;

#[derive(Parser)]
#[command(name = "cue")]
#[command(about = "Cue - run the behavior of declarative UI documents", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Invoke a handler against an in-memory host and print the resulting state
    Run {
        /// Markup or JSON document
        document: PathBuf,

        /// Handler to invoke
        #[arg(short = 'H', long = "handler")]
        handler: String,

        /// Number of invocations
        #[arg(short = 'n', long = "times", default_value = "1")]
        times: usize,

        /// Widget name passed as the sender
        #[arg(long)]
        sender: Option<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parse a document and list its declarations
    Check {
        /// Markup or JSON document
        document: PathBuf,
    },

    /// Print the effective configuration as TOML
    Config,
}

/// State after a `run`, as printed by the CLI
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub outcomes: Vec<InvokeOutcome>,
    pub state: BTreeMap<String, Scalar>,
    pub widgets: BTreeMap<String, BTreeMap<String, String>>,
}

/// Run the CLI by parsing process arguments
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_cli_with_args(cli)
}

/// Run the CLI with provided arguments
pub fn run_cli_from_args(args: Vec<String>) -> Result<()> {
    let cli = Cli::parse_from(args);
    run_cli_with_args(cli)
}

fn run_cli_with_args(cli: Cli) -> Result<()> {
    // Load configuration before any command so config errors surface first
    let config = Config::builder()
        .config_path(cli.config.clone())
        .dotenv(true)
        .build()?;
    init_logging(&config.logging.level);

    match cli.command {
        Commands::Run {
            document,
            handler,
            times,
            sender,
            json,
        } => {
            let source = read_document(&document)?;
            let report = run_document(&source, &handler, times, sender.as_deref(), &config)?;

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&report).context("Failed to render report")?
                );
            } else {
                print!("{}", render_report(&report));
            }
        }

        Commands::Check { document } => {
            let source = read_document(&document)?;
            let parsed = Document::parse(&source)
                .with_context(|| format!("Invalid document {}", document.display()))?;
            print!("{}", render_check(&parsed));
        }

        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

/// Install the fmt subscriber; `RUST_LOG` wins over the configured level
fn init_logging(level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .try_init();
}

fn read_document(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Load `source` into a permissive in-memory host and invoke `handler` `times` times
pub fn run_document(
    source: &str,
    handler: &str,
    times: usize,
    sender: Option<&str>,
    config: &Config,
) -> Result<RunReport> {
    let mut runtime = Runtime::with_config(MemoryHost::permissive(), config.interpreter.clone());
    runtime.load_source(source)?;

    let sender = sender.map(WidgetRef::new);
    let outcomes = (0..times)
        .map(|_| runtime.invoke(handler, sender.as_ref()))
        .collect();

    Ok(RunReport {
        outcomes,
        state: runtime.state_snapshot(),
        widgets: runtime.host().widget_snapshot(),
    })
}

fn render_report(report: &RunReport) -> String {
    let mut out = String::new();

    for (i, outcome) in report.outcomes.iter().enumerate() {
        let line = match outcome {
            InvokeOutcome::Completed => "completed".to_string(),
            InvokeOutcome::Faulted(message) => format!("faulted: {}", message),
            InvokeOutcome::UnknownHandler => "unknown handler".to_string(),
        };
        out.push_str(&format!("Invocation {}: {}\n", i + 1, line));
    }

    out.push_str("\nState:\n");
    if report.state.is_empty() {
        out.push_str("  (empty)\n");
    }
    for (name, value) in &report.state {
        out.push_str(&format!("  {} = {} ({})\n", name, value, value.type_name()));
    }

    if !report.widgets.is_empty() {
        out.push_str("\nWidgets:\n");
        for (widget, props) in &report.widgets {
            for (property, value) in props {
                out.push_str(&format!("  {}.{} = {}\n", widget, property, value));
            }
        }
    }
    out
}

fn render_check(document: &Document) -> String {
    let mut out = String::new();
    if let Some(hash) = &document.version_hash {
        out.push_str(&format!("Version: {}\n", &hash[..12.min(hash.len())]));
    }

    out.push_str(&format!("Variables ({}):\n", document.variables.len()));
    for decl in &document.variables {
        out.push_str(&format!(
            "  {} = {} ({})\n",
            decl.name,
            decl.value,
            decl.value.type_name()
        ));
    }

    out.push_str(&format!("Handlers ({}):\n", document.handlers.len()));
    for handler in &document.handlers {
        out.push_str(&format!(
            "  {} ({} commands)\n",
            handler.name,
            handler.body.len()
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"
        <App>
            <Variable name="cnt" value="0" />
            <Handler name="Add">
                <Increment var="cnt" />
                <Set target="lbl" property="Text" value="{cnt}" />
            </Handler>
        </App>
    "#;

    #[test]
    fn test_cli_parses_run_arguments() {
        let cli = Cli::try_parse_from(["cue", "run", "app.xml", "-H", "Add", "-n", "3", "--json"])
            .unwrap();
        match cli.command {
            Commands::Run {
                document,
                handler,
                times,
                json,
                sender,
            } => {
                assert_eq!(document, PathBuf::from("app.xml"));
                assert_eq!(handler, "Add");
                assert_eq!(times, 3);
                assert!(json);
                assert!(sender.is_none());
            }
            _ => panic!("Expected run command"),
        }
    }

    #[test]
    fn test_run_document_report() {
        let report = run_document(DOC, "Add", 2, None, &Config::default()).unwrap();

        assert_eq!(report.outcomes, vec![InvokeOutcome::Completed; 2]);
        assert_eq!(report.state.get("cnt"), Some(&Scalar::Float(2.0)));
        assert_eq!(report.widgets["lbl"]["Text"], "2");

        let text = render_report(&report);
        assert!(text.contains("Invocation 2: completed"));
        assert!(text.contains("cnt = 2 (float)"));
        assert!(text.contains("lbl.Text = 2"));
    }

    #[test]
    fn test_run_report_json_shape() {
        let report = run_document(DOC, "Missing", 1, None, &Config::default()).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["outcomes"][0]["status"], "unknown_handler");
        assert_eq!(json["state"]["cnt"], 0);
    }

    #[test]
    fn test_render_check() {
        let document = Document::parse(DOC).unwrap();
        let text = render_check(&document);
        assert!(text.starts_with("Version: "));
        assert!(text.contains("cnt = 0 (int)"));
        assert!(text.contains("Add (2 commands)"));
    }
}
