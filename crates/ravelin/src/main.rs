//! Ravelin proxy-bundle document toolkit.
//!
//! Transcodes gateway policy documents between XML and YAML and inlines
//! multi-file `$ref` graphs into standalone documents.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use ravelin_doctree::{
    node_to_json_text, node_to_yaml_text, resolve_refs, xml_text_to_yaml_text, yaml_text_to_xml_text,
    yaml_to_node, DocError, ResolveOptions,
};

mod io;

#[derive(Parser, Debug)]
#[command(name = "ravelin", about = "Proxy bundle document toolkit", version)]
struct Cli {
    /// Log filter (RUST_LOG takes precedence).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert an XML document to YAML.
    XmlToYaml {
        /// Input file, or '-' for stdin.
        #[arg(short, long, default_value = "-")]
        input: String,

        /// Output file, or '-' for stdout.
        #[arg(short, long, default_value = "-")]
        output: String,
    },

    /// Convert a YAML document to XML.
    YamlToXml {
        /// Input file, or '-' for stdin.
        #[arg(short, long, default_value = "-")]
        input: String,

        /// Output file, or '-' for stdout.
        #[arg(short, long, default_value = "-")]
        output: String,
    },

    /// Inline every `$ref` reachable from a YAML document.
    ///
    /// Relative reference paths resolve against the referencing file; with
    /// stdin input they resolve against the working directory. An output
    /// path ending in .json switches the rendering to JSON.
    ResolveRefs {
        /// Input file, or '-' for stdin.
        #[arg(short, long, default_value = "-")]
        input: String,

        /// Output file, or '-' for stdout.
        #[arg(short, long, default_value = "-")]
        output: String,

        /// Replace cyclic references with placeholders instead of failing.
        #[arg(long)]
        allow_cycles: bool,
    },
}

fn run_xml_to_yaml(input: &str, output: &str) -> Result<(), DocError> {
    debug!(input, output, "xml-to-yaml");
    let text = io::read_input_text(input)?;
    io::write_output_text(output, &xml_text_to_yaml_text(&text)?)
}

fn run_yaml_to_xml(input: &str, output: &str) -> Result<(), DocError> {
    debug!(input, output, "yaml-to-xml");
    let text = io::read_input_text(input)?;
    io::write_output_text(output, &yaml_text_to_xml_text(&text)?)
}

fn run_resolve_refs(input: &str, output: &str, allow_cycles: bool) -> Result<(), DocError> {
    debug!(input, output, allow_cycles, "resolve-refs");
    let text = io::read_input_text(input)?;
    let node = yaml_to_node(&text)?;

    // stdin has no directory of its own; a placeholder name in the working
    // directory gives relative references a sensible base
    let root_file = if io::is_std(input) {
        PathBuf::from("stdin.yaml")
    } else {
        PathBuf::from(input)
    };
    let options = ResolveOptions {
        allow_cycles,
        resolve_root_refs: true,
    };
    let resolved = resolve_refs(&node, &root_file, &options)?;

    let rendered = if output.ends_with(".json") {
        node_to_json_text(&resolved)?
    } else {
        node_to_yaml_text(&resolved)?
    };
    io::write_output_text(output, &rendered)
}

/// Keep multi-cycle reports readable on pathological bundles.
const MAX_ERROR_LINES: usize = 20;

fn report(err: &DocError) {
    let text = err.to_string();
    let mut lines = text.lines();
    for line in lines.by_ref().take(MAX_ERROR_LINES) {
        eprintln!("error: {line}");
    }
    let truncated = lines.count();
    if truncated > 0 {
        eprintln!("error: ... and {truncated} more");
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let layer = fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_filter(filter);
    let _ = tracing_subscriber::registry().with(layer).try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let result = match &cli.command {
        Commands::XmlToYaml { input, output } => run_xml_to_yaml(input, output),
        Commands::YamlToXml { input, output } => run_yaml_to_xml(input, output),
        Commands::ResolveRefs {
            input,
            output,
            allow_cycles,
        } => run_resolve_refs(input, output, *allow_cycles),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::from(1)
        }
    }
}
