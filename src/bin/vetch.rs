//! vetch CLI binary entry point.
//!
//! Reads a JSON unit description (stdin by default), runs the built-in
//! analyzers over the described package, and prints diagnostics in text
//! or JSON form. Per-analyzer flags arrive as `-analyzer.flag=value`
//! arguments and are routed to the owning analyzer's pass.

use clap::Parser;
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use vetch::driver::{main_from, DriverOptions};
use vetch::Registry;

/// Static analysis for Go packages: indexed traversal, fact propagation,
/// suggested fixes.
#[derive(Parser)]
#[command(name = "vetch")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Emit diagnostics as JSON on stdout and always exit zero.
    #[arg(long)]
    json: bool,

    /// Print N lines of source context around each diagnostic.
    #[arg(short = 'c', value_name = "N")]
    context: Option<usize>,

    /// List the registered analyzers and their flags, then exit.
    #[arg(long)]
    list: bool,

    /// Unit description file (defaults to stdin).
    unit: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let analyzers = vetch::checks::default_analyzers();
    let registry = match Registry::new(&analyzers) {
        Ok(r) => r,
        Err(err) => {
            eprintln!("vetch: {err}");
            return ExitCode::from(2);
        }
    };

    // Per-analyzer flags are split off before clap sees the arguments.
    let mut flags = HashMap::new();
    let mut rest = Vec::new();
    for arg in std::env::args() {
        match split_analyzer_flag(&arg) {
            Some((key, value)) => {
                let (analyzer, flag) = key.split_once('.').unwrap_or((key, ""));
                let known = registry
                    .get(analyzer)
                    .is_some_and(|a| a.flags.iter().any(|f| f.name == flag));
                if !known {
                    eprintln!("vetch: unknown analyzer flag -{key}");
                    return ExitCode::from(2);
                }
                flags.insert(key.to_string(), value.to_string());
            }
            None => rest.push(arg),
        }
    }
    let cli = Cli::parse_from(rest);

    if cli.list {
        for a in registry.analyzers() {
            let summary = a.doc.lines().next().unwrap_or("");
            println!("{:<16} {summary}", a.name);
            for f in a.flags {
                println!("    -{}.{}={:?}  {}", a.name, f.name, f.default, f.doc);
            }
        }
        return ExitCode::SUCCESS;
    }

    let opts = DriverOptions {
        json: cli.json,
        context: cli.context,
        flags,
    };
    let mut stdout = io::stdout().lock();
    let mut stderr = io::stderr().lock();
    let code = match &cli.unit {
        Some(path) => match std::fs::File::open(path) {
            Ok(file) => main_from(&registry, &opts, file, &mut stdout, &mut stderr),
            Err(err) => {
                drop(stdout);
                drop(stderr);
                eprintln!("vetch: opening {}: {err}", path.display());
                3
            }
        },
        None => main_from(&registry, &opts, io::stdin().lock(), &mut stdout, &mut stderr),
    };
    ExitCode::from(code as u8)
}

/// Match `-analyzer.flag=value` (one or two dashes). Returns the
/// dotted key and the value.
fn split_analyzer_flag(arg: &str) -> Option<(&str, &str)> {
    let body = arg.strip_prefix("--").or_else(|| arg.strip_prefix('-'))?;
    let (key, value) = body.split_once('=')?;
    let (analyzer, flag) = key.split_once('.')?;
    let ident = |s: &str| {
        !s.is_empty()
            && s.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
    };
    (ident(analyzer) && ident(flag)).then_some((key, value))
}
