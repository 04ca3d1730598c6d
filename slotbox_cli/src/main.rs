use slotbox_core::config::SlotboxConfig;
use slotbox_core::ingest::IngestSchema;
use slotbox_core::session::{LineInterpreter, RunSummary, run_lines};
use slotbox_core::{ArrayInterpreter, CalcInterpreter, IngestInterpreter, KvInterpreter};
use slotbox_core::{docs, graph, records};

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    /// TOML file with a [limits] table; defaults to ./slotbox.toml if present.
    #[clap(short, long, value_parser)]
    config_file: Option<PathBuf>,
    /// Emit the run summary as JSON on stdout instead of text on stderr.
    #[clap(long)]
    summary_json: bool,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Integer-array manager: CREATE/FILL/SPLICE/JOIN/FREE/STAT/PRINT.
    Array {
        /// Command file; stdin when omitted.
        file: Option<PathBuf>,
    },
    /// Calculator and allocator: CALC/ALLOC/ECHO.
    Calc {
        /// Command file; stdin when omitted.
        file: Option<PathBuf>,
    },
    /// Key-value store: SET/CONFIG/REMOVE/COMPUTE/DUMP.
    Kv {
        /// Command file; stdin when omitted.
        file: Option<PathBuf>,
    },
    /// Comma-separated name,age,email records from stdin or a file.
    Roster {
        file: Option<PathBuf>,
    },
    /// Pipe-separated TITLE|AUTHOR|YEAR records from a file.
    Shelf {
        file: PathBuf,
    },
    /// Length-prefixed binary document blob.
    Docs {
        file: PathBuf,
    },
    /// Binary adjacency-list graph.
    Graph {
        file: PathBuf,
    },
    /// Nested binary record database.
    Records {
        file: PathBuf,
    },
}

fn load_config(config_file: &Option<PathBuf>) -> Result<SlotboxConfig, anyhow::Error> {
    match config_file {
        Some(path) => {
            eprintln!("Loading configuration from specified path: {path:?}");
            SlotboxConfig::load_from_file(path)
        }
        None => {
            let default_path = PathBuf::from("slotbox.toml");
            if default_path.exists() {
                eprintln!("Loading default configuration file: {default_path:?}");
                SlotboxConfig::load_from_file(&default_path)
            } else {
                Ok(SlotboxConfig::default())
            }
        }
    }
}

fn open_input(file: &Option<PathBuf>) -> Result<Box<dyn BufRead>, anyhow::Error> {
    match file {
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("Could not open file {path:?}"))?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(BufReader::new(std::io::stdin()))),
    }
}

fn read_binary(path: &PathBuf) -> Result<Vec<u8>, anyhow::Error> {
    std::fs::read(path).with_context(|| format!("Could not open file {path:?}"))
}

fn report_summary(summary: &RunSummary, as_json: bool) -> Result<(), anyhow::Error> {
    if as_json {
        println!("{}", serde_json::to_string(summary)?);
    } else {
        eprintln!(
            "Processed {} lines: {} ok, {} errors",
            summary.lines, summary.ok, summary.errors
        );
    }
    Ok(())
}

fn run_line_frontend(
    interpreter: &mut dyn LineInterpreter,
    file: &Option<PathBuf>,
    config: &SlotboxConfig,
) -> Result<RunSummary, anyhow::Error> {
    let input = open_input(file)?;
    let stdout = std::io::stdout();
    let stderr = std::io::stderr();
    let summary = run_lines(
        input,
        interpreter,
        &mut stdout.lock(),
        &mut stderr.lock(),
        &config.limits,
    )?;
    Ok(summary)
}

/// Prints a byte payload followed by a newline, tolerating non-UTF-8 data.
fn print_payload(payload: &[u8]) -> Result<(), anyhow::Error> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    out.write_all(payload)?;
    out.write_all(b"\n")?;
    Ok(())
}

fn run_docs(path: &PathBuf, config: &SlotboxConfig) -> Result<RunSummary, anyhow::Error> {
    let bytes = read_binary(path)?;
    let scan = docs::scan(&bytes, &config.limits);
    let mut summary = RunSummary {
        lines: scan.docs.len() as u64,
        ok: scan.docs.len() as u64,
        errors: 0,
    };

    if let Some(fault) = &scan.fault {
        summary.errors += 1;
        eprintln!("ERROR: {fault}");
    }
    match scan.average_len() {
        Ok(mean) => println!("Average length: {mean}"),
        Err(e) => {
            summary.errors += 1;
            eprintln!("ERROR: {e}");
        }
    }
    if let Some(preview) = scan.first_preview() {
        print_payload(preview)?;
    }
    Ok(summary)
}

fn run_graph(path: &PathBuf, config: &SlotboxConfig) -> Result<RunSummary, anyhow::Error> {
    let bytes = read_binary(path)?;
    let scan = graph::scan(&bytes, &config.limits);
    let mut summary = RunSummary {
        lines: scan.edges_added + scan.rejected_edges.len() as u64,
        ok: scan.edges_added,
        errors: scan.rejected_edges.len() as u64,
    };

    if let Some(fault) = &scan.fault {
        summary.errors += 1;
        eprintln!("ERROR: {fault}");
    }
    for rejected in &scan.rejected_edges {
        eprintln!("ERROR: {rejected}");
    }
    match scan.average_out_degree() {
        Ok(mean) => println!("Average out-degree: {mean}"),
        Err(e) => {
            summary.errors += 1;
            eprintln!("ERROR: {e}");
        }
    }
    if let Some(neighbors) = scan.neighbors(0) {
        if !neighbors.is_empty() {
            let rendered: Vec<String> = neighbors.iter().map(|n| n.to_string()).collect();
            println!("Edges from node 0: {}", rendered.join(" "));
        }
    }
    Ok(summary)
}

fn run_records(path: &PathBuf, config: &SlotboxConfig) -> Result<RunSummary, anyhow::Error> {
    let bytes = read_binary(path)?;
    let scan = records::scan(&bytes, &config.limits);
    let mut summary = RunSummary {
        lines: scan.records.len() as u64,
        ok: scan.records.len() as u64,
        errors: 0,
    };

    if let Some(fault) = &scan.fault {
        summary.errors += 1;
        eprintln!("ERROR: {fault}");
    }
    match scan.average_field_count() {
        Ok(mean) => println!("Average fields per record: {mean}"),
        Err(e) => {
            summary.errors += 1;
            eprintln!("ERROR: {e}");
        }
    }
    if let Some(preview) = scan.first_field_preview() {
        print_payload(preview)?;
    }
    Ok(summary)
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();
    let config = load_config(&cli.config_file)?;

    let summary = match &cli.command {
        Command::Array { file } => {
            let mut interpreter = ArrayInterpreter::new(&config.limits);
            run_line_frontend(&mut interpreter, file, &config)?
        }
        Command::Calc { file } => {
            let mut interpreter = CalcInterpreter::new(&config.limits);
            run_line_frontend(&mut interpreter, file, &config)?
        }
        Command::Kv { file } => {
            let mut interpreter = KvInterpreter::new(&config.limits);
            run_line_frontend(&mut interpreter, file, &config)?
        }
        Command::Roster { file } => {
            let mut interpreter =
                IngestInterpreter::new(IngestSchema::roster(), &config.limits);
            run_line_frontend(&mut interpreter, file, &config)?
        }
        Command::Shelf { file } => {
            let mut interpreter =
                IngestInterpreter::new(IngestSchema::shelf(), &config.limits);
            run_line_frontend(&mut interpreter, &Some(file.clone()), &config)?
        }
        Command::Docs { file } => run_docs(file, &config)?,
        Command::Graph { file } => run_graph(file, &config)?,
        Command::Records { file } => run_records(file, &config)?,
    };

    report_summary(&summary, cli.summary_json)?;
    Ok(())
}
