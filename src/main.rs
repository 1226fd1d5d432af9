use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser as ClapParser, ValueEnum};
use env_logger::Builder;
use log::{debug, info};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use pseudo::ast_printer::AstPrinter;
use pseudo::parser::Parser;
use pseudo::scanner::Scanner;
use pseudo::session::{Report, Session, Status};

/// Path stamped on tokens typed at the prompt.
const REPL_PATH: &str = "INTERPRETER";

#[derive(ClapParser, Debug)]
#[command(version, about = "Pseudocode interpreter", long_about = None)]
pub struct Cli {
    /// Source file to run; starts the interactive prompt when omitted
    file: Option<PathBuf>,

    /// Print an intermediate representation instead of running the program
    #[arg(long, value_enum)]
    emit: Option<Emit>,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Emit {
    /// One JSON object per token
    Tokens,

    /// The parsed program in prefix form
    Ast,
}

/// Reads the contents of a file into a String
fn read_file(filename: &PathBuf) -> Result<String> {
    info!("Reading file: {:?}", filename);
    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = String::new();

    let bytes = reader
        .read_to_string(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    Ok(buf)
}

fn init_logger() -> Result<()> {
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    Builder::new()
        .format(|buf, record| {
            // Strip 'pseudo::' from module path
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("pseudo::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // Default to Debug, override with RUST_LOG
        .parse_env("RUST_LOG")
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

fn print_diagnostics(report: &Report) {
    for diagnostic in &report.diagnostics {
        debug!("Diagnostic: {:?}", diagnostic);
        eprintln!("{}", diagnostic);
    }
}

fn emit(kind: Emit, source: &str, path: &str) -> Result<Status> {
    let (tokens, errors) = Scanner::new(source, path).scan_tokens();

    if let Emit::Tokens = kind {
        for token in &tokens {
            println!("{}", serde_json::to_string(token)?);
        }
    }

    if !errors.is_empty() {
        errors.iter().for_each(|e| eprintln!("{}", e));
        return Ok(Status::StaticError);
    }

    if let Emit::Ast = kind {
        let (statements, errors) = Parser::new(tokens).parse();

        if !errors.is_empty() {
            errors.iter().for_each(|e| eprintln!("{}", e));
            return Ok(Status::StaticError);
        }

        println!("{}", AstPrinter::print_program(&statements));
    }

    Ok(Status::Success)
}

fn run_file(filename: &PathBuf, emit_kind: Option<Emit>) -> Result<Status> {
    let source: String = read_file(filename)?;
    let path: String = filename.display().to_string();

    if let Some(kind) = emit_kind {
        return emit(kind, &source, &path);
    }

    let mut session = Session::new();
    let report: Report = session.run(&source, &path);
    print_diagnostics(&report);

    info!("Run finished with {:?}", report.status);
    Ok(report.status)
}

fn run_prompt() -> Result<()> {
    let mut editor = DefaultEditor::new().context("Failed to start line editor")?;
    let mut session = Session::new();

    loop {
        match editor.readline("> ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }

                let _ = editor.add_history_entry(line.as_str());

                let report: Report = session.run(&line, REPL_PATH);
                print_diagnostics(&report);
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e).context("Failed to read line"),
        }
    }

    info!("Prompt closed");
    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match &args.file {
        Some(filename) => {
            let status: Status = run_file(filename, args.emit)?;

            if status != Status::Success {
                debug!("Exiting with code {}", status.exit_code());
                std::process::exit(status.exit_code());
            }
        }
        None => run_prompt()?,
    }

    Ok(())
}
