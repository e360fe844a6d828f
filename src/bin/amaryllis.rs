use std::{
    path::{Path, PathBuf},
    process,
};

use clap::{Parser, Subcommand};

use amaryllis::{
    environment::{Environment, ProgramEnvironment},
    evaluator, parser, AmaryllisError, Repl,
};

#[derive(Parser)]
#[command(author, version, about = "Amaryllis language interpreter")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run an Amaryllis script file
    Run { script: PathBuf },
    /// Start an interactive REPL session
    Repl,
    /// Evaluate a snippet of Amaryllis code
    Eval { source: String },
}

fn main() -> Result<(), AmaryllisError> {
    let args = Args::parse();
    match args.command.unwrap_or(Command::Repl) {
        Command::Run { script } => run_script(script),
        Command::Repl => Repl::new()?.run(),
        Command::Eval { source } => eval_snippet(&source),
    }
}

fn run_script(script: PathBuf) -> Result<(), AmaryllisError> {
    let script = script.canonicalize()?;
    let run_directory = script
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("/"));

    let program = match parser::parse_file(&script) {
        Ok(program) => program,
        Err(AmaryllisError::Parse(diagnostics)) => {
            for diagnostic in &diagnostics {
                eprintln!("{diagnostic}");
            }
            process::exit(1);
        }
        Err(other) => return Err(other),
    };

    let program_environment = ProgramEnvironment::new(run_directory);
    let environment = Environment::new(script, program_environment);
    if let Some(result) = evaluator::evaluate(&program, &environment) {
        if result.is_error() {
            eprintln!("{result}");
            process::exit(1);
        }
    }
    Ok(())
}

fn eval_snippet(source: &str) -> Result<(), AmaryllisError> {
    let run_directory = std::env::current_dir()?;
    let program_environment = ProgramEnvironment::new(run_directory);
    let environment = Environment::new(PathBuf::from("<eval>"), program_environment);
    match evaluator::evaluate_source(source, &environment) {
        Ok(Some(result)) if result.is_error() => {
            eprintln!("{result}");
            process::exit(1);
        }
        Ok(_) => Ok(()),
        Err(AmaryllisError::Parse(diagnostics)) => {
            for diagnostic in &diagnostics {
                eprintln!("{diagnostic}");
            }
            process::exit(1);
        }
        Err(other) => Err(other),
    }
}
