use std::{io, path::PathBuf};

use rustyline::{error::ReadlineError, DefaultEditor};

use crate::{
    diagnostics::{AmaryllisError, Result},
    environment::{Environment, EnvironmentRef, ProgramEnvironment},
    evaluator,
    lexer::Lexer,
    parser::Parser,
};

/// Interactive line-at-a-time loop: each line gets a fresh lexer and parser
/// against one long-lived environment, so bindings survive between lines.
pub struct Repl {
    environment: EnvironmentRef,
}

impl Repl {
    pub fn new() -> Result<Self> {
        let run_directory = std::env::current_dir()?;
        let program = ProgramEnvironment::new(run_directory);
        let environment = Environment::new(PathBuf::from("<repl>"), program);
        Ok(Self { environment })
    }

    pub fn run(&mut self) -> Result<()> {
        let mut editor = DefaultEditor::new().map_err(|err| {
            AmaryllisError::from(io::Error::new(io::ErrorKind::Other, err))
        })?;
        loop {
            match editor.readline(">> ") {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed == ":quit" || trimmed == ":exit" {
                        break;
                    }
                    if trimmed.is_empty() {
                        continue;
                    }
                    editor.add_history_entry(trimmed).ok();
                    let lexer = Lexer::new(trimmed);
                    let mut parser = Parser::new(lexer);
                    let program = parser.parse_program();
                    if !parser.errors().is_empty() {
                        for diagnostic in parser.errors() {
                            eprintln!("\t{diagnostic}");
                        }
                        continue;
                    }
                    if let Some(value) = evaluator::evaluate(&program, &self.environment) {
                        println!("{value}");
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(err) => {
                    return Err(AmaryllisError::from(io::Error::new(
                        io::ErrorKind::Other,
                        err,
                    )));
                }
            }
        }
        Ok(())
    }
}
