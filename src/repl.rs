//! A line-oriented REPL: read one `;`-terminated declaration at a time,
//! elaborate it against a persistent top-level scope, print the result.
//!
//! Deliberately much simpler than a full editor integration — no syntax
//! highlighting, no multi-line paste detection beyond counting `;` — this
//! is a tool for iterating on a handful of declarations, not an IDE.

use crate::elaborate::{drive_program, Elaborator};
use crate::syntax::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

const HISTORY_FILE: &str = ".minitt_history";

pub fn run() -> Result<(), String> {
    let mut rl = DefaultEditor::new().map_err(|e| e.to_string())?;
    let _ = rl.load_history(HISTORY_FILE);

    println!("minitt REPL — enter `;`-terminated declarations, `:quit` to exit");
    let elab = Elaborator::new();
    let mut buffer = String::new();

    loop {
        let prompt = if buffer.is_empty() { "> " } else { ". " };
        match rl.readline(prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if buffer.is_empty() && (trimmed == ":quit" || trimmed == ":q") {
                    break;
                }
                let _ = rl.add_history_entry(line.as_str());
                buffer.push_str(&line);
                buffer.push('\n');
                if trimmed.ends_with(';') {
                    run_decl(&elab, &buffer);
                    buffer.clear();
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("readline error: {}", e);
                break;
            }
        }
    }

    let _ = rl.save_history(HISTORY_FILE);
    Ok(())
}

fn run_decl(elab: &Elaborator, src: &str) {
    let mut parser = match Parser::new(src) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("parse error: {}", e);
            return;
        }
    };
    let program = match parser.parse_program() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("parse error: {}", e);
            return;
        }
    };
    match drive_program(elab, &program) {
        Ok(reports) => {
            for report in reports {
                println!("{} : ok", report.name);
                if let Some(elaborated) = report.elaborated {
                    println!("  elaborated: {}", elaborated);
                }
                if let Some(nf) = report.normal_form {
                    println!("  normal form: {}", nf);
                }
            }
        }
        Err(e) => eprintln!("error: {}", e),
    }
}
