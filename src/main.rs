use nabla_lang::diagnostics::{emit_syntax_errors, report_io_error, report_runtime_error};
use nabla_lang::language::parser::parse_program;
use nabla_lang::runtime::Interpreter;
use std::env;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;

fn main() {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("run") => {
            let filename = match args.get(2) {
                Some(filename) => filename,
                None => usage(),
            };
            if !filename.ends_with(".nabla") {
                eprintln!("Invalid file extension. Only .nabla files are allowed.");
                std::process::exit(1);
            }
            run_file(filename);
        }
        Some("repl") => repl(),
        _ => usage(),
    }
}

fn usage() -> ! {
    eprintln!("Usage: ./nabla-lang [run <filename.nabla>|repl]");
    std::process::exit(1);
}

fn run_file(filename: &str) {
    let source = match fs::read_to_string(filename) {
        Ok(source) => source,
        Err(err) => {
            report_io_error(Path::new(filename), &err);
            std::process::exit(1);
        }
    };
    let mut interpreter = Interpreter::new();
    if !run_source(&mut interpreter, filename, &source) {
        std::process::exit(1);
    }
}

// Lex + parse + execute one unit of source, reporting any errors. Returns
// whether the unit ran cleanly.
fn run_source(interpreter: &mut Interpreter, name: &str, source: &str) -> bool {
    let program = match parse_program(source) {
        Ok(program) => program,
        Err(errors) => {
            emit_syntax_errors(name, source, &errors.errors);
            return false;
        }
    };
    match interpreter.run(&program) {
        Ok(()) => true,
        Err(err) => {
            report_runtime_error(&err);
            false
        }
    }
}

fn repl() {
    println!("nabla (a little language for math, matrices and plots).");
    println!("Type 'exit' to leave.");

    // One interpreter for the whole session: assignments and function
    // definitions persist from line to line.
    let mut interpreter = Interpreter::new();
    let stdin = io::stdin();

    loop {
        print!(">>> ");
        let _ = io::stdout().flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }

        let trimmed = line.trim();
        if trimmed == "exit" || trimmed == "quit" {
            break;
        }
        if trimmed.is_empty() {
            continue;
        }

        run_source(&mut interpreter, "<repl>", &line);
    }
}
