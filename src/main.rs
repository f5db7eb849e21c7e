//! todo-graph - Dependency graphs from TODO comments

use std::process::ExitCode;

fn main() -> ExitCode {
    match todo_graph::cli::run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
