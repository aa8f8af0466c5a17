//! Interactive shell over one database file.
//!
//! Thin plumbing only: read a line, hand it to the engine, print the
//! result. Supports execute mode (`-e`) for one-shot scripts.

use anyhow::Result;
use clap::Parser;
use common::pretty::{render_query_result, TableStyleKind};
use common::{Config, QueryResult};
use database::Database;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sqlshell", about = "Interactive shell for the database engine")]
struct Args {
    /// Database file to open or create
    #[arg(default_value = "data.db")]
    path: PathBuf,

    /// Number of pages the buffer pool keeps resident
    #[arg(long, default_value_t = 1000)]
    cache_pages: usize,

    /// Execute the provided SQL and exit
    #[arg(short = 'e', long)]
    execute: Option<String>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = Config::builder().cache_pages(args.cache_pages).build();
    let mut db = Database::open(&args.path, &config)?;
    println!("Opened {}", args.path.display());

    if let Some(sql) = args.execute {
        run_sql(&mut db, &sql);
    } else {
        interactive_loop(&mut db)?;
    }

    db.close()?;
    Ok(())
}

fn interactive_loop(db: &mut Database) -> Result<()> {
    let mut editor = DefaultEditor::new()?;
    println!("Type SQL statements, .tables, .help, or .quit");

    loop {
        match editor.readline("sql> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(line);
                if !process_line(db, line) {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("input error: {err}");
                break;
            }
        }
    }
    Ok(())
}

/// Returns false when the loop should exit.
fn process_line(db: &mut Database, line: &str) -> bool {
    match line {
        ".quit" | ".exit" => return false,
        ".help" => {
            println!(".tables        list tables");
            println!(".quit          exit");
            println!("anything else  executed as SQL");
        }
        ".tables" => {
            for name in db.get_tables() {
                println!("{name}");
            }
        }
        sql => run_sql(db, sql),
    }
    true
}

fn run_sql(db: &mut Database, sql: &str) {
    match db.execute_sql(sql) {
        Ok(results) => {
            for result in results {
                print_result(&result);
            }
        }
        Err(err) => eprintln!("Error: {err}\n  while executing: {sql}"),
    }
}

fn print_result(result: &QueryResult) {
    println!("{}", render_query_result(result, TableStyleKind::Rounded));
}
