use std::io::{self, BufRead, Write};
use std::path::Path;

use askdocs_cli::{parse_args, App, Command, USAGE};
use askdocs_core::config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const PREVIEW_CHARS: usize = 240;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "askdocs=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let command = match parse_args(std::env::args().skip(1)) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    };
    if command == Command::Help {
        println!("{USAGE}");
        return Ok(());
    }

    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {e}");
        e
    })?;
    let settings = config.settings()?;
    let app = App::new(settings, Path::new("."))?;

    match command {
        Command::Ingest { dir } => {
            let written = app.ingest(dir.as_deref(), true)?;
            println!("Ingest complete ({written} chunks)");
        }
        Command::Search { query, limit, window } => {
            app.ensure_loaded()?;
            let limit = limit.unwrap_or(app.config().retrieval.limit);
            let window = window.or(app.config().retrieval.window.enabled.then_some(app.config().retrieval.window.size));
            let engine = app.engine(window)?;
            let passages = engine.search_passages(&query, None, limit, window.unwrap_or(0))?;
            println!("Found {} results for: \"{query}\"", passages.len());
            for (i, p) in passages.iter().enumerate() {
                let preview: String = p.text.chars().take(PREVIEW_CHARS).collect();
                println!("\n  {}. score={:.4}  source={}", i + 1, p.score, p.source);
                println!("     {}", preview.replace('\n', " "));
            }
        }
        Command::Ask => {
            app.ensure_loaded()?;
            let flow = app.flow()?;
            println!("Ask a question (exit, quit or q to leave).");
            let stdin = io::stdin();
            loop {
                print!("\n> ");
                io::stdout().flush()?;
                let mut line = String::new();
                if stdin.lock().read_line(&mut line)? == 0 {
                    break;
                }
                let question = line.trim();
                if question.is_empty() {
                    continue;
                }
                if matches!(question.to_ascii_lowercase().as_str(), "exit" | "quit" | "q") {
                    break;
                }
                let state = flow.run(question);
                println!("\n{}", state.answer());
                println!("\n[status: {:?}, attempts: {}]", state.status, state.attempts);
                println!("[steps: {}]", state.trace());
                if let Some(err) = &state.error {
                    println!("[last fallback: {err}]");
                }
            }
        }
        Command::Help => println!("{USAGE}"),
    }
    Ok(())
}
