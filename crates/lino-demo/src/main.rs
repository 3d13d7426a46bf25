//! lino-demo: a small REPL exercising the line editor.
//!
//! Reads lines with history, completion over a fixed command set and file
//! paths, and prints what it got. `exit` quits; `history` dumps the store.

use anyhow::{Context, Result};
use clap::Parser;
use lino::{
    Candidate, CandidateProvider, CompletionError, EditingMode, LineReader, ParsedLine,
    ReadError, ReaderOptions,
};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "lino-demo", version, about = "Interactive line editor demo")]
struct Args {
    /// History file (loaded at start, saved on exit).
    #[arg(long)]
    history: Option<PathBuf>,
    /// Start in vi editing mode.
    #[arg(long)]
    vi: bool,
    /// Prompt string.
    #[arg(long, default_value = "lino> ")]
    prompt: String,
    /// Clear each accepted line from the screen.
    #[arg(long)]
    erase: bool,
}

const COMMANDS: &[(&str, &str)] = &[
    ("help", "show available commands"),
    ("history", "dump the history store"),
    ("exit", "leave the repl"),
    ("echo", "print the arguments"),
    ("mask", "prompt for a hidden value"),
];

struct CommandCompleter;

impl CandidateProvider for CommandCompleter {
    fn name(&self) -> &str {
        "commands"
    }

    fn complete(&self, line: &ParsedLine) -> Result<Vec<Candidate>, CompletionError> {
        if line.word_index > 0 {
            return Ok(Vec::new());
        }
        Ok(COMMANDS
            .iter()
            .map(|(name, desc)| {
                Candidate::new(*name)
                    .group("commands")
                    .description(*desc)
            })
            .collect())
    }
}

struct PathCompleter;

impl CandidateProvider for PathCompleter {
    fn name(&self) -> &str {
        "paths"
    }

    fn complete(&self, line: &ParsedLine) -> Result<Vec<Candidate>, CompletionError> {
        if line.word_index == 0 {
            return Ok(Vec::new());
        }
        let word = &line.word.value;
        let (dir, prefix) = match word.rsplit_once('/') {
            Some((d, p)) => (format!("{d}/"), p.to_string()),
            None => ("./".to_string(), word.clone()),
        };
        let entries = std::fs::read_dir(&dir)
            .map_err(|e| CompletionError::new("paths", e.to_string()))?;
        let mut out = Vec::new();
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with(&prefix) {
                continue;
            }
            let shown_dir = if dir == "./" { String::new() } else { dir.clone() };
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            let value = if is_dir {
                format!("{shown_dir}{name}/")
            } else {
                format!("{shown_dir}{name}")
            };
            out.push(Candidate::new(value).group("files"));
        }
        Ok(out)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut options = ReaderOptions::default();
    options.editing_mode = if args.vi {
        EditingMode::Vi
    } else {
        EditingMode::Emacs
    };
    options.history_ignore_dups = true;
    options.history_timestamped = true;
    options.erase_on_finish = args.erase;

    let mut reader = LineReader::new(options).context("opening terminal")?;
    reader.set_application("lino-demo");
    reader.add_completer(Box::new(CommandCompleter));
    reader.add_completer(Box::new(PathCompleter));

    if let Some(path) = &args.history
        && path.exists()
    {
        let outcome = reader.load_history(path).context("loading history")?;
        if !outcome.skipped.is_empty() {
            eprintln!("history: skipped {} malformed lines", outcome.skipped.len());
        }
        info!(loaded = outcome.loaded, "history loaded");
    }

    loop {
        match reader.read_line(&args.prompt) {
            Ok(line) => {
                let mut parts = line.split_whitespace();
                match parts.next() {
                    Some("exit") => break,
                    Some("help") => {
                        for (name, desc) in COMMANDS {
                            println!("{name:10} {desc}");
                        }
                    }
                    Some("history") => {
                        for entry in reader.history().iter() {
                            println!("{:5}  {}", entry.id, entry.text);
                        }
                    }
                    Some("mask") => {
                        let secret = reader.read_line_masked("value: ", '*')?;
                        println!("got {} hidden characters", secret.chars().count());
                    }
                    Some("echo") => {
                        println!("{}", parts.collect::<Vec<_>>().join(" "));
                    }
                    Some(other) => println!("unknown command: {other} (try help)"),
                    None => {}
                }
            }
            Err(ReadError::Interrupted) => {
                println!("^C");
            }
            Err(ReadError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }

    if let Some(path) = &args.history {
        reader.save_history(path).context("saving history")?;
    }
    Ok(())
}
