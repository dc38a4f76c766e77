mod agent;
mod ai;
mod app;
mod config;
mod constants;
mod credentials;
mod error;
mod mail;
mod retry;

use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::sync::Mutex;
use tracing_subscriber::fmt::{self, writer::BoxMakeWriter};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::ai::{Interpreted, OpenAiClient};
use crate::app::{App, ProcessingReport};
use crate::config::Config;
use crate::constants::PREVIEW_CHARS;
use crate::credentials::CredentialStore;
use crate::error::TriageError;

/// `triage.log` in the config directory, opened for appending
fn open_log_file() -> Option<fs::File> {
    let dir = Config::config_dir().ok()?;
    fs::create_dir_all(&dir).ok()?;
    fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("triage.log"))
        .ok()
}

/// Log to the file when it can be opened, to stderr otherwise. Stdout stays
/// reserved for command output.
fn setup_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,triage=debug"));
    let writer = match open_log_file() {
        Some(file) => BoxMakeWriter::new(Mutex::new(file)),
        None => BoxMakeWriter::new(std::io::stderr),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .init();
}

fn print_usage() {
    eprintln!(
        r#"triage - Prompt-driven email triage assistant

Usage: triage <command> [args]

Commands:
    inbox                   List the emails in the inbox file
    process                 Categorize every email and extract action items
    categorize <id>         Categorize one email
    summarize <id>          Summarize one email
    actions <id>            Extract action items from one email
    draft <id> [tone]       Draft a reply (never sent)
    chat <message...>       Ask the agent about your inbox
    prompts                 Show the current prompt templates
    prompt-set <name> <file>
                            Replace a prompt with the contents of a file and save
    shell                   Start an interactive session
    set-key                 Store the API key (read from stdin) in the keyring
    help                    Show this help message

Configuration file: ~/.config/triage/config.toml (override with TRIAGE_CONFIG)
"#
    );
}

fn parse_id(arg: Option<&String>) -> Result<u32> {
    let arg = arg.context("Missing email id")?;
    arg.trim_start_matches('#')
        .parse()
        .with_context(|| format!("Invalid email id: {}", arg))
}

fn print_note<V>(result: &Interpreted<V>) {
    if let Some(warning) = result.warning() {
        println!("(note: {})", warning);
    }
}

fn build_app(config: Config) -> Result<App<OpenAiClient>, TriageError> {
    let creds = CredentialStore::new(config.ai.api_key.clone());
    let api_key = match creds.api_key() {
        Some((key, source)) => {
            tracing::debug!("Using API key from {:?}", source);
            Some(key)
        }
        None => {
            tracing::warn!("No API key configured; requests will likely be rejected");
            None
        }
    };

    let mut app = App::from_config(config, api_key);
    let count = app.load_inbox()?;
    tracing::info!("Loaded {} emails", count);
    Ok(app)
}

fn print_report(app: &App<OpenAiClient>, report: &ProcessingReport) {
    for email in app.state().emails() {
        println!("#{:<3} [{}] {}", email.id, email.category, email.subject);
        for item in app.state().actions(email.id).unwrap_or_default() {
            println!("      - {}", item);
        }
    }
    println!(
        "\nProcessed {} emails, {} fallback results",
        report.processed, report.fallbacks
    );
    for (id, reason) in &report.failures {
        println!("Skipped #{}: {}", id, reason);
    }
    for recorded in app.state().warnings() {
        println!("Note #{} ({:?}): {}", recorded.email_id, recorded.task, recorded.warning);
    }
}

/// Everything the session holds for one email
fn show_email(app: &App<OpenAiClient>, id: u32) -> Result<()> {
    let state = app.state();
    let email = state
        .email(id)
        .with_context(|| format!("No email #{} in the inbox", id))?;

    println!("#{} [{}] {}", email.id, email.category, email.subject);
    println!("From: {}  {}", email.sender, email.display_timestamp());
    if let Some(items) = state.actions(id) {
        println!("\nAction items:");
        for item in items {
            println!("- {}", item);
        }
    }
    if let Some(summary) = state.summary(id) {
        println!("\nSummary:\n{}", summary);
    }
    if let Some(draft) = state.draft(id) {
        println!(
            "\nDraft ({} tone, not sent):\nSubject: {}\n\n{}",
            draft.tone, draft.subject, draft.body
        );
    }
    Ok(())
}

/// Run one command against a loaded app. The outer `Result` carries argument
/// problems, the inner one failures reported by the assistant itself.
async fn execute(
    app: &mut App<OpenAiClient>,
    command: &str,
    args: &[String],
) -> Result<Result<(), TriageError>> {
    let outcome = match command {
        "inbox" => {
            for email in app.state().emails() {
                println!(
                    "#{:<3} {}  {:<28} {}",
                    email.id,
                    email.display_timestamp(),
                    email.sender,
                    email.subject
                );
                println!("      {}", email.preview(PREVIEW_CHARS).replace('\n', " "));
            }
            Ok(())
        }
        "process" => app
            .run_processing()
            .await
            .map(|report| print_report(app, &report)),
        "categorize" => {
            let id = parse_id(args.first())?;
            app.categorize(id).await.map(|result| {
                println!("#{} -> {}", id, result.value());
                print_note(&result);
            })
        }
        "summarize" => {
            let id = parse_id(args.first())?;
            app.summarize(id).await.map(|result| {
                println!("{}", result.value());
                print_note(&result);
            })
        }
        "actions" => {
            let id = parse_id(args.first())?;
            app.extract_actions(id).await.map(|result| {
                if result.value().is_empty() {
                    println!("No action items.");
                }
                for item in result.value() {
                    println!("- {}", item);
                }
                print_note(&result);
            })
        }
        "draft" => {
            let id = parse_id(args.first())?;
            let tone = args.get(1).map(String::as_str);
            app.draft_reply(id, tone).await.map(|result| {
                let draft = result.value();
                println!("Subject: {}\nTone: {}\n\n{}", draft.subject, draft.tone, draft.body);
                print_note(&result);
            })
        }
        "chat" => {
            let message = args.join(" ");
            app.chat(&message).await.map(|reply| println!("{}", reply))
        }
        "prompts" => {
            for (name, text) in app.prompts().iter() {
                println!("== {} ==\n{}\n", name, text);
            }
            Ok(())
        }
        "prompt-set" => {
            let name = args.first().context("Missing prompt name")?;
            let file = args.get(1).context("Missing template file")?;
            let text = fs::read_to_string(file)
                .with_context(|| format!("Failed to read template file: {}", file))?;
            app.update_prompt(name, &text)
                .and_then(|name| {
                    app.save_prompts()?;
                    Ok(name)
                })
                .map(|name| println!("Saved {} prompt", name))
        }
        other => anyhow::bail!("Unknown command: {}", other),
    };

    Ok(outcome)
}

fn report(outcome: Result<Result<(), TriageError>>) -> bool {
    match outcome {
        Ok(Ok(())) => true,
        Ok(Err(err)) => {
            eprintln!("Error: {}", err.user_message());
            false
        }
        Err(err) => {
            eprintln!("Error: {:#}", err);
            false
        }
    }
}

const SHELL_HELP: &str = "Session commands:
    select <id>             Make an email the current one
    show <id>               Show the category, action items, summary and draft of an email
    edit <id> <text...>     Replace the body of a draft
    prompt <name> <text...> Change a prompt for this session
    save                    Write the current prompts to disk
    reload                  Re-read prompts from disk
    history                 Show the chat transcript
    quit                    Leave the session
The one-shot commands (inbox, process, categorize, summarize, actions, draft,
chat, prompts, prompt-set) also work here. Anything else is sent to the agent as a chat message.";

/// Interactive session: results, drafts and the chat transcript live until
/// the session ends.
async fn run_shell(app: &mut App<OpenAiClient>) -> Result<()> {
    use std::io::{self, BufRead, Write};

    println!(
        "{} emails loaded. Type 'help' for commands, 'quit' to leave.",
        app.state().emails().len()
    );

    let stdin = io::stdin();
    loop {
        print!("triage> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        let words: Vec<String> = line.split_whitespace().map(str::to_string).collect();
        let Some(command) = words.first() else {
            continue;
        };
        let args = &words[1..];

        let outcome = match command.as_str() {
            "quit" | "exit" => break,
            "help" => {
                println!("{}", SHELL_HELP);
                Ok(Ok(()))
            }
            "select" => parse_id(args.first()).map(|id| {
                app.select_email(id).map(|()| {
                    if let Some(email) = app.state().selected() {
                        println!("Selected #{}: {}", email.id, email.subject);
                    }
                })
            }),
            // "show me the spam emails" is a chat message, not this command
            "show" if args.len() == 1 && parse_id(args.first()).is_ok() => {
                parse_id(args.first()).and_then(|id| show_email(app, id)).map(Ok)
            }
            "edit" => parse_id(args.first()).map(|id| {
                app.edit_draft(id, &args[1..].join(" "))
                    .map(|draft| println!("Draft for #{} updated:\n{}", draft.email_id, draft.body))
            }),
            "prompt" => match args.first() {
                Some(name) => Ok(app
                    .update_prompt(name, &args[1..].join(" "))
                    .map(|name| println!("Updated {} prompt (not saved)", name))),
                None => Err(anyhow::anyhow!("Missing prompt name")),
            },
            "save" => Ok(app.save_prompts().map(|()| println!("Prompts saved"))),
            "reload" => Ok(app.reload_prompts().map(|()| println!("Prompts reloaded"))),
            "history" => {
                for turn in app.state().chat_history() {
                    println!(
                        "[{}] {:?}: {}",
                        turn.timestamp.format("%H:%M:%S"),
                        turn.role,
                        turn.text
                    );
                }
                Ok(Ok(()))
            }
            "inbox" | "process" | "categorize" | "summarize" | "actions" | "draft" | "chat"
            | "prompts" | "prompt-set" => execute(app, command, args).await,
            _ => Ok(app.chat(line).await.map(|reply| println!("{}", reply))),
        };
        report(outcome);
    }
    Ok(())
}

fn set_key() -> Result<()> {
    use std::io::{self, Write};

    print!("API key: ");
    io::stdout().flush()?;
    let mut key = String::new();
    io::stdin().read_line(&mut key)?;
    if key.trim().is_empty() {
        anyhow::bail!("No key entered");
    }
    CredentialStore::set_api_key(&key)?;
    println!("API key stored in the system keyring.");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        None | Some("help") | Some("--help") | Some("-h") => {
            print_usage();
            Ok(())
        }
        Some("set-key") => set_key(),
        Some(
            cmd @ ("inbox" | "process" | "categorize" | "summarize" | "actions" | "draft"
            | "chat" | "prompts" | "prompt-set" | "shell"),
        ) => {
            setup_logging();
            let config = Config::load()?;
            let mut app = match build_app(config) {
                Ok(app) => app,
                Err(err) => {
                    eprintln!("Error: {}", err.user_message());
                    std::process::exit(1);
                }
            };

            if cmd == "shell" {
                return run_shell(&mut app).await;
            }
            if !report(execute(&mut app, cmd, &args[2..]).await) {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(cmd) => {
            eprintln!("Unknown command: {}", cmd);
            print_usage();
            std::process::exit(1);
        }
    }
}
