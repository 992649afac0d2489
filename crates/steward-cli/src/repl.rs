//! Interactive chat REPL
//!
//! Keeps the conversation log across turns; the agent's fact memory lives in
//! the session and survives `/clear`.

use std::time::Duration;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use steward_agent::{Role, Session, TurnOutcome, TurnState};

use crate::bootstrap;

const GREEN: &str = "\x1b[92m";
const BLUE: &str = "\x1b[94m";
const YELLOW: &str = "\x1b[93m";
const CYAN: &str = "\x1b[96m";
const DIM: &str = "\x1b[2m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// REPL state
struct ReplState {
    session: Session,
    /// Last finished turn; its history seeds the next one
    turn: TurnState,
}

impl ReplState {
    fn new(session: Session) -> Self {
        Self {
            session,
            turn: TurnState::default(),
        }
    }

    async fn send(&mut self, input: &str) -> &TurnState {
        let next = std::mem::take(&mut self.turn).next(input);
        self.turn = self.session.ask_with(next).await;
        &self.turn
    }

    fn clear(&mut self) {
        self.turn = TurnState::default();
    }
}

/// Run the interactive REPL
pub async fn run() -> Result<()> {
    let session = bootstrap::session_from_env()?;
    let mut state = ReplState::new(session);

    let mut rl = DefaultEditor::new()?;

    print_welcome(&state);

    loop {
        let prompt = format!("{}steward>{} ", CYAN, RESET);

        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();

                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                if line.starts_with('/') {
                    if handle_slash_command(&mut state, line) {
                        break;
                    }
                    continue;
                }

                send_message(&mut state, line).await;
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}^C{}", DIM, RESET);
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("{}Goodbye!{}", DIM, RESET);
                break;
            }
            Err(e) => {
                eprintln!("{}Error:{} {}", YELLOW, RESET, e);
                break;
            }
        }
    }

    Ok(())
}

fn print_welcome(state: &ReplState) {
    let tools = state.session.agent().registry().list_names().join(", ");

    println!();
    println!("{}╭─────────────────────────────────────────╮{}", DIM, RESET);
    println!(
        "{}│{} {}steward{} - Personal AI Agent             {}│{}",
        DIM, RESET, BOLD, RESET, DIM, RESET
    );
    println!(
        "{}│{} Type {}/help{} for commands                  {}│{}",
        DIM, RESET, CYAN, RESET, DIM, RESET
    );
    println!("{}╰─────────────────────────────────────────╯{}", DIM, RESET);
    println!("{}Tools: {}{}", DIM, truncate(&tools, 72), RESET);
    println!();
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

async fn send_message(state: &mut ReplState, input: &str) {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message("Thinking...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let turn = state.send(input).await;
    spinner.finish_and_clear();

    let color = match turn.outcome {
        TurnOutcome::Refused | TurnOutcome::Failed => YELLOW,
        _ => GREEN,
    };
    println!("{}{}{}", color, turn.assistant, RESET);
    println!();
}

/// Returns true when the user asked to exit
fn handle_slash_command(state: &mut ReplState, input: &str) -> bool {
    let cmd = input.split_whitespace().next().unwrap_or("").to_lowercase();

    match cmd.as_str() {
        "/help" | "/h" | "/?" => print_help(),
        "/exit" | "/quit" | "/q" => {
            println!("{}Goodbye!{}", DIM, RESET);
            return true;
        }
        "/memory" | "/mem" => print_memory(state),
        "/history" => print_history(state),
        "/clear" => {
            state.clear();
            println!("{}Conversation cleared{}", DIM, RESET);
        }
        _ => {
            println!("{}Unknown command: {}{}", YELLOW, cmd, RESET);
            println!("Type {}/help{} for available commands", CYAN, RESET);
        }
    }

    false
}

fn print_help() {
    println!();
    println!("{}Commands:{}", BOLD, RESET);
    println!("  {}/help{}, /h, /?      Show this help", CYAN, RESET);
    println!("  {}/memory{}           Show remembered facts", CYAN, RESET);
    println!("  {}/history{}          Show conversation history", CYAN, RESET);
    println!("  {}/clear{}            Clear conversation history", CYAN, RESET);
    println!("  {}/exit{}, /quit, /q  Exit the REPL", CYAN, RESET);
    println!();
    println!("{}Tips:{}", DIM, RESET);
    println!("  - \"Remember my <thing> is <value>\" stores a fact");
    println!("  - \"What is my <thing>?\" recalls it");
    println!("  - Mention JSON to get a structured answer");
    println!("  - Press Ctrl+D to exit");
    println!();
}

fn print_memory(state: &ReplState) {
    let facts = state.session.memory().all();
    if facts.is_empty() {
        println!("{}No stored memory{}", DIM, RESET);
        return;
    }

    println!("{}Memory ({}){}", BOLD, facts.len(), RESET);
    for (key, value) in facts {
        println!("  {}{}{}: {}", BLUE, key, RESET, value);
    }
}

fn print_history(state: &ReplState) {
    let history = &state.turn.history;
    if history.is_empty() {
        println!("{}No messages yet{}", DIM, RESET);
        return;
    }

    for entry in history {
        let (label, color) = match entry.role {
            Role::User => ("you", CYAN),
            Role::Assistant => ("steward", GREEN),
        };
        println!("{}{}:{} {}", color, label, RESET, entry.content);
    }
}
