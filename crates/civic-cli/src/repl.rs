//! Interactive chat loop.

use crate::config::data_dir;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use civic_assistant::{AssistantError, Conversation};
use civic_domain::traits::{MessageFeed, SessionStore};
use civic_domain::Department;
use rustyline::error::ReadlineError;
use rustyline::{Config as EditorConfig, DefaultEditor};
use std::path::PathBuf;

/// Run the interactive chat loop.
pub async fn run_repl<S: SessionStore>(
    conversation: Conversation<S>,
    history_size: usize,
    formatter: &Formatter,
) -> Result<()> {
    println!(
        "{}",
        formatter.info("CivicSphere - Ask a question, '/help' for commands, '/exit' to quit")
    );
    println!(
        "{}",
        formatter.info(&format!("Session {}", conversation.session()))
    );
    println!();

    let editor_config = EditorConfig::builder()
        .max_history_size(history_size)?
        .auto_add_history(false)
        .build();
    let mut editor = DefaultEditor::with_config(editor_config)?;

    let history_path = get_history_path()?;
    let _ = editor.load_history(&history_path);

    if let Err(e) = show_department(&conversation, conversation.department(), formatter).await {
        eprintln!("{}", formatter.error(&e.to_string()));
    }

    loop {
        let prompt = format!("civic [{}]> ", conversation.department());

        match editor.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();

                if line.is_empty() {
                    continue;
                }

                editor.add_history_entry(line).ok();

                match parse_repl_command(line) {
                    Ok(ReplCommand::Exit) => {
                        println!("{}", formatter.info("Goodbye!"));
                        break;
                    }
                    Ok(ReplCommand::Help) => {
                        print_help(formatter);
                    }
                    Ok(command) => {
                        if let Err(e) = execute_repl_command(command, &conversation, formatter).await {
                            eprintln!("{}", formatter.error(&e.to_string()));
                        }
                    }
                    Err(e) => {
                        eprintln!("{}", formatter.error(&e.to_string()));
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", formatter.warning("Use '/exit' to quit"));
            }
            Err(ReadlineError::Eof) => {
                break;
            }
            Err(err) => {
                eprintln!("{}", formatter.error(&format!("Error: {}", err)));
                break;
            }
        }
    }

    editor.save_history(&history_path).ok();

    Ok(())
}

/// One line of chat input.
#[derive(Debug, PartialEq, Eq)]
enum ReplCommand {
    Exit,
    Help,
    Switch(Department),
    History,
    Departments,
    Ask(String),
}

/// Parse a chat line. Lines starting with '/' are commands; anything else is a question.
fn parse_repl_command(line: &str) -> Result<ReplCommand> {
    let Some(command) = line.strip_prefix('/') else {
        return match line {
            "exit" | "quit" => Ok(ReplCommand::Exit),
            _ => Ok(ReplCommand::Ask(line.to_string())),
        };
    };

    let parts: Vec<&str> = command.split_whitespace().collect();
    if parts.is_empty() {
        return Err(CliError::InvalidInput("Empty command".to_string()));
    }

    match parts[0] {
        "exit" | "quit" | "q" => Ok(ReplCommand::Exit),
        "help" | "?" => Ok(ReplCommand::Help),
        "history" => Ok(ReplCommand::History),
        "departments" => Ok(ReplCommand::Departments),
        "dept" | "department" | "go" => {
            let name = parts
                .get(1)
                .ok_or_else(|| CliError::InvalidInput("Usage: /dept <department>".to_string()))?;
            Department::parse(name)
                .map(ReplCommand::Switch)
                .ok_or_else(|| CliError::InvalidInput(format!("Unknown department: {}", name)))
        }
        "home" => Ok(ReplCommand::Switch(Department::Home)),
        _ => Err(CliError::InvalidInput(format!(
            "Unknown command: /{}. Type '/help' for available commands.",
            parts[0]
        ))),
    }
}

/// Execute a parsed chat line.
async fn execute_repl_command<S: SessionStore>(
    command: ReplCommand,
    conversation: &Conversation<S>,
    formatter: &Formatter,
) -> Result<()> {
    match command {
        ReplCommand::Ask(text) => {
            if let Some(turn) = conversation.send(&text).await? {
                println!("{}", formatter.format_turn(&turn)?);
            }
        }
        ReplCommand::Switch(department) => {
            conversation.switch_department(department);
            println!(
                "{}",
                formatter.success(&format!("Switched to {}", department.profile().name))
            );
            show_department(conversation, department, formatter).await?;
        }
        ReplCommand::History => {
            let messages = conversation.history(conversation.department()).await?;
            println!("{}", formatter.format_transcript(&messages)?);
        }
        ReplCommand::Departments => {
            println!("{}", formatter.format_departments()?);
        }
        ReplCommand::Exit | ReplCommand::Help => {}
    }

    Ok(())
}

/// Print a department's header and its current transcript.
async fn show_department<S: SessionStore>(
    conversation: &Conversation<S>,
    department: Department,
    formatter: &Formatter,
) -> Result<()> {
    let profile = department.profile();
    println!(
        "{}",
        formatter.info(&format!("{} | {}", profile.hero_title, profile.hero_subtitle))
    );

    let mut feed = conversation.open(department).await?;
    let snapshot = match feed.next_snapshot().await {
        Some(snapshot) => snapshot.map_err(|e| AssistantError::Store(Box::new(e)))?,
        None => return Err(CliError::Config("Session store is closed".to_string())),
    };
    feed.unsubscribe();

    println!("{}", formatter.format_transcript(&snapshot)?);
    println!(
        "{}",
        formatter.info(&format!("Try asking: {}", profile.query_suggestion))
    );
    Ok(())
}

fn get_history_path() -> Result<PathBuf> {
    let dir = data_dir()?;
    std::fs::create_dir_all(&dir)?;
    Ok(dir.join("history.txt"))
}

fn print_help(formatter: &Formatter) {
    println!("{}", formatter.info("Available commands:"));
    println!();
    println!("  <question>                 - Ask the assistant");
    println!("  /dept <department>         - Switch department (home|tax|vehicle|benefits|housing)");
    println!("  /home                      - Return to the portal home");
    println!("  /history                   - Show this department's conversation");
    println!("  /departments               - List departments");
    println!("  /help, /?                  - Show this help");
    println!("  /exit, /quit, /q           - Exit");
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_a_question() {
        assert_eq!(
            parse_repl_command("What documents do I need?").unwrap(),
            ReplCommand::Ask("What documents do I need?".to_string())
        );
        assert_eq!(
            parse_repl_command("help me file").unwrap(),
            ReplCommand::Ask("help me file".to_string())
        );
    }

    #[test]
    fn test_exit_commands() {
        assert_eq!(parse_repl_command("/q").unwrap(), ReplCommand::Exit);
        assert_eq!(parse_repl_command("quit").unwrap(), ReplCommand::Exit);
    }

    #[test]
    fn test_switch_department() {
        assert_eq!(
            parse_repl_command("/dept housing").unwrap(),
            ReplCommand::Switch(Department::Housing)
        );
        assert_eq!(
            parse_repl_command("/home").unwrap(),
            ReplCommand::Switch(Department::Home)
        );
        assert!(parse_repl_command("/dept").is_err());
        assert!(parse_repl_command("/dept library").is_err());
    }

    #[test]
    fn test_unknown_command() {
        assert!(matches!(
            parse_repl_command("/teleport"),
            Err(CliError::InvalidInput(_))
        ));
        assert!(parse_repl_command("/").is_err());
    }
}
