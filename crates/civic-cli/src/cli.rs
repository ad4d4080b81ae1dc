//! CLI command definitions and argument parsing.

use civic_domain::Department;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// CivicSphere CLI - Ask the city services assistant.
#[derive(Debug, Parser)]
#[command(name = "civic")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path
    #[arg(short, long, global = true, env = "CIVIC_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
    /// Quiet format (plain text only)
    Quiet,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Chat interactively (default)
    Chat(ChatArgs),

    /// Ask a single question
    Ask(AskArgs),

    /// Show the rule table in evaluation order
    Rules(RulesArgs),

    /// List departments
    Departments,

    /// Show stored conversations (sqlite backend)
    History(HistoryArgs),
}

/// Arguments for the chat command.
#[derive(Debug, Default, Args)]
pub struct ChatArgs {
    /// Department to start in
    #[arg(short, long, value_enum)]
    pub department: Option<DepartmentArg>,

    /// Resume an existing session token
    #[arg(short, long)]
    pub session: Option<String>,
}

/// Arguments for the ask command.
#[derive(Debug, Args)]
pub struct AskArgs {
    /// Question text
    #[arg(required = true)]
    pub question: Vec<String>,

    /// Department context
    #[arg(short, long, value_enum, default_value = "home")]
    pub department: DepartmentArg,

    /// Skip the simulated reply delay
    #[arg(long)]
    pub instant: bool,
}

/// Arguments for the rules command.
#[derive(Debug, Args)]
pub struct RulesArgs {
    /// Only rules consulted under this department
    #[arg(short, long, value_enum)]
    pub department: Option<DepartmentArg>,
}

/// Arguments for the history command.
#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// Session token; lists sessions when omitted
    #[arg(short, long)]
    pub session: Option<String>,

    /// Department partition to show
    #[arg(short, long, value_enum, default_value = "home")]
    pub department: DepartmentArg,
}

/// Department argument.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum DepartmentArg {
    /// Portal home
    Home,
    /// Tax Office
    Tax,
    /// Vehicle Services
    Vehicle,
    /// Unemployment benefits
    Benefits,
    /// Housing Authority
    Housing,
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
            CliFormat::Quiet => crate::config::OutputFormat::Quiet,
        }
    }
}

impl From<DepartmentArg> for Department {
    fn from(department: DepartmentArg) -> Self {
        match department {
            DepartmentArg::Home => Department::Home,
            DepartmentArg::Tax => Department::Tax,
            DepartmentArg::Vehicle => Department::Vehicle,
            DepartmentArg::Benefits => Department::Benefits,
            DepartmentArg::Housing => Department::Housing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_means_chat() {
        let cli = Cli::parse_from(["civic"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_ask_command() {
        let cli = Cli::parse_from([
            "civic",
            "ask",
            "What",
            "documents",
            "do",
            "I",
            "need?",
            "--department",
            "tax",
            "--instant",
        ]);
        match cli.command {
            Some(Command::Ask(args)) => {
                assert_eq!(args.question.join(" "), "What documents do I need?");
                assert!(matches!(args.department, DepartmentArg::Tax));
                assert!(args.instant);
            }
            _ => panic!("Expected Ask command"),
        }
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from(["civic", "departments", "--format", "json", "--no-color"]);
        assert!(matches!(cli.format, Some(CliFormat::Json)));
        assert!(cli.no_color);
        assert!(matches!(cli.command, Some(Command::Departments)));
    }

    #[test]
    fn test_department_conversion() {
        let department: Department = DepartmentArg::Benefits.into();
        assert_eq!(department, Department::Benefits);
    }
}
