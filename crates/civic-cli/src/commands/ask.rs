//! Ask command implementation.

use crate::cli::AskArgs;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use civic_assistant::{Conversation, LatencyConfig};
use civic_domain::traits::SessionStore;
use std::sync::Arc;

/// Execute the ask command.
pub async fn execute_ask<S: SessionStore>(
    args: AskArgs,
    store: Arc<S>,
    config: &Config,
    formatter: &Formatter,
) -> Result<()> {
    let mut assistant = config.assistant.clone();
    if args.instant {
        assistant.latency = LatencyConfig::instant();
    }

    let conversation = Conversation::from_config(store, &assistant)?;
    conversation.switch_department(args.department.into());

    let question = args.question.join(" ");
    let turn = conversation
        .send(&question)
        .await?
        .ok_or_else(|| CliError::InvalidInput("Question is empty".to_string()))?;

    println!("{}", formatter.format_turn(&turn)?);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::DepartmentArg;
    use crate::config::OutputFormat;
    use civic_domain::Department;
    use civic_store::SqliteStore;

    fn args(question: &[&str], department: DepartmentArg) -> AskArgs {
        AskArgs {
            question: question.iter().map(|s| s.to_string()).collect(),
            department,
            instant: true,
        }
    }

    #[tokio::test]
    async fn test_ask_records_one_turn() {
        let store = Arc::new(SqliteStore::new(":memory:").unwrap());
        let formatter = Formatter::new(OutputFormat::Quiet, false);

        execute_ask(
            args(&["how", "do", "I", "apply"], DepartmentArg::Benefits),
            store.clone(),
            &Config::default(),
            &formatter,
        )
        .await
        .unwrap();

        let sessions = store.sessions().unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].partition.department, Department::Benefits);
        // welcome, question, reply
        assert_eq!(sessions[0].message_count, 3);
    }

    #[tokio::test]
    async fn test_blank_question_rejected() {
        let store = Arc::new(SqliteStore::new(":memory:").unwrap());
        let formatter = Formatter::new(OutputFormat::Quiet, false);

        let result = execute_ask(
            args(&["  "], DepartmentArg::Home),
            store,
            &Config::default(),
            &formatter,
        )
        .await;
        assert!(matches!(result, Err(CliError::InvalidInput(_))));
    }
}
