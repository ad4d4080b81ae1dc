//! Chat command implementation.

use crate::cli::ChatArgs;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use crate::repl;
use civic_assistant::{Conversation, RuleMatcher};
use civic_domain::traits::SessionStore;
use civic_domain::SessionId;
use std::sync::Arc;

/// Execute the chat command.
pub async fn execute_chat<S: SessionStore>(
    args: ChatArgs,
    store: Arc<S>,
    config: &Config,
    formatter: &Formatter,
) -> Result<()> {
    config.assistant.validate()?;
    let matcher = RuleMatcher::new(config.assistant.load_rulebook()?);

    let session = match args.session {
        Some(token) => SessionId::new(token).map_err(CliError::InvalidInput)?,
        None => SessionId::generate(),
    };

    let conversation = Conversation::with_session(store, matcher, config.assistant.latency, session);
    if let Some(department) = args.department {
        conversation.switch_department(department.into());
    }

    repl::run_repl(conversation, config.settings.history_size, formatter).await
}
