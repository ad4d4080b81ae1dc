//! History command implementation.

use crate::cli::HistoryArgs;
use crate::config::{Config, StoreBackend};
use crate::error::{CliError, Result};
use crate::output::Formatter;
use civic_domain::traits::SessionStore;
use civic_domain::{Partition, SessionId};

/// Execute the history command.
///
/// Lists stored sessions, or prints one partition's transcript when a
/// session token is given.
pub async fn execute_history(
    args: HistoryArgs,
    config: &Config,
    formatter: &Formatter,
) -> Result<()> {
    if config.store.backend != StoreBackend::Sqlite {
        return Err(CliError::Config(
            "history needs the sqlite store backend; conversations in memory end with the process"
                .to_string(),
        ));
    }

    let store = super::open_sqlite(&config.store)?;

    match args.session {
        Some(token) => {
            let session = SessionId::new(token).map_err(CliError::InvalidInput)?;
            let partition = Partition::new(args.department.into(), session);
            let messages = store.history(&partition).await?;
            println!("{}", formatter.format_transcript(&messages)?);
        }
        None => {
            println!("{}", formatter.format_sessions(&store.sessions()?)?);
        }
    }

    Ok(())
}
