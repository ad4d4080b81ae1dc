//! Conversation service: bootstrap, turns and department switching

use crate::clock::MonotonicClock;
use crate::config::AssistantConfig;
use crate::latency::LatencyConfig;
use crate::matcher::RuleMatcher;
use crate::AssistantError;
use civic_domain::traits::SessionStore;
use civic_domain::{Department, Message, Partition, SessionId};
use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// One completed exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    /// Message the user sent
    pub user: Message,

    /// Assistant reply
    pub reply: Message,

    /// Rule that produced the reply; `None` for a fallback
    pub rule: Option<String>,
}

/// A single visitor's conversation across departments
///
/// Owns its session token and the active department. Messages are filed
/// under the partition of the department active when the input was sent,
/// even if the user switches while the reply is pending.
///
/// # Examples
///
/// ```
/// use civic_assistant::{AssistantConfig, Conversation};
/// use civic_domain::Department;
/// use civic_store::MemoryStore;
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = Arc::new(MemoryStore::new());
/// let conversation = Conversation::from_config(store, &AssistantConfig::instant())?;
///
/// conversation.switch_department(Department::Vehicle);
/// let turn = conversation.send("What is the late fee?").await?.unwrap();
/// assert_eq!(turn.rule.as_deref(), Some("vehicle-fees"));
/// # Ok(())
/// # }
/// ```
pub struct Conversation<S: SessionStore> {
    store: Arc<S>,
    matcher: RuleMatcher,
    latency: LatencyConfig,
    session: SessionId,
    department: RwLock<Department>,
    // Held across the history check and the welcome append
    bootstrapped: Mutex<HashSet<Department>>,
    clock: MonotonicClock,
}

impl<S: SessionStore> Conversation<S> {
    /// Create a conversation with a fresh session token, starting at home
    pub fn new(store: Arc<S>, matcher: RuleMatcher, latency: LatencyConfig) -> Self {
        Self::with_session(store, matcher, latency, SessionId::generate())
    }

    /// Create a conversation that resumes an existing session
    pub fn with_session(
        store: Arc<S>,
        matcher: RuleMatcher,
        latency: LatencyConfig,
        session: SessionId,
    ) -> Self {
        info!("Starting conversation {}", session);
        Self {
            store,
            matcher,
            latency,
            session,
            department: RwLock::new(Department::Home),
            bootstrapped: Mutex::new(HashSet::new()),
            clock: MonotonicClock::new(),
        }
    }

    /// Build from configuration, loading the configured rulebook
    pub fn from_config(store: Arc<S>, config: &AssistantConfig) -> Result<Self, AssistantError> {
        config.validate()?;
        let matcher = RuleMatcher::new(config.load_rulebook()?);
        Ok(Self::new(store, matcher, config.latency))
    }

    /// Session token
    pub fn session(&self) -> &SessionId {
        &self.session
    }

    /// The matcher answering this conversation
    pub fn matcher(&self) -> &RuleMatcher {
        &self.matcher
    }

    /// The shared session store
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Currently active department
    pub fn department(&self) -> Department {
        *self.department.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Change the active department
    ///
    /// Messages already filed under the previous department stay there.
    pub fn switch_department(&self, department: Department) {
        let mut current = self.department.write().unwrap_or_else(|e| e.into_inner());
        if *current != department {
            debug!("Switching {} from {} to {}", self.session, *current, department);
            *current = department;
        }
    }

    /// Partition key for a department in this session
    pub fn partition(&self, department: Department) -> Partition {
        Partition::new(department, self.session.clone())
    }

    /// Open a live feed over a department's partition
    ///
    /// The partition is bootstrapped with its welcome message first if it
    /// is empty, so the feed's first snapshot is never empty.
    pub async fn open(&self, department: Department) -> Result<S::Feed, AssistantError> {
        let feed = self
            .store
            .subscribe(self.partition(department))
            .map_err(|e| store_failure("subscribe", e))?;
        self.ensure_welcome(department).await?;
        Ok(feed)
    }

    /// Stored messages for a department, in order
    pub async fn history(&self, department: Department) -> Result<Vec<Message>, AssistantError> {
        self.store
            .history(&self.partition(department))
            .await
            .map_err(|e| store_failure("read history", e))
    }

    /// Append the welcome message if the partition has no messages yet
    ///
    /// Runs at most once per department for this conversation, even when
    /// called concurrently.
    pub async fn ensure_welcome(&self, department: Department) -> Result<(), AssistantError> {
        let mut bootstrapped = self.bootstrapped.lock().await;
        if bootstrapped.contains(&department) {
            return Ok(());
        }

        let partition = self.partition(department);
        let existing = self
            .store
            .history(&partition)
            .await
            .map_err(|e| store_failure("read history", e))?;

        if existing.is_empty() {
            let welcome = Message::welcome(
                self.matcher.welcome(department),
                &partition,
                self.clock.now(),
            );
            self.store
                .append(welcome)
                .await
                .map_err(|e| store_failure("append welcome message", e))?;
            info!("Bootstrapped {}", partition);
        }

        bootstrapped.insert(department);
        Ok(())
    }

    /// Send input under the active department and wait for the reply
    ///
    /// Returns `Ok(None)` for blank input.
    pub async fn send(&self, input: &str) -> Result<Option<Turn>, AssistantError> {
        self.send_in(self.department(), input).await
    }

    /// Send input under an explicit department
    ///
    /// The user message is stored before the reply is computed; the reply
    /// is stored only after that append succeeds.
    pub async fn send_in(
        &self,
        department: Department,
        input: &str,
    ) -> Result<Option<Turn>, AssistantError> {
        let text = input.trim();
        if text.is_empty() {
            return Ok(None);
        }

        self.ensure_welcome(department).await?;

        let partition = self.partition(department);
        let user = Message::user(text, &partition, self.clock.now());
        self.store
            .append(user.clone())
            .await
            .map_err(|e| store_failure("append user message", e))?;

        self.latency.delay().await;

        let matched = self.matcher.match_input(text, department);
        let reply = Message::assistant(matched.response, &partition, self.clock.now());
        self.store
            .append(reply.clone())
            .await
            .map_err(|e| store_failure("append reply", e))?;

        debug!(
            "Answered in {} with {}",
            partition,
            matched.rule.as_deref().unwrap_or("fallback")
        );

        Ok(Some(Turn {
            user,
            reply,
            rule: matched.rule,
        }))
    }
}

impl<S: SessionStore + 'static> Conversation<S> {
    /// Send input in the background
    ///
    /// The department is captured now; switching before the task finishes
    /// does not move the reply.
    pub fn submit(
        self: &Arc<Self>,
        input: impl Into<String>,
    ) -> JoinHandle<Result<Option<Turn>, AssistantError>> {
        let conversation = Arc::clone(self);
        let department = self.department();
        let input = input.into();
        tokio::spawn(async move { conversation.send_in(department, &input).await })
    }
}

fn store_failure<E>(operation: &str, err: E) -> AssistantError
where
    E: std::error::Error + Send + Sync + 'static,
{
    error!("Failed to {}: {}", operation, err);
    AssistantError::Store(Box::new(err))
}
