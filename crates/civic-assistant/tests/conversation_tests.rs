//! End-to-end conversation behavior over real stores

use civic_assistant::{
    render_message, AssistantConfig, AssistantError, BuiltinRulebook, Conversation,
    DisplaySegment, LatencyConfig, RuleMatcher, Rulebook,
};
use civic_domain::traits::{MessageFeed, SessionStore};
use civic_domain::{Department, Message, MessageId, Partition, Role};
use civic_store::{MemoryStore, SqliteStore, StoreError, Subscription};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn portal() -> RuleMatcher {
    RuleMatcher::new(Rulebook::builtin(BuiltinRulebook::Portal).unwrap())
}

/// Store double whose writes can be switched off
struct FlakyStore {
    inner: MemoryStore,
    fail_appends: AtomicBool,
}

impl FlakyStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_appends: AtomicBool::new(false),
        }
    }

    fn set_failing(&self, failing: bool) {
        self.fail_appends.store(failing, Ordering::SeqCst);
    }
}

impl SessionStore for FlakyStore {
    type Error = StoreError;
    type Feed = Subscription;

    async fn append(&self, message: Message) -> Result<MessageId, StoreError> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(StoreError::InvalidData("network unavailable".to_string()));
        }
        self.inner.append(message).await
    }

    async fn history(&self, partition: &Partition) -> Result<Vec<Message>, StoreError> {
        self.inner.history(partition).await
    }

    fn subscribe(&self, partition: Partition) -> Result<Subscription, StoreError> {
        self.inner.subscribe(partition)
    }

    fn close(&self) {
        self.inner.close();
    }
}

#[tokio::test]
async fn test_documents_scenario_end_to_end() {
    let store = Arc::new(MemoryStore::new());
    let conversation = Conversation::from_config(store, &AssistantConfig::instant()).unwrap();
    conversation.switch_department(Department::Tax);

    let turn = conversation
        .send("What documents do I need to file?")
        .await
        .unwrap()
        .unwrap();

    let response = turn.reply.data.as_ref().unwrap();
    assert!(response.text.contains("W-2s"));
    assert!(response.citations.iter().any(|c| c.source.contains("IRS")));

    let segments = render_message(&turn.reply);
    assert!(segments.iter().any(|s| matches!(
        s,
        DisplaySegment::Link { label, .. } if label == "W-2s"
    )));
    assert!(segments.iter().all(DisplaySegment::is_resolved));
}

#[tokio::test]
async fn test_concurrent_open_bootstraps_once() {
    let store = Arc::new(MemoryStore::new());
    let conversation = Arc::new(Conversation::new(
        store.clone(),
        portal(),
        LatencyConfig::instant(),
    ));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let conversation = Arc::clone(&conversation);
        handles.push(tokio::spawn(async move {
            conversation.open(Department::Vehicle).await.map(|_| ())
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let history = conversation.history(Department::Vehicle).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].role, Role::Assistant);
    assert_eq!(history[0].content, "How can I help you with Vehicle Services?");
}

#[tokio::test]
async fn test_welcome_precedes_first_user_message() {
    let store = Arc::new(MemoryStore::new());
    let conversation = Conversation::new(store, portal(), LatencyConfig::instant());

    conversation.send("hello").await.unwrap();
    conversation.send("tax").await.unwrap();

    let history = conversation.history(Department::Home).await.unwrap();
    let welcomes = history
        .iter()
        .filter(|m| m.content == "Welcome to CivicSphere.")
        .count();
    assert_eq!(welcomes, 1);
    assert_eq!(history[0].content, "Welcome to CivicSphere.");
    assert_eq!(history[1].role, Role::User);
    assert_eq!(history.len(), 5);
}

#[tokio::test]
async fn test_pending_reply_stays_in_original_department() {
    let store = Arc::new(MemoryStore::new());
    let conversation = Arc::new(Conversation::new(
        store,
        portal(),
        LatencyConfig::fixed(50),
    ));
    conversation.switch_department(Department::Vehicle);

    let pending = conversation.submit("What is the late fee?");
    conversation.switch_department(Department::Housing);

    let turn = pending.await.unwrap().unwrap().unwrap();
    assert_eq!(turn.reply.department, Department::Vehicle);
    assert_eq!(turn.rule.as_deref(), Some("vehicle-fees"));
    assert_eq!(conversation.department(), Department::Housing);

    assert_eq!(conversation.history(Department::Vehicle).await.unwrap().len(), 3);
    assert!(conversation.history(Department::Housing).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_latency_does_not_block_other_sessions() {
    let store = Arc::new(MemoryStore::new());
    let slow = Arc::new(Conversation::new(
        store.clone(),
        portal(),
        LatencyConfig::fixed(300),
    ));
    let fast = Conversation::new(store, portal(), LatencyConfig::instant());

    let pending = slow.submit("hello");
    let turn = tokio::time::timeout(Duration::from_millis(200), fast.send("hello"))
        .await
        .expect("fast session should not wait for the slow one")
        .unwrap();
    assert!(turn.is_some());
    assert!(!pending.is_finished());

    pending.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_store_failure_abandons_turn() {
    let store = Arc::new(FlakyStore::new());
    let conversation = Conversation::new(store.clone(), portal(), LatencyConfig::instant());
    conversation.switch_department(Department::Housing);
    conversation.ensure_welcome(Department::Housing).await.unwrap();

    store.set_failing(true);
    let result = conversation.send("income limit").await;
    assert!(matches!(result, Err(AssistantError::Store(_))));
    assert_eq!(conversation.history(Department::Housing).await.unwrap().len(), 1);

    // The session stays usable once the store recovers
    store.set_failing(false);
    let turn = conversation.send("income limit").await.unwrap().unwrap();
    assert_eq!(turn.rule.as_deref(), Some("housing-income-limits"));
    assert_eq!(conversation.history(Department::Housing).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_failed_bootstrap_is_retried_on_next_send() {
    let store = Arc::new(FlakyStore::new());
    let conversation = Conversation::new(store.clone(), portal(), LatencyConfig::instant());

    store.set_failing(true);
    assert!(conversation.send("hello").await.is_err());
    assert!(conversation.history(Department::Home).await.unwrap().is_empty());

    store.set_failing(false);
    conversation.send("hello").await.unwrap();
    let history = conversation.history(Department::Home).await.unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].content, "Welcome to CivicSphere.");
}

#[tokio::test]
async fn test_feed_follows_turns() {
    let store = Arc::new(SqliteStore::new(":memory:").unwrap());
    let conversation = Conversation::new(store, portal(), LatencyConfig::instant());
    conversation.switch_department(Department::Benefits);

    let mut feed = conversation.open(Department::Benefits).await.unwrap();
    let first = feed.next_snapshot().await.unwrap().unwrap();
    assert_eq!(first.len(), 1);

    conversation.send("how do I apply").await.unwrap();

    // One snapshot per append; drain until both appends are visible
    let mut latest = first;
    while latest.len() < 3 {
        latest = feed.next_snapshot().await.unwrap().unwrap();
    }
    assert_eq!(latest[1].content, "how do I apply");
    assert!(latest[2].content.starts_with("To apply for benefits"));

    feed.restart();
    assert_eq!(feed.next_snapshot().await.unwrap().unwrap(), latest);

    conversation.store().close();
    assert!(feed.next_snapshot().await.is_none());
}
