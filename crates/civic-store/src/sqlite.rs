//! SQLite-backed session store

use crate::feed::{ChangeNotifier, SnapshotSource, Subscription};
use crate::{check_created_at, stored_created_at, StoreError, DEFAULT_FEED_CAPACITY};
use civic_domain::traits::SessionStore;
use civic_domain::{Citation, Department, Message, MessageId, Partition, Response, Role, SessionId};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Stored form of a response payload
///
/// `citations` defaults to empty so that welcome payloads written as
/// `{"text": ...}` still decode.
#[derive(Debug, Serialize, Deserialize)]
struct ResponseRecord {
    text: String,
    #[serde(default)]
    citations: Vec<CitationRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CitationRecord {
    id: u32,
    source: String,
    url: String,
}

impl From<&Response> for ResponseRecord {
    fn from(response: &Response) -> Self {
        Self {
            text: response.text.clone(),
            citations: response
                .citations
                .iter()
                .map(|c| CitationRecord {
                    id: c.id,
                    source: c.source.clone(),
                    url: c.url.clone(),
                })
                .collect(),
        }
    }
}

impl From<ResponseRecord> for Response {
    fn from(record: ResponseRecord) -> Self {
        Response::new(
            record.text,
            record
                .citations
                .into_iter()
                .map(|c| Citation::new(c.id, c.source, c.url))
                .collect(),
        )
    }
}

/// One stored conversation, as listed by [`SqliteStore::sessions`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    /// Partition key
    pub partition: Partition,

    /// Number of messages in the partition
    pub message_count: usize,

    /// Timestamp of the newest message (ms since epoch)
    pub last_activity: u64,
}

/// SQLite-based implementation of [`SessionStore`]
///
/// The connection is opened once and shared behind a mutex by every handle.
/// Use `:memory:` for an in-memory database (useful for testing).
#[derive(Clone)]
pub struct SqliteStore {
    inner: Arc<SqliteInner>,
}

struct SqliteInner {
    conn: Mutex<Connection>,
    notifier: ChangeNotifier,
}

impl SqliteStore {
    /// Open (or create) a store at the given database path
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use civic_store::SqliteStore;
    ///
    /// let store = SqliteStore::new("civicsphere.db").unwrap();
    /// ```
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path.as_ref())?;
        conn.execute_batch(include_str!("schema.sql"))?;
        info!("Opened message log at {}", path.as_ref().display());

        Ok(Self {
            inner: Arc::new(SqliteInner {
                conn: Mutex::new(conn),
                notifier: ChangeNotifier::new(DEFAULT_FEED_CAPACITY),
            }),
        })
    }

    /// List stored conversations, most recently active first
    pub fn sessions(&self) -> Result<Vec<SessionSummary>, StoreError> {
        let conn = self.inner.conn.lock().unwrap_or_else(|e| e.into_inner());
        let mut stmt = conn.prepare(
            "SELECT department, session_id, COUNT(*), MAX(created_at)
             FROM messages
             GROUP BY department, session_id
             ORDER BY MAX(created_at) DESC",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(department, session, count, last)| {
                Ok(SessionSummary {
                    partition: Partition::new(
                        parse_department(&department)?,
                        SessionId::new(session).map_err(StoreError::InvalidData)?,
                    ),
                    message_count: usize::try_from(count).map_err(|_| {
                        StoreError::InvalidData(format!("Negative message count: {}", count))
                    })?,
                    last_activity: stored_created_at(last)?,
                })
            })
            .collect()
    }

    /// Convert MessageId to bytes for storage
    fn id_to_bytes(id: MessageId) -> Vec<u8> {
        id.value().to_be_bytes().to_vec()
    }

    /// Convert bytes to MessageId
    fn bytes_to_id(bytes: &[u8]) -> Result<MessageId, StoreError> {
        if bytes.len() != 16 {
            return Err(StoreError::InvalidData(format!(
                "Expected 16 bytes for MessageId, got {}",
                bytes.len()
            )));
        }
        let mut arr = [0u8; 16];
        arr.copy_from_slice(bytes);
        Ok(MessageId::from_value(u128::from_be_bytes(arr)))
    }
}

fn parse_department(s: &str) -> Result<Department, StoreError> {
    Department::parse(s).ok_or_else(|| StoreError::InvalidData(format!("Unknown department: {}", s)))
}

impl SqliteInner {
    fn insert(&self, message: Message) -> Result<MessageId, StoreError> {
        if self.notifier.is_closed() {
            return Err(StoreError::Closed);
        }

        let created_at = check_created_at(message.created_at)?;
        let id_bytes = SqliteStore::id_to_bytes(message.id);
        let data = message
            .data
            .as_ref()
            .map(|r| serde_json::to_string(&ResponseRecord::from(r)))
            .transpose()?;

        {
            let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());

            let exists: bool = conn
                .query_row(
                    "SELECT 1 FROM messages WHERE id = ?1",
                    params![&id_bytes],
                    |_| Ok(true),
                )
                .optional()?
                .unwrap_or(false);

            if exists {
                return Err(StoreError::Duplicate(message.id));
            }

            conn.execute(
                "INSERT INTO messages (id, department, session_id, role, content, data, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    &id_bytes,
                    message.department.as_str(),
                    message.session_id.as_str(),
                    message.role.as_str(),
                    &message.content,
                    data,
                    created_at,
                ],
            )?;
        }

        let partition = message.partition();
        debug!("Appended message {} to {}", message.id, partition);
        self.notifier.notify(partition);
        Ok(message.id)
    }
}

impl SnapshotSource for SqliteInner {
    fn snapshot(&self, partition: &Partition) -> Result<Vec<Message>, StoreError> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let mut stmt = conn.prepare(
            "SELECT id, role, content, data, created_at
             FROM messages
             WHERE department = ?1 AND session_id = ?2
             ORDER BY created_at, id",
        )?;

        let rows = stmt
            .query_map(
                params![partition.department.as_str(), partition.session.as_str()],
                |row| {
                    Ok((
                        row.get::<_, Vec<u8>>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, i64>(4)?,
                    ))
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id_bytes, role, content, data, created_at)| {
                let role = Role::parse(&role)
                    .ok_or_else(|| StoreError::InvalidData(format!("Unknown role: {}", role)))?;
                let data = data
                    .map(|json| serde_json::from_str::<ResponseRecord>(&json))
                    .transpose()?
                    .map(Response::from);

                Ok(Message {
                    id: SqliteStore::bytes_to_id(&id_bytes)?,
                    role,
                    content,
                    data,
                    department: partition.department,
                    session_id: partition.session.clone(),
                    created_at: stored_created_at(created_at)?,
                })
            })
            .collect()
    }

    fn is_closed(&self) -> bool {
        self.notifier.is_closed()
    }
}

impl SessionStore for SqliteStore {
    type Error = StoreError;
    type Feed = Subscription;

    async fn append(&self, message: Message) -> Result<MessageId, StoreError> {
        self.inner.insert(message)
    }

    async fn history(&self, partition: &Partition) -> Result<Vec<Message>, StoreError> {
        if self.inner.is_closed() {
            return Err(StoreError::Closed);
        }
        self.inner.snapshot(partition)
    }

    fn subscribe(&self, partition: Partition) -> Result<Subscription, StoreError> {
        let receiver = self.inner.notifier.receiver()?;
        let source: Arc<dyn SnapshotSource> = self.inner.clone();
        Ok(Subscription::new(partition, source, receiver))
    }

    fn close(&self) {
        info!("Closing message log");
        self.inner.notifier.close();
    }
}
