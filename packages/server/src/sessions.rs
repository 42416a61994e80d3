//! Session registry and the chat flow.
//!
//! Each browser session owns a schema field store, a conversation log, and
//! the download artifacts of its successful turns. Sessions are isolated:
//! nothing is shared across session IDs and nothing survives the process.
//!
//! The session state machine is Idle → Extracting → Idle. Rendered and
//! error outcomes surface as the HTTP response itself, so only the
//! in-flight distinction needs representing. It is held as a
//! one-permit semaphore rather than a stored flag: the permit is acquired
//! for the duration of the extract call and released when it drops, so a
//! request future cancelled mid-extraction (client disconnect) can never
//! leave the session wedged in Extracting.
//!
//! Sessions are deleted explicitly (the UI does so on page unload) or
//! swept by [`SessionRegistry::remove_expired`] once idle past a TTL.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock, Semaphore};
use uuid::Uuid;

use extract::{
    format, ConversationLog, ExtractError, Extractor, FieldType, FormatError, Role, SchemaField,
    SchemaFieldStore,
};

/// Errors surfaced by session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("unknown session")]
    UnknownSession,

    /// Submission with a blank URL, rejected before any API call.
    #[error("please enter a website URL first")]
    MissingUrl,

    /// A previous extraction for this session is still in flight.
    #[error("an extraction is already in progress for this session")]
    Busy,

    #[error("field index {0} is out of range")]
    FieldIndex(usize),

    #[error("no downloadable artifact for that turn")]
    ArtifactNotFound,

    #[error(transparent)]
    Extraction(#[from] ExtractError),

    #[error("formatting error: {0}")]
    Format(#[from] FormatError),
}

/// Where a session sits in its request cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Idle,
    Extracting,
}

/// Download artifact flavor for a successful turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Json,
    Csv,
}

impl ArtifactKind {
    /// Fixed per-turn download filename.
    pub fn filename(self) -> &'static str {
        match self {
            ArtifactKind::Json => "extracted_data.json",
            ArtifactKind::Csv => "extracted_data.csv",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ArtifactKind::Json => "application/json",
            ArtifactKind::Csv => "text/csv",
        }
    }
}

/// Pre-rendered downloads for one successful assistant turn.
struct TurnArtifacts {
    json: Vec<u8>,
    csv: Vec<u8>,
}

/// Mutable state owned by one browser session.
struct Session {
    fields: SchemaFieldStore,
    log: ConversationLog,
    /// Keyed by the assistant turn's index in the log.
    artifacts: HashMap<usize, TurnArtifacts>,
    last_touched: Instant,
}

impl Session {
    fn new() -> Self {
        Self {
            fields: SchemaFieldStore::new(),
            log: ConversationLog::new(),
            artifacts: HashMap::new(),
            last_touched: Instant::now(),
        }
    }

    fn touch(&mut self) {
        self.last_touched = Instant::now();
    }
}

/// A live session: its state plus the one-permit in-flight gate.
struct SessionHandle {
    state: Mutex<Session>,
    in_flight: Semaphore,
}

impl SessionHandle {
    fn new() -> Self {
        Self {
            state: Mutex::new(Session::new()),
            in_flight: Semaphore::new(1),
        }
    }

    fn status(&self) -> SessionStatus {
        if self.in_flight.available_permits() == 0 {
            SessionStatus::Extracting
        } else {
            SessionStatus::Idle
        }
    }
}

/// Schema-builder state as the UI needs it.
#[derive(Debug, Clone, Serialize)]
pub struct FieldsView {
    pub fields: Vec<SchemaField>,
    pub can_add: bool,
    pub can_remove: bool,
}

impl FieldsView {
    fn of(store: &SchemaFieldStore) -> Self {
        Self {
            fields: store.fields().to_vec(),
            can_add: store.can_add(),
            can_remove: store.can_remove(),
        }
    }
}

/// One transcript entry as the UI needs it.
#[derive(Debug, Clone, Serialize)]
pub struct TurnView {
    pub index: usize,
    pub role: Role,
    pub content: String,
    /// True when JSON/CSV downloads exist for this turn.
    pub has_downloads: bool,
}

/// Full session state for the UI.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub status: SessionStatus,
    #[serde(flatten)]
    pub schema: FieldsView,
    pub turns: Vec<TurnView>,
}

/// Outcome of one successful chat turn.
#[derive(Debug, Clone, Serialize)]
pub struct ChatOutcome {
    /// Markdown table rendered from the extracted records.
    pub table: String,
    /// Assistant turn index, used to build download URLs.
    pub turn: usize,
    pub record_count: usize,
}

/// In-memory registry of all live sessions.
///
/// The registry lock only guards the session map; each session has its own
/// mutex, so a long extraction in one session never blocks another.
pub struct SessionRegistry {
    extractor: Arc<dyn Extractor>,
    sessions: RwLock<HashMap<Uuid, Arc<SessionHandle>>>,
}

impl SessionRegistry {
    pub fn new(extractor: Arc<dyn Extractor>) -> Self {
        Self {
            extractor,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Create a fresh session: one blank schema field, empty transcript.
    pub async fn create_session(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.sessions
            .write()
            .await
            .insert(id, Arc::new(SessionHandle::new()));
        tracing::info!(session = %id, "Session created");
        id
    }

    /// Drop a session and everything it owns.
    pub async fn delete_session(&self, id: Uuid) -> Result<(), SessionError> {
        match self.sessions.write().await.remove(&id) {
            Some(_) => {
                tracing::info!(session = %id, "Session deleted");
                Ok(())
            }
            None => Err(SessionError::UnknownSession),
        }
    }

    /// Evict sessions idle for at least `max_idle`. Sessions with an
    /// extraction in flight are kept regardless of age. Returns the number
    /// evicted.
    pub async fn remove_expired(&self, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.write().await;

        let expired: Vec<Uuid> = sessions
            .iter()
            .filter_map(|(id, handle)| {
                if handle.in_flight.available_permits() == 0 {
                    return None;
                }
                // A state lock held elsewhere means the session is in use.
                let guard = handle.state.try_lock().ok()?;
                (guard.last_touched.elapsed() >= max_idle).then_some(*id)
            })
            .collect();

        for id in &expired {
            sessions.remove(id);
        }
        if !expired.is_empty() {
            tracing::info!(
                evicted = expired.len(),
                remaining = sessions.len(),
                "Expired sessions evicted"
            );
        }
        expired.len()
    }

    async fn get(&self, id: Uuid) -> Result<Arc<SessionHandle>, SessionError> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(SessionError::UnknownSession)
    }

    pub async fn snapshot(&self, id: Uuid) -> Result<SessionSnapshot, SessionError> {
        let session = self.get(id).await?;
        let status = session.status();
        let mut guard = session.state.lock().await;
        guard.touch();
        let turns = guard
            .log
            .turns()
            .iter()
            .enumerate()
            .map(|(index, turn)| TurnView {
                index,
                role: turn.role,
                content: turn.content.clone(),
                has_downloads: guard.artifacts.contains_key(&index),
            })
            .collect();
        Ok(SessionSnapshot {
            id,
            status,
            schema: FieldsView::of(&guard.fields),
            turns,
        })
    }

    /// Append a blank schema field. No-op once the store is at capacity.
    pub async fn add_field(&self, id: Uuid) -> Result<FieldsView, SessionError> {
        let session = self.get(id).await?;
        let mut guard = session.state.lock().await;
        guard.touch();
        guard.fields.add_field();
        Ok(FieldsView::of(&guard.fields))
    }

    /// Remove a schema field. No-op on the last remaining slot.
    pub async fn remove_field(&self, id: Uuid, index: usize) -> Result<FieldsView, SessionError> {
        let session = self.get(id).await?;
        let mut guard = session.state.lock().await;
        guard.touch();
        guard.fields.remove_field(index);
        Ok(FieldsView::of(&guard.fields))
    }

    /// Overwrite a schema field in place.
    pub async fn update_field(
        &self,
        id: Uuid,
        index: usize,
        name: &str,
        field_type: FieldType,
    ) -> Result<FieldsView, SessionError> {
        let session = self.get(id).await?;
        let mut guard = session.state.lock().await;
        guard.touch();
        if !guard.fields.update_field(index, name, field_type) {
            return Err(SessionError::FieldIndex(index));
        }
        Ok(FieldsView::of(&guard.fields))
    }

    /// Clear the transcript and its artifacts. Schema fields survive.
    pub async fn reset(&self, id: Uuid) -> Result<(), SessionError> {
        let session = self.get(id).await?;
        let mut guard = session.state.lock().await;
        guard.touch();
        guard.log.reset();
        guard.artifacts.clear();
        tracing::info!(session = %id, "Conversation reset");
        Ok(())
    }

    /// Run one chat turn: compile the schema, call the extractor, render
    /// the table, append both turns, store download artifacts.
    ///
    /// Any failure leaves the transcript untouched and the session Idle;
    /// a failed call yields nothing rendered.
    pub async fn chat(
        &self,
        id: Uuid,
        url: &str,
        prompt: &str,
    ) -> Result<ChatOutcome, SessionError> {
        let session = self.get(id).await?;

        if url.trim().is_empty() {
            return Err(SessionError::MissingUrl);
        }

        // The in-flight permit is what blocks a second submission. It is
        // released when dropped, on every exit path including this future
        // being cancelled by a client disconnect.
        let _permit = session
            .in_flight
            .try_acquire()
            .map_err(|_| SessionError::Busy)?;

        let schema = {
            let mut guard = session.state.lock().await;
            guard.touch();
            guard.fields.compile()
        };

        tracing::info!(
            session = %id,
            url = %url.trim(),
            schema_fields = schema.as_ref().map(|s| s.len()).unwrap_or(0),
            "Extracting data from website"
        );

        // The session mutex is NOT held across the call, so other session
        // operations (snapshots, field edits) proceed meanwhile.
        let urls = vec![url.trim().to_string()];
        let outcome = self.extractor.extract(&urls, prompt, schema.as_ref()).await;

        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(session = %id, error = %e, "Extraction failed");
                return Err(e.into());
            }
        };

        let table = format::to_markdown_table(&result.records);
        let json = format::to_json_pretty(&result.raw)?;
        let csv = format::to_csv(&result.records)?;

        let mut guard = session.state.lock().await;
        guard.touch();
        guard.log.append(Role::User, prompt);
        let turn = guard.log.len();
        guard.log.append(Role::Assistant, table.clone());
        guard.artifacts.insert(turn, TurnArtifacts { json, csv });

        tracing::info!(
            session = %id,
            records = result.records.len(),
            turn,
            "Extraction rendered"
        );

        Ok(ChatOutcome {
            table,
            turn,
            record_count: result.records.len(),
        })
    }

    /// Fetch a stored download artifact for a successful turn.
    pub async fn artifact(
        &self,
        id: Uuid,
        turn: usize,
        kind: ArtifactKind,
    ) -> Result<Vec<u8>, SessionError> {
        let session = self.get(id).await?;
        let mut guard = session.state.lock().await;
        guard.touch();
        let artifacts = guard
            .artifacts
            .get(&turn)
            .ok_or(SessionError::ArtifactNotFound)?;
        Ok(match kind {
            ArtifactKind::Json => artifacts.json.clone(),
            ArtifactKind::Csv => artifacts.csv.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use extract::MockExtractor;
    use serde_json::json;

    fn registry(mock: &MockExtractor) -> SessionRegistry {
        SessionRegistry::new(Arc::new(mock.clone()))
    }

    #[tokio::test]
    async fn test_new_session_snapshot() {
        let mock = MockExtractor::new();
        let registry = registry(&mock);
        let id = registry.create_session().await;

        let snapshot = registry.snapshot(id).await.unwrap();
        assert_eq!(snapshot.status, SessionStatus::Idle);
        assert_eq!(snapshot.schema.fields.len(), 1);
        assert!(snapshot.turns.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let mock = MockExtractor::new();
        let registry = registry(&mock);
        let err = registry.snapshot(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, SessionError::UnknownSession));
    }

    #[tokio::test]
    async fn test_delete_session() {
        let mock = MockExtractor::new();
        let registry = registry(&mock);
        let id = registry.create_session().await;

        registry.delete_session(id).await.unwrap();
        let err = registry.snapshot(id).await.unwrap_err();
        assert!(matches!(err, SessionError::UnknownSession));

        let err = registry.delete_session(id).await.unwrap_err();
        assert!(matches!(err, SessionError::UnknownSession));
    }

    #[tokio::test]
    async fn test_remove_expired_evicts_idle_sessions() {
        let mock = MockExtractor::new();
        let registry = registry(&mock);
        let first = registry.create_session().await;
        let second = registry.create_session().await;

        // Nothing is old enough for a generous TTL.
        assert_eq!(registry.remove_expired(Duration::from_secs(3600)).await, 0);
        registry.snapshot(first).await.unwrap();

        // A zero TTL expires everything idle.
        assert_eq!(registry.remove_expired(Duration::ZERO).await, 2);
        assert!(matches!(
            registry.snapshot(first).await.unwrap_err(),
            SessionError::UnknownSession
        ));
        assert!(matches!(
            registry.snapshot(second).await.unwrap_err(),
            SessionError::UnknownSession
        ));
    }

    #[tokio::test]
    async fn test_blank_url_rejected_without_call() {
        let mock = MockExtractor::new();
        let registry = registry(&mock);
        let id = registry.create_session().await;

        let err = registry.chat(id, "   ", "get the title").await.unwrap_err();
        assert!(matches!(err, SessionError::MissingUrl));
        assert_eq!(mock.call_count(), 0);
        assert!(registry.snapshot(id).await.unwrap().turns.is_empty());
    }

    #[tokio::test]
    async fn test_successful_turn_appends_and_stores_artifacts() {
        let mock =
            MockExtractor::new().with_response(json!({"data": {"title": "Example Domain"}}));
        let registry = registry(&mock);
        let id = registry.create_session().await;
        registry.update_field(id, 0, "title", FieldType::Str).await.unwrap();

        let outcome = registry
            .chat(id, "https://example.com", "get the title")
            .await
            .unwrap();
        assert_eq!(outcome.record_count, 1);
        assert!(outcome.table.contains("Example Domain"));

        // Compiled schema was sent with the request.
        let call = &mock.calls()[0];
        assert_eq!(call.urls, vec!["https://example.com"]);
        let schema = call.schema.as_ref().unwrap();
        assert_eq!(schema.properties["title"].json_type, "string");

        let snapshot = registry.snapshot(id).await.unwrap();
        assert_eq!(snapshot.turns.len(), 2);
        assert_eq!(snapshot.turns[0].role, Role::User);
        assert_eq!(snapshot.turns[1].role, Role::Assistant);
        assert!(snapshot.turns[1].has_downloads);
        assert_eq!(snapshot.status, SessionStatus::Idle);

        let json_bytes = registry.artifact(id, outcome.turn, ArtifactKind::Json).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&json_bytes).unwrap();
        assert_eq!(parsed["data"]["title"], "Example Domain");

        let csv_bytes = registry.artifact(id, outcome.turn, ArtifactKind::Csv).await.unwrap();
        assert_eq!(String::from_utf8(csv_bytes).unwrap(), "title\nExample Domain\n");
    }

    #[tokio::test]
    async fn test_failed_turn_appends_nothing() {
        let mock = MockExtractor::new().with_error(ExtractError::MissingData);
        let registry = registry(&mock);
        let id = registry.create_session().await;

        let err = registry
            .chat(id, "https://example.com", "anything")
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Extraction(ExtractError::MissingData)));

        let snapshot = registry.snapshot(id).await.unwrap();
        assert!(snapshot.turns.is_empty());
        assert_eq!(snapshot.status, SessionStatus::Idle);
    }

    #[tokio::test]
    async fn test_blank_schema_omitted_from_request() {
        let mock = MockExtractor::new().with_response(json!({"data": []}));
        let registry = registry(&mock);
        let id = registry.create_session().await;

        registry.chat(id, "https://example.com", "free form").await.unwrap();
        assert!(mock.calls()[0].schema.is_none());
    }

    #[tokio::test]
    async fn test_empty_record_list_renders_empty_table() {
        let mock = MockExtractor::new().with_response(json!({"data": []}));
        let registry = registry(&mock);
        let id = registry.create_session().await;

        let outcome = registry.chat(id, "https://example.com", "anything").await.unwrap();
        assert_eq!(outcome.record_count, 0);
        assert_eq!(outcome.table, "");

        let snapshot = registry.snapshot(id).await.unwrap();
        assert_eq!(snapshot.turns.len(), 2);
    }

    #[tokio::test]
    async fn test_reset_clears_turns_and_artifacts_but_not_fields() {
        let mock = MockExtractor::new().with_response(json!({"data": {"a": 1}}));
        let registry = registry(&mock);
        let id = registry.create_session().await;
        registry.update_field(id, 0, "a", FieldType::Int).await.unwrap();

        let outcome = registry.chat(id, "https://example.com", "a").await.unwrap();
        registry.reset(id).await.unwrap();

        let snapshot = registry.snapshot(id).await.unwrap();
        assert!(snapshot.turns.is_empty());
        assert_eq!(snapshot.schema.fields[0].name, "a");

        let err = registry.artifact(id, outcome.turn, ArtifactKind::Json).await.unwrap_err();
        assert!(matches!(err, SessionError::ArtifactNotFound));
    }

    #[tokio::test]
    async fn test_field_ops_respect_store_invariants() {
        let mock = MockExtractor::new();
        let registry = registry(&mock);
        let id = registry.create_session().await;

        for _ in 0..6 {
            registry.add_field(id).await.unwrap();
        }
        let view = registry.snapshot(id).await.unwrap().schema;
        assert_eq!(view.fields.len(), 5);
        assert!(!view.can_add);

        for _ in 0..6 {
            registry.remove_field(id, 0).await.unwrap();
        }
        let view = registry.snapshot(id).await.unwrap().schema;
        assert_eq!(view.fields.len(), 1);
        assert!(!view.can_remove);

        let err = registry.update_field(id, 9, "x", FieldType::Str).await.unwrap_err();
        assert!(matches!(err, SessionError::FieldIndex(9)));
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let mock = MockExtractor::new().with_response(json!({"data": {"a": 1}}));
        let registry = registry(&mock);
        let first = registry.create_session().await;
        let second = registry.create_session().await;

        registry.update_field(first, 0, "a", FieldType::Int).await.unwrap();
        registry.chat(first, "https://example.com", "a").await.unwrap();

        let snapshot = registry.snapshot(second).await.unwrap();
        assert!(snapshot.turns.is_empty());
        assert!(!snapshot.schema.fields[0].is_named());
    }
}
