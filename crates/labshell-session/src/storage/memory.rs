//! In-memory session storage.

use std::{
    collections::HashMap,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use async_trait::async_trait;
use chrono::Utc;
use labshell_core::{
    CommandHistory, CommandResult, Session, SessionError, SessionFilter, SessionId, SessionPage,
    SessionStatus, SessionStorage, Statistics,
    validation::{validate_command, validate_session_payload},
};
use serde_json::Value;
use uuid::Uuid;

use crate::MonotonicClock;

/// A stored session plus its insertion order, used to break timestamp ties.
struct Entry {
    seq: u64,
    session: Session,
}

#[derive(Default)]
struct Inner {
    sessions: HashMap<SessionId, Entry>,
    next_seq: u64,
    clock: MonotonicClock,
}

impl Inner {
    fn insert(&mut self, session: Session) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.sessions.insert(session.id, Entry { seq, session });
    }

    fn name_taken(&self, machine_name: &str, except: Option<SessionId>) -> bool {
        self.sessions
            .values()
            .any(|e| e.session.machine_name == machine_name && Some(e.session.id) != except)
    }
}

/// In-memory storage implementation.
///
/// Single-process only. Data is lost on restart.
#[derive(Default)]
pub struct MemoryStorage {
    inner: RwLock<Inner>,
}

impl MemoryStorage {
    /// Create an empty in-memory storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a storage preloaded with `sessions`, in the given order.
    #[must_use]
    pub fn with_sessions(sessions: Vec<Session>) -> Self {
        let mut inner = Inner::default();
        for session in sessions {
            inner.clock.observe(session.timestamp);
            inner.insert(session);
        }
        Self {
            inner: RwLock::new(inner),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>, SessionError> {
        self.inner
            .read()
            .map_err(|e| SessionError::Internal(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>, SessionError> {
        self.inner
            .write()
            .map_err(|e| SessionError::Internal(e.to_string()))
    }
}

#[async_trait]
impl SessionStorage for MemoryStorage {
    async fn list(&self, filter: &SessionFilter) -> Result<SessionPage, SessionError> {
        let inner = self.read()?;

        let mut matched: Vec<&Entry> = inner
            .sessions
            .values()
            .filter(|e| filter.matches(&e.session))
            .collect();

        // Newest first, oldest insertion first among equal timestamps
        matched.sort_by(|a, b| {
            b.session
                .timestamp
                .cmp(&a.session.timestamp)
                .then(a.seq.cmp(&b.seq))
        });

        let sorted = matched.into_iter().map(|e| e.session.clone()).collect();

        tracing::debug!(
            page = filter.page,
            limit = filter.limit,
            search = ?filter.search,
            status = ?filter.status,
            "Listing sessions"
        );

        Ok(SessionPage::slice(sorted, filter.page, filter.limit))
    }

    async fn get(&self, id: SessionId) -> Result<Session, SessionError> {
        self.read()?
            .sessions
            .get(&id)
            .map(|e| e.session.clone())
            .ok_or_else(|| SessionError::not_found(id))
    }

    async fn create(&self, payload: &Value) -> Result<Session, SessionError> {
        let draft = validate_session_payload(payload)?;
        let mut inner = self.write()?;

        if inner.name_taken(&draft.machine_name, None) {
            return Err(SessionError::Conflict {
                machine_name: draft.machine_name,
            });
        }

        let timestamp = inner.clock.tick();
        let session = Session::from_draft(Uuid::new_v4(), draft, timestamp);
        inner.insert(session.clone());

        tracing::info!(
            id = %session.id,
            "New session created: {} ({})",
            session.machine_name,
            session.ip_address
        );

        Ok(session)
    }

    async fn update(&self, id: SessionId, payload: &Value) -> Result<Session, SessionError> {
        let validated = validate_session_payload(payload);
        let mut inner = self.write()?;

        if !inner.sessions.contains_key(&id) {
            return Err(SessionError::not_found(id));
        }
        let draft = validated?;
        if inner.name_taken(&draft.machine_name, Some(id)) {
            return Err(SessionError::Conflict {
                machine_name: draft.machine_name,
            });
        }

        let timestamp = inner.clock.tick();
        let entry = inner
            .sessions
            .get_mut(&id)
            .ok_or_else(|| SessionError::not_found(id))?;
        entry.session.apply(draft, timestamp);

        tracing::info!(
            id = %id,
            "Session updated: {} ({})",
            entry.session.machine_name,
            entry.session.ip_address
        );

        Ok(entry.session.clone())
    }

    async fn delete(&self, id: SessionId) -> Result<Session, SessionError> {
        let session = self
            .write()?
            .sessions
            .remove(&id)
            .map(|e| e.session)
            .ok_or_else(|| SessionError::not_found(id))?;

        tracing::info!(
            id = %id,
            "Session deleted: {} ({})",
            session.machine_name,
            session.ip_address
        );

        Ok(session)
    }

    async fn append_command(
        &self,
        id: SessionId,
        command: &str,
    ) -> Result<(Session, CommandResult), SessionError> {
        let mut inner = self.write()?;

        let status = inner
            .sessions
            .get(&id)
            .map(|e| e.session.status)
            .ok_or_else(|| SessionError::not_found(id))?;
        if status != SessionStatus::Active {
            return Err(SessionError::InvalidState { status });
        }
        validate_command(command)?;

        let timestamp = inner.clock.tick();
        let entry = inner
            .sessions
            .get_mut(&id)
            .ok_or_else(|| SessionError::not_found(id))?;
        entry.session.record_command(command, timestamp);

        let result = CommandResult::simulated(command, &entry.session.machine_name, timestamp);

        tracing::info!(
            id = %id,
            "Command executed on {}: {}",
            entry.session.machine_name,
            command
        );

        Ok((entry.session.clone(), result))
    }

    async fn terminate_all(&self) -> Result<usize, SessionError> {
        let mut guard = self.write()?;
        let inner = &mut *guard;

        let mut terminated = 0;
        for entry in inner.sessions.values_mut() {
            if entry.session.is_active() {
                entry.session.status = SessionStatus::Inactive;
                entry.session.timestamp = inner.clock.tick();
                terminated += 1;
            }
        }

        tracing::info!("Terminated {terminated} active sessions");

        Ok(terminated)
    }

    async fn history(&self, id: SessionId) -> Result<CommandHistory, SessionError> {
        self.read()?
            .sessions
            .get(&id)
            .map(|e| e.session.history())
            .ok_or_else(|| SessionError::not_found(id))
    }

    async fn statistics(&self) -> Result<Statistics, SessionError> {
        let inner = self.read()?;
        Ok(Statistics::collect(
            inner.sessions.values().map(|e| &e.session),
            Utc::now(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::demo_sessions;

    async fn create(store: &MemoryStorage, name: &str, status: &str) -> Session {
        store
            .create(&json!({"machineName": name, "ipAddress": "10.0.0.5", "status": status}))
            .await
            .unwrap()
    }

    fn filter(page: usize, limit: usize) -> SessionFilter {
        SessionFilter {
            page,
            limit,
            ..SessionFilter::default()
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = MemoryStorage::new();
        let created = create(&store, "LABPC2", "active").await;

        assert_eq!(created.status, SessionStatus::Active);
        assert!(created.command_history.is_empty());
        assert_eq!(created.last_command, None);
        assert_eq!(store.get(created.id).await.unwrap(), created);
    }

    #[tokio::test]
    async fn test_create_many_distinct_ids() {
        let store = MemoryStorage::new();
        let mut ids = std::collections::HashSet::new();
        for i in 0..25 {
            let session = create(&store, &format!("HOST{i}"), "inactive").await;
            assert_ok!(store.get(session.id).await);
            ids.insert(session.id);
        }
        assert_eq!(ids.len(), 25);
    }

    #[tokio::test]
    async fn test_create_duplicate_name_conflicts() {
        let store = MemoryStorage::new();
        create(&store, "DUPNAME", "inactive").await;

        let err = store
            .create(&json!({"machineName": "DUPNAME", "ipAddress": "10.0.0.6"}))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            SessionError::Conflict {
                machine_name: "DUPNAME".to_string()
            }
        );

        let page = store.list(&SessionFilter::default()).await.unwrap();
        assert_eq!(page.pagination.total_items, 1);
    }

    #[tokio::test]
    async fn test_create_invalid_leaves_store_untouched() {
        let store = MemoryStorage::new();
        let err = store
            .create(&json!({"machineName": "x", "ipAddress": "nope"}))
            .await
            .unwrap_err();
        match err {
            SessionError::Validation(v) => assert_eq!(v.len(), 2),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(store.statistics().await.unwrap().total_sessions, 0);
    }

    #[tokio::test]
    async fn test_machine_name_is_case_sensitive() {
        let store = MemoryStorage::new();
        create(&store, "LabPC", "inactive").await;
        assert_ok!(
            store
                .create(&json!({"machineName": "LABPC", "ipAddress": "10.0.0.6"}))
                .await
        );
    }

    #[tokio::test]
    async fn test_update_replaces_fields() {
        let store = MemoryStorage::new();
        let created = store
            .create(&json!({
                "machineName": "LABPC2",
                "ipAddress": "10.0.0.5",
                "status": "active",
                "port": 4444,
                "notes": "first"
            }))
            .await
            .unwrap();
        store.append_command(created.id, "whoami").await.unwrap();

        let updated = store
            .update(
                created.id,
                &json!({"machineName": "LABPC3", "ipAddress": "10.0.0.7"}),
            )
            .await
            .unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.machine_name, "LABPC3");
        assert_eq!(updated.status, SessionStatus::Inactive);
        assert_eq!(updated.port, None);
        assert_eq!(updated.notes, None);
        assert_eq!(updated.command_history, vec!["whoami"]);
        assert!(updated.timestamp > created.timestamp);
    }

    #[tokio::test]
    async fn test_update_errors() {
        let store = MemoryStorage::new();
        let a = create(&store, "ALPHA", "inactive").await;
        create(&store, "BRAVO", "inactive").await;

        let missing = store
            .update(Uuid::new_v4(), &json!({"machineName": "X"}))
            .await
            .unwrap_err();
        assert!(matches!(missing, SessionError::NotFound(_)));

        let invalid = store.update(a.id, &json!({"machineName": "ALPHA"})).await;
        assert!(matches!(invalid, Err(SessionError::Validation(_))));

        let conflict = store
            .update(a.id, &json!({"machineName": "BRAVO", "ipAddress": "10.0.0.1"}))
            .await;
        assert!(matches!(conflict, Err(SessionError::Conflict { .. })));

        // Keeping its own name is fine
        assert_ok!(
            store
                .update(a.id, &json!({"machineName": "ALPHA", "ipAddress": "10.0.0.1"}))
                .await
        );
    }

    #[tokio::test]
    async fn test_delete_then_get() {
        let store = MemoryStorage::new();
        let created = create(&store, "GONE1", "inactive").await;

        let deleted = store.delete(created.id).await.unwrap();
        assert_eq!(deleted.id, created.id);
        assert_eq!(
            store.get(created.id).await,
            Err(SessionError::not_found(created.id))
        );
        assert_err!(store.delete(created.id).await);
    }

    #[tokio::test]
    async fn test_append_command_on_active_session() {
        let store = MemoryStorage::new();
        let created = create(&store, "LABPC2", "active").await;

        let (session, result) = store.append_command(created.id, "whoami").await.unwrap();

        assert_eq!(session.command_history, vec!["whoami"]);
        assert_eq!(session.last_command.as_deref(), Some("whoami"));
        assert!(session.timestamp > created.timestamp);
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.command, "whoami");

        let (again, _) = store.append_command(created.id, "pwd").await.unwrap();
        assert_eq!(again.command_history, vec!["whoami", "pwd"]);
        assert!(again.timestamp > session.timestamp);
    }

    #[tokio::test]
    async fn test_append_command_requires_active() {
        let store = MemoryStorage::new();
        for status in ["inactive", "connecting", "error"] {
            let created = create(&store, &format!("HOST{status}"), status).await;
            let err = store.append_command(created.id, "id").await.unwrap_err();
            assert!(matches!(err, SessionError::InvalidState { .. }));
            assert!(store.get(created.id).await.unwrap().command_history.is_empty());
        }
    }

    #[tokio::test]
    async fn test_append_command_error_order() {
        let store = MemoryStorage::new();
        let inactive = create(&store, "IDLE1", "inactive").await;
        let active = create(&store, "BUSY1", "active").await;

        assert!(matches!(
            store.append_command(Uuid::new_v4(), "").await,
            Err(SessionError::NotFound(_))
        ));
        assert!(matches!(
            store.append_command(inactive.id, "").await,
            Err(SessionError::InvalidState { .. })
        ));
        assert!(matches!(
            store.append_command(active.id, "").await,
            Err(SessionError::Validation(_))
        ));
        assert!(store.get(active.id).await.unwrap().command_history.is_empty());
    }

    #[tokio::test]
    async fn test_terminate_all() {
        let store = MemoryStorage::new();
        let a = create(&store, "ACTIVE1", "active").await;
        let b = create(&store, "ACTIVE2", "active").await;
        let c = create(&store, "ERROR1", "error").await;

        assert_eq!(store.terminate_all().await.unwrap(), 2);
        assert_eq!(store.get(a.id).await.unwrap().status, SessionStatus::Inactive);
        assert_eq!(store.get(b.id).await.unwrap().status, SessionStatus::Inactive);
        assert!(store.get(a.id).await.unwrap().timestamp > a.timestamp);
        assert_eq!(store.get(c.id).await.unwrap(), c);

        assert_eq!(store.terminate_all().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_history() {
        let store = MemoryStorage::new();
        let created = create(&store, "LABPC2", "active").await;
        store.append_command(created.id, "whoami").await.unwrap();
        store.append_command(created.id, "hostname").await.unwrap();

        let history = store.history(created.id).await.unwrap();
        assert_eq!(history.session_id, created.id);
        assert_eq!(history.machine_name, "LABPC2");
        assert_eq!(history.history, vec!["whoami", "hostname"]);
        assert_eq!(history.total_commands, 2);
        assert_eq!(history.last_command.as_deref(), Some("hostname"));

        assert_err!(store.history(Uuid::new_v4()).await);
    }

    #[tokio::test]
    async fn test_list_sorted_newest_first() {
        let store = MemoryStorage::new();
        let first = create(&store, "FIRST", "inactive").await;
        let second = create(&store, "SECOND", "inactive").await;
        let third = create(&store, "THIRD", "active").await;

        // Touching the first session moves it to the front
        store
            .update(first.id, &json!({"machineName": "FIRST", "ipAddress": "10.0.0.9"}))
            .await
            .unwrap();

        let page = store.list(&SessionFilter::default()).await.unwrap();
        let ids: Vec<_> = page.sessions.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![first.id, third.id, second.id]);

        for pair in page.sessions.windows(2) {
            assert!(pair[0].timestamp >= pair[1].timestamp);
        }
    }

    #[tokio::test]
    async fn test_list_ties_keep_insertion_order() {
        let now = Utc::now();
        let mut sessions = demo_sessions(now);
        for session in &mut sessions {
            session.timestamp = now;
        }
        let expected: Vec<_> = sessions.iter().map(|s| s.id).collect();
        let store = MemoryStorage::with_sessions(sessions);

        let page = store.list(&SessionFilter::default()).await.unwrap();
        let ids: Vec<_> = page.sessions.iter().map(|s| s.id).collect();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn test_list_status_and_search_filters() {
        let store = MemoryStorage::with_sessions(demo_sessions(Utc::now()));
        create(&store, "WEBSRV01", "active").await;

        let active = store
            .list(&SessionFilter {
                status: Some("active".to_string()),
                ..SessionFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(active.pagination.total_items, 2);
        assert!(active.sessions.iter().all(Session::is_active));

        let search = store
            .list(&SessionFilter {
                search: Some("ubuntu".to_string()),
                ..SessionFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(search.sessions.len(), 1);
        assert_eq!(search.sessions[0].machine_name, "LABLINUX001");

        let both = store
            .list(&SessionFilter {
                search: Some("lab".to_string()),
                status: Some("active".to_string()),
                ..SessionFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(both.sessions.len(), 1);
        assert_eq!(both.sessions[0].machine_name, "LABPC001");
    }

    #[tokio::test]
    async fn test_pages_concatenate_to_full_listing() {
        let store = MemoryStorage::new();
        for i in 0..11 {
            create(&store, &format!("NODE{i:02}"), "inactive").await;
        }

        let full = store.list(&filter(1, 100)).await.unwrap().sessions;
        let mut concatenated = Vec::new();
        let first = store.list(&filter(1, 4)).await.unwrap();
        assert_eq!(first.pagination.total_pages, 3);
        for page in 1..=first.pagination.total_pages {
            concatenated.extend(store.list(&filter(page, 4)).await.unwrap().sessions);
        }

        assert_eq!(concatenated, full);
    }

    #[tokio::test]
    async fn test_statistics() {
        let store = MemoryStorage::with_sessions(demo_sessions(Utc::now()));
        let stats = store.statistics().await.unwrap();

        assert_eq!(stats.total_sessions, 3);
        assert_eq!(stats.active_sessions, 1);
        assert_eq!(stats.inactive_sessions, 1);
        assert_eq!(stats.connecting_sessions, 1);
        assert_eq!(stats.error_sessions, 0);
        assert_eq!(stats.total_commands, 6);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_keep_names_unique() {
        let store = Arc::new(MemoryStorage::new());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .create(&json!({"machineName": "RACE", "ipAddress": "10.0.0.1"}))
                    .await
                    .is_ok()
            }));
        }

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap() {
                created += 1;
            }
        }
        assert_eq!(created, 1);
    }
}
