//! # Draft Sessions
//!
//! Invoices being written, one per open tab.
//!
//! ## Session Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Draft Session Operations                             │
//! │                                                                         │
//! │  Front end action         Store call               Session change       │
//! │  ────────────────         ──────────               ──────────────       │
//! │                                                                         │
//! │  Open new tab ───────────► create(label) ────────► sessions.push(..)    │
//! │                                                                         │
//! │  Edit a line ────────────► with_draft_mut(id, f) ► f(&mut draft)        │
//! │                                                                         │
//! │  Rename tab ─────────────► rename(id, label) ────► label = ..           │
//! │                                                                         │
//! │  Close tab ──────────────► dispose(id) ──────────► sessions.remove(..)  │
//! │                            (refused for the last one)                   │
//! │                                                                         │
//! │  Save invoice ───────────► begin_commit(id) ─────► committing = true    │
//! │                            guard dropped ────────► reset on success     │
//! │  NOTE: All operations take the Mutex. Closures must not block.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The store itself does no I/O. The commands layer writes each changed
//! session to the `invoice_drafts` table and rebuilds the store from it on
//! start-up with [`DraftStore::restore`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tillbook_core::{CoreError, CoreResult, InvoiceDraft, Money};
use tillbook_db::StoredDraft;

/// Label given to a session nobody has named.
pub const DEFAULT_SESSION_LABEL: &str = "New Invoice";

/// One open invoice tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftSession {
    pub id: String,
    pub label: String,
    pub draft: InvoiceDraft,
    /// Set while the draft is being saved as an invoice.
    #[serde(skip)]
    committing: bool,
}

impl DraftSession {
    fn new(label: Option<&str>, draft: InvoiceDraft) -> Self {
        DraftSession {
            id: Uuid::new_v4().to_string(),
            label: session_label(label),
            draft,
            committing: false,
        }
    }

    pub fn is_committing(&self) -> bool {
        self.committing
    }
}

/// Tab strip entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: String,
    pub label: String,
    pub position: usize,
    pub line_count: usize,
    pub grand_total: Money,
}

fn session_label(label: Option<&str>) -> String {
    match label.map(str::trim) {
        Some(l) if !l.is_empty() => l.to_string(),
        _ => DEFAULT_SESSION_LABEL.to_string(),
    }
}

/// Keyed store of draft sessions, in tab order.
///
/// There is always at least one session.
#[derive(Debug, Clone)]
pub struct DraftStore {
    sessions: Arc<Mutex<Vec<DraftSession>>>,
}

impl DraftStore {
    /// A store holding one empty session.
    pub fn new(initial: InvoiceDraft) -> Self {
        DraftStore {
            sessions: Arc::new(Mutex::new(vec![DraftSession::new(None, initial)])),
        }
    }

    /// Rebuilds the store from saved rows (already in tab order).
    ///
    /// With nothing saved, starts with one session holding `fresh`.
    pub fn restore(stored: Vec<StoredDraft>, fresh: InvoiceDraft) -> Self {
        if stored.is_empty() {
            return DraftStore::new(fresh);
        }

        let sessions = stored
            .into_iter()
            .map(|s| DraftSession {
                id: s.session_id,
                label: session_label(Some(&s.label)),
                draft: s.draft,
                committing: false,
            })
            .collect();

        DraftStore {
            sessions: Arc::new(Mutex::new(sessions)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<DraftSession>> {
        // A panic inside a closure leaves the drafts themselves intact.
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Opens a new session at the end of the tab strip.
    pub fn create(&self, label: Option<&str>, draft: InvoiceDraft) -> DraftSession {
        let session = DraftSession::new(label, draft);
        self.lock().push(session.clone());
        session
    }

    /// A copy of one session.
    pub fn get(&self, id: &str) -> CoreResult<DraftSession> {
        self.lock()
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| CoreError::SessionNotFound(id.to_string()))
    }

    /// Tab index of a session.
    pub fn position(&self, id: &str) -> CoreResult<usize> {
        self.lock()
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| CoreError::SessionNotFound(id.to_string()))
    }

    /// Executes a function with read access to one draft.
    pub fn with_draft<F, R>(&self, id: &str, f: F) -> CoreResult<R>
    where
        F: FnOnce(&InvoiceDraft) -> R,
    {
        let sessions = self.lock();
        let session = sessions
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| CoreError::SessionNotFound(id.to_string()))?;
        Ok(f(&session.draft))
    }

    /// Executes a function with write access to one draft.
    ///
    /// `f` works on a copy that replaces the draft only when it returns
    /// `Ok`, so a rejected edit leaves the session untouched.
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let index = drafts.with_draft_mut(&id, |d| d.add_line(LineKind::Manual))?;
    /// ```
    ///
    /// ## Errors
    /// * `CoreError::SessionNotFound` - no such session
    /// * `CoreError::CommitInProgress` - the session is being committed
    pub fn with_draft_mut<F, R>(&self, id: &str, f: F) -> CoreResult<R>
    where
        F: FnOnce(&mut InvoiceDraft) -> CoreResult<R>,
    {
        let mut sessions = self.lock();
        let session = sessions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| CoreError::SessionNotFound(id.to_string()))?;
        if session.committing {
            return Err(CoreError::CommitInProgress);
        }

        let mut draft = session.draft.clone();
        let result = f(&mut draft)?;
        session.draft = draft;
        Ok(result)
    }

    /// Claims a session for committing and returns its draft.
    ///
    /// Until the returned guard is dropped, further commits, edits and
    /// closing of the session fail with `CoreError::CommitInProgress`.
    pub fn begin_commit(&self, id: &str) -> CoreResult<(InvoiceDraft, CommitGuard)> {
        let mut sessions = self.lock();
        let session = sessions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| CoreError::SessionNotFound(id.to_string()))?;
        if session.committing {
            return Err(CoreError::CommitInProgress);
        }
        session.committing = true;

        let guard = CommitGuard {
            store: self.clone(),
            session_id: id.to_string(),
            committed: false,
        };
        Ok((session.draft.clone(), guard))
    }

    fn end_commit(&self, id: &str, committed: bool) {
        let mut sessions = self.lock();
        if let Some(session) = sessions.iter_mut().find(|s| s.id == id) {
            session.committing = false;
            if committed {
                session.draft.reset();
            }
        }
    }

    pub fn list(&self) -> Vec<SessionSummary> {
        self.lock()
            .iter()
            .enumerate()
            .map(|(position, s)| SessionSummary {
                id: s.id.clone(),
                label: s.label.clone(),
                position,
                line_count: s.draft.lines().len(),
                grand_total: s.draft.totals().grand_total,
            })
            .collect()
    }

    /// Renames a tab. A blank label falls back to the default.
    pub fn rename(&self, id: &str, label: &str) -> CoreResult<()> {
        let mut sessions = self.lock();
        let session = sessions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| CoreError::SessionNotFound(id.to_string()))?;
        session.label = session_label(Some(label));
        Ok(())
    }

    /// Closes a tab and drops its draft.
    ///
    /// ## Errors
    /// * `CoreError::LastSession` - it is the only open session
    /// * `CoreError::SessionNotFound` - no such session
    pub fn dispose(&self, id: &str) -> CoreResult<DraftSession> {
        let mut sessions = self.lock();
        let index = sessions
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| CoreError::SessionNotFound(id.to_string()))?;
        if sessions.len() == 1 {
            return Err(CoreError::LastSession);
        }
        if sessions[index].committing {
            return Err(CoreError::CommitInProgress);
        }
        Ok(sessions.remove(index))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Id of the first tab.
    pub fn first_id(&self) -> Option<String> {
        self.lock().first().map(|s| s.id.clone())
    }
}

/// Holds a session in the committing state.
///
/// Dropping it releases the session. After [`CommitGuard::committed`] the
/// draft is also reset, keeping the tab open.
#[derive(Debug)]
pub struct CommitGuard {
    store: DraftStore,
    session_id: String,
    committed: bool,
}

impl CommitGuard {
    /// The invoice was saved: reset the draft and release the session.
    pub fn committed(mut self) {
        self.committed = true;
    }
}

impl Drop for CommitGuard {
    fn drop(&mut self) {
        self.store.end_commit(&self.session_id, self.committed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tillbook_core::draft::LineField;
    use tillbook_core::LineKind;

    #[test]
    fn test_store_starts_with_one_session() {
        let store = DraftStore::new(InvoiceDraft::default());
        let sessions = store.list();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].label, DEFAULT_SESSION_LABEL);
        assert_eq!(sessions[0].line_count, 0);
    }

    #[test]
    fn test_sessions_are_independent() {
        let store = DraftStore::new(InvoiceDraft::default());
        let first = store.first_id().unwrap();
        let second = store.create(Some("Ravi"), InvoiceDraft::default()).id;

        store
            .with_draft_mut(&second, |d| {
                let line = d.add_line(LineKind::Manual)?;
                d.update_line(line, LineField::UnitPrice, "100")?;
                d.update_line(line, LineField::Quantity, "2")
            })
            .unwrap();

        assert_eq!(store.with_draft(&first, |d| d.lines().len()).unwrap(), 0);
        assert_eq!(store.with_draft(&second, |d| d.lines().len()).unwrap(), 1);
        assert_eq!(store.position(&second).unwrap(), 1);

        let list = store.list();
        assert_eq!(list[1].label, "Ravi");
        assert!(list[1].grand_total.is_positive());
    }

    #[test]
    fn test_rename_blank_falls_back() {
        let store = DraftStore::new(InvoiceDraft::default());
        let id = store.first_id().unwrap();

        store.rename(&id, "Asha").unwrap();
        assert_eq!(store.get(&id).unwrap().label, "Asha");

        store.rename(&id, "   ").unwrap();
        assert_eq!(store.get(&id).unwrap().label, DEFAULT_SESSION_LABEL);
    }

    #[test]
    fn test_last_session_cannot_be_disposed() {
        let store = DraftStore::new(InvoiceDraft::default());
        let first = store.first_id().unwrap();
        assert!(matches!(store.dispose(&first), Err(CoreError::LastSession)));

        let second = store.create(None, InvoiceDraft::default()).id;
        store.dispose(&first).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.first_id(), Some(second));
    }

    #[test]
    fn test_unknown_session() {
        let store = DraftStore::new(InvoiceDraft::default());
        assert!(matches!(store.get("nope"), Err(CoreError::SessionNotFound(_))));
        assert!(matches!(
            store.with_draft_mut("nope", |_| Ok(())),
            Err(CoreError::SessionNotFound(_))
        ));
        assert!(matches!(store.dispose("nope"), Err(CoreError::SessionNotFound(_))));
    }

    #[test]
    fn test_rejected_edit_leaves_draft() {
        let store = DraftStore::new(InvoiceDraft::default());
        let id = store.first_id().unwrap();
        store
            .with_draft_mut(&id, |d| d.add_line(LineKind::Manual).map(|_| ()))
            .unwrap();
        let before = store.get(&id).unwrap().draft;

        let result = store.with_draft_mut(&id, |d| {
            d.update_line(0, LineField::UnitPrice, "250")?;
            d.update_line(0, LineField::Quantity, "1000000")
        });
        assert!(result.is_err());
        assert_eq!(store.get(&id).unwrap().draft, before);
    }

    #[test]
    fn test_commit_claims_session() {
        let store = DraftStore::new(InvoiceDraft::default());
        let id = store.first_id().unwrap();
        let other = store.create(None, InvoiceDraft::default()).id;
        store
            .with_draft_mut(&id, |d| d.add_line(LineKind::Manual).map(|_| ()))
            .unwrap();

        let (draft, guard) = store.begin_commit(&id).unwrap();
        assert_eq!(draft.lines().len(), 1);
        assert!(store.get(&id).unwrap().is_committing());
        assert!(matches!(store.begin_commit(&id), Err(CoreError::CommitInProgress)));
        assert!(matches!(
            store.with_draft_mut(&id, |_| Ok(())),
            Err(CoreError::CommitInProgress)
        ));
        assert!(matches!(store.dispose(&id), Err(CoreError::CommitInProgress)));
        store.with_draft_mut(&other, |_| Ok(())).unwrap();

        // Failed commit: released, draft kept
        drop(guard);
        assert!(!store.get(&id).unwrap().is_committing());
        assert_eq!(store.get(&id).unwrap().draft.lines().len(), 1);

        // Successful commit: released, draft reset
        let (_, guard) = store.begin_commit(&id).unwrap();
        guard.committed();
        assert!(!store.get(&id).unwrap().is_committing());
        assert!(store.get(&id).unwrap().draft.lines().is_empty());
    }

    #[test]
    fn test_restore_keeps_order() {
        let mut named = InvoiceDraft::default();
        named.customer.name = "Fatima".into();
        let stored = vec![
            StoredDraft {
                session_id: "a".into(),
                label: "Fatima".into(),
                draft: named.clone(),
                position: 0,
            },
            StoredDraft {
                session_id: "b".into(),
                label: String::new(),
                draft: InvoiceDraft::default(),
                position: 1,
            },
        ];

        let store = DraftStore::restore(stored, InvoiceDraft::default());
        let list = store.list();
        assert_eq!(list.iter().map(|s| s.id.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(list[1].label, DEFAULT_SESSION_LABEL);
        assert_eq!(store.get("a").unwrap().draft, named);

        let empty = DraftStore::restore(Vec::new(), InvoiceDraft::default());
        assert_eq!(empty.len(), 1);
    }
}
