//! Import sessions: one per upload, keyed by an opaque id.
//!
//! State moves `FileReceived → Detected → Matching → Reviewing` and ends in
//! propagation or discard, both of which purge the session. A propagation
//! with failed records keeps the session in `Reviewing` so it can be retried.
//! Sessions left idle past the timeout are dropped on the next upload.

use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::matcher::{match_table, MatchCandidate, MatchReport};
use super::normalize::{detect_title_column, TitleColumn};
use super::propagate::{propagate, PropagationReport, RecordOutcome};
use super::table::Table;
use crate::error::{AppError, AppResult};
use crate::repository::RecordStore;

pub const DEFAULT_PAGE_SIZE: usize = 25;
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportState {
    Idle,
    FileReceived,
    Detected,
    Matching,
    Reviewing,
    Propagating,
    Discarding,
}

impl ImportState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::FileReceived => "file_received",
            Self::Detected => "detected",
            Self::Matching => "matching",
            Self::Reviewing => "reviewing",
            Self::Propagating => "propagating",
            Self::Discarding => "discarding",
        }
    }
}

struct ImportSession {
    filename: Option<String>,
    table: Table,
    title_column: TitleColumn,
    state: ImportState,
    report: Option<MatchReport>,
    /// Indices into `report.matches`.
    selected: BTreeSet<usize>,
    page: usize,
    touched_at: Instant,
}

impl ImportSession {
    fn touch(&mut self) {
        self.touched_at = Instant::now();
    }

    fn expect_state(&self, wanted: ImportState) -> AppResult<()> {
        if self.state != wanted {
            return Err(AppError::Validation(format!(
                "Import session is {}, expected {}",
                self.state.as_str(),
                wanted.as_str()
            )));
        }
        Ok(())
    }
}

/// What the client sees after an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadSummary {
    pub session_id: Uuid,
    pub state: ImportState,
    pub filename: Option<String>,
    pub headers: Vec<String>,
    pub rows: usize,
    pub title_column: String,
    /// False when the first column was used as a fallback.
    pub title_column_detected: bool,
}

/// One page of the review table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewPage {
    pub session_id: Uuid,
    pub state: ImportState,
    pub page: usize,
    pub page_count: usize,
    pub total_matches: usize,
    pub matches: Vec<ReviewEntry>,
    pub unmatched: usize,
    pub selected: usize,
    /// Weaker candidates that were found but cannot be imported.
    pub non_importable: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewEntry {
    pub index: usize,
    pub selected: bool,
    pub importable: bool,
    #[serde(flatten)]
    pub candidate: MatchCandidate,
}

/// Checkbox changes for a reviewing session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionUpdate {
    #[serde(default)]
    pub select: Vec<usize>,
    #[serde(default)]
    pub deselect: Vec<usize>,
    #[serde(default)]
    pub select_all: bool,
    #[serde(default)]
    pub clear: bool,
    #[serde(default)]
    pub page: Option<usize>,
}

/// Outcome of a confirm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmOutcome {
    pub report: PropagationReport,
    /// True when the session was purged; false when it stays for a retry.
    pub finished: bool,
    pub message: String,
}

/// Every live import session of this process.
pub struct ImportSessions {
    sessions: RwLock<HashMap<Uuid, ImportSession>>,
    page_size: usize,
    idle_timeout: Duration,
}

impl Default for ImportSessions {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

fn poisoned() -> AppError {
    AppError::Fatal("import session lock poisoned".to_string())
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("No import session {}", id))
}

impl ImportSessions {
    pub fn new(page_size: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            page_size: page_size.max(1),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Start a session from an uploaded file and detect its title column.
    pub fn upload(&self, bytes: &[u8], filename: Option<&str>) -> AppResult<UploadSummary> {
        let table = Table::from_bytes(bytes, filename)?;
        let title_column = detect_title_column(&table.headers).ok_or_else(|| {
            AppError::InputFormat("Uploaded file has no columns".to_string())
        })?;

        let id = Uuid::new_v4();
        let mut session = ImportSession {
            filename: filename.map(str::to_string),
            table,
            title_column,
            state: ImportState::FileReceived,
            report: None,
            selected: BTreeSet::new(),
            page: 0,
            touched_at: Instant::now(),
        };
        session.state = ImportState::Detected;

        let summary = UploadSummary {
            session_id: id,
            state: session.state,
            filename: session.filename.clone(),
            headers: session.table.headers.clone(),
            rows: session.table.rows.len(),
            title_column: session.title_column.header.clone(),
            title_column_detected: session.title_column.detected,
        };
        info!(
            "Import session {} started: {} rows, title column {:?}",
            id, summary.rows, summary.title_column
        );
        let mut sessions = self.sessions.write().map_err(|_| poisoned())?;
        let before = sessions.len();
        let timeout = self.idle_timeout;
        // Sessions awaiting the store always survive.
        sessions.retain(|_, s| {
            matches!(s.state, ImportState::Matching | ImportState::Propagating)
                || s.touched_at.elapsed() < timeout
        });
        if sessions.len() < before {
            info!("Dropped {} idle import sessions", before - sessions.len());
        }
        sessions.insert(id, session);
        Ok(summary)
    }

    /// Run matching for a detected session. Every importable candidate
    /// starts out selected.
    pub async fn run_match(&self, id: Uuid, store: &dyn RecordStore) -> AppResult<ReviewPage> {
        let (table, title_column) = {
            let mut sessions = self.sessions.write().map_err(|_| poisoned())?;
            let session = sessions.get_mut(&id).ok_or_else(|| not_found(id))?;
            session.touch();
            session.expect_state(ImportState::Detected)?;
            session.state = ImportState::Matching;
            (session.table.clone(), session.title_column.clone())
        };

        let result = match_table(store, &table, &title_column).await;

        let mut sessions = self.sessions.write().map_err(|_| poisoned())?;
        let session = sessions.get_mut(&id).ok_or_else(|| not_found(id))?;
        session.touch();
        match result {
            Ok(report) => {
                session.selected = report.importable().map(|(i, _)| i).collect();
                session.report = Some(report);
                session.page = 0;
                session.state = ImportState::Reviewing;
                Ok(self.page_of(id, session))
            }
            Err(e) => {
                session.state = ImportState::Detected;
                Err(e)
            }
        }
    }

    /// Change checkboxes or the page of a reviewing session.
    pub fn update_selection(&self, id: Uuid, update: &SelectionUpdate) -> AppResult<ReviewPage> {
        let mut sessions = self.sessions.write().map_err(|_| poisoned())?;
        let session = sessions.get_mut(&id).ok_or_else(|| not_found(id))?;
        session.touch();
        session.expect_state(ImportState::Reviewing)?;
        let report = session
            .report
            .as_ref()
            .ok_or_else(|| AppError::Fatal("reviewing session without matches".to_string()))?;

        for index in &update.select {
            match report.matches.get(*index) {
                Some(m) if m.confidence.is_importable() => {}
                Some(m) => {
                    return Err(AppError::Validation(format!(
                        "Match {} is {} and cannot be imported",
                        index,
                        m.confidence.as_str()
                    )))
                }
                None => return Err(AppError::Validation(format!("No match {}", index))),
            }
        }

        if update.clear {
            session.selected.clear();
        }
        if update.select_all {
            session.selected = report.importable().map(|(i, _)| i).collect();
        }
        session.selected.extend(update.select.iter().copied());
        for index in &update.deselect {
            session.selected.remove(index);
        }
        if let Some(page) = update.page {
            session.page = page;
        }
        Ok(self.page_of(id, session))
    }

    /// Current review page.
    pub fn review(&self, id: Uuid) -> AppResult<ReviewPage> {
        let sessions = self.sessions.read().map_err(|_| poisoned())?;
        let session = sessions.get(&id).ok_or_else(|| not_found(id))?;
        session.expect_state(ImportState::Reviewing)?;
        Ok(self.page_of(id, session))
    }

    /// Propagate the selected matches.
    pub async fn confirm(
        &self,
        id: Uuid,
        store: &dyn RecordStore,
        on_record: impl FnMut(&RecordOutcome) + Send,
    ) -> AppResult<ConfirmOutcome> {
        let (table, title_column, confirmed) = {
            let mut sessions = self.sessions.write().map_err(|_| poisoned())?;
            let session = sessions.get_mut(&id).ok_or_else(|| not_found(id))?;
            session.touch();
            session.expect_state(ImportState::Reviewing)?;
            let report = session
                .report
                .as_ref()
                .ok_or_else(|| AppError::Fatal("reviewing session without matches".to_string()))?;
            let confirmed: Vec<MatchCandidate> = session
                .selected
                .iter()
                .filter_map(|i| report.matches.get(*i).cloned())
                .collect();
            if confirmed.is_empty() {
                return Err(AppError::Validation(
                    "Select at least one match to import".to_string(),
                ));
            }
            session.state = ImportState::Propagating;
            (session.table.clone(), session.title_column.clone(), confirmed)
        };

        let report = propagate(store, &table, &title_column, &confirmed, on_record).await;

        let mut sessions = self.sessions.write().map_err(|_| poisoned())?;
        if report.is_complete() {
            sessions.remove(&id);
            info!("Import session {} finished", id);
            return Ok(ConfirmOutcome {
                message: format!("Updated {} records", report.updated.len()),
                report,
                finished: true,
            });
        }

        // Keep only the failures selected so a retry repeats just those.
        let session = sessions.get_mut(&id).ok_or_else(|| not_found(id))?;
        session.touch();
        let failed: BTreeSet<i64> = report.failed.iter().map(|o| o.record_id).collect();
        if let Some(matches) = session.report.as_ref().map(|r| &r.matches) {
            session
                .selected
                .retain(|i| matches.get(*i).is_some_and(|m| failed.contains(&m.db_record_id)));
        }
        session.state = ImportState::Reviewing;
        Ok(ConfirmOutcome {
            message: format!(
                "Updated {} records; {} failed and remain selected",
                report.updated.len(),
                report.failed.len()
            ),
            report,
            finished: false,
        })
    }

    /// Start over: drop the session and everything it holds.
    pub fn discard(&self, id: Uuid) -> AppResult<()> {
        let mut sessions = self.sessions.write().map_err(|_| poisoned())?;
        let session = sessions.get_mut(&id).ok_or_else(|| not_found(id))?;
        if session.state == ImportState::Propagating {
            return Err(AppError::Validation(
                "Import session is propagating".to_string(),
            ));
        }
        session.state = ImportState::Discarding;
        sessions.remove(&id);
        info!("Import session {} discarded", id);
        Ok(())
    }

    pub fn state(&self, id: Uuid) -> AppResult<ImportState> {
        let sessions = self.sessions.read().map_err(|_| poisoned())?;
        // A purged session is back to idle from the caller's point of view.
        Ok(sessions.get(&id).map(|s| s.state).unwrap_or(ImportState::Idle))
    }

    fn page_of(&self, id: Uuid, session: &ImportSession) -> ReviewPage {
        let empty = Vec::new();
        let (matches, unmatched, non_importable) = match &session.report {
            Some(r) => (&r.matches, r.unmatched.len(), r.non_importable_count()),
            None => (&empty, 0, 0),
        };
        let page_count = matches.len().div_ceil(self.page_size).max(1);
        let page = session.page.min(page_count - 1);
        let entries = matches
            .iter()
            .enumerate()
            .skip(page * self.page_size)
            .take(self.page_size)
            .map(|(index, m)| ReviewEntry {
                index,
                selected: session.selected.contains(&index),
                importable: m.confidence.is_importable(),
                candidate: m.clone(),
            })
            .collect();
        ReviewPage {
            session_id: id,
            state: session.state,
            page,
            page_count,
            total_matches: matches.len(),
            matches: entries,
            unmatched,
            selected: session.selected.len(),
            non_importable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewRecord;
    use crate::repository::MemoryRecordStore;

    const CSV: &str = "Study,Location\nSmith et al. 2019,\"Paris, FR\"\nJones 2020,Lyon\n";

    async fn seeded() -> MemoryRecordStore {
        let store = MemoryRecordStore::new();
        for paragraph in ["… Smith et al. 2019 …", "Jones 2020 found", "Jones 2020 too"] {
            store
                .insert(&NewRecord {
                    criteria: "Density".to_string(),
                    energy_method: "EUI".to_string(),
                    direction: "Increase".to_string(),
                    paragraph: Some(paragraph.to_string()),
                    ..Default::default()
                })
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_full_session_flow() {
        let store = seeded().await;
        let sessions = ImportSessions::new(2);

        let summary = sessions.upload(CSV.as_bytes(), Some("studies.csv")).unwrap();
        assert_eq!(summary.state, ImportState::Detected);
        assert_eq!(summary.title_column, "Study");
        let id = summary.session_id;

        let page = sessions.run_match(id, &store).await.unwrap();
        assert_eq!(page.total_matches, 3);
        assert_eq!(page.page_count, 2);
        assert_eq!(page.selected, 3);

        let page = sessions
            .update_selection(
                id,
                &SelectionUpdate {
                    deselect: vec![1, 2],
                    page: Some(1),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.selected, 1);

        let outcome = sessions.confirm(id, &store, |_| {}).await.unwrap();
        assert!(outcome.finished);
        assert_eq!(outcome.report.updated, vec![1]);
        assert_eq!(sessions.state(id).unwrap(), ImportState::Idle);

        let r1 = store.get(1).await.unwrap().unwrap();
        assert_eq!(r1.location.as_deref(), Some("Paris, FR"));
        assert_eq!(store.get(2).await.unwrap().unwrap().location, None);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated_and_discardable() {
        let store = seeded().await;
        let sessions = ImportSessions::default();
        let a = sessions.upload(CSV.as_bytes(), None).unwrap().session_id;
        let b = sessions.upload(CSV.as_bytes(), None).unwrap().session_id;
        assert_ne!(a, b);

        sessions.run_match(a, &store).await.unwrap();
        assert_eq!(sessions.state(a).unwrap(), ImportState::Reviewing);
        assert_eq!(sessions.state(b).unwrap(), ImportState::Detected);

        sessions.discard(a).unwrap();
        assert_eq!(sessions.state(a).unwrap(), ImportState::Idle);
        assert!(matches!(sessions.review(a), Err(AppError::NotFound(_))));
        assert_eq!(sessions.state(b).unwrap(), ImportState::Detected);
    }

    #[tokio::test]
    async fn test_empty_confirmation_rejected() {
        let store = seeded().await;
        let sessions = ImportSessions::default();
        let id = sessions.upload(CSV.as_bytes(), None).unwrap().session_id;
        sessions.run_match(id, &store).await.unwrap();
        sessions
            .update_selection(
                id,
                &SelectionUpdate {
                    clear: true,
                    ..Default::default()
                },
            )
            .unwrap();

        let err = sessions.confirm(id, &store, |_| {}).await.unwrap_err();
        assert_eq!(err.kind(), "validation");
        assert_eq!(sessions.state(id).unwrap(), ImportState::Reviewing);
    }

    #[tokio::test]
    async fn test_failed_records_keep_session() {
        let store = seeded().await;
        let sessions = ImportSessions::default();
        let id = sessions.upload(CSV.as_bytes(), None).unwrap().session_id;
        sessions.run_match(id, &store).await.unwrap();

        // Record 2 disappears between matching and confirmation.
        store.delete(2).await.unwrap();
        let outcome = sessions.confirm(id, &store, |_| {}).await.unwrap();
        assert!(!outcome.finished);
        assert_eq!(outcome.report.failed.len(), 1);
        assert_eq!(sessions.review(id).unwrap().selected, 1);
    }

    #[tokio::test]
    async fn test_idle_sessions_dropped_on_upload() {
        let store = seeded().await;
        let sessions = ImportSessions::default().with_idle_timeout(Duration::ZERO);
        let stale = sessions.upload(CSV.as_bytes(), None).unwrap().session_id;
        sessions.run_match(stale, &store).await.unwrap();

        let fresh = sessions.upload(CSV.as_bytes(), None).unwrap().session_id;
        assert_eq!(sessions.state(stale).unwrap(), ImportState::Idle);
        assert!(matches!(sessions.review(stale), Err(AppError::NotFound(_))));
        assert_eq!(sessions.state(fresh).unwrap(), ImportState::Detected);

        let patient = ImportSessions::default();
        let kept = patient.upload(CSV.as_bytes(), None).unwrap().session_id;
        patient.upload(CSV.as_bytes(), None).unwrap();
        assert_eq!(patient.state(kept).unwrap(), ImportState::Detected);
    }

    #[test]
    fn test_bad_upload_creates_no_session() {
        let sessions = ImportSessions::default();
        let err = sessions.upload(b"", Some("empty.csv")).unwrap_err();
        assert_eq!(err.kind(), "input_format");
    }
}
