use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::Status;
use crate::remote::{RemoteError, RemoteSource};
use crate::store::{IndexOutOfRange, RosterStore, SkippedLine};

/// Session lifecycle. `Fetching` and `Committing` can land in `Failed`,
/// which is terminal for that attempt; the user retries by re-invoking
/// fetch or commit. Nothing auto-retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Fetching,
    Loaded,
    Editing,
    Committing,
    Failed,
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("could not fetch the roster")]
    Fetch(#[source] RemoteError),
    #[error("could not commit roster changes")]
    Commit(#[source] RemoteError),
}

#[derive(Debug, Error)]
pub enum EditError {
    #[error("no roster loaded")]
    NothingLoaded,
    #[error(transparent)]
    Index(#[from] IndexOutOfRange),
}

/// What a fetch had to skip. Empty on a clean load.
#[derive(Debug)]
pub struct FetchReport {
    pub skipped: Vec<SkippedLine>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Nothing was dirty; no remote write happened.
    Clean,
    Committed,
}

/// Outcome of the pre-navigation confirmation gate.
#[derive(Debug, PartialEq, Eq)]
pub enum Resolution {
    Clean,
    Committed,
    Discarded,
}

struct Session {
    store: RosterStore,
    version: String,
}

/// Orchestrates fetch and commit between the remote roster file and the
/// in-memory store. Owns the single `RosterStore` of the session; all
/// operations are blocking and run on the caller's thread.
pub struct SyncController<R: RemoteSource> {
    remote: R,
    state: SyncState,
    session: Option<Session>,
}

impl<R: RemoteSource> SyncController<R> {
    pub fn new(remote: R) -> SyncController<R> {
        SyncController {
            remote,
            state: SyncState::Idle,
            session: None,
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn store(&self) -> Option<&RosterStore> {
        self.session.as_ref().map(|session| &session.store)
    }

    /// Download the remote roster and replace the current session with it.
    ///
    /// A transport failure leaves any previously loaded store untouched.
    /// Unparsable lines are not fatal: they are logged, reported in the
    /// returned [`FetchReport`], and the parsed remainder becomes the
    /// loaded store.
    pub fn fetch(&mut self) -> Result<FetchReport, SyncError> {
        self.state = SyncState::Fetching;
        debug!("fetching roster");

        let snapshot = match self.remote.fetch() {
            Ok(snapshot) => snapshot,
            Err(err) => {
                self.state = SyncState::Failed;
                return Err(SyncError::Fetch(err));
            }
        };

        let (store, skipped) = match RosterStore::load_from_text(&snapshot.text) {
            Ok(store) => (store, Vec::new()),
            Err(failure) => (failure.store, failure.skipped),
        };

        for line in &skipped {
            warn!(
                line = line.line_number,
                reason = %line.reason,
                "skipped unparsable roster line"
            );
        }

        info!(students = store.len(), "roster loaded");
        self.session = Some(Session {
            store,
            version: snapshot.version,
        });
        self.state = SyncState::Loaded;
        Ok(FetchReport { skipped })
    }

    /// Apply one status edit to the loaded roster.
    pub fn set_status(&mut self, index: usize, status: Status) -> Result<(), EditError> {
        let session = self.session.as_mut().ok_or(EditError::NothingLoaded)?;
        session.store.set_status(index, status)?;
        if session.store.is_dirty() {
            self.state = SyncState::Editing;
        }
        Ok(())
    }

    /// Write the full roster back to the remote.
    ///
    /// A clean store (or no loaded session) is a no-op success. On success
    /// the dirty flag clears and the roster is re-fetched, so the session
    /// reflects exactly what the remote now holds. On failure the dirty
    /// flag is left set; the user's edits are not silently lost.
    pub fn commit(&mut self) -> Result<CommitOutcome, SyncError> {
        let Some(session) = self.session.as_mut() else {
            return Ok(CommitOutcome::Clean);
        };
        if !session.store.is_dirty() {
            return Ok(CommitOutcome::Clean);
        }

        self.state = SyncState::Committing;
        let text = session.store.serialize();
        let message = commit_message();

        match self.remote.update(&text, &session.version, &message) {
            Ok(_) => {
                session.store.clear_dirty();
                info!("roster committed");
                self.fetch()?;
                Ok(CommitOutcome::Committed)
            }
            Err(err) => {
                self.state = SyncState::Failed;
                Err(SyncError::Commit(err))
            }
        }
    }

    /// Confirmation gate run before any navigation away from pending edits.
    ///
    /// With a dirty store, `confirm` decides: yes commits, no discards the
    /// edits (the store reverts to the last-fetched text) and navigation
    /// proceeds. A clean session passes straight through.
    pub fn resolve_dirty<F: FnOnce() -> bool>(
        &mut self,
        confirm: F,
    ) -> Result<Resolution, SyncError> {
        let dirty = self
            .session
            .as_ref()
            .is_some_and(|session| session.store.is_dirty());
        if !dirty {
            return Ok(Resolution::Clean);
        }

        if confirm() {
            self.commit()?;
            Ok(Resolution::Committed)
        } else {
            self.discard_edits();
            Ok(Resolution::Discarded)
        }
    }

    fn discard_edits(&mut self) {
        if let Some(session) = self.session.as_mut() {
            // Skipped lines were already reported when this text was fetched.
            session.store = match RosterStore::load_from_text(session.store.raw_remote_text()) {
                Ok(store) => store,
                Err(failure) => failure.store,
            };
            info!("pending edits discarded");
            self.state = SyncState::Loaded;
        }
    }
}

fn commit_message() -> String {
    format!(
        "Updating student rosters ({})",
        chrono::Local::now().format("%Y-%m-%d %H:%M")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::io;

    use crate::filter;
    use crate::models::{FilterCriterion, Period};
    use crate::remote::RemoteSnapshot;

    const SAMPLE: &str = "Doe,Jane,1,U,.\nSmith,Sam,1,O,.\nNguyen,An,4,I,.\n";

    /// In-memory remote; the version token is the content itself.
    struct FakeRemote {
        content: RefCell<String>,
        fail_fetch: Cell<bool>,
        writes: Cell<usize>,
    }

    impl FakeRemote {
        fn new(content: &str) -> FakeRemote {
            FakeRemote {
                content: RefCell::new(content.to_string()),
                fail_fetch: Cell::new(false),
                writes: Cell::new(0),
            }
        }
    }

    impl RemoteSource for FakeRemote {
        fn fetch(&self) -> Result<RemoteSnapshot, RemoteError> {
            if self.fail_fetch.get() {
                return Err(RemoteError::Unavailable(io::Error::new(
                    io::ErrorKind::ConnectionRefused,
                    "remote down",
                )));
            }
            let text = self.content.borrow().clone();
            Ok(RemoteSnapshot {
                version: text.clone(),
                text,
            })
        }

        fn update(
            &self,
            text: &str,
            expected_version: &str,
            _message: &str,
        ) -> Result<String, RemoteError> {
            let current = self.content.borrow().clone();
            if current != expected_version {
                return Err(RemoteError::StaleVersion {
                    expected: expected_version.to_string(),
                    found: current,
                });
            }
            *self.content.borrow_mut() = text.to_string();
            self.writes.set(self.writes.get() + 1);
            Ok(text.to_string())
        }
    }

    #[test]
    fn fetch_loads_the_roster() {
        let mut controller = SyncController::new(FakeRemote::new(SAMPLE));
        let report = controller.fetch().unwrap();
        assert!(report.skipped.is_empty());
        assert_eq!(controller.state(), SyncState::Loaded);
        assert_eq!(controller.store().unwrap().len(), 3);
        assert!(!controller.store().unwrap().is_dirty());
    }

    #[test]
    fn fetch_failure_leaves_the_previous_store_untouched() {
        let mut controller = SyncController::new(FakeRemote::new(SAMPLE));
        controller.fetch().unwrap();

        controller.remote.fail_fetch.set(true);
        let err = controller.fetch().unwrap_err();
        assert!(matches!(err, SyncError::Fetch(_)));
        assert_eq!(controller.state(), SyncState::Failed);
        assert_eq!(controller.store().unwrap().len(), 3);
    }

    #[test]
    fn fetch_reports_skipped_lines_but_still_loads() {
        let mut controller =
            SyncController::new(FakeRemote::new("Doe,Jane,1,U,.\nOnlyTwoFields,x\n"));
        let report = controller.fetch().unwrap();
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].raw, "OnlyTwoFields,x");
        assert_eq!(controller.store().unwrap().len(), 1);
        assert_eq!(controller.state(), SyncState::Loaded);
    }

    #[test]
    fn edits_mark_the_session_dirty() {
        let mut controller = SyncController::new(FakeRemote::new(SAMPLE));
        controller.fetch().unwrap();
        controller.set_status(0, Status::InPerson).unwrap();
        assert_eq!(controller.state(), SyncState::Editing);
        assert!(controller.store().unwrap().is_dirty());
    }

    #[test]
    fn edit_without_a_session_fails() {
        let mut controller = SyncController::new(FakeRemote::new(SAMPLE));
        let err = controller.set_status(0, Status::Online).unwrap_err();
        assert!(matches!(err, EditError::NothingLoaded));
    }

    #[test]
    fn commit_when_clean_is_a_no_op() {
        let mut controller = SyncController::new(FakeRemote::new(SAMPLE));
        controller.fetch().unwrap();
        assert_eq!(controller.commit().unwrap(), CommitOutcome::Clean);
        assert_eq!(controller.remote.writes.get(), 0);
    }

    #[test]
    fn commit_writes_the_full_roster_even_under_a_filter() {
        let mut controller = SyncController::new(FakeRemote::new(SAMPLE));
        controller.fetch().unwrap();

        // Edit through a filtered view of period 1; the period 4 student is
        // invisible but must survive the save.
        let period = Period::new(1).unwrap();
        let index = {
            let view = filter::apply(
                controller.store().unwrap(),
                FilterCriterion::ByPeriod(period),
            );
            assert_eq!(view.len(), 2);
            view[0].0
        };
        controller.set_status(index, Status::InPerson).unwrap();

        assert_eq!(controller.commit().unwrap(), CommitOutcome::Committed);
        assert_eq!(
            *controller.remote.content.borrow(),
            "Doe,Jane,1,I,.\nSmith,Sam,1,O,.\nNguyen,An,4,I,.\n"
        );
        assert_eq!(controller.state(), SyncState::Loaded);
        assert!(!controller.store().unwrap().is_dirty());
        assert_eq!(controller.store().unwrap().len(), 3);
    }

    #[test]
    fn commit_rejected_on_stale_version_keeps_dirty() {
        let mut controller = SyncController::new(FakeRemote::new(SAMPLE));
        controller.fetch().unwrap();
        controller.set_status(0, Status::Online).unwrap();

        // Another writer updates the remote between fetch and commit.
        *controller.remote.content.borrow_mut() = "Okafor,Chi,7,O,.\n".to_string();

        let err = controller.commit().unwrap_err();
        assert!(matches!(err, SyncError::Commit(RemoteError::StaleVersion { .. })));
        assert_eq!(controller.state(), SyncState::Failed);
        assert!(controller.store().unwrap().is_dirty());
        assert_eq!(controller.remote.writes.get(), 0);
    }

    #[test]
    fn resolve_dirty_commits_on_yes() {
        let mut controller = SyncController::new(FakeRemote::new(SAMPLE));
        controller.fetch().unwrap();
        controller.set_status(1, Status::InPerson).unwrap();

        let resolution = controller.resolve_dirty(|| true).unwrap();
        assert_eq!(resolution, Resolution::Committed);
        assert_eq!(controller.remote.writes.get(), 1);
        assert!(!controller.store().unwrap().is_dirty());
    }

    #[test]
    fn resolve_dirty_discards_on_no() {
        let mut controller = SyncController::new(FakeRemote::new(SAMPLE));
        controller.fetch().unwrap();
        controller.set_status(1, Status::InPerson).unwrap();

        let resolution = controller.resolve_dirty(|| false).unwrap();
        assert_eq!(resolution, Resolution::Discarded);
        assert_eq!(controller.remote.writes.get(), 0);

        let store = controller.store().unwrap();
        assert!(!store.is_dirty());
        assert_eq!(store.entries()[1].status, Status::Online);
        assert_eq!(controller.state(), SyncState::Loaded);
    }

    #[test]
    fn resolve_dirty_passes_a_clean_session_through() {
        let mut controller = SyncController::new(FakeRemote::new(SAMPLE));
        controller.fetch().unwrap();
        let resolution = controller
            .resolve_dirty(|| panic!("confirm must not run for a clean session"))
            .unwrap();
        assert_eq!(resolution, Resolution::Clean);
    }
}
