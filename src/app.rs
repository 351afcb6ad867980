//! Composition root: one credential store, one analyzer, one session.

use crate::analysis::{AnalysisResult, ImagePayload, PromptAnalyzer};
use crate::credential::{Credential, CredentialStore};
use crate::error::Result;
use crate::session::{Session, SessionState};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

/// Drives the user actions against injected collaborators.
///
/// The session lock is never held across the network call, so `reset` can
/// run while an analysis is in flight; the late response is then discarded.
pub struct App {
    store: Arc<dyn CredentialStore>,
    analyzer: Arc<dyn PromptAnalyzer>,
    credential: RwLock<Option<Credential>>,
    session: Mutex<Session>,
}

impl App {
    /// Creates the app, loading the stored credential once.
    pub fn new(store: Arc<dyn CredentialStore>, analyzer: Arc<dyn PromptAnalyzer>) -> Self {
        let credential = store.load();
        tracing::debug!(
            analyzer = analyzer.name(),
            has_key = credential.is_some(),
            "app initialized"
        );
        Self {
            store,
            analyzer,
            credential: RwLock::new(credential),
            session: Mutex::new(Session::new()),
        }
    }

    /// The active credential.
    pub fn credential(&self) -> Option<Credential> {
        self.credential
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Saves a key. An empty value clears it.
    pub fn save_credential(&self, value: &str) {
        self.store.save(value);
        *self.credential.write().unwrap_or_else(PoisonError::into_inner) = Credential::new(value);
    }

    /// Forgets the key.
    pub fn clear_credential(&self) {
        self.store.clear();
        *self.credential.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Selects an image for analysis.
    pub fn select_image(&self, image: ImagePayload) -> Result<()> {
        self.lock_session().select_image(image)
    }

    /// Returns to `Idle`, discarding any in-flight outcome.
    pub fn reset(&self) {
        self.lock_session().reset();
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.lock_session().state()
    }

    /// Runs `f` against the session, e.g. to render it.
    pub fn with_session<R>(&self, f: impl FnOnce(&Session) -> R) -> R {
        f(&self.lock_session())
    }

    /// Analyzes the selected image with the active key.
    ///
    /// Returns `Ok(None)` when the session was reset while the request was in
    /// flight; the outcome is dropped in that case.
    pub async fn analyze(&self) -> Result<Option<AnalysisResult>> {
        let credential = self.credential();
        let ticket = {
            let mut session = self.lock_session();
            session.begin_analysis(credential)?
        };

        let outcome = self
            .analyzer
            .analyze(ticket.credential().expose(), ticket.image())
            .await;

        let applied = {
            let mut session = self.lock_session();
            session.finish_analysis(&ticket, &outcome)
        };

        if applied {
            outcome.map(Some)
        } else {
            Ok(None)
        }
    }

    fn lock_session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
