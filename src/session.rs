//! Upload/analysis state machine.
//!
//! A session moves `Idle -> ImageSelected -> Analyzing -> Result | Failed`.
//! Every `reset` bumps a generation counter; a completion whose ticket carries
//! an older generation is discarded, so a response that arrives after a reset
//! never shows up.

use crate::analysis::{AnalysisResult, ImagePayload};
use crate::credential::Credential;
use crate::error::{RepromptError, Result};

/// Where a session currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No image selected.
    Idle,
    /// An image is selected, nothing analyzed yet.
    ImageSelected,
    /// A request is in flight.
    Analyzing,
    /// The last analysis succeeded.
    Result,
    /// The last attempt failed; an error message is shown.
    Failed,
}

/// Proof that an analysis was started, handed back on completion.
#[derive(Debug, Clone)]
pub struct AnalysisTicket {
    generation: u64,
    image: ImagePayload,
    credential: Credential,
}

impl AnalysisTicket {
    /// The image to send.
    pub fn image(&self) -> &ImagePayload {
        &self.image
    }

    /// The key to send it with.
    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Session generation this ticket belongs to.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// UI-facing state for one user session.
#[derive(Debug)]
pub struct Session {
    state: SessionState,
    generation: u64,
    image: Option<ImagePayload>,
    result: Option<AnalysisResult>,
    error: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Creates an idle session.
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            generation: 0,
            image: None,
            result: None,
            error: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Selected image, if any.
    pub fn image(&self) -> Option<&ImagePayload> {
        self.image.as_ref()
    }

    /// Last successful result, if any.
    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    /// Message to show in the error panel, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether the analyze trigger should be enabled.
    pub fn can_analyze(&self) -> bool {
        self.state != SessionState::Analyzing && self.image.is_some()
    }

    /// Current generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Selects a new image, dropping any previous result or error.
    pub fn select_image(&mut self, image: ImagePayload) -> Result<()> {
        if self.state == SessionState::Analyzing {
            return Err(RepromptError::AnalysisInFlight);
        }
        self.image = Some(image);
        self.result = None;
        self.error = None;
        self.state = SessionState::ImageSelected;
        Ok(())
    }

    /// Moves to `Analyzing` and returns the ticket for the request.
    ///
    /// While a request is already in flight this is a no-op that returns
    /// [`RepromptError::AnalysisInFlight`]. A missing image or key moves the
    /// session to `Failed` with a local message and returns the error.
    pub fn begin_analysis(&mut self, credential: Option<Credential>) -> Result<AnalysisTicket> {
        if self.state == SessionState::Analyzing {
            return Err(RepromptError::AnalysisInFlight);
        }

        let Some(image) = self.image.clone() else {
            return Err(self.fail_locally(RepromptError::MissingImage));
        };
        let Some(credential) = credential else {
            return Err(self.fail_locally(RepromptError::MissingCredential));
        };

        self.result = None;
        self.error = None;
        self.state = SessionState::Analyzing;
        tracing::debug!(generation = self.generation, "analysis started");

        Ok(AnalysisTicket {
            generation: self.generation,
            image,
            credential,
        })
    }

    /// Applies the outcome of a request. Returns `false` if the ticket is
    /// stale (the session was reset meanwhile) and the outcome was dropped.
    pub fn finish_analysis(
        &mut self,
        ticket: &AnalysisTicket,
        outcome: &Result<AnalysisResult>,
    ) -> bool {
        if ticket.generation != self.generation || self.state != SessionState::Analyzing {
            tracing::debug!(
                ticket = ticket.generation,
                current = self.generation,
                "discarding stale analysis outcome"
            );
            return false;
        }

        match outcome {
            Ok(result) => {
                self.result = Some(result.clone());
                self.state = SessionState::Result;
            }
            Err(e) => {
                tracing::warn!("analysis failed: {e}");
                self.error = Some(format!("analysis failed: {e}"));
                self.state = SessionState::Failed;
            }
        }
        true
    }

    /// Back to `Idle`, discarding image, result and error. Any in-flight
    /// request becomes stale.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.image = None;
        self.result = None;
        self.error = None;
        self.state = SessionState::Idle;
    }

    fn fail_locally(&mut self, err: RepromptError) -> RepromptError {
        self.result = None;
        self.error = Some(err.to_string());
        self.state = SessionState::Failed;
        err
    }
}
