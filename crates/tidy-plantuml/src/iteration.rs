//! Bounded generate, fetch, validate, retry loop.
//!
//! [`IterationSession`] is a caller-driven state machine: the caller submits a
//! description, the session encodes and fetches it, validates the artifact
//! and either accepts it or asks for a revised description. Revision needs
//! judgement about the diagram language, so it stays with the caller; the
//! session only tracks the attempt budget.
//!
//! ```text
//! Generating --Submitted--> Fetching --Fetched--> Validating --Passed--> Accepted
//!                              |                      |
//!                         FetchFailed               Failed
//!                              v                      v
//!                              +------------------> Revising --BudgetSpent--> Exhausted
//!                                                     |
//!                 Generating <------AttemptsRemain----+
//! ```

use crate::consts::{DEFAULT_MAX_ATTEMPTS, DEFAULT_SERVER_URL};
use crate::encoding::{EncodingError, build_render_url};
use crate::fetch::{FetchError, Fetcher, RenderedArtifact};
use crate::format::OutputFormat;
use crate::validate::{ValidationFailure, Validator};

/// Phase of an iteration session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the caller to submit a description.
    Generating,
    /// Render request in flight.
    Fetching,
    /// Checking the fetched artifact.
    Validating,
    /// The artifact passed validation (terminal).
    Accepted,
    /// An attempt failed; deciding whether the budget allows another.
    Revising,
    /// The attempt budget is spent (terminal).
    Exhausted,
}

/// Input driving a phase transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A description was encoded and handed to the fetcher.
    Submitted,
    /// The fetcher returned an error.
    FetchFailed,
    /// The fetcher returned an artifact.
    Fetched,
    /// The artifact passed validation.
    Passed,
    /// The artifact failed validation.
    Failed,
    /// Failed attempts are still below the budget.
    AttemptsRemain,
    /// Failed attempts reached the budget.
    BudgetSpent,
}

impl Phase {
    /// Transition table. Returns `None` for transitions that are not allowed.
    #[must_use]
    pub fn on(self, event: Event) -> Option<Self> {
        match (self, event) {
            (Self::Generating, Event::Submitted) => Some(Self::Fetching),
            (Self::Fetching, Event::Fetched) => Some(Self::Validating),
            (Self::Fetching, Event::FetchFailed) | (Self::Validating, Event::Failed) => {
                Some(Self::Revising)
            }
            (Self::Validating, Event::Passed) => Some(Self::Accepted),
            (Self::Revising, Event::AttemptsRemain) => Some(Self::Generating),
            (Self::Revising, Event::BudgetSpent) => Some(Self::Exhausted),
            _ => None,
        }
    }

    /// Whether the session has ended.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Accepted | Self::Exhausted)
    }
}

/// Why an attempt did not produce an accepted artifact.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AttemptFailure {
    /// The render request failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// The artifact was fetched but rejected.
    #[error(transparent)]
    Validation(#[from] ValidationFailure),
}

/// Error that stops a session from advancing.
#[derive(Debug, thiserror::Error)]
pub enum IterationError {
    /// The description could not be encoded; not retried.
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    /// The session already reached a terminal phase.
    #[error("iteration session already ended ({0:?})")]
    Terminated(Phase),
    /// An event arrived that the current phase does not accept.
    #[error("invalid transition from {from:?} on {event:?}")]
    InvalidTransition { from: Phase, event: Event },
}

/// Mutable state of one iteration session.
#[derive(Debug, Clone)]
pub struct IterationState {
    phase: Phase,
    attempt: u32,
    max_attempts: u32,
    last_url: Option<String>,
    last_artifact: Option<RenderedArtifact>,
    last_error: Option<AttemptFailure>,
    phases: Vec<Phase>,
}

impl IterationState {
    fn new(max_attempts: u32) -> Self {
        Self {
            phase: Phase::Generating,
            attempt: 0,
            max_attempts,
            last_url: None,
            last_artifact: None,
            last_error: None,
            phases: vec![Phase::Generating],
        }
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Number of failed attempts so far.
    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Attempt budget.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Render URL of the most recent attempt.
    #[must_use]
    pub fn last_url(&self) -> Option<&str> {
        self.last_url.as_deref()
    }

    /// Artifact fetched by the most recent attempt, accepted or not.
    ///
    /// `None` when that attempt failed before an artifact arrived.
    #[must_use]
    pub fn last_artifact(&self) -> Option<&RenderedArtifact> {
        self.last_artifact.as_ref()
    }

    /// Failure of the most recent attempt, if it failed.
    #[must_use]
    pub fn last_error(&self) -> Option<&AttemptFailure> {
        self.last_error.as_ref()
    }

    /// Every phase entered so far, starting with `Generating`.
    #[must_use]
    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    /// Take the accepted artifact out of a finished session.
    #[must_use]
    pub fn into_artifact(self) -> Option<RenderedArtifact> {
        self.last_artifact
    }
}

/// Result of one submitted description.
#[derive(Debug, Clone)]
pub enum Step {
    /// The artifact passed validation on the given attempt (1-based).
    Accepted { attempt: u32 },
    /// The attempt failed and the budget allows another description.
    Revise { attempt: u32, failure: AttemptFailure },
    /// The attempt failed and the budget is spent.
    Exhausted { attempt: u32, failure: AttemptFailure },
}

/// Final result of [`IterationSession::run`].
#[derive(Debug, Clone)]
pub enum Outcome {
    /// An artifact passed validation.
    Accepted(IterationState),
    /// Every attempt in the budget failed.
    Exhausted(IterationState),
    /// The reviser declined to supply another description.
    Abandoned(IterationState),
}

impl Outcome {
    /// State at the end of the session.
    #[must_use]
    pub fn state(&self) -> &IterationState {
        match self {
            Self::Accepted(state) | Self::Exhausted(state) | Self::Abandoned(state) => state,
        }
    }
}

/// One generate, fetch, validate, retry session.
///
/// Each session owns its state; run concurrent sessions with separate
/// instances.
pub struct IterationSession<F> {
    fetcher: F,
    validator: Validator,
    server_url: String,
    format: OutputFormat,
    state: IterationState,
}

impl<F: Fetcher> IterationSession<F> {
    /// Create a session with the default server, format, budget and validator.
    #[must_use]
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            validator: Validator::default(),
            server_url: DEFAULT_SERVER_URL.to_owned(),
            format: OutputFormat::default(),
            state: IterationState::new(DEFAULT_MAX_ATTEMPTS),
        }
    }

    /// Set the render server base URL.
    #[must_use]
    pub fn server_url(mut self, server_url: impl Into<String>) -> Self {
        self.server_url = server_url.into();
        self
    }

    /// Set the output format.
    #[must_use]
    pub fn format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the attempt budget (at least one attempt is always made).
    #[must_use]
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.state.max_attempts = max_attempts.max(1);
        self
    }

    /// Set the artifact validator.
    #[must_use]
    pub fn validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    /// Current session state.
    #[must_use]
    pub fn state(&self) -> &IterationState {
        &self.state
    }

    /// Run one attempt with `description`.
    ///
    /// # Errors
    ///
    /// Returns [`IterationError::Encoding`] if the description cannot be
    /// encoded (the session is left unchanged) and
    /// [`IterationError::Terminated`] if the session already ended.
    pub fn submit(&mut self, description: &str) -> Result<Step, IterationError> {
        if self.state.phase.is_terminal() {
            return Err(IterationError::Terminated(self.state.phase));
        }

        let url = build_render_url(&self.server_url, description, self.format)?;
        self.advance(Event::Submitted)?;
        self.state.last_artifact = None;
        self.state.last_url = Some(url.clone());
        let attempt = self.state.attempt + 1;
        tracing::debug!(attempt, url = %url, "Submitting diagram");

        let verdict = match self.fetcher.fetch(&url) {
            Ok(artifact) => {
                self.advance(Event::Fetched)?;
                let verdict = self.validator.check(&artifact).map_err(AttemptFailure::from);
                self.state.last_artifact = Some(artifact);
                verdict
            }
            Err(e) => Err(AttemptFailure::from(e)),
        };

        match verdict {
            Ok(()) => {
                self.advance(Event::Passed)?;
                self.state.last_error = None;
                tracing::info!(attempt, "Diagram accepted");
                Ok(Step::Accepted { attempt })
            }
            Err(failure) => self.revise(failure),
        }
    }

    /// Record a failed attempt and decide whether another one is allowed.
    fn revise(&mut self, failure: AttemptFailure) -> Result<Step, IterationError> {
        let event = match self.state.phase {
            Phase::Fetching => Event::FetchFailed,
            _ => Event::Failed,
        };
        self.advance(event)?;

        self.state.attempt += 1;
        let attempt = self.state.attempt;
        self.state.last_error = Some(failure.clone());

        if attempt >= self.state.max_attempts {
            self.advance(Event::BudgetSpent)?;
            tracing::warn!(
                attempt,
                max_attempts = self.state.max_attempts,
                error = %failure,
                "Attempt budget spent"
            );
            Ok(Step::Exhausted { attempt, failure })
        } else {
            self.advance(Event::AttemptsRemain)?;
            tracing::warn!(attempt, error = %failure, "Attempt failed, revision needed");
            Ok(Step::Revise { attempt, failure })
        }
    }

    fn advance(&mut self, event: Event) -> Result<Phase, IterationError> {
        let from = self.state.phase;
        let to = from
            .on(event)
            .ok_or(IterationError::InvalidTransition { from, event })?;
        tracing::trace!(?from, ?event, ?to, "Phase transition");
        self.state.phase = to;
        self.state.phases.push(to);
        Ok(to)
    }

    /// Drive the session to a terminal phase.
    ///
    /// After each failed attempt `revise` receives the failure and the
    /// previous description and returns the next description, or `None` to
    /// stop early.
    ///
    /// # Errors
    ///
    /// Returns [`IterationError`] if a description cannot be encoded.
    pub fn run<R>(
        mut self,
        description: impl Into<String>,
        mut revise: R,
    ) -> Result<Outcome, IterationError>
    where
        R: FnMut(&AttemptFailure, &str) -> Option<String>,
    {
        let mut current = description.into();
        loop {
            match self.submit(&current)? {
                Step::Accepted { .. } => return Ok(Outcome::Accepted(self.state)),
                Step::Exhausted { .. } => return Ok(Outcome::Exhausted(self.state)),
                Step::Revise { failure, .. } => match revise(&failure, &current) {
                    Some(next) => current = next,
                    None => return Ok(Outcome::Abandoned(self.state)),
                },
            }
        }
    }
}
