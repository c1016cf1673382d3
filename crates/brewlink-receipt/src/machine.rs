//! The receipt submission state machine.
//!
//! Drives one captured image through REST initialization, channel join,
//! upload, and server-side processing, producing a cafe session on
//! success. All awaited operations are wrapped at the machine boundary:
//! failures become the `Error` state, nothing propagates uncaught, and
//! the receipt channel is always torn down on the way out.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, info, warn};

use brewlink_channel::receipt::{ReceiptChannel, ReceiptChannelFactory};
use brewlink_core::config::{ReceiptConfig, SessionConfig};
use brewlink_core::error::AppError;
use brewlink_core::events::ReceiptOutcome;
use brewlink_core::result::AppResult;
use brewlink_core::types::{CafeId, ChannelKey};
use brewlink_session::resolver::resolve_current;
use brewlink_session::session::CafeSession;
use brewlink_session::shared::SharedSessionState;
use brewlink_session::store::SessionStore;

use crate::api::{ReceiptApi, ReceiptInit};
use crate::image::{CapturedImage, ImageSource};

/// Sub-phase of the processing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingPhase {
    /// Asking the collaborator to initialize the receipt.
    Init,
    /// Streaming the captured binary to the upload target.
    Uploading,
    /// Awaiting the asynchronous status event.
    Processing,
}

/// Machine state. `Done` and `Closed` are terminal; `Error` is
/// recoverable via retake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MachineState {
    /// Choosing an input path (camera or file).
    Select,
    /// An unexpired session exists; awaiting the user's choice.
    ActiveSessionWarning,
    /// Image captured; awaiting explicit submit.
    Preview,
    /// The submit sequence is running.
    Processing(ProcessingPhase),
    /// Session saved.
    Done,
    /// The run failed; the message is user-facing.
    Error(String),
    /// The flow was dismissed.
    Closed,
}

/// Whether this run starts a new session or extends the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitMode {
    /// Normal flow; the entry guard applies.
    New,
    /// Invoked from inside an active cafe view; the guard is bypassed
    /// and the existing channel key is retained.
    Extend,
}

/// The user's decision in the active-session warning state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningChoice {
    /// Abort the new flow and go back to the existing session.
    ReturnToSession,
    /// Discard the existing session and proceed with a new receipt.
    Replace,
}

/// What the caller must do after resolving the warning.
///
/// The machine never owns the presence connection, so discarding a
/// session can only be completed by the caller stopping it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningResolution {
    /// The existing session stays; navigate back to its cafe.
    ReturnToSession(Option<CafeId>),
    /// The existing session is gone. Any live presence connection for it
    /// must be stopped before the new flow proceeds.
    Replaced,
    /// The machine was not awaiting a warning decision; nothing changed.
    NotPending,
}

/// Result of a successful submission.
#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    /// The session that was saved.
    pub session: CafeSession,
    /// Cafe to navigate to, when the flow should move the caller into
    /// the presence view (never set in extend mode).
    pub navigate_to: Option<CafeId>,
}

/// One receipt submission flow.
///
/// Owns the transient run state exclusively; nothing here is persisted.
/// A machine is created per modal open and discarded after `Done`,
/// `Closed`, or an abandoned `Error`.
pub struct ReceiptSubmissionMachine {
    api: Arc<dyn ReceiptApi>,
    channels: Arc<dyn ReceiptChannelFactory>,
    store: Arc<SessionStore>,
    shared: SharedSessionState,
    session_config: SessionConfig,
    receipt_config: ReceiptConfig,
    mode: SubmitMode,
    cafe_id: CafeId,

    state: MachineState,
    history: Vec<MachineState>,
    image: Option<CapturedImage>,
    channel: Option<Box<dyn ReceiptChannel>>,
    existing_session: Option<CafeSession>,
    retained_channel_key: Option<ChannelKey>,
}

impl ReceiptSubmissionMachine {
    /// Create a machine for the given cafe/location context.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        api: Arc<dyn ReceiptApi>,
        channels: Arc<dyn ReceiptChannelFactory>,
        store: Arc<SessionStore>,
        shared: SharedSessionState,
        session_config: SessionConfig,
        receipt_config: ReceiptConfig,
        cafe_id: CafeId,
        mode: SubmitMode,
    ) -> Self {
        Self {
            api,
            channels,
            store,
            shared,
            session_config,
            receipt_config,
            mode,
            cafe_id,
            state: MachineState::Select,
            history: vec![MachineState::Select],
            image: None,
            channel: None,
            existing_session: None,
            retained_channel_key: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> &MachineState {
        &self.state
    }

    /// Ordered transition log, starting at `Select`.
    pub fn history(&self) -> &[MachineState] {
        &self.history
    }

    /// Run the entry guard.
    ///
    /// In extend mode the guard is bypassed and the existing channel key
    /// is captured for reuse at completion. Otherwise an existing valid
    /// session moves the machine to `ActiveSessionWarning`.
    pub async fn open(&mut self) {
        let existing = resolve_current(&self.shared, &self.store).await;

        match self.mode {
            SubmitMode::Extend => {
                self.retained_channel_key = existing.and_then(|s| s.channel_key);
            }
            SubmitMode::New => {
                if let Some(session) = existing {
                    debug!(cafe_id = %session.cafe_id, "Active session found, asking the user");
                    self.existing_session = Some(session);
                    self.transition(MachineState::ActiveSessionWarning);
                }
            }
        }
    }

    /// Resolve the active-session warning.
    ///
    /// On `Replace` the durable record and shared state are cleared here,
    /// and the returned [`WarningResolution::Replaced`] tells the caller
    /// to stop the presence connection of the discarded session.
    pub async fn resolve_warning(&mut self, choice: WarningChoice) -> WarningResolution {
        if self.state != MachineState::ActiveSessionWarning {
            return WarningResolution::NotPending;
        }

        match choice {
            WarningChoice::ReturnToSession => {
                let target = self.existing_session.as_ref().map(|s| s.cafe_id);
                self.transition(MachineState::Closed);
                WarningResolution::ReturnToSession(target)
            }
            WarningChoice::Replace => {
                // The prior record must be gone before any new INIT call.
                self.store.clear().await;
                self.shared.clear();
                self.existing_session = None;
                self.transition(MachineState::Select);
                WarningResolution::Replaced
            }
        }
    }

    /// Attach a validated captured image and advance to preview.
    pub fn attach_image(&mut self, image: CapturedImage) -> AppResult<()> {
        if self.state != MachineState::Select {
            return Err(AppError::internal(format!(
                "Cannot attach an image in state {:?}",
                self.state
            )));
        }
        self.image = Some(image);
        self.transition(MachineState::Preview);
        Ok(())
    }

    /// Discard the captured image and return to selection.
    ///
    /// Returns the source of the discarded image so the caller can
    /// reopen the matching input path (camera or file picker).
    pub fn retake(&mut self) -> Option<ImageSource> {
        if !matches!(self.state, MachineState::Preview | MachineState::Error(_)) {
            return None;
        }
        let source = self.image.take().map(|image| image.source);
        self.transition(MachineState::Select);
        source
    }

    /// Re-enter preview after a failed run, keeping the captured image.
    ///
    /// The image survives the error path precisely so a transient
    /// collaborator failure does not force a recapture.
    pub fn retry(&mut self) {
        if matches!(self.state, MachineState::Error(_)) && self.image.is_some() {
            self.transition(MachineState::Preview);
        }
    }

    /// Run the submit sequence from `Preview`.
    ///
    /// On failure the machine lands in `Error` with a user-facing
    /// message and the receipt channel is torn down; the error is also
    /// returned for callers that want it.
    pub async fn submit(&mut self) -> AppResult<SubmissionOutcome> {
        if self.state != MachineState::Preview {
            return Err(AppError::internal(format!(
                "Cannot submit in state {:?}",
                self.state
            )));
        }
        let image = self
            .image
            .clone()
            .ok_or_else(|| AppError::internal("No captured image to submit"))?;

        match self.run_submission(image).await {
            Ok(outcome) => {
                self.transition(MachineState::Done);
                Ok(outcome)
            }
            Err(e) => {
                self.teardown_channel().await;
                self.transition(MachineState::Error(e.message.clone()));
                Err(e)
            }
        }
    }

    /// Dismiss the flow from any state.
    ///
    /// Stops any open receipt channel and clears all transient run
    /// state; the machine must never leave a dangling connection.
    pub async fn close(&mut self) {
        self.teardown_channel().await;
        self.image = None;
        self.existing_session = None;
        self.transition(MachineState::Closed);
    }

    async fn run_submission(&mut self, image: CapturedImage) -> AppResult<SubmissionOutcome> {
        self.transition(MachineState::Processing(ProcessingPhase::Init));
        let init = self
            .api
            .initialize(
                self.cafe_id,
                self.receipt_config.latitude,
                self.receipt_config.longitude,
            )
            .await?;

        let mut channel = self.channels.open();
        channel.connect().await?;
        channel.join(&init.channel_key).await?;
        self.channel = Some(channel);

        self.transition(MachineState::Processing(ProcessingPhase::Uploading));
        self.api
            .upload(&init.upload_url, &image.content_type, image.bytes.clone())
            .await?;

        self.transition(MachineState::Processing(ProcessingPhase::Processing));
        self.api
            .complete(&init.receipt_id, &init.bucket, &init.object_key)
            .await?;

        let outcome = self.await_terminal_event().await?;
        self.teardown_channel().await;

        match outcome {
            ReceiptOutcome::Success {
                expires_at,
                cafe_id,
                channel_key,
                receipt_id,
            } => {
                let session = self.build_session(&init, expires_at, cafe_id, channel_key, receipt_id);

                // Persistence is best-effort: the in-memory mirror keeps
                // the current run working even if the durable write fails.
                if !self.store.save(&session).await {
                    warn!("Session not persisted; it will not survive a restart");
                }
                self.shared.set(session.clone());

                let navigate_to = match self.mode {
                    SubmitMode::New => Some(session.cafe_id),
                    SubmitMode::Extend => None,
                };

                info!(cafe_id = %session.cafe_id, "Receipt accepted, session active");
                Ok(SubmissionOutcome {
                    session,
                    navigate_to,
                })
            }
            ReceiptOutcome::Failure { reason } => {
                let message =
                    reason.unwrap_or_else(|| "Receipt could not be processed".to_string());
                Err(AppError::session(message))
            }
            ReceiptOutcome::Unknown { .. } => {
                // `await_terminal_event` only returns terminal outcomes.
                Err(AppError::internal("Non-terminal outcome escaped the event wait"))
            }
        }
    }

    /// Await a terminal status event under the processing deadline.
    async fn await_terminal_event(&mut self) -> AppResult<ReceiptOutcome> {
        let deadline =
            std::time::Duration::from_secs(self.receipt_config.processing_timeout_seconds);
        let channel = self
            .channel
            .as_mut()
            .ok_or_else(|| AppError::internal("Receipt channel missing during processing"))?;

        let wait = async {
            loop {
                match channel.next_event().await {
                    Some(event) => {
                        let outcome = event.classify();
                        if outcome.is_terminal() {
                            return Ok(outcome);
                        }
                        debug!(?outcome, "Progress event, still waiting");
                    }
                    None => {
                        return Err(AppError::channel(
                            "Receipt channel closed before a terminal event",
                        ));
                    }
                }
            }
        };

        tokio::time::timeout(deadline, wait)
            .await
            .map_err(|_| AppError::timeout("Timed out waiting for receipt processing"))?
    }

    /// Compute the session record from the success event, preferring
    /// server-supplied fields and falling back to configured policy.
    fn build_session(
        &self,
        init: &ReceiptInit,
        expires_at: Option<chrono::DateTime<Utc>>,
        cafe_id: Option<CafeId>,
        event_channel_key: Option<ChannelKey>,
        event_receipt_id: Option<brewlink_core::types::ReceiptId>,
    ) -> CafeSession {
        let expires_at = expires_at.unwrap_or_else(|| {
            warn!(
                minutes = self.session_config.fallback_duration_minutes,
                "Server omitted expires_at, applying fallback duration"
            );
            Utc::now() + Duration::minutes(self.session_config.fallback_duration_minutes)
        });

        let cafe_id = cafe_id.unwrap_or_else(|| {
            warn!(cafe_id = %self.cafe_id, "Server omitted cafe_id, using the run's cafe context");
            self.cafe_id
        });

        let channel_key = match self.mode {
            SubmitMode::Extend if self.retained_channel_key.is_some() => {
                self.retained_channel_key.clone()
            }
            _ => event_channel_key.or_else(|| Some(init.channel_key.clone())),
        };

        CafeSession {
            cafe_id,
            channel_key,
            expires_at: Some(expires_at),
            receipt_id: event_receipt_id.or_else(|| Some(init.receipt_id.clone())),
            saved_at: None,
        }
    }

    async fn teardown_channel(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            channel.stop().await;
            debug!("Receipt channel torn down");
        }
    }

    fn transition(&mut self, state: MachineState) {
        debug!(from = ?self.state, to = ?state, "State transition");
        self.state = state.clone();
        self.history.push(state);
    }
}
