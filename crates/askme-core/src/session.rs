//! The view state controller.
//!
//! A [`Session`] owns everything one user sees: which screen is active, the
//! selected document, the transcript and the current error line. Requests
//! are split into `begin_*` (validate, transition, hand out the payload) and
//! `finish_*` (apply the outcome) so a front end can run the network call on
//! a background task and keep rendering in between. `submit_document` and
//! `send_message` glue the two halves together for callers that can simply
//! await.

use std::path::Path;

use tracing::{debug, info};

use crate::document::{clean_dropped_path, DocumentCandidate};
use crate::error::ServiceError;
use crate::remote::DocumentService;
use crate::state::ChatMessage;

pub const INVALID_FILE_TYPE: &str = "Oops! I can only read PDF files, babes!";

pub const WELCOME_MESSAGE: &str = "Hey babes! I just read that PDF for you! Ask me anything about it and I'll break it down for you. No boring details, just the tea you need to know! ✨";

/// Which screen is visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Upload screen; a document may be selected, dropped or removed.
    #[default]
    Idle,
    /// Upload in flight.
    Processing,
    /// Chat screen.
    Ready,
}

/// A request handed out by `begin_*`, tagged with the session generation it
/// belongs to. Pass the generation back to `finish_*`.
#[derive(Debug, Clone)]
pub struct Submission<T> {
    pub generation: u64,
    pub payload: T,
}

#[derive(Debug, Default)]
pub struct Session {
    phase: Phase,
    document: Option<DocumentCandidate>,
    transcript: Vec<ChatMessage>,
    error: Option<String>,
    input: String,
    is_dragging: bool,
    chat_pending: bool,
    // Bumped on reset so completions from before the reset are dropped.
    generation: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn document(&self) -> Option<&DocumentCandidate> {
        self.document.as_ref()
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut String {
        &mut self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn is_dragging(&self) -> bool {
        self.is_dragging
    }

    pub fn chat_pending(&self) -> bool {
        self.chat_pending
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the upload button should be enabled.
    pub fn can_submit_document(&self) -> bool {
        self.phase == Phase::Idle && self.document.is_some()
    }

    /// Whether the send button should be enabled.
    pub fn can_send(&self) -> bool {
        self.phase == Phase::Ready && !self.chat_pending && !self.input.trim().is_empty()
    }

    // Document intake

    /// Offer a file as the document. Non-PDF files set the error and leave
    /// the current selection alone. Returns whether the file was taken.
    pub fn select_file(&mut self, candidate: DocumentCandidate) -> bool {
        if self.phase != Phase::Idle {
            return false;
        }

        if !candidate.is_pdf() {
            debug!(name = candidate.name(), mime = candidate.mime(), "rejected non-PDF file");
            self.error = Some(INVALID_FILE_TYPE.to_string());
            return false;
        }

        info!(name = candidate.name(), size = candidate.size(), "document selected");
        self.document = Some(candidate);
        self.error = None;
        true
    }

    /// Select a file by path, reporting unreadable paths as the error.
    pub fn select_path(&mut self, path: impl AsRef<Path>) -> bool {
        if self.phase != Phase::Idle {
            return false;
        }

        match DocumentCandidate::from_path(path) {
            Ok(candidate) => self.select_file(candidate),
            Err(err) => {
                self.error = Some(err.user_message());
                false
            }
        }
    }

    pub fn drop_file(&mut self, candidate: DocumentCandidate) -> bool {
        self.is_dragging = false;
        self.select_file(candidate)
    }

    /// Drop whatever text the terminal pasted for a dragged file.
    pub fn drop_path(&mut self, raw: &str) -> bool {
        self.is_dragging = false;
        self.select_path(clean_dropped_path(raw))
    }

    pub fn drag_enter(&mut self) {
        self.is_dragging = true;
    }

    pub fn drag_leave(&mut self) {
        self.is_dragging = false;
    }

    /// Clear the selected document. Ignored while an upload is in flight so
    /// a failed upload can still be retried with the same file.
    pub fn remove_file(&mut self) {
        if self.phase == Phase::Processing {
            return;
        }
        self.document = None;
    }

    // Ingestion

    pub fn begin_ingestion(&mut self) -> Option<Submission<DocumentCandidate>> {
        if !self.can_submit_document() {
            return None;
        }
        let document = self.document.clone()?;

        info!(name = document.name(), "ingestion started");
        self.phase = Phase::Processing;
        self.error = None;

        Some(Submission {
            generation: self.generation,
            payload: document,
        })
    }

    /// Apply the outcome of an upload. Returns false for stale results.
    pub fn finish_ingestion(&mut self, generation: u64, result: Result<(), ServiceError>) -> bool {
        if generation != self.generation || self.phase != Phase::Processing {
            debug!(generation, current = self.generation, "dropping stale ingestion result");
            return false;
        }

        match result {
            Ok(()) => {
                info!("ingestion finished, chat ready");
                self.transcript = vec![ChatMessage::assistant(WELCOME_MESSAGE)];
                self.phase = Phase::Ready;
            }
            Err(err) => {
                info!(error = %err, status = ?err.status(), "ingestion failed");
                self.error = Some(err.user_message());
                self.phase = Phase::Idle;
            }
        }
        true
    }

    pub async fn submit_document<S>(&mut self, service: &S) -> bool
    where
        S: DocumentService + ?Sized,
    {
        let Some(submission) = self.begin_ingestion() else {
            return false;
        };
        let result = service.ingest(&submission.payload).await;
        self.finish_ingestion(submission.generation, result)
    }

    // Chat

    /// Append the user's turn and hand out the transcript to send.
    pub fn begin_chat(&mut self) -> Option<Submission<Vec<ChatMessage>>> {
        if !self.can_send() {
            return None;
        }

        let text = self.input.trim().to_string();
        self.input.clear();
        self.transcript.push(ChatMessage::user(text));
        self.error = None;
        self.chat_pending = true;

        debug!(turns = self.transcript.len(), "chat turn started");
        Some(Submission {
            generation: self.generation,
            payload: self.transcript.clone(),
        })
    }

    /// Apply the outcome of a chat request. A failed turn keeps the user's
    /// message in the transcript.
    pub fn finish_chat(&mut self, generation: u64, result: Result<String, ServiceError>) -> bool {
        if generation != self.generation || !self.chat_pending {
            debug!(generation, current = self.generation, "dropping stale chat result");
            return false;
        }

        self.chat_pending = false;
        match result {
            Ok(reply) => self.transcript.push(ChatMessage::assistant(reply)),
            Err(err) => {
                info!(error = %err, status = ?err.status(), "chat turn failed");
                self.error = Some(err.user_message());
            }
        }
        true
    }

    pub async fn send_message<S>(&mut self, service: &S) -> bool
    where
        S: DocumentService + ?Sized,
    {
        let Some(submission) = self.begin_chat() else {
            return false;
        };
        let result = service.chat(&submission.payload).await;
        self.finish_chat(submission.generation, result)
    }

    /// Start over with a new document. Purely local.
    pub fn reset(&mut self) {
        info!("session reset");
        *self = Session {
            generation: self.generation + 1,
            ..Session::default()
        };
    }
}
