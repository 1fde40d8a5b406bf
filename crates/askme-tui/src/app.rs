use std::path::PathBuf;
use std::sync::Arc;

use askme_core::config::normalize_base_url;
use askme_core::document::clean_dropped_path;
use askme_core::{Config, DocumentService, Phase, RemoteClient, ServiceError, Session};
use ratatui::layout::Rect;
use tokio::task::JoinHandle;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Upload,
    Chat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    /// Type a path instead of dragging a file in
    OpenFile,
    BaseUrl,
}

#[derive(Debug, Clone)]
pub struct Prompt {
    pub kind: PromptKind,
    pub input: String,
    pub cursor: usize, // cursor position in chars
}

/// A request running on a background task, tagged with the session
/// generation it was started in.
struct PendingRequest<T> {
    generation: u64,
    handle: JoinHandle<Result<T, ServiceError>>,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub session: Session,
    pub input_mode: InputMode,

    // Chat input
    pub input_cursor: usize,

    // Popup prompt (file path or backend URL)
    pub prompt: Option<Prompt>,

    // Chat view
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Panel areas for mouse hit-testing (updated during render)
    pub drop_area: Option<Rect>,
    pub chat_area: Option<Rect>,

    // Backend
    pub service: Arc<dyn DocumentService>,
    pub base_url: String,
    pub config: Config,
    config_path: Option<PathBuf>,

    ingest_task: Option<PendingRequest<()>>,
    chat_task: Option<PendingRequest<String>>,
}

impl App {
    pub fn new(config: Config, config_path: Option<PathBuf>, base_url: &str) -> Self {
        Self::with_service(config, config_path, base_url, Arc::new(RemoteClient::new(base_url)))
    }

    pub fn with_service(
        config: Config,
        config_path: Option<PathBuf>,
        base_url: &str,
        service: Arc<dyn DocumentService>,
    ) -> Self {
        Self {
            should_quit: false,
            session: Session::new(),
            input_mode: InputMode::Normal,
            input_cursor: 0,
            prompt: None,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            animation_frame: 0,
            drop_area: None,
            chat_area: None,
            service,
            base_url: normalize_base_url(base_url),
            config,
            config_path,
            ingest_task: None,
            chat_task: None,
        }
    }

    pub fn screen(&self) -> Screen {
        match self.session.phase() {
            Phase::Idle | Phase::Processing => Screen::Upload,
            Phase::Ready => Screen::Chat,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.session.phase() == Phase::Processing || self.session.chat_pending()
    }

    // Background requests

    pub fn start_ingestion(&mut self) {
        let Some(submission) = self.session.begin_ingestion() else {
            return;
        };

        let service = Arc::clone(&self.service);
        let document = submission.payload;
        self.animation_frame = 0;
        self.ingest_task = Some(PendingRequest {
            generation: submission.generation,
            handle: tokio::spawn(async move { service.ingest(&document).await }),
        });
    }

    pub fn start_chat(&mut self) {
        let Some(submission) = self.session.begin_chat() else {
            return;
        };

        self.input_cursor = 0;
        self.animation_frame = 0;
        // Scroll to bottom so "Thinking..." is visible
        self.scroll_chat_to_bottom();

        let service = Arc::clone(&self.service);
        let transcript = submission.payload;
        self.chat_task = Some(PendingRequest {
            generation: submission.generation,
            handle: tokio::spawn(async move { service.chat(&transcript).await }),
        });
    }

    /// Apply results of finished background requests.
    pub async fn poll_tasks(&mut self) {
        if self.ingest_task.as_ref().is_some_and(|t| t.handle.is_finished()) {
            if let Some(task) = self.ingest_task.take() {
                let result = task.handle.await.unwrap_or_else(|err| {
                    warn!(error = %err, "ingestion task failed");
                    Err(ServiceError::unknown())
                });
                self.session.finish_ingestion(task.generation, result);

                if self.session.phase() == Phase::Ready {
                    self.chat_scroll = 0;
                    self.input_cursor = 0;
                    self.input_mode = InputMode::Editing;
                }
            }
        }

        if self.chat_task.as_ref().is_some_and(|t| t.handle.is_finished()) {
            if let Some(task) = self.chat_task.take() {
                let result = task.handle.await.unwrap_or_else(|err| {
                    warn!(error = %err, "chat task failed");
                    Err(ServiceError::unknown())
                });
                if self.session.finish_chat(task.generation, result) {
                    self.scroll_chat_to_bottom();
                }
            }
        }
    }

    /// "Read something else": back to the upload screen with nothing selected.
    /// Requests still in flight run to completion and are ignored.
    pub fn reset_session(&mut self) {
        self.session.reset();
        self.ingest_task = None;
        self.chat_task = None;
        self.input_mode = InputMode::Normal;
        self.input_cursor = 0;
        self.chat_scroll = 0;
        self.prompt = None;
    }

    // Prompts

    pub fn open_prompt(&mut self, kind: PromptKind) {
        let input = match kind {
            PromptKind::OpenFile => String::new(),
            PromptKind::BaseUrl => self.base_url.clone(),
        };
        let cursor = input.chars().count();
        self.prompt = Some(Prompt { kind, input, cursor });
    }

    pub fn cancel_prompt(&mut self) {
        self.prompt = None;
    }

    pub fn submit_prompt(&mut self) {
        let Some(prompt) = self.prompt.take() else {
            return;
        };

        match prompt.kind {
            PromptKind::OpenFile => {
                if !prompt.input.trim().is_empty() {
                    self.session.select_path(clean_dropped_path(&prompt.input));
                }
            }
            PromptKind::BaseUrl => {
                let url = normalize_base_url(&prompt.input);
                if url.is_empty() {
                    return;
                }
                info!(%url, "backend URL changed");
                self.service = Arc::new(RemoteClient::new(&url));
                self.base_url = url.clone();
                self.config.base_url = Some(url);
                if let Some(path) = &self.config_path {
                    if let Err(err) = self.config.save_to(path) {
                        warn!(error = %err, "could not save config");
                    }
                }
            }
        }
    }

    // Chat view

    pub fn tick_animation(&mut self) {
        if self.is_busy() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_chat_down(&mut self, lines: u16) {
        let max = self.chat_total_lines().saturating_sub(self.visible_chat_height());
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(max);
    }

    pub fn scroll_chat_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_chat_to_bottom(&mut self) {
        let total_lines = self.chat_total_lines();
        let visible_height = self.visible_chat_height();

        if total_lines > visible_height {
            self.chat_scroll = total_lines.saturating_sub(visible_height);
        }
    }

    fn visible_chat_height(&self) -> u16 {
        if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        }
    }

    /// Rendered line count of the transcript, mirroring the layout in `ui`.
    fn chat_total_lines(&self) -> u16 {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: usize = 0;
        for msg in self.session.transcript() {
            total_lines += 1; // Role line
            for line in msg.content.lines() {
                total_lines += wrapped_line_count(line, wrap_width);
            }
            total_lines += 1; // Blank line after message
        }

        if self.session.chat_pending() {
            total_lines += 2; // Role line + "Thinking..."
        }

        total_lines.min(u16::MAX as usize) as u16
    }
}

/// Number of rows a line takes when wrapped at word boundaries, the way the
/// chat paragraph renders it. Words longer than the width are broken.
fn wrapped_line_count(text: &str, width: usize) -> usize {
    if width == 0 {
        return 1;
    }

    let mut lines = 1;
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut word_len = word.chars().count();

        if current_len > 0 && current_len + 1 + word_len <= width {
            // Word fits on current line
            current_len += 1 + word_len;
            continue;
        }

        if current_len > 0 {
            // Word doesn't fit, start new line
            lines += 1;
        }

        // Overlong words spill over full rows
        while word_len > width {
            lines += 1;
            word_len -= width;
        }
        current_len = word_len;
    }

    lines
}
