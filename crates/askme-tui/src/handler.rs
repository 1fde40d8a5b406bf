use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use crate::app::{App, InputMode, PromptKind, Screen};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Paste(text) => handle_paste(app, &text),
        AppEvent::Resize => {}
        AppEvent::Tick => app.tick_animation(),
    }
    app.poll_tasks().await;
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    if app.prompt.is_some() {
        handle_prompt_key(app, key);
        return;
    }

    match (app.screen(), app.input_mode) {
        (Screen::Upload, _) => handle_upload_key(app, key),
        (Screen::Chat, InputMode::Normal) => handle_chat_normal(app, key),
        (Screen::Chat, InputMode::Editing) => handle_chat_editing(app, key),
    }
}

fn handle_upload_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,

        // File picker
        KeyCode::Char('o') | KeyCode::Char('/') => {
            if !app.is_busy() {
                app.open_prompt(PromptKind::OpenFile);
            }
        }

        // Remove the selected file
        KeyCode::Char('x') | KeyCode::Delete | KeyCode::Backspace => app.session.remove_file(),

        // "Let's Go!"
        KeyCode::Enter => app.start_ingestion(),

        KeyCode::Char('u') => {
            if !app.is_busy() {
                app.open_prompt(PromptKind::BaseUrl);
            }
        }

        _ => {}
    }
}

fn handle_chat_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        KeyCode::Char('i') | KeyCode::Char('a') | KeyCode::Enter => {
            app.input_mode = InputMode::Editing;
        }

        // "Read something else"
        KeyCode::Char('r') => app.reset_session(),

        KeyCode::Char('j') | KeyCode::Down => app.scroll_chat_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_chat_up(1),
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_chat_down(app.chat_height / 2);
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_chat_up(app.chat_height / 2);
        }
        KeyCode::Char('G') => app.scroll_chat_to_bottom(),
        KeyCode::Char('g') => app.chat_scroll = 0,

        _ => {}
    }
}

fn handle_chat_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => app.start_chat(),
        KeyCode::Up => app.scroll_chat_up(1),
        KeyCode::Down => app.scroll_chat_down(1),
        // The input control is disabled while a reply is pending
        _ if app.session.chat_pending() => {}
        _ => {
            let cursor = &mut app.input_cursor;
            edit_line(app.session.input_mut(), cursor, key);
        }
    }
}

fn handle_prompt_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.cancel_prompt(),
        KeyCode::Enter => app.submit_prompt(),
        _ => {
            if let Some(prompt) = app.prompt.as_mut() {
                edit_line(&mut prompt.input, &mut prompt.cursor, key);
            }
        }
    }
}

/// Single-line editing with a char-indexed cursor.
fn edit_line(text: &mut String, cursor: &mut usize, key: KeyEvent) {
    let char_count = text.chars().count();
    *cursor = (*cursor).min(char_count);

    match key.code {
        KeyCode::Backspace => {
            if *cursor > 0 {
                *cursor -= 1;
                let byte_pos = char_to_byte_index(text, *cursor);
                text.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            if *cursor < char_count {
                let byte_pos = char_to_byte_index(text, *cursor);
                text.remove(byte_pos);
            }
        }
        KeyCode::Left => *cursor = cursor.saturating_sub(1),
        KeyCode::Right => *cursor = (*cursor + 1).min(char_count),
        KeyCode::Home => *cursor = 0,
        KeyCode::End => *cursor = char_count,
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(text, *cursor);
            text.insert(byte_pos, c);
            *cursor += 1;
        }
        _ => {}
    }
}

/// Dragging a file onto the terminal arrives as a paste of its path.
fn handle_paste(app: &mut App, text: &str) {
    if let Some(prompt) = app.prompt.as_mut() {
        let byte_pos = char_to_byte_index(&prompt.input, prompt.cursor);
        let text = text.trim_end_matches(['\r', '\n']);
        prompt.input.insert_str(byte_pos, text);
        prompt.cursor += text.chars().count();
        return;
    }

    match app.screen() {
        Screen::Upload => {
            app.session.drop_path(text);
        }
        Screen::Chat if app.input_mode == InputMode::Editing && !app.session.chat_pending() => {
            let text = text.replace(['\r', '\n'], " ");
            let byte_pos = char_to_byte_index(app.session.input(), app.input_cursor);
            app.session.input_mut().insert_str(byte_pos, &text);
            app.input_cursor += text.chars().count();
        }
        Screen::Chat => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let x = mouse.column;
    let y = mouse.row;

    let in_drop = app.drop_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);
    let in_chat = app.chat_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);

    match (app.screen(), mouse.kind) {
        // Hovering over the drop zone highlights it, like a drag over it would
        (Screen::Upload, MouseEventKind::Moved | MouseEventKind::Drag(_)) => {
            if in_drop && app.prompt.is_none() {
                app.session.drag_enter();
            } else {
                app.session.drag_leave();
            }
        }
        (Screen::Upload, MouseEventKind::Down(MouseButton::Left)) => {
            if in_drop && app.prompt.is_none() && !app.is_busy() {
                app.open_prompt(PromptKind::OpenFile);
            }
        }
        (Screen::Chat, MouseEventKind::ScrollDown) if in_chat => app.scroll_chat_down(3),
        (Screen::Chat, MouseEventKind::ScrollUp) if in_chat => app.scroll_chat_up(3),
        _ => {}
    }
}
