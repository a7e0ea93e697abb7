use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::sync::mpsc::UnboundedSender;
use crate::app::{App, InputMode, Screen, SettingsField, SettingsPane};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub async fn handle_event(
    app: &mut App,
    event: AppEvent,
    events: &UnboundedSender<AppEvent>,
) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key, events),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick_animation();
        }
        AppEvent::Progress(progress) => app.apply_progress(progress),
    }
    app.poll_run().await;
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent, events: &UnboundedSender<AppEvent>) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match app.input_mode {
        InputMode::Normal => match app.screen {
            Screen::Intro => handle_intro(app, key),
            Screen::Generator => handle_generator(app, key, events),
            Screen::Settings => handle_settings(app, key),
        },
        InputMode::Editing => handle_editing(app, key),
    }
}

fn handle_intro(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,
        KeyCode::Enter | KeyCode::Char(' ') => app.screen = Screen::Generator,
        KeyCode::Char('s') => app.screen = Screen::Settings,
        _ => {}
    }
}

fn handle_generator(app: &mut App, key: KeyEvent, events: &UnboundedSender<AppEvent>) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Esc => app.screen = Screen::Intro,

        KeyCode::Char('g') => app.start_generation(events.clone()),
        KeyCode::Char('d') => app.download(),
        KeyCode::Char('s') => {
            if !app.is_loading {
                app.screen = Screen::Settings;
            }
        }

        KeyCode::Char('j') | KeyCode::Down => app.scroll_preview_down(),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_preview_up(),
        KeyCode::PageDown => {
            for _ in 0..10 {
                app.scroll_preview_down();
            }
        }
        KeyCode::PageUp => {
            for _ in 0..10 {
                app.scroll_preview_up();
            }
        }
        KeyCode::Home => app.preview_scroll = 0,

        _ => {}
    }
}

fn handle_settings(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Esc => app.screen = Screen::Generator,

        KeyCode::Tab | KeyCode::BackTab => {
            app.settings_pane = match app.settings_pane {
                SettingsPane::Fields => SettingsPane::Themes,
                SettingsPane::Themes => SettingsPane::Fields,
            };
        }

        KeyCode::Char('j') | KeyCode::Down => match app.settings_pane {
            SettingsPane::Fields => app.field_nav_down(),
            SettingsPane::Themes => app.theme_nav_down(),
        },
        KeyCode::Char('k') | KeyCode::Up => match app.settings_pane {
            SettingsPane::Fields => app.field_nav_up(),
            SettingsPane::Themes => app.theme_nav_up(),
        },

        KeyCode::Enter | KeyCode::Char('e') if app.settings_pane == SettingsPane::Fields => {
            app.begin_edit();
        }
        KeyCode::Char(' ') | KeyCode::Enter if app.settings_pane == SettingsPane::Themes => {
            app.toggle_selected_theme();
        }
        KeyCode::Char('a') if app.settings_pane == SettingsPane::Themes => app.set_all_themes(true),
        KeyCode::Char('n') if app.settings_pane == SettingsPane::Themes => app.set_all_themes(false),

        KeyCode::Char('R') => app.reset_settings(),

        _ => {}
    }
}

fn handle_editing(app: &mut App, key: KeyEvent) {
    let multiline = matches!(
        app.selected_field(),
        SettingsField::Personality | SettingsField::StyleNotes
    );

    match key.code {
        KeyCode::Esc => app.cancel_edit(),
        // Ctrl+N breaks the line in the long-form fields
        KeyCode::Char('n') if multiline && key.modifiers.contains(KeyModifiers::CONTROL) => {
            insert_char(app, '\n');
        }
        KeyCode::Enter => app.commit_edit(),
        KeyCode::Backspace => {
            if app.edit_cursor > 0 {
                app.edit_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.edit_buffer, app.edit_cursor);
                app.edit_buffer.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.edit_buffer.chars().count();
            if app.edit_cursor < char_count {
                let byte_pos = char_to_byte_index(&app.edit_buffer, app.edit_cursor);
                app.edit_buffer.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.edit_cursor = app.edit_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.edit_buffer.chars().count();
            app.edit_cursor = (app.edit_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.edit_cursor = 0;
        }
        KeyCode::End => {
            app.edit_cursor = app.edit_buffer.chars().count();
        }
        KeyCode::Char(c) => insert_char(app, c),
        _ => {}
    }
}

fn insert_char(app: &mut App, c: char) {
    let byte_pos = char_to_byte_index(&app.edit_buffer, app.edit_cursor);
    app.edit_buffer.insert(byte_pos, c);
    app.edit_cursor += 1;
}
