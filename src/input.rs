//! Key bindings: normal and vim-style.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Up,
    Down,
    Left,
    Right,
    Confirm,
    Cancel,
    Pause,
    Quit,
    NewGame,
    Menu,
    None,
}

/// Map key event to action. Supports both normal (arrows, enter) and vim (hjkl).
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent {
        code, modifiers, ..
    } = key;
    let no_mod = modifiers.is_empty() || modifiers == KeyModifiers::SHIFT;
    if !no_mod && modifiers != KeyModifiers::CONTROL {
        return Action::None;
    }
    match code {
        KeyCode::Char('c') if modifiers == KeyModifiers::CONTROL => Action::Quit,
        KeyCode::Char('q') if no_mod => Action::Quit,
        KeyCode::Esc if no_mod => Action::Cancel,
        KeyCode::Char('p') if no_mod => Action::Pause,
        KeyCode::Char('r' | 'n') if no_mod => Action::NewGame,
        KeyCode::Char('m') if no_mod => Action::Menu,
        KeyCode::Left | KeyCode::Char('h') if no_mod => Action::Left,
        KeyCode::Right | KeyCode::Char('l') if no_mod => Action::Right,
        KeyCode::Up | KeyCode::Char('k') if no_mod => Action::Up,
        KeyCode::Down | KeyCode::Char('j') if no_mod => Action::Down,
        KeyCode::Enter | KeyCode::Char(' ') if no_mod => Action::Confirm,
        _ => Action::None,
    }
}
