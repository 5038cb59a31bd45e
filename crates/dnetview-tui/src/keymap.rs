//! Key bindings: raw key events to actions.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use dnetview_core::NavCommand;

use crate::action::Action;

/// Map a key press to an action. Unbound keys yield `None`.
pub fn map_key(key: KeyEvent) -> Option<Action> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Some(Action::Navigate(NavCommand::Quit)),
            _ => None,
        };
    }

    let command = match key.code {
        KeyCode::Up | KeyCode::Char('k') => NavCommand::MoveUp,
        KeyCode::Down | KeyCode::Char('j') => NavCommand::MoveDown,
        KeyCode::Right | KeyCode::Enter | KeyCode::Char('l') => NavCommand::Enter,
        KeyCode::Left | KeyCode::Esc | KeyCode::Backspace | KeyCode::Char('h') => {
            NavCommand::Back
        }
        KeyCode::Char('q') => NavCommand::Quit,
        KeyCode::Char('?') => return Some(Action::ToggleHelp),
        _ => return None,
    };
    Some(Action::Navigate(command))
}
