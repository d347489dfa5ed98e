// Keyboard input handling and command dispatch.
//
// Translates crossterm key events into `UserCommand`s for the controller,
// or into local `ViewState` changes (quit confirmation, modal dismissal).

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use housie_core::protocol::{UserCommand, ViewPhase};

use super::ViewState;

/// Handle a keyboard event.
///
/// Returns `Some(UserCommand)` when the key should be forwarded to the
/// controller, `None` when it was handled locally or ignored.
pub fn handle_key(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    // Windows reports both press and release.
    if key_event.kind != KeyEventKind::Press {
        return None;
    }

    if key_event.modifiers.contains(KeyModifiers::CONTROL)
        && key_event.code == KeyCode::Char('c')
    {
        return Some(UserCommand::Quit);
    }

    if view_state.confirm_quit {
        return handle_confirm_quit(key_event, view_state);
    }

    match key_event.code {
        KeyCode::Enter | KeyCode::Esc => {
            view_state.notices.dismiss_modal();
            None
        }
        KeyCode::Char('g') | KeyCode::Char('G') => {
            (view_state.phase == ViewPhase::Ready).then_some(UserCommand::GenerateNumber)
        }
        KeyCode::Char('r') | KeyCode::Char('R') => {
            view_state.can_retry().then_some(UserCommand::Retry)
        }
        KeyCode::Char('q') | KeyCode::Char('Q') => {
            view_state.confirm_quit = true;
            None
        }
        _ => None,
    }
}

/// y/q confirm, n/Esc cancel, everything else is blocked.
fn handle_confirm_quit(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Char('q') | KeyCode::Char('Q') => {
            Some(UserCommand::Quit)
        }
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
            view_state.confirm_quit = false;
            None
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
