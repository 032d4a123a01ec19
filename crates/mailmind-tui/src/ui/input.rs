//! Keyboard input handling for the TUI.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};

use mailmind_core::views::CallbackState;

use crate::app::{App, AppState, Screen};

/// Handle keyboard input. Returns true if the app should quit.
pub async fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    if matches!(app.state, AppState::ConfirmingQuit) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                app.state = AppState::Quitting;
                return Ok(true);
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                app.state = AppState::Normal;
            }
            _ => {}
        }
        return Ok(false);
    }

    let login_alert = matches!(app.screen, Screen::Login(ref view) if view.alert().is_some());
    let callback_failed = matches!(
        app.screen,
        Screen::Callback(ref view) if matches!(view.state(), CallbackState::Error(_))
    );

    match app.screen {
        Screen::Login(_) if login_alert => {
            // Blocking alert: only dismissal
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
                app.dismiss_alert();
            }
        }
        Screen::Login(_) if app.awaiting_redirect => handle_redirect_input(app, key),
        Screen::Login(_) => match key.code {
            KeyCode::Enter => app.sign_in().await,
            KeyCode::Char('q') | KeyCode::Esc => app.state = AppState::ConfirmingQuit,
            _ => {}
        },
        Screen::Callback(_) => match key.code {
            KeyCode::Enter | KeyCode::Char('r') if callback_failed => app.retry_sign_in(),
            KeyCode::Char('q') | KeyCode::Esc => app.state = AppState::ConfirmingQuit,
            _ => {}
        },
        Screen::Dashboard(_) => match key.code {
            KeyCode::Char('r') => app.refresh_status().await,
            KeyCode::Char('l') => app.logout().await,
            KeyCode::Char('q') | KeyCode::Esc => app.state = AppState::ConfirmingQuit,
            _ => {}
        },
    }

    Ok(false)
}

fn handle_redirect_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.cancel_redirect(),
        KeyCode::Enter => app.submit_redirect(),
        KeyCode::Backspace => {
            app.redirect_input.pop();
        }
        KeyCode::Char(c) => app.push_redirect_char(c),
        _ => {}
    }
}
