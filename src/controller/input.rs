//! Key event handling

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::PlaybackController;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputOutcome {
    Continue,
    Quit,
}

impl PlaybackController {
    /// Playback changes run on their own task so the card keeps redrawing
    /// (and shows Loading) while the lookups are in flight.
    pub fn handle_key_event(&self, key: KeyEvent) -> InputOutcome {
        // Only handle key press events, not release or repeat
        if key.kind != KeyEventKind::Press {
            return InputOutcome::Continue;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return InputOutcome::Quit,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return InputOutcome::Quit;
            }
            KeyCode::Char(' ') | KeyCode::Char('m') | KeyCode::Enter => {
                let controller = self.clone();
                tokio::spawn(async move { controller.toggle().await });
            }
            KeyCode::Char('s') => {
                let controller = self.clone();
                tokio::spawn(async move { controller.stop().await });
            }
            _ => {}
        }

        InputOutcome::Continue
    }
}
