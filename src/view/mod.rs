//! View module - UI rendering
//!
//! - `utils`: Shared formatting helpers
//! - `card`: The now-playing card

pub(crate) mod utils;
mod card;

use ratatui::{
    layout::{Constraint, Direction, Layout},
    Frame,
};

use crate::model::PlaybackInfo;

const CARD_WIDTH: u16 = 64;
const CARD_HEIGHT: u16 = 9;

pub struct AppView;

impl AppView {
    pub fn render(frame: &mut Frame, playback: &PlaybackInfo) {
        let area = frame.area();

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(CARD_HEIGHT.min(area.height)), Constraint::Min(0)])
            .split(area);
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(CARD_WIDTH.min(area.width)), Constraint::Min(0)])
            .split(rows[0]);

        card::render_card(frame, columns[0], playback);
    }
}
