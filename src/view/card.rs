//! Now-playing card rendering

use chrono::Utc;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Padding, Paragraph},
    Frame,
};

use crate::model::{PlaybackInfo, PlaybackState};
use super::utils::{format_duration, format_played_at, truncate_string};

const KEY_HINTS: &str = " space toggle · s stop · q quit ";

pub fn render_card(frame: &mut Frame, area: Rect, playback: &PlaybackInfo) {
    let (title, accent) = match playback.state {
        PlaybackState::Idle => (" ♪ Idle ", Color::Gray),
        PlaybackState::Loading => (" … Loading ", Color::Yellow),
        PlaybackState::Playing => (" ▶ Playing ", Color::Green),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(accent))
        .title(title)
        .title_bottom(Line::from(KEY_HINTS).right_aligned())
        .padding(Padding::horizontal(1));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // Track details
            Constraint::Length(1), // Clip progress
        ])
        .split(inner);

    let width = chunks[0].width as usize;
    let details = Paragraph::new(detail_lines(playback, width));
    frame.render_widget(details, chunks[0]);

    if playback.state == PlaybackState::Playing {
        render_progress(frame, chunks[1], playback, accent);
    }
}

fn detail_lines(playback: &PlaybackInfo, width: usize) -> Vec<Line<'static>> {
    let Some(now_playing) = &playback.now_playing else {
        let hint = match playback.state {
            PlaybackState::Loading => "Looking up the latest scrobble...",
            _ => "Press space to play what I've been listening to",
        };
        return vec![Line::from(Span::styled(hint, Style::default().fg(Color::DarkGray)))];
    };

    let track = &now_playing.track;
    let listened = if track.now_playing {
        "Now playing".to_string()
    } else {
        match track.played_at {
            Some(played_at) => format!("Last played {}", format_played_at(played_at, Utc::now())),
            None => "Last played".to_string(),
        }
    };

    let mut lines = vec![
        Line::from(Span::styled(
            truncate_string(&track.name, width),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(truncate_string(&track.artist, width)),
        Line::from(Span::styled(listened, Style::default().fg(Color::DarkGray))),
    ];

    if !now_playing.preview.artwork_url.is_empty() {
        lines.push(Line::from(Span::styled(
            truncate_string(&now_playing.preview.artwork_url, width),
            Style::default().fg(Color::DarkGray),
        )));
    }

    lines
}

fn render_progress(frame: &mut Frame, area: Rect, playback: &PlaybackInfo, accent: Color) {
    let ratio = if playback.duration_ms > 0 {
        (playback.progress_ms as f64 / playback.duration_ms as f64).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let label = format!(
        "{} / {}",
        format_duration(playback.progress_ms),
        format_duration(playback.duration_ms)
    );

    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(accent))
        .ratio(ratio)
        .label(label);

    frame.render_widget(gauge, area);
}
