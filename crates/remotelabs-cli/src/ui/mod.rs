//! Dashboard rendering.

pub mod servers;

use chrono::Local;
use ratatui::{
  Frame,
  layout::{Constraint, Direction, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Paragraph},
};

use crate::app::App;

// ─── Root draw ────────────────────────────────────────────────────────────────

/// Main draw function called each frame.
pub fn draw(f: &mut Frame, app: &App) {
  let rows = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // header
      Constraint::Min(0),    // body
      Constraint::Length(1), // status bar
    ])
    .split(f.area());

  draw_header(f, rows[0], app);

  let cols = Layout::default()
    .direction(Direction::Horizontal)
    .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
    .split(rows[1]);
  servers::draw_list(f, cols[0], app);
  servers::draw_history(f, cols[1], app);

  draw_status(f, rows[2], app);
}

// ─── Header ───────────────────────────────────────────────────────────────────

fn draw_header(f: &mut Frame, area: Rect, app: &App) {
  let time = Local::now().format("%H:%M:%S").to_string();

  let left = Span::styled(
    format!(" remotelabs  {}", app.api_url),
    Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
  );
  let right = Span::styled(format!("{time} "), Style::default().fg(Color::Gray));

  let pad = area
    .width
    .saturating_sub(left.content.chars().count() as u16)
    .saturating_sub(right.content.chars().count() as u16);
  let line = Line::from(vec![left, Span::raw(" ".repeat(pad as usize)), right]);

  let block = Block::default().style(Style::default().bg(Color::DarkGray));
  let inner = block.inner(area);
  f.render_widget(block, area);
  f.render_widget(Paragraph::new(line), inner);
}

// ─── Status bar ───────────────────────────────────────────────────────────────

fn draw_status(f: &mut Frame, area: Rect, app: &App) {
  let (label, bg) = if app.view.error { ("STALE", Color::Red) } else { ("LIVE", Color::Cyan) };

  let mode = Span::styled(
    format!(" {label} "),
    Style::default().fg(Color::Black).bg(bg).add_modifier(Modifier::BOLD),
  );
  let detail = if app.view.error {
    "last poll failed; showing previous data".to_owned()
  } else {
    format!("{} polls", app.view.polls)
  };
  let hints = Span::styled(
    format!("  {detail}  ↑↓/jk select  Tab metric  q quit"),
    Style::default().fg(Color::DarkGray),
  );

  f.render_widget(
    Paragraph::new(Line::from(vec![mode, hints])).style(Style::default().bg(Color::Black)),
    area,
  );
}
