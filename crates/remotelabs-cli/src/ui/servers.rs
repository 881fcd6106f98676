//! Server list and per-server utilisation history.

use ratatui::{
  Frame,
  layout::{Constraint, Direction, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, List, ListItem, Paragraph, Sparkline},
};
use remotelabs_core::server::ServerStatus;

use crate::app::{App, Metric};

fn load_color(percent: f64) -> Color {
  match percent {
    p if p >= 90.0 => Color::Red,
    p if p >= 70.0 => Color::Yellow,
    _ => Color::Green,
  }
}

fn current(server: &ServerStatus, metric: Metric) -> f64 {
  match metric {
    Metric::Cpu => server.cpu_percent,
    Metric::Ram => server.ram_percent,
    Metric::Disk => server.disk_percent,
  }
}

/// Left pane: one line per server with the highlighted metric.
pub fn draw_list(f: &mut Frame, area: Rect, app: &App) {
  let block = Block::default()
    .title(format!(" Servers ({}) · {} ", app.view.servers.len(), app.metric.label()))
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));

  let items: Vec<ListItem> = app
    .view
    .servers
    .iter()
    .enumerate()
    .map(|(i, server)| {
      let value = current(server, app.metric);
      let base = if i == app.cursor {
        Style::default().bg(Color::Blue).fg(Color::White).add_modifier(Modifier::BOLD)
      } else {
        Style::default()
      };
      let reading = if server.online {
        Span::styled(format!("{value:>5.1}%"), base.fg(load_color(value)))
      } else {
        Span::styled("  down", base.fg(Color::Red))
      };
      ListItem::new(Line::from(vec![Span::styled(format!(" {:<20}", server.name), base), reading]))
    })
    .collect();

  f.render_widget(List::new(items).block(block), area);
}

/// Right pane: a sparkline per metric for the selected server.
pub fn draw_history(f: &mut Frame, area: Rect, app: &App) {
  let title = app.selected().map(|n| format!(" {n} ")).unwrap_or_else(|| " History ".into());
  let block = Block::default()
    .title(title)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));
  let inner = block.inner(area);
  f.render_widget(block, area);

  let Some(history) = app.selected().and_then(|name| app.view.history.get(name)) else {
    f.render_widget(
      Paragraph::new(Span::styled(
        "Waiting for the first poll…",
        Style::default().fg(Color::DarkGray),
      )),
      inner,
    );
    return;
  };

  let rows = Layout::default()
    .direction(Direction::Vertical)
    .constraints([Constraint::Ratio(1, 3); 3])
    .split(inner);

  for (metric, row) in Metric::ALL.into_iter().zip(rows.iter()) {
    let latest = history.latest().map(|s| metric.of(s)).unwrap_or_default();
    let mut data = history.series(|s| metric.of(s));
    if data.is_empty() {
      data.push(0);
    }
    let highlighted = metric == app.metric;
    let border = if highlighted { Color::Cyan } else { Color::DarkGray };
    f.render_widget(
      Sparkline::default()
        .block(
          Block::default()
            .title(format!(" {} {latest:.1}% ", metric.label()))
            .borders(Borders::TOP)
            .border_style(Style::default().fg(border)),
        )
        .data(&data)
        .max(100)
        .style(Style::default().fg(load_color(latest))),
      *row,
    );
  }
}
