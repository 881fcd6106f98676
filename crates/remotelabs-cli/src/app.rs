//! Dashboard state, key handling and the terminal event loop.

use std::{io, time::Duration};

use anyhow::Context as _;
use crossterm::{
  event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
  execute,
  terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use remotelabs_client::monitor::{FleetView, MonitorHandle, Sample};

use crate::ui;

// ─── Metric ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
  Cpu,
  Ram,
  Disk,
}

impl Metric {
  pub const ALL: [Metric; 3] = [Metric::Cpu, Metric::Ram, Metric::Disk];

  pub fn label(self) -> &'static str {
    match self {
      Metric::Cpu => "CPU",
      Metric::Ram => "RAM",
      Metric::Disk => "Disk",
    }
  }

  pub fn of(self, sample: &Sample) -> f64 {
    match self {
      Metric::Cpu => sample.cpu,
      Metric::Ram => sample.ram,
      Metric::Disk => sample.disk,
    }
  }

  fn next(self) -> Self {
    match self {
      Metric::Cpu => Metric::Ram,
      Metric::Ram => Metric::Disk,
      Metric::Disk => Metric::Cpu,
    }
  }
}

// ─── App ──────────────────────────────────────────────────────────────────────

pub struct App {
  /// Latest published fleet snapshot.
  pub view:    FleetView,
  /// Index into `view.servers`.
  pub cursor:  usize,
  /// Metric highlighted in the server list.
  pub metric:  Metric,
  pub api_url: String,
}

impl App {
  pub fn new(api_url: &str) -> Self {
    Self {
      view:    FleetView::default(),
      cursor:  0,
      metric:  Metric::Cpu,
      api_url: api_url.to_owned(),
    }
  }

  /// Replace the snapshot, keeping the cursor in range.
  pub fn update(&mut self, view: FleetView) {
    self.view = view;
    self.cursor = self.cursor.min(self.view.servers.len().saturating_sub(1));
  }

  pub fn selected(&self) -> Option<&str> {
    self.view.servers.get(self.cursor).map(|s| s.name.as_str())
  }

  /// Process a key event. Returns `true` to continue, `false` to quit.
  pub fn handle_key(&mut self, key: KeyEvent) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
      return false;
    }
    match key.code {
      KeyCode::Char('q') | KeyCode::Esc => return false,
      KeyCode::Down | KeyCode::Char('j') => {
        if self.cursor + 1 < self.view.servers.len() {
          self.cursor += 1;
        }
      }
      KeyCode::Up | KeyCode::Char('k') => {
        self.cursor = self.cursor.saturating_sub(1);
      }
      KeyCode::Tab | KeyCode::Char('m') => self.metric = self.metric.next(),
      _ => {}
    }
    true
  }
}

// ─── Event loop ───────────────────────────────────────────────────────────────

/// Take over the terminal and render `monitor` until the user quits.
pub async fn run(monitor: MonitorHandle, api_url: &str) -> anyhow::Result<()> {
  let mut app = App::new(api_url);

  enable_raw_mode().context("enabling raw mode")?;
  let mut stdout = io::stdout();
  execute!(stdout, EnterAlternateScreen).context("entering alternate screen")?;
  let backend = CrosstermBackend::new(stdout);
  let mut terminal = Terminal::new(backend).context("creating terminal")?;

  let result = event_loop(&mut terminal, &mut app, &monitor).await;

  // Restore terminal regardless of result.
  disable_raw_mode().ok();
  execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
  terminal.show_cursor().ok();

  result
}

async fn event_loop(
  terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
  app: &mut App,
  monitor: &MonitorHandle,
) -> anyhow::Result<()> {
  loop {
    app.update(monitor.latest());
    terminal.draw(|f| ui::draw(f, app)).context("drawing frame")?;

    // Poll for an event, yielding control to tokio while waiting.
    let maybe_event = tokio::task::block_in_place(|| {
      if event::poll(Duration::from_millis(200))? {
        Ok::<_, io::Error>(Some(event::read()?))
      } else {
        Ok(None)
      }
    })?;

    if let Some(Event::Key(key)) = maybe_event
      && !app.handle_key(key)
    {
      break;
    }
  }
  Ok(())
}
