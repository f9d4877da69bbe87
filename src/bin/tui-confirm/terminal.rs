use anyhow::Result;
use crossterm::event::{Event as CrosstermEvent, KeyEvent, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io;
use std::time::Duration;

pub type Backend = CrosstermBackend<io::Stdout>;

/// Initialize the terminal for TUI mode
pub fn init_terminal() -> Result<Terminal<Backend>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Restore the terminal to normal mode
pub fn restore_terminal(terminal: &mut Terminal<Backend>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Terminal events the demo cares about
#[derive(Debug, Clone)]
pub enum Event {
    Key(KeyEvent),
    Resize(u16, u16),
    Tick,
}

/// Polls crossterm without blocking the runtime
pub struct EventHandler {
    tick_interval: Duration,
}

impl EventHandler {
    pub fn new() -> Self {
        Self {
            tick_interval: Duration::from_millis(50),
        }
    }

    /// Get the next event, or a tick when nothing arrived in time
    pub async fn next(&mut self) -> Result<Event> {
        let interval = self.tick_interval;
        let event = tokio::task::spawn_blocking(move || -> io::Result<Option<CrosstermEvent>> {
            if crossterm::event::poll(interval)? {
                crossterm::event::read().map(Some)
            } else {
                Ok(None)
            }
        })
        .await??;

        Ok(match event {
            Some(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => Event::Key(key),
            Some(CrosstermEvent::Resize(width, height)) => Event::Resize(width, height),
            _ => Event::Tick,
        })
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}
