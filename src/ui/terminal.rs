use {
    crate::{
        tracker::{Tracker, TrackerMessage, ViewCommand},
        view::TableId,
    },
    crossterm::event::{KeyCode, KeyEvent, KeyEventKind},
    ratatui::{backend::CrosstermBackend, Terminal},
    std::{sync::Arc, time::Duration},
    tokio::sync::{mpsc, RwLock},
};

const REFRESH_INTERVAL: Duration = Duration::from_millis(250);
const ROWS_PER_PAGE_STEP: usize = 5;

/// What a key press asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Quit,
    NextTable,
    Send(ViewCommand),
    None,
}

/// Map a key to an action. Column keys sort the `selected` summary table; `+`/`-`
/// step the page size from `rows_per_page`.
pub fn map_key(code: KeyCode, selected: TableId, rows_per_page: usize) -> KeyAction {
    match code {
        KeyCode::Char('q') | KeyCode::Esc => KeyAction::Quit,
        KeyCode::Tab => KeyAction::NextTable,
        KeyCode::Right => KeyAction::Send(ViewCommand::NextPage),
        KeyCode::Left => KeyAction::Send(ViewCommand::PreviousPage),
        KeyCode::Char('+') => KeyAction::Send(ViewCommand::SetRowsPerPage(rows_per_page + ROWS_PER_PAGE_STEP)),
        KeyCode::Char('-') => KeyAction::Send(ViewCommand::SetRowsPerPage(
            rows_per_page.saturating_sub(ROWS_PER_PAGE_STEP).max(ROWS_PER_PAGE_STEP),
        )),
        KeyCode::Char('t') => KeyAction::Send(ViewCommand::SortKillsByTime),
        KeyCode::Char(c @ '0'..='3') => KeyAction::Send(ViewCommand::ToggleSort {
            table: selected,
            column: (c as u8 - b'0') as usize,
        }),
        KeyCode::Char('g') => KeyAction::Send(ViewCommand::CycleGridMode),
        KeyCode::Char('c') => KeyAction::Send(ViewCommand::Clear),
        KeyCode::Char('r') => KeyAction::Send(ViewCommand::Reload),
        KeyCode::Char('s') => KeyAction::Send(ViewCommand::Save),
        KeyCode::Char('k') => KeyAction::Send(ViewCommand::DemoKill),
        KeyCode::Char('m') => KeyAction::Send(ViewCommand::DemoMission),
        _ => KeyAction::None,
    }
}

fn next_table(current: TableId) -> TableId {
    let tables = TableId::summary_tables();
    let idx = tables.iter().position(|t| *t == current).unwrap_or(0);
    tables[(idx + 1) % tables.len()]
}

/// Run the TUI event loop
///
/// Reads the tracker for rendering and sends every key command through the
/// tracker channel, so the UI never mutates state directly.
pub async fn run_ui(
    tracker: Arc<RwLock<Tracker>>,
    tx: mpsc::Sender<TrackerMessage>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let stdout = std::io::stdout();
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    crossterm::terminal::enable_raw_mode()?;

    // Separate screen buffer keeps stdout apart from stderr logs
    crossterm::execute!(
        std::io::stdout(),
        crossterm::terminal::EnterAlternateScreen,
        crossterm::cursor::Hide
    )?;
    terminal.clear()?;

    let mut selected = TableId::FactionBounties;

    loop {
        if crossterm::event::poll(REFRESH_INTERVAL)? {
            if let crossterm::event::Event::Key(KeyEvent { code, kind, .. }) = crossterm::event::read()? {
                if kind != KeyEventKind::Press {
                    continue;
                }

                let rows_per_page = tracker.read().await.views().pagination().rows_per_page();
                match map_key(code, selected, rows_per_page) {
                    KeyAction::Quit => break,
                    KeyAction::NextTable => selected = next_table(selected),
                    KeyAction::Send(command) => {
                        if tx.send(TrackerMessage::Command(command)).await.is_err() {
                            log::warn!("Tracker stopped, leaving UI");
                            break;
                        }
                    }
                    KeyAction::None => {}
                }
            }
        }

        {
            let tracker = tracker.read().await;
            let area = terminal.size()?;
            terminal.draw(|f| {
                if let Err(e) = crate::ui::layout::render_layout(f, area, &tracker, selected) {
                    log::error!("Layout render error: {}", e);
                }
            })?;
        }
    }

    crossterm::execute!(
        std::io::stdout(),
        crossterm::terminal::LeaveAlternateScreen,
        crossterm::cursor::Show
    )?;
    crossterm::terminal::disable_raw_mode()?;
    Ok(())
}
