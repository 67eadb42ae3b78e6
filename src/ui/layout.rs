use {
    crate::{
        error::{TrackerError, TrackerResult},
        tracker::Tracker,
        view::{KillLogPage, ShipCard, SortState, TableId, TableView},
    },
    ratatui::{
        layout::{Constraint, Direction, Layout as RatLayout, Rect},
        style::{Color, Modifier, Style},
        text::{Line, Span},
        widgets::{Block, Borders, Paragraph, Row, Table},
        Frame,
    },
};

const CARD_WIDTH: u16 = 26;

/// Render the whole dashboard. Fails when the terminal leaves no room for a region.
pub fn render_layout(f: &mut Frame, area: Rect, tracker: &Tracker, selected: TableId) -> TrackerResult<()> {
    if area.width == 0 || area.height == 0 {
        return Err(TrackerError::MissingTarget("dashboard"));
    }

    let chunks = RatLayout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(8),    // Tables
            Constraint::Length(6), // Ship grid
            Constraint::Length(3), // Footer/Status
        ])
        .split(area);

    let body = RatLayout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(chunks[1]);

    render_header(f, chunks[0], tracker);
    render_kill_log(f, body[0], &tracker.kill_log())?;
    render_summaries(f, body[1], tracker, selected)?;
    render_ship_grid(f, chunks[2], &tracker.ship_cards(), tracker.views().grid_mode().label())?;
    render_footer(f, chunks[3], tracker);

    Ok(())
}

fn render_header(f: &mut Frame, area: Rect, tracker: &Tracker) {
    let status = tracker.status().unwrap_or("Waiting for commander data");
    let text = vec![
        Line::from(vec![
            Span::styled("Kill Tracker", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::raw(" - "),
            Span::raw(status.to_string()),
        ]),
    ];

    f.render_widget(Paragraph::new(text).block(Block::default().borders(Borders::ALL)), area);
}

fn header_row(table: TableId, sort: SortState) -> Row<'static> {
    let cells: Vec<String> = table
        .headers()
        .iter()
        .enumerate()
        .map(|(i, title)| {
            if i == sort.column {
                format!("{} {}", title, sort.direction.arrow())
            } else {
                title.to_string()
            }
        })
        .collect();
    Row::new(cells).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
}

fn even_widths(columns: usize) -> Vec<Constraint> {
    let share = (100 / columns.max(1)) as u16;
    vec![Constraint::Percentage(share); columns]
}

fn render_kill_log(f: &mut Frame, area: Rect, page: &KillLogPage) -> TrackerResult<()> {
    if area.height < 3 {
        return Err(TrackerError::MissingTarget("kill log"));
    }

    let rows: Vec<Row> = page.rows.iter().map(|cells| Row::new(cells.clone())).collect();
    let widths = [
        Constraint::Length(24), // Time
        Constraint::Length(18), // Ship
        Constraint::Min(20),    // Rewards
        Constraint::Length(18), // Victim faction
        Constraint::Length(12), // Bounty
    ];

    let title = format!(
        "Kills ({}) - page {}/{}",
        page.total_rows, page.current_page, page.total_pages
    );
    let table = Table::new(rows, widths)
        .header(header_row(TableId::Kills, TableId::Kills.initial_sort()))
        .block(Block::default().borders(Borders::ALL).title(title));

    f.render_widget(table, area);
    Ok(())
}

fn render_summaries(f: &mut Frame, area: Rect, tracker: &Tracker, selected: TableId) -> TrackerResult<()> {
    let tables = TableId::summary_tables();
    let chunks = RatLayout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Ratio(1, 4); 4])
        .split(area);

    for (table, chunk) in tables.into_iter().zip(chunks.iter()) {
        render_summary(f, *chunk, &tracker.summary(table), table == selected)?;
    }
    Ok(())
}

fn render_summary(f: &mut Frame, area: Rect, view: &TableView, selected: bool) -> TrackerResult<()> {
    if area.height < 2 {
        return Err(TrackerError::MissingTarget(view.table.title()));
    }

    let rows: Vec<Row> = view.rows.iter().map(|cells| Row::new(cells.clone())).collect();
    let footer = Row::new(view.footer.clone()).style(Style::default().add_modifier(Modifier::BOLD));

    let border_style = if selected {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };

    let table = Table::new(rows, even_widths(view.table.column_count()))
        .header(header_row(view.table, view.sort))
        .footer(footer)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .title(view.table.title()),
        );

    f.render_widget(table, area);
    Ok(())
}

fn render_ship_grid(f: &mut Frame, area: Rect, cards: &[ShipCard], mode: &str) -> TrackerResult<()> {
    if area.height < 3 {
        return Err(TrackerError::MissingTarget("ship grid"));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Ships ({})", mode));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let fits = (inner.width / CARD_WIDTH) as usize;
    let shown = cards.len().min(fits);
    if shown == 0 {
        return Ok(());
    }

    let slots = RatLayout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![Constraint::Length(CARD_WIDTH); shown])
        .split(inner);

    for (card, slot) in cards.iter().zip(slots.iter()) {
        let text = vec![
            Line::from(Span::styled(
                card.display_name.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(card.bounty_text.clone()),
            Line::from(Span::styled(card.kills_text.clone(), Style::default().fg(Color::Green))),
        ];
        f.render_widget(
            Paragraph::new(text).block(Block::default().borders(Borders::LEFT)),
            *slot,
        );
    }
    Ok(())
}

fn render_footer(f: &mut Frame, area: Rect, tracker: &Tracker) {
    let store = tracker.store();
    let text = vec![Line::from(vec![
        Span::styled("Kills: ", Style::default().fg(Color::Cyan)),
        Span::raw(store.kill_count().to_string()),
        Span::raw(" | "),
        Span::styled("Missions: ", Style::default().fg(Color::Cyan)),
        Span::raw(store.mission_count().to_string()),
        Span::raw(" | "),
        Span::raw(tracker.last_activity().unwrap_or("Idle").to_string()),
        Span::raw(" | q quit ←/→ page +/- rows t time Tab table 0-3 sort g grid c clear r reload s save k/m demo"),
    ])];

    let footer = Block::default()
        .borders(Borders::ALL)
        .title(format!("Status ({})", tracker.persistence().backend_type()));

    f.render_widget(Paragraph::new(text).block(footer), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{persistence::PersistenceBridge, reference::ShipCatalog};
    use ratatui::{backend::TestBackend, Terminal};

    #[test]
    fn test_renders_into_test_backend() {
        let mut tracker = Tracker::new(PersistenceBridge::in_memory(), ShipCatalog::new(), 10);
        tracker
            .command(crate::tracker::ViewCommand::DemoKill)
            .unwrap();

        let mut terminal = Terminal::new(TestBackend::new(160, 48)).unwrap();
        let mut result = Ok(());
        terminal
            .draw(|f| {
                let area = f.size();
                result = render_layout(f, area, &tracker, TableId::Missions);
            })
            .unwrap();
        assert!(result.is_ok());

        let content: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(content.contains("Kill Tracker"));
        assert!(content.contains("Missions"));
        assert!(content.contains("Ships (by ship)"));
        assert!(!content.contains("by by"));
    }

    #[test]
    fn test_empty_area_is_missing_target() {
        let tracker = Tracker::new(PersistenceBridge::in_memory(), ShipCatalog::new(), 10);
        let mut terminal = Terminal::new(TestBackend::new(10, 10)).unwrap();
        let mut result = Ok(());
        terminal
            .draw(|f| {
                result = render_layout(f, Rect::new(0, 0, 0, 0), &tracker, TableId::Missions);
            })
            .unwrap();
        assert!(matches!(result, Err(TrackerError::MissingTarget("dashboard"))));
    }
}
