//! View projection: sorted, paginated and grouped views over the store and rollups
//!
//! Views are recomputed from the numeric state on every projection; nothing here
//! is read back into the rollups. The projector owns only presentation state:
//! per-table sort column/direction, kill log pagination and the ship grid mode.
//!
//! Two sorting regimes:
//! - the kill log is always newest first (a dedicated control re-applies it)
//! - summary tables sort by a clicked column, toggling direction on repeat clicks

use crate::events::KillEvent;
use crate::reference::ship_image_path;
use crate::rollup::{KeyedRollup, MissionRollup, RollupEngine, RollupKind};
use crate::store::AggregationStore;
use crate::ui::renderer::{fix_ship_name, format_credits, format_kills, format_thousands};
use chrono::{DateTime, NaiveDateTime};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::ops::Range;

pub const DEFAULT_ROWS_PER_PAGE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableId {
    Kills,
    FactionBounties,
    ShipTypeBounties,
    VictimFactionBounties,
    Missions,
}

impl TableId {
    pub fn all() -> [TableId; 5] {
        [
            TableId::Kills,
            TableId::FactionBounties,
            TableId::ShipTypeBounties,
            TableId::VictimFactionBounties,
            TableId::Missions,
        ]
    }

    /// Tables sorted by header clicks (everything but the kill log)
    pub fn summary_tables() -> [TableId; 4] {
        [
            TableId::FactionBounties,
            TableId::ShipTypeBounties,
            TableId::VictimFactionBounties,
            TableId::Missions,
        ]
    }

    pub fn title(&self) -> &'static str {
        match self {
            TableId::Kills => "Kills",
            TableId::FactionBounties => "Faction Bounties",
            TableId::ShipTypeBounties => "Ship Type Bounties",
            TableId::VictimFactionBounties => "Victim Faction Bounties",
            TableId::Missions => "Massacre Missions",
        }
    }

    pub fn headers(&self) -> &'static [&'static str] {
        match self {
            TableId::Kills => &["Time", "Ship", "Rewards", "Victim Faction", "Bounty"],
            TableId::FactionBounties => &["Faction", "Bounty", "Kills"],
            TableId::ShipTypeBounties => &["Ship", "Bounty", "Kills"],
            TableId::VictimFactionBounties => &["Victim Faction", "Bounty", "Kills"],
            TableId::Missions => &["Faction", "Target", "Kills", "Reward"],
        }
    }

    pub fn column_count(&self) -> usize {
        self.headers().len()
    }

    /// Direction a column starts in when first clicked: names ascending, magnitudes descending
    pub fn default_direction(&self, column: usize) -> SortDirection {
        if column == 0 || (column == 1 && *self == TableId::Missions) {
            SortDirection::Ascending
        } else {
            SortDirection::Descending
        }
    }

    /// Sort state before any click
    pub fn initial_sort(&self) -> SortState {
        let column = match self {
            TableId::Kills => 0,
            TableId::Missions => 3,
            _ => 1,
        };
        SortState { column, direction: SortDirection::Descending }
    }

    pub fn rollup_kind(&self) -> Option<RollupKind> {
        match self {
            TableId::FactionBounties => Some(RollupKind::Faction),
            TableId::ShipTypeBounties => Some(RollupKind::ShipType),
            TableId::VictimFactionBounties => Some(RollupKind::VictimFaction),
            TableId::Kills | TableId::Missions => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    pub fn arrow(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "▲",
            SortDirection::Descending => "▼",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortState {
    pub column: usize,
    pub direction: SortDirection,
}

/// Kill log pagination. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    current_page: usize,
    rows_per_page: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(DEFAULT_ROWS_PER_PAGE)
    }
}

impl Pagination {
    pub fn new(rows_per_page: usize) -> Self {
        Self {
            current_page: 1,
            rows_per_page: rows_per_page.max(1),
        }
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn rows_per_page(&self) -> usize {
        self.rows_per_page
    }

    /// `ceil(total / rows_per_page)`, never below 1
    pub fn total_pages(&self, total_rows: usize) -> usize {
        total_rows.div_ceil(self.rows_per_page).max(1)
    }

    pub fn next_page(&mut self, total_rows: usize) {
        if self.current_page < self.total_pages(total_rows) {
            self.current_page += 1;
        }
    }

    pub fn previous_page(&mut self) {
        if self.current_page > 1 {
            self.current_page -= 1;
        }
    }

    /// Change the page size and return to the first page. Zero is ignored.
    pub fn set_rows_per_page(&mut self, rows_per_page: usize) {
        if rows_per_page == 0 {
            log::warn!("Ignoring rows-per-page of 0");
            return;
        }
        self.rows_per_page = rows_per_page;
        self.current_page = 1;
    }

    pub fn reset(&mut self) {
        self.current_page = 1;
    }

    /// Index range of the visible rows, with the page clamped into range
    pub fn visible_range(&self, total_rows: usize) -> Range<usize> {
        let page = self.current_page.min(self.total_pages(total_rows));
        let start = ((page - 1) * self.rows_per_page).min(total_rows);
        let end = (start + self.rows_per_page).min(total_rows);
        start..end
    }
}

/// Ship card grid ordering, cycled by a single control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GridSortMode {
    #[default]
    ShipType,
    Kills,
    Bounty,
}

impl GridSortMode {
    pub fn next(self) -> Self {
        match self {
            GridSortMode::ShipType => GridSortMode::Kills,
            GridSortMode::Kills => GridSortMode::Bounty,
            GridSortMode::Bounty => GridSortMode::ShipType,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            GridSortMode::ShipType => "by ship",
            GridSortMode::Kills => "by kills",
            GridSortMode::Bounty => "by bounty",
        }
    }
}

/// A projected table: display cells plus an unsorted footer
#[derive(Debug, Clone, PartialEq)]
pub struct TableView {
    pub table: TableId,
    pub sort: SortState,
    pub rows: Vec<Vec<String>>,
    pub footer: Vec<String>,
}

/// The visible slice of the kill log
#[derive(Debug, Clone, PartialEq)]
pub struct KillLogPage {
    pub rows: Vec<Vec<String>>,
    pub current_page: usize,
    pub total_pages: usize,
    pub total_rows: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShipCard {
    pub ship_name: String,
    pub display_name: String,
    pub bounty: u64,
    pub kills: u64,
    pub bounty_text: String,
    pub kills_text: String,
    pub image_path: String,
}

#[derive(Debug, Clone)]
pub struct ViewProjector {
    sorts: HashMap<TableId, SortState>,
    pagination: Pagination,
    grid_mode: GridSortMode,
}

impl Default for ViewProjector {
    fn default() -> Self {
        Self::new(DEFAULT_ROWS_PER_PAGE)
    }
}

impl ViewProjector {
    pub fn new(rows_per_page: usize) -> Self {
        Self {
            sorts: TableId::all().into_iter().map(|t| (t, t.initial_sort())).collect(),
            pagination: Pagination::new(rows_per_page),
            grid_mode: GridSortMode::default(),
        }
    }

    pub fn sort_state(&self, table: TableId) -> SortState {
        self.sorts.get(&table).copied().unwrap_or_else(|| table.initial_sort())
    }

    pub fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    pub fn pagination_mut(&mut self) -> &mut Pagination {
        &mut self.pagination
    }

    pub fn grid_mode(&self) -> GridSortMode {
        self.grid_mode
    }

    /// Header click. Same column flips; a new column starts in its default direction.
    /// Clicking the kill log re-applies its time sort instead.
    pub fn toggle_sort(&mut self, table: TableId, column: usize) {
        if table == TableId::Kills {
            self.sort_kills_by_time();
            return;
        }
        if column >= table.column_count() {
            log::warn!("{} has no column {}", table.title(), column);
            return;
        }

        let current = self.sort_state(table);
        let direction = if current.column == column {
            current.direction.flipped()
        } else {
            table.default_direction(column)
        };
        self.sorts.insert(table, SortState { column, direction });
    }

    /// Re-apply newest-first ordering to the kill log and show the first page
    pub fn sort_kills_by_time(&mut self) {
        self.sorts.insert(TableId::Kills, TableId::Kills.initial_sort());
        self.pagination.reset();
    }

    pub fn cycle_grid_mode(&mut self) -> GridSortMode {
        self.grid_mode = self.grid_mode.next();
        self.grid_mode
    }

    /// Current page of the kill log, newest first
    pub fn kill_log(&self, store: &AggregationStore) -> KillLogPage {
        let ordered = newest_first(store.kills());
        let total_rows = ordered.len();
        let range = self.pagination.visible_range(total_rows);

        KillLogPage {
            rows: ordered[range].iter().map(|k| kill_cells(k)).collect(),
            current_page: self.pagination.current_page().min(self.pagination.total_pages(total_rows)),
            total_pages: self.pagination.total_pages(total_rows),
            total_rows,
        }
    }

    /// A summary table sorted by its current sort state
    pub fn summary(&self, table: TableId, rollups: &RollupEngine) -> TableView {
        let (rows, footer) = match table.rollup_kind() {
            Some(kind) => keyed_cells(rollups.keyed(kind)),
            None => mission_cells(rollups.missions()),
        };

        let sort = self.sort_state(table);
        let mut rows = rows;
        sort_rows(&mut rows, sort);

        TableView { table, sort, rows, footer }
    }

    /// Ship cards ordered by the grid mode
    pub fn ship_cards(&self, ship_types: &KeyedRollup) -> Vec<ShipCard> {
        let mut cards: Vec<ShipCard> = ship_types
            .rows()
            .iter()
            .map(|row| ShipCard {
                ship_name: row.key.clone(),
                display_name: fix_ship_name(&row.key),
                bounty: row.total_value,
                kills: row.count,
                bounty_text: format_credits(row.total_value),
                kills_text: format_kills(row.count),
                image_path: ship_image_path(&row.key),
            })
            .collect();

        match self.grid_mode {
            GridSortMode::ShipType => cards.sort_by(|a, b| locale_compare(&a.ship_name, &b.ship_name)),
            GridSortMode::Kills => cards.sort_by(|a, b| b.kills.cmp(&a.kills)),
            GridSortMode::Bounty => cards.sort_by(|a, b| b.bounty.cmp(&a.bounty)),
        }
        cards
    }
}

fn kill_cells(kill: &KillEvent) -> Vec<String> {
    vec![
        kill.timestamp.clone(),
        kill.ship_name.clone(),
        kill.rewards_text(),
        kill.victim_faction.clone().unwrap_or_default(),
        format_thousands(kill.bounty_amount),
    ]
}

fn keyed_cells(rollup: &KeyedRollup) -> (Vec<Vec<String>>, Vec<String>) {
    let rows = rollup
        .rows()
        .iter()
        .map(|r| vec![r.key.clone(), format_thousands(r.total_value), r.count.to_string()])
        .collect();
    let footer = rollup.footer();
    (
        rows,
        vec![
            "Total".to_string(),
            format_thousands(footer.total_value),
            footer.count.to_string(),
        ],
    )
}

fn mission_cells(rollup: &MissionRollup) -> (Vec<Vec<String>>, Vec<String>) {
    let rows = rollup
        .rows()
        .iter()
        .map(|r| {
            vec![
                r.faction.clone(),
                r.target.clone(),
                r.kills.to_string(),
                format_thousands(r.reward),
            ]
        })
        .collect();
    let footer = rollup.footer();
    (
        rows,
        vec![
            "Total".to_string(),
            String::new(),
            footer.max_kills.to_string(),
            format_thousands(footer.total_reward),
        ],
    )
}

/// Parse a display cell as a number, ignoring thousands separators
pub fn parse_cell_number(cell: &str) -> Option<f64> {
    cell.trim()
        .replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
}

/// Case-insensitive ordering with a case-sensitive tie break
pub fn locale_compare(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Stable sort of display rows on one column.
///
/// The column compares numerically when every cell in it is a number, otherwise
/// lexically, so the ordering stays total for mixed columns. Descending uses the
/// reversed comparator (not a reversal) so repeated sorts leave ties in place.
pub fn sort_rows(rows: &mut [Vec<String>], sort: SortState) {
    let cell = |row: &Vec<String>| row.get(sort.column).map(|c| c.trim().to_string()).unwrap_or_default();

    let numeric = rows.iter().all(|r| parse_cell_number(&cell(r)).is_some());

    let compare = |a: &Vec<String>, b: &Vec<String>| -> Ordering {
        let (a, b) = (cell(a), cell(b));
        if numeric {
            let (x, y) = (parse_cell_number(&a).unwrap_or(0.0), parse_cell_number(&b).unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        } else {
            locale_compare(&a, &b)
        }
    };

    match sort.direction {
        SortDirection::Ascending => rows.sort_by(|a, b| compare(a, b)),
        SortDirection::Descending => rows.sort_by(|a, b| compare(b, a)),
    }
}

/// Milliseconds since the epoch for an ISO-8601 timestamp
pub fn parse_timestamp(ts: &str) -> Option<i64> {
    let ts = ts.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
        return Some(dt.timestamp_millis());
    }
    NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|dt| dt.and_utc().timestamp_millis())
}

/// Kill log order: newest first.
///
/// Kills whose timestamp does not parse keep their position; only the parseable
/// ones are reordered among the slots they occupy.
pub fn newest_first(kills: &[KillEvent]) -> Vec<&KillEvent> {
    let mut ordered: Vec<&KillEvent> = kills.iter().collect();

    let slots: Vec<usize> = ordered
        .iter()
        .enumerate()
        .filter(|(_, k)| parse_timestamp(&k.timestamp).is_some())
        .map(|(i, _)| i)
        .collect();

    let mut dated: Vec<(i64, &KillEvent)> = slots
        .iter()
        .filter_map(|&i| parse_timestamp(&ordered[i].timestamp).map(|ts| (ts, ordered[i])))
        .collect();
    dated.sort_by(|a, b| b.0.cmp(&a.0));

    for (slot, (_, kill)) in slots.into_iter().zip(dated) {
        ordered[slot] = kill;
    }
    ordered
}
