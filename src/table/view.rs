use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::trace;

use super::{ColumnDefinition, PageWindow, SelectionModel, SortDirection, TableRow};

pub const SELECT_COLUMN_KEY: &str = "select";
pub const ACTIONS_COLUMN_KEY: &str = "actions";

/// Presentation switches of one table instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    pub selectable: bool,
    pub size_selectable: bool,
    pub show_edit: bool,
    pub show_details: bool,
    pub show_delete: bool,
    pub show_paginator: bool,
    pub page_size_options: Vec<usize>,
    pub header_radius: String,
    pub cell_padding: String,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            selectable: false,
            size_selectable: true,
            show_edit: false,
            show_details: false,
            show_delete: false,
            show_paginator: true,
            page_size_options: vec![5, 10, 20],
            header_radius: "16px".to_string(),
            cell_padding: "10px".to_string(),
        }
    }
}

impl TableConfig {
    /// Whether any row action is enabled
    pub fn show_actions(&self) -> bool {
        self.show_edit || self.show_details || self.show_delete
    }
}

/// Per-row buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowAction {
    Edit,
    Details,
    Delete,
}

impl RowAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RowAction::Edit => "edit",
            RowAction::Details => "details",
            RowAction::Delete => "delete",
        }
    }
}

/// One entry of the display-column list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "key", rename_all = "snake_case")]
pub enum DisplayColumn {
    Select,
    Data(String),
    Actions,
}

impl DisplayColumn {
    pub fn key(&self) -> &str {
        match self {
            DisplayColumn::Select => SELECT_COLUMN_KEY,
            DisplayColumn::Data(key) => key,
            DisplayColumn::Actions => ACTIONS_COLUMN_KEY,
        }
    }
}

/// User intent reported to the host
#[derive(Debug, Clone, PartialEq)]
pub enum TableEvent<R> {
    PageChanged { page_index: usize, page_size: usize },
    SortRequested { column: String, direction: SortDirection },
    SelectionChanged(Vec<R>),
    RowAction { row: R, action: RowAction },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderCell {
    pub key: String,
    pub header: String,
    pub sortable: bool,
    pub width: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayRow {
    /// Present only when the table is selectable
    pub selected: Option<bool>,
    pub cells: Vec<String>,
    pub actions: Vec<RowAction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaginatorDisplay {
    pub page_index: usize,
    pub page_size: usize,
    pub total_items: usize,
    /// Empty when the page size cannot be changed
    pub page_size_options: Vec<usize>,
}

/// Everything needed to draw the table once
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableDisplay {
    pub columns: Vec<DisplayColumn>,
    pub headers: Vec<HeaderCell>,
    pub rows: Vec<DisplayRow>,
    /// Header checkbox state, when selectable
    pub all_selected: Option<bool>,
    pub paginator: Option<PaginatorDisplay>,
}

/// Selection column first, then the data columns in order, then actions
pub fn display_columns<R>(columns: &[ColumnDefinition<R>], config: &TableConfig) -> Vec<DisplayColumn> {
    let mut display = Vec::with_capacity(columns.len() + 2);
    if config.selectable {
        display.push(DisplayColumn::Select);
    }
    display.extend(columns.iter().map(|column| DisplayColumn::Data(column.key.clone())));
    if config.show_actions() {
        display.push(DisplayColumn::Actions);
    }
    display
}

fn enabled_actions(config: &TableConfig) -> Vec<RowAction> {
    [
        (config.show_edit, RowAction::Edit),
        (config.show_details, RowAction::Details),
        (config.show_delete, RowAction::Delete),
    ]
    .into_iter()
    .filter_map(|(enabled, action)| enabled.then_some(action))
    .collect()
}

/// Render rows as given; the window only feeds the paginator.
pub fn render<R: TableRow>(
    columns: &[ColumnDefinition<R>],
    rows: &[R],
    window: PageWindow,
    config: &TableConfig,
    selection: &SelectionModel<R>,
) -> TableDisplay {
    let actions = enabled_actions(config);
    let all_selected = config
        .selectable
        .then(|| every_row_selected(rows, selection));

    let rows = rows
        .iter()
        .map(|row| DisplayRow {
            selected: config.selectable.then(|| selection.is_selected(row)),
            cells: columns.iter().map(|column| column.cell_text(row)).collect(),
            actions: actions.clone(),
        })
        .collect::<Vec<_>>();

    let paginator = config.show_paginator.then(|| PaginatorDisplay {
        page_index: window.page_index,
        page_size: window.page_size,
        total_items: window.total_items,
        page_size_options: if config.size_selectable {
            config.page_size_options.clone()
        } else {
            Vec::new()
        },
    });

    TableDisplay {
        columns: display_columns(columns, config),
        headers: columns
            .iter()
            .map(|column| HeaderCell {
                key: column.key.clone(),
                header: column.header.clone(),
                sortable: column.sortable,
                width: column.width.clone(),
            })
            .collect(),
        all_selected,
        rows,
        paginator,
    }
}

/// Equal rows share one selection entry, so counting entries is not enough.
/// An empty view counts as fully selected.
fn every_row_selected<R: TableRow>(rows: &[R], selection: &SelectionModel<R>) -> bool {
    rows.iter().all(|row| selection.is_selected(row))
}

/// Stateful table bound to a host through an event channel
pub struct TableView<R> {
    columns: Vec<ColumnDefinition<R>>,
    rows: Vec<R>,
    window: PageWindow,
    config: TableConfig,
    selection: SelectionModel<R>,
    display_columns: Vec<DisplayColumn>,
    events: mpsc::UnboundedSender<TableEvent<R>>,
}

impl<R: TableRow> TableView<R> {
    pub fn new(config: TableConfig) -> (Self, mpsc::UnboundedReceiver<TableEvent<R>>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let view = Self {
            columns: Vec::new(),
            rows: Vec::new(),
            window: PageWindow::default(),
            display_columns: display_columns::<R>(&[], &config),
            config,
            selection: SelectionModel::new(),
            events,
        };
        (view, receiver)
    }

    pub fn set_columns(&mut self, columns: Vec<ColumnDefinition<R>>) {
        self.columns = columns;
        self.refresh_display_columns();
    }

    /// Replace the rows in view. Selected rows that disappeared are dropped.
    pub fn set_rows(&mut self, rows: Vec<R>) {
        self.selection.retain_present(&rows);
        self.rows = rows;
    }

    pub fn set_page_window(&mut self, window: PageWindow) {
        self.window = window;
    }

    pub fn set_config(&mut self, config: TableConfig) {
        self.config = config;
        self.refresh_display_columns();
    }

    pub fn set_show_edit(&mut self, show: bool) {
        self.config.show_edit = show;
        self.refresh_display_columns();
    }

    pub fn set_show_details(&mut self, show: bool) {
        self.config.show_details = show;
        self.refresh_display_columns();
    }

    pub fn set_show_delete(&mut self, show: bool) {
        self.config.show_delete = show;
        self.refresh_display_columns();
    }

    pub fn set_selectable(&mut self, selectable: bool) {
        self.config.selectable = selectable;
        if !selectable {
            self.selection.clear();
        }
        self.refresh_display_columns();
    }

    fn refresh_display_columns(&mut self) {
        self.display_columns = display_columns(&self.columns, &self.config);
    }

    pub fn display_columns(&self) -> &[DisplayColumn] {
        &self.display_columns
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn window(&self) -> PageWindow {
        self.window
    }

    pub fn selected(&self) -> &[R] {
        self.selection.selected()
    }

    pub fn render(&self) -> TableDisplay {
        render(
            &self.columns,
            &self.rows,
            self.window,
            &self.config,
            &self.selection,
        )
    }

    /// Every row in view is selected
    pub fn is_all_selected(&self) -> bool {
        every_row_selected(&self.rows, &self.selection)
    }

    /// Propose a new page window; the host decides what to show
    pub fn on_page_change(&self, page_index: usize, page_size: usize) {
        self.emit(TableEvent::PageChanged {
            page_index,
            page_size,
        });
    }

    /// Ask the host to sort; rows are left as they are
    pub fn on_sort_request(&self, column: &str, direction: SortDirection) {
        self.emit(TableEvent::SortRequested {
            column: column.to_string(),
            direction,
        });
    }

    pub fn toggle_row(&mut self, row: &R) {
        self.selection.toggle(row);
        self.emit_selection();
    }

    /// Header checkbox: clear a full selection, otherwise select every row in view
    pub fn toggle_all(&mut self) {
        if self.is_all_selected() {
            self.selection.clear();
        } else {
            for row in &self.rows {
                self.selection.select(row);
            }
        }
        self.emit_selection();
    }

    pub fn on_row_action(&self, row: &R, action: RowAction) {
        self.emit(TableEvent::RowAction {
            row: row.clone(),
            action,
        });
    }

    fn emit_selection(&self) {
        self.emit(TableEvent::SelectionChanged(self.selection.selected().to_vec()));
    }

    fn emit(&self, event: TableEvent<R>) {
        if self.events.send(event).is_err() {
            trace!("Table host stopped listening, event dropped");
        }
    }
}
