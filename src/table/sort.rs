use super::{ColumnDefinition, PageWindow, SortDirection, TableRow};

/// Sort host rows by a column, stable for equal keys.
///
/// Hosts call this when answering a sort request; the table never does.
pub fn sort_rows<R: TableRow>(rows: &mut [R], column: &ColumnDefinition<R>, direction: SortDirection) {
    rows.sort_by(|a, b| {
        let ordering = column.compare(a, b);
        match direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
}

/// Rows of the page described by `window`, empty past the end
pub fn page_slice<R>(rows: &[R], window: PageWindow) -> &[R] {
    let start = window.page_index.saturating_mul(window.page_size);
    if window.page_size == 0 || start >= rows.len() {
        return &[];
    }
    let end = start.saturating_add(window.page_size).min(rows.len());
    &rows[start..end]
}
