/// Multi-row selection keyed on row equality
#[derive(Debug, Clone)]
pub struct SelectionModel<R> {
    selected: Vec<R>,
}

impl<R> Default for SelectionModel<R> {
    fn default() -> Self {
        Self {
            selected: Vec::new(),
        }
    }
}

impl<R: Clone + PartialEq> SelectionModel<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_selected(&self, row: &R) -> bool {
        self.selected.contains(row)
    }

    pub fn select(&mut self, row: &R) {
        if !self.is_selected(row) {
            self.selected.push(row.clone());
        }
    }

    pub fn deselect(&mut self, row: &R) {
        self.selected.retain(|selected| selected != row);
    }

    pub fn toggle(&mut self, row: &R) {
        if self.is_selected(row) {
            self.deselect(row);
        } else {
            self.select(row);
        }
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Drop selected rows that are no longer present
    pub fn retain_present(&mut self, rows: &[R]) {
        self.selected.retain(|selected| rows.contains(selected));
    }

    /// Selected rows, in selection order
    pub fn selected(&self) -> &[R] {
        &self.selected
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }
}
