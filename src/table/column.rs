use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use super::TableRow;

pub type RenderHook<R> = Arc<dyn Fn(&R) -> String + Send + Sync>;
pub type Comparator<R> = Arc<dyn Fn(&R, &R) -> Ordering + Send + Sync>;

/// How one column reads, labels and orders its cells
pub struct ColumnDefinition<R> {
    pub key: String,
    pub header: String,
    pub sortable: bool,
    pub width: Option<String>,
    pub is_date: bool,
    render: Option<RenderHook<R>>,
    comparator: Option<Comparator<R>>,
}

impl<R> ColumnDefinition<R> {
    pub fn new(key: impl Into<String>, header: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            header: header.into(),
            sortable: false,
            width: None,
            is_date: false,
            render: None,
            comparator: None,
        }
    }

    pub fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    pub fn width(mut self, width: impl Into<String>) -> Self {
        self.width = Some(width.into());
        self
    }

    pub fn date(mut self) -> Self {
        self.is_date = true;
        self
    }

    /// Replace the default cell text
    pub fn render_with(mut self, hook: impl Fn(&R) -> String + Send + Sync + 'static) -> Self {
        self.render = Some(Arc::new(hook));
        self
    }

    /// Order rows by something other than the cell value
    pub fn compare_with(
        mut self,
        comparator: impl Fn(&R, &R) -> Ordering + Send + Sync + 'static,
    ) -> Self {
        self.comparator = Some(Arc::new(comparator));
        self
    }

    pub fn comparator(&self) -> Option<&Comparator<R>> {
        self.comparator.as_ref()
    }
}

impl<R: TableRow> ColumnDefinition<R> {
    /// Text shown in this column for `row`
    pub fn cell_text(&self, row: &R) -> String {
        if let Some(render) = &self.render {
            return render(row);
        }
        let value = row.cell(&self.key);
        if self.is_date {
            value.as_date_text()
        } else {
            value.to_string()
        }
    }

    /// Ascending order of two rows under this column
    pub fn compare(&self, a: &R, b: &R) -> Ordering {
        match &self.comparator {
            Some(comparator) => comparator(a, b),
            None => a.cell(&self.key).compare(&b.cell(&self.key)),
        }
    }
}

impl<R> Clone for ColumnDefinition<R> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            header: self.header.clone(),
            sortable: self.sortable,
            width: self.width.clone(),
            is_date: self.is_date,
            render: self.render.clone(),
            comparator: self.comparator.clone(),
        }
    }
}

impl<R> fmt::Debug for ColumnDefinition<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnDefinition")
            .field("key", &self.key)
            .field("header", &self.header)
            .field("sortable", &self.sortable)
            .field("width", &self.width)
            .field("is_date", &self.is_date)
            .field("render", &self.render.is_some())
            .field("comparator", &self.comparator.is_some())
            .finish()
    }
}
