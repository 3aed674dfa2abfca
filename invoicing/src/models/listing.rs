//! Shared listing parameters.

use serde::{Deserialize, Serialize};

/// Which slice of a soft-deletable table to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordView {
    /// Neither archived nor deleted.
    #[default]
    Active,
    Archived,
    Deleted,
}

impl RecordView {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordView::Active => "active",
            RecordView::Archived => "archived",
            RecordView::Deleted => "deleted",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "archived" => RecordView::Archived,
            "deleted" => RecordView::Deleted,
            _ => RecordView::Active,
        }
    }
}

/// Offset pagination, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub per_page: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 10,
        }
    }
}

impl Page {
    pub fn limit(&self) -> i64 {
        self.per_page.clamp(1, 100)
    }

    pub fn offset(&self) -> i64 {
        (self.page.max(1) - 1) * self.limit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_offsets() {
        assert_eq!(Page::default().offset(), 0);
        assert_eq!(Page { page: 3, per_page: 10 }.offset(), 20);
        assert_eq!(Page { page: 0, per_page: 10 }.offset(), 0);
        assert_eq!(Page { page: 2, per_page: 500 }.limit(), 100);
    }

    #[test]
    fn test_record_view_defaults_to_active() {
        assert_eq!(RecordView::from_string("deleted"), RecordView::Deleted);
        assert_eq!(RecordView::from_string("bogus"), RecordView::Active);
    }
}
