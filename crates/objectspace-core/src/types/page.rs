//! Page selection for partitioned scans

use crate::storage::partition::page_of;
use crate::types::{DocumentId, ValidationError};

/// One logical page out of `total`
///
/// Always satisfies `index < total` and `total >= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSpec {
    index: u64,
    total: u64,
}

impl PageSpec {
    /// Build a page, rejecting out-of-range values
    pub fn new(index: u64, total: u64) -> Result<Self, ValidationError> {
        if total < 1 {
            return Err(ValidationError::InvalidTotal(total.to_string()));
        }
        if index >= total {
            return Err(ValidationError::InvalidPage(index.to_string()));
        }
        Ok(Self { index, total })
    }

    /// Validate raw `page` / `total` query values
    ///
    /// Presence of both is checked first, then `total`, then `page`.
    pub fn from_query(page: Option<&str>, total: Option<&str>) -> Result<Self, ValidationError> {
        let page = page
            .filter(|v| !v.is_empty())
            .ok_or(ValidationError::MissingParameter("page"))?;
        let total = total
            .filter(|v| !v.is_empty())
            .ok_or(ValidationError::MissingParameter("total"))?;

        let total_pages = total
            .parse::<u64>()
            .ok()
            .filter(|t| *t >= 1)
            .ok_or_else(|| ValidationError::InvalidTotal(total.to_string()))?;

        let index = page
            .parse::<u64>()
            .ok()
            .filter(|p| *p < total_pages)
            .ok_or_else(|| ValidationError::InvalidPage(page.to_string()))?;

        Ok(Self {
            index,
            total: total_pages,
        })
    }

    /// Page index
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Total number of pages
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Whether `id` falls on this page
    pub fn contains(&self, id: &DocumentId) -> bool {
        page_of(id.partition_hash(), self.total) == self.index
    }
}
