// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::SortOrder;

pub const DEFAULT_PAGE_LIMIT: u64 = 25;

/// Offset/limit browsing state for the user list.
///
/// `count` is whatever the backend reported on the last accepted reload, so
/// `next` never walks past data the operator has not seen a count for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageState {
    offset: u64,
    limit: u64,
    count: u64,
    search: String,
    order: SortOrder,
}

/// A snapshot of the page parameters a reload was issued with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    pub search: String,
    pub order: SortOrder,
    pub offset: u64,
    pub limit: u64,
    /// Set on the single follow-up reload issued after an out-of-range answer.
    pub corrected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    Accepted,
    /// Offset was past the end; reload once more at the last valid page.
    Resnap(PageQuery),
    /// A corrected reload was still out of range; offset was clamped without
    /// fetching again.
    Clamped,
}

impl Default for PageState {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_LIMIT)
    }
}

impl PageState {
    pub fn new(limit: u64) -> Self {
        Self {
            offset: 0,
            limit: limit.max(1),
            count: 0,
            search: String::new(),
            order: SortOrder::default(),
        }
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }

    pub fn reset(&mut self, search: &str, order: SortOrder) -> PageQuery {
        self.search = search.trim().to_owned();
        self.order = order;
        self.offset = 0;
        self.query()
    }

    pub fn next(&mut self) -> Option<PageQuery> {
        if self.offset + self.limit >= self.count {
            return None;
        }
        self.offset += self.limit;
        Some(self.query())
    }

    pub fn prev(&mut self) -> PageQuery {
        self.offset = self.offset.saturating_sub(self.limit);
        self.query()
    }

    /// Parameters for reloading the current page.
    pub fn query(&self) -> PageQuery {
        PageQuery {
            search: self.search.clone(),
            order: self.order,
            offset: self.offset,
            limit: self.limit,
            corrected: false,
        }
    }

    pub fn apply_count(&mut self, query: &PageQuery, count: u64) -> PageOutcome {
        self.count = count;
        if count == 0 {
            self.offset = 0;
            return PageOutcome::Accepted;
        }
        if query.offset < count {
            return PageOutcome::Accepted;
        }

        self.offset = last_page_offset(count, self.limit);
        if query.corrected {
            return PageOutcome::Clamped;
        }
        PageOutcome::Resnap(PageQuery {
            corrected: true,
            ..self.query()
        })
    }
}

pub fn last_page_offset(count: u64, limit: u64) -> u64 {
    if count == 0 {
        return 0;
    }
    let limit = limit.max(1);
    ((count - 1) / limit) * limit
}
