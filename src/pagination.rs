// Library Guide - Personal Library Catalog Client
// Copyright (C) 2025 Henning Berge
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! Page bookkeeping for list screens
//!
//! The backend returns no total count, so the last page is inferred from the
//! size of the page that came back.

use crate::config::DEFAULT_PAGE_SIZE;

/// One-relative page cursor with a fixed page size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    page: usize,
    page_size: usize,
}

impl Default for Pager {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl Pager {
    /// A zero page size is bumped to one.
    pub fn new(page_size: usize) -> Self {
        Self {
            page: 1,
            page_size: page_size.max(1),
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Row offset of the current page
    pub fn offset(&self) -> usize {
        (self.page - 1) * self.page_size
    }

    pub fn next(&mut self) {
        self.page += 1;
    }

    /// Returns false when already on the first page
    pub fn previous(&mut self) -> bool {
        if self.page > 1 {
            self.page -= 1;
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.page = 1;
    }

    /// True when a page of `returned` rows cannot be followed by another one
    pub fn is_last_page(&self, returned: usize) -> bool {
        returned == 0 || returned < self.page_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_page_heuristic() {
        let pager = Pager::new(25);
        assert!(!pager.is_last_page(25));
        assert!(pager.is_last_page(10));
        assert!(pager.is_last_page(0));
        assert!(pager.is_last_page(24));
    }

    #[test]
    fn test_offsets_are_one_relative() {
        let mut pager = Pager::default();
        assert_eq!(pager.page(), 1);
        assert_eq!(pager.offset(), 0);

        pager.next();
        pager.next();
        assert_eq!(pager.page(), 3);
        assert_eq!(pager.offset(), 50);

        assert!(pager.previous());
        assert_eq!(pager.offset(), 25);

        pager.reset();
        assert!(!pager.previous());
        assert_eq!(pager.page(), 1);
    }

    #[test]
    fn test_zero_page_size_is_clamped() {
        let pager = Pager::new(0);
        assert_eq!(pager.page_size(), 1);
        assert!(!pager.is_last_page(1));
    }
}
