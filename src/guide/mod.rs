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


//! Guided entity wizard
//!
//! A guide is rooted at one Author, Series, Story or Volume and walks the
//! user through its relationships one stage at a time:
//!
//! ```text
//! Wizard
//!   ├─ StageController   stage sequence + root id
//!   ├─ StageScreen       list/search/page/edit for the current stage
//!   │    └─ MutationAdapter   include/exclude/insert/update/remove
//!   └─ Summary           digest of the loaded root
//! ```

pub mod adapter;
pub mod parent;
pub mod screen;
pub mod stage;
pub mod summary;
pub mod wizard;

pub use adapter::{MutationAdapter, Processing};
pub use parent::Parent;
pub use screen::{
    ListStatus, ListTarget, PageRequest, PageResult, ScreenOutcome, ScreenView, StageScreen,
    FETCH_IN_PROGRESS,
};
pub use stage::{GuideKind, Stage, StageController, NO_ROOT};
pub use summary::{Summary, SummaryEntry, SummarySection};
pub use wizard::Wizard;
