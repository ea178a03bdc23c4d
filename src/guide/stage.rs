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


//! Stage sequence and root selection for one guide

use crate::models::{EntityKind, NEW_ID};
use std::fmt;
use tracing::debug;

/// Root id before anything is selected or saved
pub const NO_ROOT: i64 = NEW_ID;

/// Which entity kind the guide is rooted at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuideKind {
    Author,
    Series,
    Story,
    Volume,
}

impl GuideKind {
    pub fn root_kind(&self) -> EntityKind {
        match self {
            GuideKind::Author => EntityKind::Author,
            GuideKind::Series => EntityKind::Series,
            GuideKind::Story => EntityKind::Story,
            GuideKind::Volume => EntityKind::Volume,
        }
    }

    pub fn from_kind(kind: EntityKind) -> Option<Self> {
        match kind {
            EntityKind::Author => Some(GuideKind::Author),
            EntityKind::Series => Some(GuideKind::Series),
            EntityKind::Story => Some(GuideKind::Story),
            EntityKind::Volume => Some(GuideKind::Volume),
            EntityKind::Library => None,
        }
    }

    /// Ordered stages; the first one always picks the root
    pub fn stages(&self) -> &'static [Stage] {
        match self {
            GuideKind::Author => &[Stage::Parent, Stage::Series, Stage::Stories, Stage::Volumes],
            GuideKind::Series => &[Stage::Parent, Stage::Authors, Stage::Stories, Stage::Writers],
            GuideKind::Story => &[Stage::Parent, Stage::Authors, Stage::Series, Stage::Volumes],
            GuideKind::Volume => &[Stage::Parent, Stage::Authors, Stage::Stories, Stage::Writers],
        }
    }
}

impl fmt::Display for GuideKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root_kind().label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Pick or create the root entity
    Parent,
    Authors,
    Series,
    Stories,
    Volumes,
    /// Authors of one story inside the root
    Writers,
}

impl Stage {
    /// Kind listed on this stage; `Parent` lists the guide's root kind
    pub fn child_kind(&self, guide: GuideKind) -> EntityKind {
        match self {
            Stage::Parent => guide.root_kind(),
            Stage::Authors | Stage::Writers => EntityKind::Author,
            Stage::Series => EntityKind::Series,
            Stage::Stories => EntityKind::Story,
            Stage::Volumes => EntityKind::Volume,
        }
    }

    pub fn label(&self, guide: GuideKind) -> String {
        match self {
            Stage::Parent => guide.root_kind().label().to_string(),
            Stage::Authors => "Authors".to_string(),
            Stage::Series => "Series".to_string(),
            Stage::Stories => "Stories".to_string(),
            Stage::Volumes => "Volumes".to_string(),
            Stage::Writers => "Writers".to_string(),
        }
    }
}

/// Current stage and root id of a guide
#[derive(Debug, Clone)]
pub struct StageController {
    guide: GuideKind,
    stage: usize,
    root_id: i64,
    refreshes: u64,
}

impl StageController {
    pub fn new(guide: GuideKind) -> Self {
        Self {
            guide,
            stage: 0,
            root_id: NO_ROOT,
            refreshes: 0,
        }
    }

    pub fn guide(&self) -> GuideKind {
        self.guide
    }

    pub fn stage_index(&self) -> usize {
        self.stage
    }

    pub fn stage(&self) -> Stage {
        self.guide.stages()[self.stage]
    }

    pub fn stage_count(&self) -> usize {
        self.guide.stages().len()
    }

    pub fn root_id(&self) -> i64 {
        self.root_id
    }

    pub fn has_root(&self) -> bool {
        self.root_id > 0
    }

    /// Number of refreshes so far; views compare it to know they are stale
    pub fn refreshes(&self) -> u64 {
        self.refreshes
    }

    /// Jump to any stage; out of range indices are clamped to the last one
    pub fn select_stage(&mut self, index: usize) -> Stage {
        self.stage = index.min(self.stage_count() - 1);
        debug!(guide = %self.guide, stage = self.stage, "stage selected");
        self.stage()
    }

    pub fn next(&mut self) -> Option<Stage> {
        if self.stage + 1 >= self.stage_count() {
            return None;
        }
        self.stage += 1;
        Some(self.stage())
    }

    pub fn previous(&mut self) -> Option<Stage> {
        if self.stage == 0 {
            return None;
        }
        self.stage -= 1;
        Some(self.stage())
    }

    /// Set the root without moving stages
    pub fn select_root(&mut self, id: i64) {
        self.root_id = if id > 0 { id } else { NO_ROOT };
        debug!(guide = %self.guide, root_id = self.root_id, "root selected");
    }

    /// Forget the root (after it was removed)
    pub fn clear_root(&mut self) {
        self.root_id = NO_ROOT;
    }

    /// Start a refresh cycle: returns the root id to re-fetch
    ///
    /// The root id passes through the sentinel and back so anything keyed on
    /// it sees a change even when the id itself is the same.
    pub fn refresh(&mut self) -> i64 {
        let id = self.root_id;
        self.root_id = NO_ROOT;
        self.refreshes += 1;
        self.root_id = id;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_sequences() {
        assert_eq!(
            GuideKind::Series.stages(),
            &[Stage::Parent, Stage::Authors, Stage::Stories, Stage::Writers]
        );
        assert_eq!(Stage::Writers.child_kind(GuideKind::Volume), EntityKind::Author);
        assert_eq!(Stage::Parent.child_kind(GuideKind::Story), EntityKind::Story);
        for guide in [GuideKind::Author, GuideKind::Series, GuideKind::Story, GuideKind::Volume] {
            assert_eq!(guide.stages()[0], Stage::Parent);
        }
    }

    #[test]
    fn test_navigation_bounds() {
        let mut controller = StageController::new(GuideKind::Author);
        assert_eq!(controller.previous(), None);
        assert_eq!(controller.next(), Some(Stage::Series));
        assert_eq!(controller.select_stage(99), Stage::Volumes);
        assert_eq!(controller.next(), None);
        assert_eq!(controller.select_stage(0), Stage::Parent);
    }

    #[test]
    fn test_stage_jump_does_not_need_root() {
        let mut controller = StageController::new(GuideKind::Story);
        assert!(!controller.has_root());
        assert_eq!(controller.select_stage(3), Stage::Volumes);
    }

    #[test]
    fn test_refresh_keeps_root() {
        let mut controller = StageController::new(GuideKind::Series);
        controller.select_root(12);
        assert_eq!(controller.refresh(), 12);
        assert_eq!(controller.root_id(), 12);
        assert_eq!(controller.refreshes(), 1);

        controller.select_root(-4);
        assert_eq!(controller.root_id(), NO_ROOT);
    }
}
