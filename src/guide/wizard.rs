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


//! Guided wizard for one root entity
//!
//! Owns the stage controller, the loaded root graph and the screen for the
//! current stage. Screens are rebuilt on every stage change; the old screen
//! (and anything it was awaiting) is dropped with it.
//!
//! Which parent a screen works against:
//! - `Parent` stage: the selected library (pick or create the root)
//! - `Writers` stage: the story drilled into, else the library
//! - any other stage: the root, else the library

use crate::error::{LibraryError, Result};
use crate::guide::adapter::MutationAdapter;
use crate::guide::parent::Parent;
use crate::guide::screen::{ScreenOutcome, StageScreen};
use crate::guide::stage::{GuideKind, Stage, StageController};
use crate::guide::summary::Summary;
use crate::models::{EntityKind, EntityRef, Library};
use crate::state::AppState;
use tracing::{debug, error, info};

pub struct Wizard {
    state: AppState,
    library: Library,
    controller: StageController,
    root: Option<Parent>,
    story: Option<Parent>,
    screen: StageScreen,
    page_size: usize,
    summary_expanded: bool,
}

impl std::fmt::Debug for Wizard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wizard")
            .field("library", &self.library.id)
            .field("controller", &self.controller)
            .field("root", &self.root.as_ref().map(Parent::entity_ref))
            .field("story", &self.story.as_ref().map(Parent::entity_ref))
            .finish()
    }
}

impl Wizard {
    /// Needs a selected library
    pub fn new(state: AppState, guide: GuideKind, page_size: usize) -> Result<Self> {
        let library = state
            .library()
            .cloned()
            .ok_or_else(|| LibraryError::InvalidState("No library selected".to_string()))?;
        let controller = StageController::new(guide);
        let screen = StageScreen::new(
            controller.stage().child_kind(guide),
            MutationAdapter::new(state.catalog(), library.id, Parent::Library(library.clone())),
            page_size,
        );
        Ok(Self {
            state,
            library,
            controller,
            root: None,
            story: None,
            screen,
            page_size,
            summary_expanded: false,
        })
    }

    /// Load the first page of the Parent stage
    pub async fn start(&mut self) {
        info!(guide = %self.controller.guide(), library_id = self.library.id, "guide started");
        self.screen.fetch().await;
    }

    pub fn guide(&self) -> GuideKind {
        self.controller.guide()
    }

    pub fn controller(&self) -> &StageController {
        &self.controller
    }

    pub fn stage(&self) -> Stage {
        self.controller.stage()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn root(&self) -> Option<&Parent> {
        self.root.as_ref()
    }

    pub fn story(&self) -> Option<&Parent> {
        self.story.as_ref()
    }

    pub fn screen(&self) -> &StageScreen {
        &self.screen
    }

    pub fn screen_mut(&mut self) -> &mut StageScreen {
        &mut self.screen
    }

    async fn load(&self, target: EntityRef) -> Result<Parent> {
        let child = self
            .state
            .catalog()
            .find(self.library.id, target, true)
            .await?;
        Ok(Parent::from_child(child))
    }

    /// Load `id` as the root; the current stage is kept
    pub async fn select_root(&mut self, id: i64) -> Result<()> {
        let kind = self.controller.guide().root_kind();
        let root = self.load(EntityRef::new(kind, id)).await?;
        info!(root = %root.entity_ref(), label = %root.label(), "root selected");
        self.controller.select_root(id);
        self.root = Some(root);
        self.story = None;
        self.rebuild_screen().await;
        Ok(())
    }

    pub async fn select_stage(&mut self, index: usize) -> Stage {
        let stage = self.controller.select_stage(index);
        self.rebuild_screen().await;
        stage
    }

    pub async fn next_stage(&mut self) -> Option<Stage> {
        let stage = self.controller.next()?;
        self.rebuild_screen().await;
        Some(stage)
    }

    pub async fn previous_stage(&mut self) -> Option<Stage> {
        let stage = self.controller.previous()?;
        self.rebuild_screen().await;
        Some(stage)
    }

    /// Pick the story whose writers the `Writers` stage manages, and move to
    /// that stage
    pub async fn drill_into_story(&mut self, story_id: i64) -> Result<()> {
        let Some(index) = self
            .controller
            .guide()
            .stages()
            .iter()
            .position(|s| *s == Stage::Writers)
        else {
            return Err(LibraryError::InvalidState(format!(
                "{} guide has no Writers stage",
                self.controller.guide()
            )));
        };
        let story = self.load(EntityRef::new(EntityKind::Story, story_id)).await?;
        debug!(story = %story.entity_ref(), "drilled into story");
        self.story = Some(story);
        self.controller.select_stage(index);
        self.rebuild_screen().await;
        Ok(())
    }

    fn screen_parent(&self) -> Parent {
        let fallback = || Parent::Library(self.library.clone());
        match self.controller.stage() {
            Stage::Parent => fallback(),
            Stage::Writers => self.story.clone().unwrap_or_else(fallback),
            _ => self.root.clone().unwrap_or_else(fallback),
        }
    }

    async fn rebuild_screen(&mut self) {
        let kind = self.controller.stage().child_kind(self.controller.guide());
        let adapter = MutationAdapter::new(self.state.catalog(), self.library.id, self.screen_parent());
        self.screen = StageScreen::new(kind, adapter, self.page_size);
        self.screen.fetch().await;
    }

    /// Re-fetch the root (and drilled story) graph, then the current page
    ///
    /// A failed re-fetch keeps the previous graph.
    pub async fn refresh(&mut self) {
        let id = self.controller.refresh();
        if id > 0 {
            let kind = self.controller.guide().root_kind();
            match self.load(EntityRef::new(kind, id)).await {
                Ok(root) => self.root = Some(root),
                Err(e) => error!(root_id = id, error = %e, "root refresh failed"),
            }
        }
        if let Some(story) = self.story.as_ref().map(Parent::entity_ref) {
            match self.load(story).await {
                Ok(loaded) => self.story = Some(loaded),
                Err(e) => error!(story = %story, error = %e, "story refresh failed"),
            }
        }
        let parent = self.screen_parent();
        self.screen.set_parent(parent);
        self.screen.fetch().await;
    }

    /// React to a screen action
    pub async fn apply(&mut self, outcome: ScreenOutcome) {
        match outcome {
            ScreenOutcome::Unchanged => {}
            ScreenOutcome::Refresh => self.refresh().await,
            ScreenOutcome::Saved(child) => {
                let is_root_kind = child.kind() == self.controller.guide().root_kind();
                if self.controller.stage() == Stage::Parent && is_root_kind {
                    if let Err(e) = self.select_root(child.id()).await {
                        error!(child = %child.entity_ref(), error = %e, "could not load saved root");
                        self.refresh().await;
                    }
                } else {
                    self.refresh().await;
                }
            }
            ScreenOutcome::Removed(child) => {
                let entity = child.entity_ref();
                if self.root.as_ref().map(Parent::entity_ref) == Some(entity) {
                    info!(root = %entity, "root removed");
                    self.controller.clear_root();
                    self.root = None;
                    self.story = None;
                }
                if self.story.as_ref().map(Parent::entity_ref) == Some(entity) {
                    self.story = None;
                }
                self.refresh().await;
            }
        }
    }

    /// Summary of the loaded root
    pub fn summary(&self) -> Option<Summary> {
        self.root.as_ref().map(|root| {
            let mut summary = Summary::from_parent(root);
            summary.expanded = self.summary_expanded;
            summary
        })
    }

    pub fn toggle_summary(&mut self) -> bool {
        self.summary_expanded = !self.summary_expanded;
        self.summary_expanded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Catalog, MemoryCatalog};
    use crate::models::Series;
    use std::sync::Arc;

    async fn wizard(guide: GuideKind) -> (Arc<MemoryCatalog>, Wizard) {
        let catalog = Arc::new(MemoryCatalog::sample());
        let mut state = AppState::new(catalog.clone());
        state.sign_in();
        let library = catalog.libraries().await.unwrap().remove(0);
        state.select_library(library).unwrap();
        (catalog, Wizard::new(state, guide, 25).unwrap())
    }

    #[tokio::test]
    async fn test_requires_library() {
        let state = AppState::new(Arc::new(MemoryCatalog::new()));
        assert!(Wizard::new(state, GuideKind::Series, 25).is_err());
    }

    #[tokio::test]
    async fn test_parent_stage_lists_root_kind() {
        let (_catalog, mut wizard) = wizard(GuideKind::Series).await;
        wizard.start().await;
        assert_eq!(wizard.screen().kind(), EntityKind::Series);
        assert!(wizard.screen().parent().is_library());
        assert_eq!(wizard.screen().rows().len(), 1);
    }

    #[tokio::test]
    async fn test_stage_without_root_falls_back_to_library() {
        let (_catalog, mut wizard) = wizard(GuideKind::Series).await;
        assert_eq!(wizard.select_stage(2).await, Stage::Stories);
        assert!(wizard.screen().parent().is_library());
        assert_eq!(wizard.screen().rows().len(), 3);
    }

    #[tokio::test]
    async fn test_saving_root_selects_it() {
        let (catalog, mut wizard) = wizard(GuideKind::Series).await;
        wizard.start().await;
        let outcome = wizard.screen_mut().save(Series::new("Tehanu Cycle").into()).await;
        wizard.apply(outcome).await;

        let root = wizard.root().unwrap();
        assert_eq!(root.label(), "Tehanu Cycle");
        assert!(wizard.controller().has_root());
        let found = catalog.find(wizard.library.id, root.entity_ref(), false).await.unwrap();
        assert_eq!(found.label(), "Tehanu Cycle");
    }

    #[tokio::test]
    async fn test_removing_root_clears_it() {
        let (_catalog, mut wizard) = wizard(GuideKind::Series).await;
        wizard.start().await;
        let series = wizard.screen().rows()[0].clone();
        wizard.select_root(series.id()).await.unwrap();

        wizard.screen_mut().request_remove(series);
        let outcome = wizard.screen_mut().confirm_remove().await;
        wizard.apply(outcome).await;
        assert!(wizard.root().is_none());
        assert!(!wizard.controller().has_root());
        assert!(wizard.screen().rows().is_empty());
    }

    #[tokio::test]
    async fn test_drill_into_story_for_writers() {
        let (_catalog, mut wizard) = wizard(GuideKind::Series).await;
        wizard.start().await;
        let series = wizard.screen().rows()[0].id();
        wizard.select_root(series).await.unwrap();
        wizard.select_stage(2).await;
        let story = wizard.screen().rows()[0].id();

        wizard.drill_into_story(story).await.unwrap();
        assert_eq!(wizard.stage(), Stage::Writers);
        assert_eq!(wizard.screen().parent().entity_ref(), EntityRef::new(EntityKind::Story, story));
        assert_eq!(wizard.screen().kind(), EntityKind::Author);
    }

    #[tokio::test]
    async fn test_story_guide_has_no_writers() {
        let (_catalog, mut wizard) = wizard(GuideKind::Story).await;
        assert!(wizard.drill_into_story(1).await.is_err());
    }

    #[tokio::test]
    async fn test_summary_follows_root() {
        let (_catalog, mut wizard) = wizard(GuideKind::Series).await;
        assert!(wizard.summary().is_none());
        wizard.start().await;
        let series = wizard.screen().rows()[0].id();
        wizard.select_root(series).await.unwrap();

        let summary = wizard.summary().unwrap();
        assert_eq!(summary.heading, "Series: Earthsea");
        assert!(!summary.expanded);
        assert!(wizard.toggle_summary());
        assert!(wizard.summary().unwrap().expanded);
    }
}
