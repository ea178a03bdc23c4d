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


//! Relationship mutations against one parent
//!
//! Turns include/exclude/insert/remove/update intents into catalog calls for
//! whatever (parent kind, child kind) pair is involved. None of the
//! operations return an error: failures land in the `error()` slot and the
//! operation degrades (`false`, or a placeholder entity whose id is `-1`).
//!
//! # Reregistration
//! The backend cannot update a join row's `principal`/`ordinal` in place.
//! `perform_update` replaces the row instead:
//! 1. exclude the row (failure means it was not joined, ignored)
//! 2. include it with the new attribute
//! 3. if step 2 fails after step 1 removed a row, include the old row again

use crate::api::{Catalog, Join};
use crate::error::LibraryError;
use crate::guide::parent::Parent;
use crate::models::Child;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Shared "operation in progress" flag
///
/// Cloned handles observe the same flag, so a view can poll it while the
/// adapter is awaiting the backend.
#[derive(Debug, Clone, Default)]
pub struct Processing(Arc<AtomicBool>);

impl Processing {
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn enter(&self) -> ProcessingGuard {
        self.0.store(true, Ordering::SeqCst);
        ProcessingGuard(Arc::clone(&self.0))
    }
}

/// Clears the flag when the operation finishes or its future is dropped
struct ProcessingGuard(Arc<AtomicBool>);

impl Drop for ProcessingGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct MutationAdapter {
    catalog: Arc<dyn Catalog>,
    library_id: i64,
    parent: Parent,
    processing: Processing,
    error: Option<LibraryError>,
}

impl std::fmt::Debug for MutationAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationAdapter")
            .field("library_id", &self.library_id)
            .field("parent", &self.parent.entity_ref())
            .field("processing", &self.processing.is_set())
            .field("error", &self.error)
            .finish()
    }
}

impl MutationAdapter {
    pub fn new(catalog: Arc<dyn Catalog>, library_id: i64, parent: Parent) -> Self {
        Self {
            catalog,
            library_id,
            parent,
            processing: Processing::default(),
            error: None,
        }
    }

    pub fn parent(&self) -> &Parent {
        &self.parent
    }

    /// Swap in a re-fetched parent
    pub fn set_parent(&mut self, parent: Parent) {
        self.parent = parent;
    }

    pub fn catalog(&self) -> &Arc<dyn Catalog> {
        &self.catalog
    }

    pub fn library_id(&self) -> i64 {
        self.library_id
    }

    pub fn processing(&self) -> bool {
        self.processing.is_set()
    }

    pub fn processing_handle(&self) -> Processing {
        self.processing.clone()
    }

    /// Failure of the most recent operation
    pub fn error(&self) -> Option<&LibraryError> {
        self.error.as_ref()
    }

    pub fn take_error(&mut self) -> Option<LibraryError> {
        self.error.take()
    }

    fn fail(&mut self, operation: &str, child: &Child, err: LibraryError) {
        error!(
            operation,
            parent = %self.parent.entity_ref(),
            child = %child.entity_ref(),
            error = %err,
            "relationship operation failed"
        );
        self.error = Some(err);
    }

    /// Join `child` to the parent. Principal defaults to true for Author joins.
    pub async fn perform_include(&mut self, child: &Child) -> bool {
        let _guard = self.processing.enter();
        self.error = None;

        let join = match self.parent.join_for(child) {
            Ok(Some(join)) => join.with_principal(Some(child.principal().unwrap_or(true))),
            Ok(None) => {
                debug!(child = %child.entity_ref(), "include on library parent is a no-op");
                return true;
            }
            Err(e) => {
                self.fail("include", child, e);
                return false;
            }
        };

        match self.catalog.include(self.library_id, &join).await {
            Ok(()) => {
                info!(path = %join.path(self.library_id), principal = ?join.principal, ordinal = ?join.ordinal, "included");
                true
            }
            Err(e) => {
                self.fail("include", child, e);
                false
            }
        }
    }

    /// Remove the join row between the parent and `child`
    pub async fn perform_exclude(&mut self, child: &Child) -> bool {
        let _guard = self.processing.enter();
        self.error = None;

        let join = match self.parent.join_for(child) {
            Ok(Some(join)) => join.bare(),
            Ok(None) => {
                debug!(child = %child.entity_ref(), "exclude on library parent is a no-op");
                return true;
            }
            Err(e) => {
                self.fail("exclude", child, e);
                return false;
            }
        };

        match self.catalog.exclude(self.library_id, &join).await {
            Ok(()) => {
                info!(path = %join.path(self.library_id), "excluded");
                true
            }
            Err(e) => {
                self.fail("exclude", child, e);
                false
            }
        }
    }

    /// Persist a new entity; the placeholder comes back on failure
    pub async fn perform_insert(&mut self, child: &Child) -> Child {
        let _guard = self.processing.enter();
        self.error = None;

        match self.catalog.insert(self.library_id, child).await {
            Ok(inserted) => {
                info!(child = %inserted.entity_ref(), label = %inserted.label(), "inserted");
                inserted
            }
            Err(e) => {
                self.fail("insert", child, e);
                placeholder_like(child)
            }
        }
    }

    /// Delete the entity itself; the placeholder comes back on failure
    pub async fn perform_remove(&mut self, child: &Child) -> Child {
        let _guard = self.processing.enter();
        self.error = None;

        match self.catalog.remove(self.library_id, child.entity_ref()).await {
            Ok(removed) => {
                info!(child = %removed.entity_ref(), label = %removed.label(), "removed");
                removed
            }
            Err(e) => {
                self.fail("remove", child, e);
                placeholder_like(child)
            }
        }
    }

    /// Persist changed attributes, then reregister the join row if its
    /// relationship-scoped attribute changed
    pub async fn perform_update(&mut self, child: &Child) -> Child {
        let _guard = self.processing.enter();
        self.error = None;

        let mut updated = match self.catalog.update(self.library_id, child).await {
            Ok(updated) => {
                info!(child = %updated.entity_ref(), label = %updated.label(), "updated");
                updated
            }
            Err(e) => {
                self.fail("update", child, e);
                return placeholder_like(child);
            }
        };
        updated.set_principal(child.principal());
        updated.set_ordinal(child.ordinal());

        if let Some((old, new)) = self.reregistration(child) {
            if let Err(e) = self.reregister(old, new).await {
                self.fail("reregister", child, e);
            }
        }
        updated
    }

    /// (old row, new row) when the child's relationship attribute differs
    /// from the parent's current row
    fn reregistration(&self, child: &Child) -> Option<(Option<Join>, Join)> {
        let new = self.parent.join_for(child).ok().flatten()?;
        let kind = new.kind();
        let wanted_change = (kind.has_principal() && new.principal.is_some())
            || (kind.has_ordinal() && new.ordinal.is_some());
        if !wanted_change {
            return None;
        }

        let current = self.parent.current(child);
        let old = current
            .as_ref()
            .and_then(|c| self.parent.join_for(c).ok().flatten());
        match &old {
            Some(old) if old.principal == new.principal && old.ordinal == new.ordinal => None,
            _ => Some((old, new)),
        }
    }

    async fn reregister(&self, old: Option<Join>, new: Join) -> crate::error::Result<()> {
        let excluded = match self.catalog.exclude(self.library_id, &new.bare()).await {
            Ok(()) => true,
            Err(e) => {
                debug!(path = %new.path(self.library_id), error = %e, "no prior join row to exclude");
                false
            }
        };

        match self.catalog.include(self.library_id, &new).await {
            Ok(()) => {
                info!(path = %new.path(self.library_id), principal = ?new.principal, ordinal = ?new.ordinal, "reregistered");
                Ok(())
            }
            Err(e) => {
                if excluded {
                    let restore = old.unwrap_or_else(|| new.bare());
                    if let Err(rollback) = self.catalog.include(self.library_id, &restore).await {
                        warn!(path = %restore.path(self.library_id), error = %rollback, "could not restore previous join row");
                    } else {
                        info!(path = %restore.path(self.library_id), "previous join row restored");
                    }
                }
                Err(e)
            }
        }
    }
}

fn placeholder_like(child: &Child) -> Child {
    Child::placeholder(child.kind()).unwrap_or_else(|| child.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{CatalogCall, MemoryCatalog, Operation};
    use crate::models::{Author, EntityKind, EntityRef, Series, Story};

    struct Fixture {
        catalog: Arc<MemoryCatalog>,
        library_id: i64,
        series: Series,
    }

    async fn fixture() -> Fixture {
        let catalog = Arc::new(MemoryCatalog::new());
        let library = catalog.add_library("Test").await;
        let series = match catalog.insert(library.id, &Series::new("Foo").into()).await.unwrap() {
            Child::Series(s) => s,
            _ => unreachable!(),
        };
        Fixture {
            catalog,
            library_id: library.id,
            series,
        }
    }

    async fn reload(f: &Fixture) -> Parent {
        let found = f
            .catalog
            .find(f.library_id, f.series_ref(), true)
            .await
            .unwrap();
        Parent::from_child(found)
    }

    impl Fixture {
        fn series_ref(&self) -> EntityRef {
            EntityRef::new(EntityKind::Series, self.series.id)
        }
    }

    #[tokio::test]
    async fn test_include_defaults_principal() {
        let f = fixture().await;
        let author = f
            .catalog
            .insert(f.library_id, &Author::new("Jane", "Doe").into())
            .await
            .unwrap();

        let mut adapter = MutationAdapter::new(f.catalog.clone(), f.library_id, reload(&f).await);
        assert!(adapter.perform_include(&author).await);
        assert!(!adapter.processing());
        assert!(adapter.error().is_none());

        let row = f
            .catalog
            .join_row(f.series_ref(), author.entity_ref())
            .await
            .unwrap();
        assert_eq!(row.principal, Some(true));
    }

    #[tokio::test]
    async fn test_failures_land_in_error_slot() {
        let f = fixture().await;
        let author = f
            .catalog
            .insert(f.library_id, &Author::new("Jane", "Doe").into())
            .await
            .unwrap();
        let mut adapter = MutationAdapter::new(f.catalog.clone(), f.library_id, reload(&f).await);

        f.catalog.fail_next(Operation::Include, 1).await;
        assert!(!adapter.perform_include(&author).await);
        assert!(adapter.error().is_some());

        // Error is reset at the start of the next call
        assert!(adapter.perform_include(&author).await);
        assert!(adapter.error().is_none());

        f.catalog.fail_next(Operation::Insert, 1).await;
        let inserted = adapter.perform_insert(&Author::new("Ann", "Other").into()).await;
        assert!(inserted.is_new());
        assert_eq!(inserted.kind(), EntityKind::Author);
        assert!(adapter.error().is_some());
    }

    #[tokio::test]
    async fn test_library_parent_is_noop() {
        let f = fixture().await;
        let library = f.catalog.library(f.library_id).await.unwrap();
        let mut adapter = MutationAdapter::new(f.catalog.clone(), f.library_id, Parent::Library(library));
        f.catalog.clear_calls().await;

        let series: Child = f.series.clone().into();
        assert!(adapter.perform_include(&series).await);
        assert!(adapter.perform_exclude(&series).await);
        assert!(f.catalog.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_update_reregisters_changed_ordinal() {
        let f = fixture().await;
        let story = f
            .catalog
            .insert(f.library_id, &Story::new("Tale").into())
            .await
            .unwrap();
        let join = Join::new(f.series_ref(), story.entity_ref())
            .unwrap()
            .with_ordinal(Some(1));
        f.catalog.include(f.library_id, &join).await.unwrap();

        let mut adapter = MutationAdapter::new(f.catalog.clone(), f.library_id, reload(&f).await);
        let mut edited = story.clone();
        edited.set_ordinal(Some(3));
        let updated = adapter.perform_update(&edited).await;
        assert_eq!(updated.ordinal(), Some(3));
        assert!(adapter.error().is_none());

        assert_eq!(f.catalog.join_count(f.series_ref(), story.entity_ref()).await, 1);
        let row = f
            .catalog
            .join_row(f.series_ref(), story.entity_ref())
            .await
            .unwrap();
        assert_eq!(row.ordinal, Some(3));
    }

    #[tokio::test]
    async fn test_update_without_attribute_change_skips_reregister() {
        let f = fixture().await;
        let story = f
            .catalog
            .insert(f.library_id, &Story::new("Tale").into())
            .await
            .unwrap();
        let join = Join::new(f.series_ref(), story.entity_ref())
            .unwrap()
            .with_ordinal(Some(1));
        f.catalog.include(f.library_id, &join).await.unwrap();

        let mut adapter = MutationAdapter::new(f.catalog.clone(), f.library_id, reload(&f).await);
        let mut edited = adapter.parent().current(&story).unwrap();
        if let Child::Story(s) = &mut edited {
            s.name = "Renamed".to_string();
        }
        f.catalog.clear_calls().await;
        adapter.perform_update(&edited).await;

        let calls = f.catalog.calls().await;
        assert_eq!(calls, vec![CatalogCall::Update(story.entity_ref())]);
    }

    #[tokio::test]
    async fn test_failed_reinclude_restores_old_row() {
        let f = fixture().await;
        let story = f
            .catalog
            .insert(f.library_id, &Story::new("Tale").into())
            .await
            .unwrap();
        let join = Join::new(f.series_ref(), story.entity_ref())
            .unwrap()
            .with_ordinal(Some(1));
        f.catalog.include(f.library_id, &join).await.unwrap();

        let mut adapter = MutationAdapter::new(f.catalog.clone(), f.library_id, reload(&f).await);
        let mut edited = story.clone();
        edited.set_ordinal(Some(5));

        f.catalog.fail_next(Operation::Include, 1).await;
        adapter.perform_update(&edited).await;
        assert!(adapter.error().is_some());

        let row = f
            .catalog
            .join_row(f.series_ref(), story.entity_ref())
            .await
            .unwrap();
        assert_eq!(row.ordinal, Some(1));
    }

    #[tokio::test]
    async fn test_reregister_when_exclude_fails() {
        let f = fixture().await;
        let story = f
            .catalog
            .insert(f.library_id, &Story::new("Tale").into())
            .await
            .unwrap();
        let join = Join::new(f.series_ref(), story.entity_ref())
            .unwrap()
            .with_ordinal(Some(1));
        f.catalog.include(f.library_id, &join).await.unwrap();

        let mut adapter = MutationAdapter::new(f.catalog.clone(), f.library_id, reload(&f).await);
        let mut edited = story.clone();
        edited.set_ordinal(Some(3));

        f.catalog.fail_next(Operation::Exclude, 1).await;
        adapter.perform_update(&edited).await;
        assert!(adapter.error().is_none());

        assert_eq!(f.catalog.join_count(f.series_ref(), story.entity_ref()).await, 1);
        let row = f
            .catalog
            .join_row(f.series_ref(), story.entity_ref())
            .await
            .unwrap();
        assert_eq!(row.ordinal, Some(3));
    }

    #[tokio::test]
    async fn test_reregister_without_prior_row() {
        let f = fixture().await;
        let author = f
            .catalog
            .insert(f.library_id, &Author::new("Jane", "Doe").into())
            .await
            .unwrap();

        let mut adapter = MutationAdapter::new(f.catalog.clone(), f.library_id, reload(&f).await);
        let mut edited = author.clone();
        edited.set_principal(Some(false));
        f.catalog.clear_calls().await;
        adapter.perform_update(&edited).await;
        assert!(adapter.error().is_none());

        let calls = f.catalog.calls().await;
        assert!(matches!(calls[1], CatalogCall::Exclude(_)));
        assert!(matches!(calls[2], CatalogCall::Include(_)));
        assert_eq!(f.catalog.join_count(f.series_ref(), author.entity_ref()).await, 1);
        let row = f
            .catalog
            .join_row(f.series_ref(), author.entity_ref())
            .await
            .unwrap();
        assert_eq!(row.principal, Some(false));
    }
}
