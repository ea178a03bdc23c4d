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


//! In-process catalog
//!
//! Behaves like the REST backend as far as the guide can observe:
//! - ids are positive and assigned on insert
//! - duplicate include updates the existing row instead of adding one
//! - exclude of a missing row fails with `RecordNotFound`
//! - removing an entity drops its join rows
//! - related lists carry the join's `principal`/`ordinal`
//!
//! Faults can be injected per operation (`fail_next`) and per kind
//! (`forbid`, answering 403). Every call is recorded for assertions.

use crate::api::{Catalog, Join, JoinKind, ListQuery};
use crate::error::{LibraryError, Result};
use crate::models::{
    sort_stories_by_ordinal, Author, Child, EntityKind, EntityRef, Library, Series, Story, Volume,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::Mutex;

/// Catalog operation, for fault injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    ListRelated,
    Find,
    FindExact,
    Insert,
    Update,
    Remove,
    Include,
    Exclude,
}

/// Record of one call made against the catalog
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogCall {
    List { kind: EntityKind, name: Option<String> },
    ListRelated { parent: EntityRef, kind: EntityKind },
    Find(EntityRef),
    FindExact { kind: EntityKind, name: String },
    Insert(EntityKind),
    Update(EntityRef),
    Remove(EntityRef),
    Include(Join),
    Exclude(Join),
}

#[derive(Debug, Clone)]
struct JoinRow {
    kind: JoinKind,
    left: i64,
    right: i64,
    principal: Option<bool>,
    ordinal: Option<i32>,
}

#[derive(Debug, Default)]
struct Store {
    next_id: i64,
    libraries: BTreeMap<i64, Library>,
    entities: BTreeMap<(EntityKind, i64), Child>,
    /// Kept in insertion order
    joins: Vec<JoinRow>,
    forbidden: HashSet<EntityKind>,
    failures: HashMap<Operation, usize>,
    calls: Vec<CatalogCall>,
}

impl Store {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn check_fault(&mut self, op: Operation, kind: EntityKind, endpoint: &str) -> Result<()> {
        if self.forbidden.contains(&kind) {
            return Err(LibraryError::Forbidden {
                endpoint: endpoint.to_string(),
            });
        }
        if let Some(remaining) = self.failures.get_mut(&op) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(LibraryError::api_failed(
                    format!("Injected {:?} failure", op),
                    Some(500),
                    Some(endpoint.to_string()),
                ));
            }
        }
        Ok(())
    }

    fn check_library(&self, library_id: i64) -> Result<()> {
        if self.libraries.contains_key(&library_id) {
            Ok(())
        } else {
            Err(LibraryError::not_found(format!("library {}", library_id)))
        }
    }

    fn get(&self, library_id: i64, target: EntityRef) -> Result<&Child> {
        self.entities
            .get(&(target.kind, target.id))
            .filter(|c| c.library_id() == library_id)
            .ok_or_else(|| LibraryError::not_found(target.to_string()))
    }

    fn insert_child(&mut self, library_id: i64, child: &Child) -> Child {
        let mut stored = child.without_relations();
        let id = self.next_id();
        match &mut stored {
            Child::Author(a) => a.id = id,
            Child::Series(s) => s.id = id,
            Child::Story(s) => s.id = id,
            Child::Volume(v) => v.id = id,
        }
        stored.set_library_id(library_id);
        self.entities.insert((stored.kind(), id), stored.clone());
        stored
    }

    fn upsert_join(&mut self, join: &Join) {
        let (kind, left, right) = join.key();
        if let Some(row) = self
            .joins
            .iter_mut()
            .find(|r| r.kind == kind && r.left == left && r.right == right)
        {
            row.principal = join.principal;
            row.ordinal = join.ordinal;
            return;
        }
        self.joins.push(JoinRow {
            kind,
            left,
            right,
            principal: join.principal,
            ordinal: join.ordinal,
        });
    }

    /// Children of `kind` joined to `parent`, with join attributes applied
    fn related(&self, library_id: i64, parent: EntityRef, kind: EntityKind, nested: bool) -> Vec<Child> {
        let Some(join_kind) = JoinKind::between(parent.kind, kind) else {
            return Vec::new();
        };
        let parent_is_left = join_kind.left() == parent.kind;

        let mut rows: Vec<Child> = self
            .joins
            .iter()
            .filter(|row| row.kind == join_kind)
            .filter_map(|row| {
                let (own, other) = if parent_is_left {
                    (row.left, row.right)
                } else {
                    (row.right, row.left)
                };
                if own != parent.id {
                    return None;
                }
                let mut child = self.get(library_id, EntityRef::new(kind, other)).ok()?.clone();
                child.set_principal(row.principal);
                child.set_ordinal(row.ordinal);
                if nested {
                    if let Child::Story(story) = &mut child {
                        story.authors = Some(self.authors_of(library_id, EntityRef::new(EntityKind::Story, story.id)));
                    }
                }
                Some(child)
            })
            .collect();

        if parent.kind == EntityKind::Series && kind == EntityKind::Story {
            let mut stories: Vec<Story> = rows
                .drain(..)
                .filter_map(|c| match c {
                    Child::Story(s) => Some(s),
                    _ => None,
                })
                .collect();
            sort_stories_by_ordinal(&mut stories);
            rows = stories.into_iter().map(Child::Story).collect();
        }
        rows
    }

    fn authors_of(&self, library_id: i64, parent: EntityRef) -> Vec<Author> {
        self.related(library_id, parent, EntityKind::Author, false)
            .into_iter()
            .filter_map(|c| match c {
                Child::Author(a) => Some(a),
                _ => None,
            })
            .collect()
    }

    fn with_children(&self, library_id: i64, child: Child) -> Child {
        let this = child.entity_ref();
        let of = |kind| self.related(library_id, this, kind, true);
        match child {
            Child::Author(a) => Child::Author(Author {
                series: Some(unwrap_series(of(EntityKind::Series))),
                stories: Some(unwrap_stories(of(EntityKind::Story))),
                volumes: Some(unwrap_volumes(of(EntityKind::Volume))),
                ..a
            }),
            Child::Series(s) => Child::Series(Series {
                authors: Some(unwrap_authors(of(EntityKind::Author))),
                stories: Some(unwrap_stories(of(EntityKind::Story))),
                ..s
            }),
            Child::Story(s) => Child::Story(Story {
                authors: Some(unwrap_authors(of(EntityKind::Author))),
                series: Some(unwrap_series(of(EntityKind::Series))),
                volumes: Some(unwrap_volumes(of(EntityKind::Volume))),
                ..s
            }),
            Child::Volume(v) => Child::Volume(Volume {
                authors: Some(unwrap_authors(of(EntityKind::Author))),
                stories: Some(unwrap_stories(of(EntityKind::Story))),
                ..v
            }),
        }
    }
}

fn unwrap_authors(rows: Vec<Child>) -> Vec<Author> {
    rows.into_iter()
        .filter_map(|c| if let Child::Author(a) = c { Some(a) } else { None })
        .collect()
}

fn unwrap_series(rows: Vec<Child>) -> Vec<Series> {
    rows.into_iter()
        .filter_map(|c| if let Child::Series(s) = c { Some(s) } else { None })
        .collect()
}

fn unwrap_stories(rows: Vec<Child>) -> Vec<Story> {
    rows.into_iter()
        .filter_map(|c| if let Child::Story(s) = c { Some(s) } else { None })
        .collect()
}

fn unwrap_volumes(rows: Vec<Child>) -> Vec<Volume> {
    rows.into_iter()
        .filter_map(|c| if let Child::Volume(v) = c { Some(v) } else { None })
        .collect()
}

fn matches_name(child: &Child, name: Option<&str>) -> bool {
    match name {
        Some(name) => child
            .lookup_name()
            .to_lowercase()
            .contains(&name.to_lowercase()),
        None => true,
    }
}

fn is_active(child: &Child) -> bool {
    match child {
        Child::Author(a) => a.active,
        Child::Series(s) => s.active,
        Child::Story(s) => s.active,
        Child::Volume(v) => v.active,
    }
}

fn window(rows: Vec<Child>, query: &ListQuery) -> Vec<Child> {
    let offset = query.offset.unwrap_or(0);
    let limit = query.limit.unwrap_or(usize::MAX);
    rows.into_iter().skip(offset).take(limit).collect()
}

/// In-memory catalog backend
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    store: Mutex<Store>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Small catalog for demos: one library with a series, its stories,
    /// an author, and a collection volume
    pub fn sample() -> Self {
        let mut store = Store::default();
        let library_id = store.next_id();
        store.libraries.insert(
            library_id,
            Library {
                id: library_id,
                name: "Personal Library".to_string(),
                active: true,
                notes: None,
                scope: "personal".to_string(),
            },
        );

        let author = store.insert_child(library_id, &Author::new("Ursula", "Le Guin").into());
        let series = store.insert_child(library_id, &Series::new("Earthsea").into());
        let volume = store.insert_child(
            library_id,
            &Volume {
                volume_type: crate::models::VolumeType::Collection,
                ..Volume::new("The Books of Earthsea")
            }
            .into(),
        );
        let titles = ["A Wizard of Earthsea", "The Tombs of Atuan", "The Farthest Shore"];
        for (index, title) in titles.iter().enumerate() {
            let story = store.insert_child(library_id, &Story::new(*title).into());
            let joins = [
                Join::new(series.entity_ref(), story.entity_ref())
                    .map(|j| j.with_ordinal(Some(index as i32 + 1))),
                Join::new(author.entity_ref(), story.entity_ref())
                    .map(|j| j.with_principal(Some(true))),
                Join::new(volume.entity_ref(), story.entity_ref()),
            ];
            for join in joins.into_iter().flatten() {
                store.upsert_join(&join);
            }
        }
        for target in [series.entity_ref(), volume.entity_ref()] {
            if let Ok(join) = Join::new(target, author.entity_ref()) {
                store.upsert_join(&join.with_principal(Some(true)));
            }
        }

        Self {
            store: Mutex::new(store),
        }
    }

    /// Add a library and return it with its assigned id
    pub async fn add_library<S: Into<String>>(&self, name: S) -> Library {
        let mut store = self.store.lock().await;
        let id = store.next_id();
        let library = Library {
            id,
            name: name.into(),
            active: true,
            notes: None,
            scope: String::new(),
        };
        store.libraries.insert(id, library.clone());
        library
    }

    /// Make the next `times` calls of `op` fail with a 500
    pub async fn fail_next(&self, op: Operation, times: usize) {
        self.store.lock().await.failures.insert(op, times);
    }

    /// Answer 403 for every call touching `kind`
    pub async fn forbid(&self, kind: EntityKind) {
        self.store.lock().await.forbidden.insert(kind);
    }

    pub async fn allow(&self, kind: EntityKind) {
        self.store.lock().await.forbidden.remove(&kind);
    }

    /// Calls made so far, oldest first
    pub async fn calls(&self) -> Vec<CatalogCall> {
        self.store.lock().await.calls.clone()
    }

    pub async fn clear_calls(&self) {
        self.store.lock().await.calls.clear();
    }

    /// Number of join rows between two entities (0 or 1)
    pub async fn join_count(&self, a: EntityRef, b: EntityRef) -> usize {
        let Ok(join) = Join::new(a, b) else {
            return 0;
        };
        let (kind, left, right) = join.key();
        self.store
            .lock()
            .await
            .joins
            .iter()
            .filter(|r| r.kind == kind && r.left == left && r.right == right)
            .count()
    }

    /// The stored join row, as seen from `a`
    pub async fn join_row(&self, a: EntityRef, b: EntityRef) -> Option<Join> {
        let join = Join::new(a, b).ok()?;
        let (kind, left, right) = join.key();
        let store = self.store.lock().await;
        let row = store
            .joins
            .iter()
            .find(|r| r.kind == kind && r.left == left && r.right == right)?;
        Some(join.with_principal(row.principal).with_ordinal(row.ordinal))
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn libraries(&self) -> Result<Vec<Library>> {
        let mut store = self.store.lock().await;
        store.check_fault(Operation::List, EntityKind::Library, "/libraries")?;
        Ok(store.libraries.values().cloned().collect())
    }

    async fn library(&self, id: i64) -> Result<Library> {
        let mut store = self.store.lock().await;
        store.check_fault(Operation::Find, EntityKind::Library, "/libraries")?;
        store
            .libraries
            .get(&id)
            .cloned()
            .ok_or_else(|| LibraryError::not_found(format!("library {}", id)))
    }

    async fn list(&self, library_id: i64, kind: EntityKind, query: &ListQuery) -> Result<Vec<Child>> {
        let mut store = self.store.lock().await;
        store.calls.push(CatalogCall::List {
            kind,
            name: query.name.clone(),
        });
        store.check_fault(Operation::List, kind, kind.segment())?;
        store.check_library(library_id)?;

        let mut rows: Vec<Child> = store
            .entities
            .values()
            .filter(|c| c.kind() == kind && c.library_id() == library_id)
            .filter(|c| matches_name(c, query.name.as_deref()))
            .filter(|c| !query.active_only || is_active(c))
            .cloned()
            .collect();
        rows.sort_by_key(|c| c.label().to_lowercase());
        Ok(window(rows, query))
    }

    async fn list_related(
        &self,
        library_id: i64,
        parent: EntityRef,
        kind: EntityKind,
        query: &ListQuery,
    ) -> Result<Vec<Child>> {
        let mut store = self.store.lock().await;
        store.calls.push(CatalogCall::ListRelated { parent, kind });
        store.check_fault(Operation::ListRelated, kind, kind.segment())?;
        store.get(library_id, parent)?;

        let rows: Vec<Child> = store
            .related(library_id, parent, kind, !query.with.is_empty())
            .into_iter()
            .filter(|c| matches_name(c, query.name.as_deref()))
            .collect();
        Ok(window(rows, query))
    }

    async fn find(&self, library_id: i64, target: EntityRef, with_children: bool) -> Result<Child> {
        let mut store = self.store.lock().await;
        store.calls.push(CatalogCall::Find(target));
        store.check_fault(Operation::Find, target.kind, target.kind.segment())?;
        let child = store.get(library_id, target)?.clone();
        Ok(if with_children {
            store.with_children(library_id, child)
        } else {
            child
        })
    }

    async fn find_exact(&self, library_id: i64, kind: EntityKind, name: &str) -> Result<Option<Child>> {
        let mut store = self.store.lock().await;
        store.calls.push(CatalogCall::FindExact {
            kind,
            name: name.to_string(),
        });
        store.check_fault(Operation::FindExact, kind, kind.segment())?;
        Ok(store
            .entities
            .values()
            .find(|c| c.kind() == kind && c.library_id() == library_id && c.lookup_name() == name)
            .cloned())
    }

    async fn insert(&self, library_id: i64, child: &Child) -> Result<Child> {
        let mut store = self.store.lock().await;
        store.calls.push(CatalogCall::Insert(child.kind()));
        store.check_fault(Operation::Insert, child.kind(), child.kind().segment())?;
        store.check_library(library_id)?;
        Ok(store.insert_child(library_id, child))
    }

    async fn update(&self, library_id: i64, child: &Child) -> Result<Child> {
        let mut store = self.store.lock().await;
        store.calls.push(CatalogCall::Update(child.entity_ref()));
        store.check_fault(Operation::Update, child.kind(), child.kind().segment())?;
        store.get(library_id, child.entity_ref())?;

        let mut stored = child.without_relations();
        stored.set_library_id(library_id);
        store
            .entities
            .insert((stored.kind(), stored.id()), stored.clone());
        Ok(stored)
    }

    async fn remove(&self, library_id: i64, target: EntityRef) -> Result<Child> {
        let mut store = self.store.lock().await;
        store.calls.push(CatalogCall::Remove(target));
        store.check_fault(Operation::Remove, target.kind, target.kind.segment())?;
        store.get(library_id, target)?;

        let removed = store
            .entities
            .remove(&(target.kind, target.id))
            .ok_or_else(|| LibraryError::not_found(target.to_string()))?;
        store.joins.retain(|row| {
            let left_hit = row.kind.left() == target.kind && row.left == target.id;
            let right_hit = row.kind.right() == target.kind && row.right == target.id;
            !(left_hit || right_hit)
        });
        Ok(removed)
    }

    async fn include(&self, library_id: i64, join: &Join) -> Result<()> {
        let mut store = self.store.lock().await;
        store.calls.push(CatalogCall::Include(join.clone()));
        store.check_fault(Operation::Include, join.child.kind, &join.path(library_id))?;
        store.get(library_id, join.parent)?;
        store.get(library_id, join.child)?;
        store.upsert_join(join);
        Ok(())
    }

    async fn exclude(&self, library_id: i64, join: &Join) -> Result<()> {
        let mut store = self.store.lock().await;
        store.calls.push(CatalogCall::Exclude(join.clone()));
        store.check_fault(Operation::Exclude, join.child.kind, &join.path(library_id))?;

        let (kind, left, right) = join.key();
        let before = store.joins.len();
        store
            .joins
            .retain(|r| !(r.kind == kind && r.left == left && r.right == right));
        if store.joins.len() == before {
            return Err(LibraryError::not_found(join.path(library_id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> (MemoryCatalog, i64, Child, Child) {
        let catalog = MemoryCatalog::new();
        let library = catalog.add_library("Test").await;
        let series = catalog.insert(library.id, &Series::new("Foo").into()).await.unwrap();
        let author = catalog
            .insert(library.id, &Author::new("Jane", "Doe").into())
            .await
            .unwrap();
        (catalog, library.id, series, author)
    }

    #[tokio::test]
    async fn test_insert_assigns_positive_ids() {
        let (_catalog, library_id, series, author) = seeded().await;
        assert!(series.id() > 0);
        assert!(author.id() > 0);
        assert_ne!(series.id(), author.id());
        assert_eq!(series.library_id(), library_id);
    }

    #[tokio::test]
    async fn test_duplicate_include_is_idempotent() {
        let (catalog, library_id, series, author) = seeded().await;
        let join = Join::new(series.entity_ref(), author.entity_ref())
            .unwrap()
            .with_principal(Some(true));

        catalog.include(library_id, &join).await.unwrap();
        catalog.include(library_id, &join.clone().with_principal(Some(false))).await.unwrap();

        assert_eq!(catalog.join_count(series.entity_ref(), author.entity_ref()).await, 1);
        let row = catalog.join_row(author.entity_ref(), series.entity_ref()).await.unwrap();
        assert_eq!(row.principal, Some(false));
    }

    #[tokio::test]
    async fn test_missing_exclude_fails() {
        let (catalog, library_id, series, author) = seeded().await;
        let join = Join::new(series.entity_ref(), author.entity_ref()).unwrap();
        let result = catalog.exclude(library_id, &join).await;
        assert!(matches!(result, Err(LibraryError::RecordNotFound(_))));
    }

    #[tokio::test]
    async fn test_related_rows_carry_join_attributes() {
        let (catalog, library_id, series, author) = seeded().await;
        let join = Join::new(series.entity_ref(), author.entity_ref())
            .unwrap()
            .with_principal(Some(true));
        catalog.include(library_id, &join).await.unwrap();

        let rows = catalog
            .list_related(library_id, series.entity_ref(), EntityKind::Author, &ListQuery::default())
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].principal(), Some(true));

        // Same row, seen from the author side
        let rows = catalog
            .list_related(library_id, author.entity_ref(), EntityKind::Series, &ListQuery::default())
            .await
            .unwrap();
        assert_eq!(rows[0].id(), series.id());
    }

    #[tokio::test]
    async fn test_remove_cascades_joins() {
        let (catalog, library_id, series, author) = seeded().await;
        let join = Join::new(series.entity_ref(), author.entity_ref()).unwrap();
        catalog.include(library_id, &join).await.unwrap();

        catalog.remove(library_id, author.entity_ref()).await.unwrap();
        assert_eq!(catalog.join_count(series.entity_ref(), author.entity_ref()).await, 0);

        let found = catalog.find(library_id, series.entity_ref(), true).await.unwrap();
        match found {
            Child::Series(s) => assert_eq!(s.authors.map(|a| a.len()), Some(0)),
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn test_fault_injection() {
        let (catalog, library_id, _series, _author) = seeded().await;

        catalog.fail_next(Operation::List, 1).await;
        let result = catalog.list(library_id, EntityKind::Author, &ListQuery::default()).await;
        assert!(matches!(result, Err(LibraryError::ApiRequestFailed { status_code: Some(500), .. })));
        assert!(catalog.list(library_id, EntityKind::Author, &ListQuery::default()).await.is_ok());

        catalog.forbid(EntityKind::Author).await;
        let result = catalog.list(library_id, EntityKind::Author, &ListQuery::default()).await;
        assert!(result.unwrap_err().is_forbidden());
    }

    #[tokio::test]
    async fn test_list_filters_and_pages() {
        let (catalog, library_id, _series, _author) = seeded().await;
        for name in ["Bar", "Baz", "Qux"] {
            catalog.insert(library_id, &Series::new(name).into()).await.unwrap();
        }

        let rows = catalog
            .list(library_id, EntityKind::Series, &ListQuery::default().named("ba"))
            .await
            .unwrap();
        let names: Vec<String> = rows.iter().map(|c| c.label()).collect();
        assert_eq!(names, vec!["Bar", "Baz"]);

        let rows = catalog
            .list(library_id, EntityKind::Series, &ListQuery::page(2, 2))
            .await
            .unwrap();
        let names: Vec<String> = rows.iter().map(|c| c.label()).collect();
        assert_eq!(names, vec!["Foo", "Qux"]);
    }

    #[tokio::test]
    async fn test_sample_catalog_is_consistent() {
        let catalog = MemoryCatalog::sample();
        let libraries = catalog.libraries().await.unwrap();
        assert_eq!(libraries.len(), 1);

        let series = catalog
            .list(libraries[0].id, EntityKind::Series, &ListQuery::default())
            .await
            .unwrap();
        let found = catalog
            .find(libraries[0].id, series[0].entity_ref(), true)
            .await
            .unwrap();
        match found {
            Child::Series(s) => {
                let ordinals: Vec<Option<i32>> =
                    s.stories.unwrap_or_default().iter().map(|st| st.ordinal).collect();
                assert_eq!(ordinals, vec![Some(1), Some(2), Some(3)]);
                assert_eq!(s.authors.map(|a| a.len()), Some(1));
            }
            _ => unreachable!(),
        }
    }
}
