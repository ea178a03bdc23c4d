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


//! Catalog backend access
//!
//! The guide never talks HTTP directly. It goes through the [`Catalog`]
//! trait, which has two implementations:
//! - [`LibraryClient`] - REST client for the catalog backend
//! - [`MemoryCatalog`] - in-process store with fault injection, used by the
//!   test-suite and the CLI `--memory` mode
//!
//! # Resources
//! `/libraries`, `/authors/{libraryId}`, `/series/{libraryId}`,
//! `/stories/{libraryId}`, `/volumes/{libraryId}`, each with
//! `/active`, `/{id}`, `/name/{name}`, `/exact/{name}` lookups and
//! `/{id}/{children}/{childId}` relationship sub-paths.

pub mod client;
pub mod join;
pub mod memory;

use crate::error::Result;
use crate::models::{Child, EntityKind, EntityRef, Library};
use async_trait::async_trait;

// Re-export commonly used types
pub use client::LibraryClient;
pub use join::{Join, JoinKind};
pub use memory::{CatalogCall, MemoryCatalog, Operation};

/// Options for list endpoints
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    /// Substring filter on the entity name
    pub name: Option<String>,
    pub active_only: bool,
    /// Child kinds the backend should embed in each row
    pub with: Vec<EntityKind>,
}

impl ListQuery {
    /// Page window starting at `offset`
    pub fn page(limit: usize, offset: usize) -> Self {
        Self {
            limit: Some(limit),
            offset: Some(offset),
            ..Self::default()
        }
    }

    pub fn named<S: Into<String>>(mut self, name: S) -> Self {
        let name = name.into();
        self.name = if name.trim().is_empty() { None } else { Some(name) };
        self
    }

    pub fn active(mut self) -> Self {
        self.active_only = true;
        self
    }

    pub fn with(mut self, kind: EntityKind) -> Self {
        if !self.with.contains(&kind) {
            self.with.push(kind);
        }
        self
    }

    /// Query-string pairs shared by every list endpoint
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(offset) = self.offset {
            pairs.push(("offset".to_string(), offset.to_string()));
        }
        for kind in &self.with {
            pairs.push((kind.with_flag().to_string(), "true".to_string()));
        }
        pairs
    }
}

/// Backend operations consumed by the guide
///
/// Every method is scoped to one library except the library lookups
/// themselves.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Libraries visible to the signed-in user
    async fn libraries(&self) -> Result<Vec<Library>>;

    async fn library(&self, id: i64) -> Result<Library>;

    /// Entities of `kind` in the library, optionally filtered by name
    async fn list(&self, library_id: i64, kind: EntityKind, query: &ListQuery) -> Result<Vec<Child>>;

    /// Entities of `kind` joined to `parent`, carrying the join's
    /// relationship-scoped attributes
    async fn list_related(
        &self,
        library_id: i64,
        parent: EntityRef,
        kind: EntityKind,
        query: &ListQuery,
    ) -> Result<Vec<Child>>;

    /// Single entity; `with_children` embeds every relationship collection
    async fn find(&self, library_id: i64, target: EntityRef, with_children: bool) -> Result<Child>;

    /// Entity whose name matches exactly, if any
    async fn find_exact(&self, library_id: i64, kind: EntityKind, name: &str) -> Result<Option<Child>>;

    async fn insert(&self, library_id: i64, child: &Child) -> Result<Child>;

    async fn update(&self, library_id: i64, child: &Child) -> Result<Child>;

    /// Deletes the entity itself; join rows go with it
    async fn remove(&self, library_id: i64, target: EntityRef) -> Result<Child>;

    /// Create a join row
    async fn include(&self, library_id: i64, join: &Join) -> Result<()>;

    /// Delete a join row
    async fn exclude(&self, library_id: i64, join: &Join) -> Result<()>;
}
