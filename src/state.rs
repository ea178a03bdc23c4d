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


//! Session state shared by the guide
//!
//! Holds the catalog handle and the library the user is working in. Every
//! other entity is scoped to that library. The state is passed explicitly to
//! whoever needs it; nothing here is global.

use crate::api::Catalog;
use crate::error::{LibraryError, Result};
use crate::models::Library;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    catalog: Arc<dyn Catalog>,
    library: Option<Library>,
    signed_in: bool,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("library", &self.library)
            .field("signed_in", &self.signed_in)
            .finish()
    }
}

impl AppState {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self {
            catalog,
            library: None,
            signed_in: false,
        }
    }

    pub fn catalog(&self) -> Arc<dyn Catalog> {
        Arc::clone(&self.catalog)
    }

    /// Mark the session signed in; the library selection starts empty
    pub fn sign_in(&mut self) {
        self.signed_in = true;
        self.library = None;
    }

    /// Sign out and forget the selected library
    pub fn sign_out(&mut self) {
        self.signed_in = false;
        self.clear();
    }

    pub fn is_signed_in(&self) -> bool {
        self.signed_in
    }

    pub fn select_library(&mut self, library: Library) -> Result<()> {
        if library.is_new() {
            return Err(LibraryError::invalid_input("Cannot select an unsaved library"));
        }
        info!(library_id = library.id, name = %library.name, "library selected");
        self.library = Some(library);
        Ok(())
    }

    /// Fetch a library by id and select it
    pub async fn select_library_by_id(&mut self, id: i64) -> Result<()> {
        let library = self.catalog.library(id).await?;
        self.select_library(library)
    }

    pub fn clear(&mut self) {
        self.library = None;
    }

    pub fn library(&self) -> Option<&Library> {
        self.library.as_ref()
    }

    /// Id of the selected library
    pub fn library_id(&self) -> Result<i64> {
        self.library
            .as_ref()
            .map(|l| l.id)
            .ok_or_else(|| LibraryError::InvalidState("No library selected".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MemoryCatalog;

    #[tokio::test]
    async fn test_library_selection_lifecycle() {
        let catalog = Arc::new(MemoryCatalog::new());
        let library = catalog.add_library("Home").await;
        let mut state = AppState::new(catalog);

        assert!(matches!(state.library_id(), Err(LibraryError::InvalidState(_))));

        state.sign_in();
        state.select_library_by_id(library.id).await.unwrap();
        assert_eq!(state.library_id().unwrap(), library.id);

        state.sign_out();
        assert!(!state.is_signed_in());
        assert!(state.library().is_none());
    }

    #[test]
    fn test_unsaved_library_rejected() {
        let mut state = AppState::new(Arc::new(MemoryCatalog::new()));
        assert!(state.select_library(Library::placeholder()).is_err());
    }
}
