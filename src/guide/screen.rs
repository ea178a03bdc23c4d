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


//! Stage screen: list, search, paginate and edit one kind of child
//!
//! # List sub-view
//! With search text the screen queries the library-wide name search. Without
//! it, the screen lists the children currently joined to the parent (or every
//! entity of the kind when the parent is the Library). One fetch never hits
//! both.
//!
//! A 403 empties the list silently. Any other failure empties the list and
//! sets a `Failed` status whose text is shown as an inline row.
//!
//! # Edit sub-view
//! New entities (id <= 0) are inserted then included; existing ones are
//! updated, with the join row reregistered when its principal/ordinal
//! changed.
//!
//! # Remove
//! Deletes the entity itself, so it needs a confirmation step:
//! `request_remove` then `confirm_remove` (or `cancel_remove`).

use crate::api::{Catalog, ListQuery};
use crate::error::LibraryError;
use crate::guide::adapter::MutationAdapter;
use crate::guide::parent::Parent;
use crate::models::{Child, EntityKind, EntityRef};
use crate::pagination::Pager;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Shown as the only table row while a fetch is pending
pub const FETCH_IN_PROGRESS: &str = "Database Fetch In Progress";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListStatus {
    Idle,
    Loading,
    Loaded,
    /// Banner text for the inline error row
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScreenView {
    List,
    /// Form for a new (id <= 0) or existing child
    Edit(Child),
}

/// What the wizard should do after a screen action
#[derive(Debug, Clone, PartialEq)]
pub enum ScreenOutcome {
    Unchanged,
    /// A join row changed; re-fetch the root
    Refresh,
    /// Entity inserted or updated
    Saved(Child),
    /// Entity deleted
    Removed(Child),
}

impl ScreenOutcome {
    pub fn needs_refresh(&self) -> bool {
        !matches!(self, ScreenOutcome::Unchanged)
    }
}

/// Which endpoint a page comes from; search and browse never mix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListTarget {
    /// Library-wide name search
    Search,
    /// Every entity of the kind in the library
    Library,
    /// Children joined to this parent
    Related(EntityRef),
}

/// A page fetch detached from the screen, so the caller can render the
/// loading row while it runs
pub struct PageRequest {
    catalog: Arc<dyn Catalog>,
    library_id: i64,
    kind: EntityKind,
    target: ListTarget,
    query: ListQuery,
    seq: u64,
}

impl PageRequest {
    pub fn target(&self) -> ListTarget {
        self.target
    }

    pub async fn run(self) -> PageResult {
        let result = match self.target {
            ListTarget::Search | ListTarget::Library => {
                self.catalog.list(self.library_id, self.kind, &self.query).await
            }
            ListTarget::Related(parent) => {
                self.catalog
                    .list_related(self.library_id, parent, self.kind, &self.query)
                    .await
            }
        };
        PageResult {
            seq: self.seq,
            searching: self.target == ListTarget::Search,
            result,
        }
    }
}

/// Outcome of a [`PageRequest`], handed back to `complete_fetch`
#[derive(Debug)]
pub struct PageResult {
    seq: u64,
    searching: bool,
    result: crate::error::Result<Vec<Child>>,
}

#[derive(Debug)]
pub struct StageScreen {
    kind: EntityKind,
    adapter: MutationAdapter,
    search_text: String,
    pager: Pager,
    rows: Vec<Child>,
    status: ListStatus,
    last_page: bool,
    view: ScreenView,
    pending_remove: Option<Child>,
    form_errors: Vec<String>,
    fetch_seq: u64,
}

impl StageScreen {
    pub fn new(kind: EntityKind, adapter: MutationAdapter, page_size: usize) -> Self {
        Self {
            kind,
            adapter,
            search_text: String::new(),
            pager: Pager::new(page_size),
            rows: Vec::new(),
            status: ListStatus::Idle,
            last_page: true,
            view: ScreenView::List,
            pending_remove: None,
            form_errors: Vec::new(),
            fetch_seq: 0,
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn parent(&self) -> &Parent {
        self.adapter.parent()
    }

    pub fn set_parent(&mut self, parent: Parent) {
        self.adapter.set_parent(parent);
    }

    pub fn adapter(&self) -> &MutationAdapter {
        &self.adapter
    }

    pub fn rows(&self) -> &[Child] {
        &self.rows
    }

    pub fn status(&self) -> &ListStatus {
        &self.status
    }

    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    pub fn page(&self) -> usize {
        self.pager.page()
    }

    pub fn last_page(&self) -> bool {
        self.last_page
    }

    pub fn view(&self) -> &ScreenView {
        &self.view
    }

    pub fn pending_remove(&self) -> Option<&Child> {
        self.pending_remove.as_ref()
    }

    pub fn form_errors(&self) -> &[String] {
        &self.form_errors
    }

    /// Row rendered in place of the table body, if any
    pub fn status_row(&self) -> Option<String> {
        match &self.status {
            ListStatus::Loading => Some(FETCH_IN_PROGRESS.to_string()),
            ListStatus::Failed(message) => Some(message.clone()),
            ListStatus::Idle | ListStatus::Loaded => None,
        }
    }

    // ===== List sub-view =====

    /// Fetch the current page
    pub async fn fetch(&mut self) {
        let request = self.begin_fetch();
        let page = request.run().await;
        self.complete_fetch(page);
    }

    /// Mark the list as loading and describe the page to fetch
    ///
    /// The screen shows [`FETCH_IN_PROGRESS`] until the matching
    /// `complete_fetch`. Starting another fetch makes this one stale.
    pub fn begin_fetch(&mut self) -> PageRequest {
        self.status = ListStatus::Loading;
        self.fetch_seq += 1;

        let query = ListQuery::page(self.pager.page_size(), self.pager.offset());
        let search = self.search_text.trim();
        let (target, query) = if !search.is_empty() {
            (ListTarget::Search, query.named(search))
        } else {
            match self.adapter.parent() {
                Parent::Library(_) => (ListTarget::Library, query),
                parent if self.kind == EntityKind::Story => {
                    (ListTarget::Related(parent.entity_ref()), query.with(EntityKind::Author))
                }
                parent => (ListTarget::Related(parent.entity_ref()), query),
            }
        };

        PageRequest {
            catalog: Arc::clone(self.adapter.catalog()),
            library_id: self.adapter.library_id(),
            kind: self.kind,
            target,
            query,
            seq: self.fetch_seq,
        }
    }

    /// Apply a fetched page; pages from superseded requests are dropped
    pub fn complete_fetch(&mut self, page: PageResult) {
        if page.seq != self.fetch_seq {
            debug!(kind = %self.kind, seq = page.seq, current = self.fetch_seq, "stale page dropped");
            return;
        }

        match page.result {
            Ok(rows) => {
                self.last_page = self.pager.is_last_page(rows.len());
                debug!(kind = %self.kind, page = self.pager.page(), rows = rows.len(), searching = page.searching, "fetched");
                self.rows = rows;
                self.status = ListStatus::Loaded;
            }
            Err(e) if e.is_forbidden() => {
                debug!(kind = %self.kind, "nothing visible to this user");
                self.clear_rows();
                self.status = ListStatus::Loaded;
            }
            Err(e) => {
                error!(kind = %self.kind, error = %e, "fetch failed");
                self.clear_rows();
                self.status = ListStatus::Failed(e.user_message());
            }
        }
    }

    fn clear_rows(&mut self) {
        self.rows.clear();
        self.last_page = true;
    }

    /// New search text; goes back to page one
    pub async fn set_search<S: Into<String>>(&mut self, text: S) {
        self.search_text = text.into();
        self.pager.reset();
        self.fetch().await;
    }

    pub async fn next_page(&mut self) {
        if self.last_page {
            return;
        }
        self.pager.next();
        self.fetch().await;
    }

    pub async fn previous_page(&mut self) {
        if self.pager.previous() {
            self.fetch().await;
        }
    }

    /// Is `child` joined to the parent
    pub fn included(&self, child: &Child) -> bool {
        self.adapter.parent().includes(child)
    }

    /// Include button state
    pub fn can_include(&self, child: &Child) -> bool {
        !child.is_new() && !self.adapter.parent().is_library() && !self.included(child)
    }

    /// Exclude button state
    pub fn can_exclude(&self, child: &Child) -> bool {
        !self.adapter.parent().is_library() && self.included(child)
    }

    pub async fn include(&mut self, child: &Child) -> ScreenOutcome {
        if self.adapter.perform_include(child).await {
            ScreenOutcome::Refresh
        } else {
            ScreenOutcome::Unchanged
        }
    }

    pub async fn exclude(&mut self, child: &Child) -> ScreenOutcome {
        if self.adapter.perform_exclude(child).await {
            ScreenOutcome::Refresh
        } else {
            ScreenOutcome::Unchanged
        }
    }

    // ===== Edit sub-view =====

    /// Open an empty form
    pub fn begin_add(&mut self) {
        if let Some(mut child) = Child::placeholder(self.kind) {
            child.set_library_id(self.adapter.library_id());
            if !self.adapter.parent().is_library() {
                child.set_principal(Some(true));
            }
            self.form_errors.clear();
            self.view = ScreenView::Edit(child);
        }
    }

    /// Open the form on an existing row
    pub fn begin_edit(&mut self, child: Child) {
        self.form_errors.clear();
        self.view = ScreenView::Edit(child);
    }

    /// Back to the list; the unsaved form is dropped
    pub fn cancel_edit(&mut self) {
        self.form_errors.clear();
        self.view = ScreenView::List;
    }

    /// Submit the form
    ///
    /// Validation failures keep the form open with `form_errors()` set.
    pub async fn save(&mut self, mut child: Child) -> ScreenOutcome {
        self.form_errors.clear();
        child.set_library_id(self.adapter.library_id());

        if let Err(e) = child.validate() {
            self.reject(child, e);
            return ScreenOutcome::Unchanged;
        }
        if let Err(e) = self.check_unique(&child).await {
            self.reject(child, e);
            return ScreenOutcome::Unchanged;
        }

        let saved = if child.is_new() {
            let mut inserted = self.adapter.perform_insert(&child).await;
            if inserted.is_new() {
                let e = self.adapter.take_error().unwrap_or_else(|| LibraryError::invalid_input("Insert failed"));
                self.reject(child, e);
                return ScreenOutcome::Unchanged;
            }
            inserted.set_principal(child.principal());
            inserted.set_ordinal(child.ordinal());
            // The entity exists even when the include fails
            self.adapter.perform_include(&inserted).await;
            inserted
        } else {
            let updated = self.adapter.perform_update(&child).await;
            if updated.is_new() {
                let e = self.adapter.take_error().unwrap_or_else(|| LibraryError::invalid_input("Update failed"));
                self.reject(child, e);
                return ScreenOutcome::Unchanged;
            }
            updated
        };
        if let Some(e) = self.adapter.error() {
            self.form_errors.push(e.user_message());
        }

        self.view = ScreenView::List;
        ScreenOutcome::Saved(saved)
    }

    fn reject(&mut self, child: Child, err: LibraryError) {
        self.form_errors = match err {
            LibraryError::Validation { errors } => errors,
            other => vec![other.user_message()],
        };
        self.view = ScreenView::Edit(child);
    }

    /// Author and Series names identify the entity, so they must be unique
    /// within the library
    async fn check_unique(&self, child: &Child) -> crate::error::Result<()> {
        if !matches!(child.kind(), EntityKind::Author | EntityKind::Series) {
            return Ok(());
        }
        let name = child.lookup_name();
        match self
            .adapter
            .catalog()
            .find_exact(self.adapter.library_id(), child.kind(), &name)
            .await
        {
            Ok(Some(existing)) if existing.id() != child.id() => Err(LibraryError::Validation {
                errors: vec![format!("{} '{}' already exists", child.kind(), name)],
            }),
            Ok(_) => Ok(()),
            Err(e) => {
                warn!(kind = %child.kind(), error = %e, "uniqueness check skipped");
                Ok(())
            }
        }
    }

    // ===== Remove =====

    /// Ask for confirmation before deleting `child`
    pub fn request_remove(&mut self, child: Child) {
        self.pending_remove = Some(child);
    }

    pub fn cancel_remove(&mut self) {
        self.pending_remove = None;
    }

    /// Delete the entity awaiting confirmation
    pub async fn confirm_remove(&mut self) -> ScreenOutcome {
        let Some(child) = self.pending_remove.take() else {
            return ScreenOutcome::Unchanged;
        };
        let removed = self.adapter.perform_remove(&child).await;
        if removed.is_new() {
            ScreenOutcome::Unchanged
        } else {
            self.view = ScreenView::List;
            ScreenOutcome::Removed(removed)
        }
    }
}
