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


//! The entity a stage screen manages children for
//!
//! A Library parent has no join semantics: every entity belongs to exactly
//! one library through a key fixed at creation, so include/exclude against a
//! Library are no-ops.

use crate::api::Join;
use crate::error::Result;
use crate::models::{
    sort_stories_by_ordinal, Author, Child, EntityKind, EntityRef, Library, Series, Story, Volume,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Parent {
    Library(Library),
    Author(Author),
    Series(Series),
    Story(Story),
    Volume(Volume),
}

impl Parent {
    /// Wrap a freshly fetched entity; series stories are put in ordinal order
    pub fn from_child(child: Child) -> Self {
        match child {
            Child::Author(a) => Parent::Author(a),
            Child::Series(mut s) => {
                if let Some(stories) = s.stories.as_mut() {
                    sort_stories_by_ordinal(stories);
                }
                Parent::Series(s)
            }
            Child::Story(s) => Parent::Story(s),
            Child::Volume(v) => Parent::Volume(v),
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Parent::Library(_) => EntityKind::Library,
            Parent::Author(_) => EntityKind::Author,
            Parent::Series(_) => EntityKind::Series,
            Parent::Story(_) => EntityKind::Story,
            Parent::Volume(_) => EntityKind::Volume,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            Parent::Library(l) => l.id,
            Parent::Author(a) => a.id,
            Parent::Series(s) => s.id,
            Parent::Story(s) => s.id,
            Parent::Volume(v) => v.id,
        }
    }

    pub fn entity_ref(&self) -> EntityRef {
        EntityRef::new(self.kind(), self.id())
    }

    pub fn is_library(&self) -> bool {
        matches!(self, Parent::Library(_))
    }

    pub fn label(&self) -> String {
        match self {
            Parent::Library(l) => l.name.clone(),
            Parent::Author(a) => a.display_name(),
            Parent::Series(s) => s.name.clone(),
            Parent::Story(s) => s.name.clone(),
            Parent::Volume(v) => v.name.clone(),
        }
    }

    /// Current relationship array for children of `kind`
    ///
    /// Empty when the parent was fetched without that collection or the pair
    /// has no relationship.
    pub fn children(&self, kind: EntityKind) -> Vec<Child> {
        fn wrap<T: Clone + Into<Child>>(items: &Option<Vec<T>>) -> Vec<Child> {
            items
                .as_deref()
                .unwrap_or_default()
                .iter()
                .cloned()
                .map(Into::into)
                .collect()
        }

        match (self, kind) {
            (Parent::Author(a), EntityKind::Series) => wrap(&a.series),
            (Parent::Author(a), EntityKind::Story) => wrap(&a.stories),
            (Parent::Author(a), EntityKind::Volume) => wrap(&a.volumes),
            (Parent::Series(s), EntityKind::Author) => wrap(&s.authors),
            (Parent::Series(s), EntityKind::Story) => wrap(&s.stories),
            (Parent::Story(s), EntityKind::Author) => wrap(&s.authors),
            (Parent::Story(s), EntityKind::Series) => wrap(&s.series),
            (Parent::Story(s), EntityKind::Volume) => wrap(&s.volumes),
            (Parent::Volume(v), EntityKind::Author) => wrap(&v.authors),
            (Parent::Volume(v), EntityKind::Story) => wrap(&v.stories),
            _ => Vec::new(),
        }
    }

    /// The relationship row for `child`, if it is currently joined
    pub fn current(&self, child: &Child) -> Option<Child> {
        self.children(child.kind())
            .into_iter()
            .find(|c| c.id() == child.id())
    }

    /// Is `child` currently associated with this parent (id equality)
    pub fn includes(&self, child: &Child) -> bool {
        match self {
            Parent::Library(l) => child.library_id() == l.id,
            _ => self.current(child).is_some(),
        }
    }

    /// Join row between this parent and `child` carrying the child's
    /// relationship attributes; `None` for a Library parent
    pub fn join_for(&self, child: &Child) -> Result<Option<Join>> {
        if self.is_library() {
            return Ok(None);
        }
        let join = Join::new(self.entity_ref(), child.entity_ref())?
            .with_principal(child.principal())
            .with_ordinal(child.ordinal());
        Ok(Some(join))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LibraryError;

    fn author(id: i64, principal: Option<bool>) -> Author {
        Author {
            id,
            principal,
            ..Author::new("A", format!("Author {}", id))
        }
    }

    fn series_with(authors: Vec<Author>) -> Parent {
        Parent::Series(Series {
            id: 7,
            library_id: 1,
            authors: Some(authors),
            ..Series::new("Foo")
        })
    }

    #[test]
    fn test_includes_by_id() {
        let parent = series_with(vec![author(3, Some(true)), author(4, None)]);
        assert!(parent.includes(&author(3, None).into()));
        assert!(parent.includes(&author(4, Some(false)).into()));
        assert!(!parent.includes(&author(5, None).into()));
    }

    #[test]
    fn test_includes_false_when_empty_or_unfetched() {
        assert!(!series_with(Vec::new()).includes(&author(3, None).into()));

        let unfetched = Parent::Series(Series { id: 7, ..Series::new("Foo") });
        assert!(!unfetched.includes(&author(3, None).into()));
    }

    #[test]
    fn test_library_parent_has_no_joins() {
        let library = Parent::Library(Library { id: 1, ..Library::placeholder() });
        let child: Child = Author { library_id: 1, ..author(3, None) }.into();
        assert!(library.includes(&child));
        assert_eq!(library.join_for(&child).unwrap(), None);
    }

    #[test]
    fn test_join_for_invalid_pair() {
        let parent = series_with(Vec::new());
        let volume: Child = Volume { id: 2, ..Volume::new("V") }.into();
        assert!(matches!(
            parent.join_for(&volume),
            Err(LibraryError::InvalidRelationship { .. })
        ));
    }

    #[test]
    fn test_from_child_sorts_series_stories() {
        let stories = vec![
            Story { id: 1, ordinal: None, ..Story::new("c") },
            Story { id: 2, ordinal: Some(2), ..Story::new("b") },
            Story { id: 3, ordinal: Some(1), ..Story::new("a") },
        ];
        let parent = Parent::from_child(Child::Series(Series {
            id: 9,
            stories: Some(stories),
            ..Series::new("S")
        }));
        let ids: Vec<i64> = parent.children(EntityKind::Story).iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }
}
