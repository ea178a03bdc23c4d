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


//! Join (relationship) rows
//!
//! Five many-to-many relationships exist. Author joins carry `principal`,
//! the Series–Story join carries `ordinal`:
//!
//! | Join          | Attribute   |
//! |---------------|-------------|
//! | Author–Series | principal   |
//! | Author–Story  | principal   |
//! | Author–Volume | principal   |
//! | Series–Story  | ordinal     |
//! | Story–Volume  | -           |
//!
//! A join can be addressed from either side
//! (`/series/1/7/authors/3` and `/authors/1/3/series/7` name the same row).

use crate::error::{LibraryError, Result};
use crate::models::{EntityKind, EntityRef};

/// Which relationship a join row belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinKind {
    AuthorSeries,
    AuthorStory,
    AuthorVolume,
    SeriesStory,
    StoryVolume,
}

impl JoinKind {
    /// Relationship between two kinds, in either order
    pub fn between(a: EntityKind, b: EntityKind) -> Option<Self> {
        use EntityKind::*;
        match (a, b) {
            (Author, Series) | (Series, Author) => Some(JoinKind::AuthorSeries),
            (Author, Story) | (Story, Author) => Some(JoinKind::AuthorStory),
            (Author, Volume) | (Volume, Author) => Some(JoinKind::AuthorVolume),
            (Series, Story) | (Story, Series) => Some(JoinKind::SeriesStory),
            (Story, Volume) | (Volume, Story) => Some(JoinKind::StoryVolume),
            _ => None,
        }
    }

    /// Kind stored on the left of the canonical (left, right) id pair
    pub fn left(&self) -> EntityKind {
        match self {
            JoinKind::AuthorSeries | JoinKind::AuthorStory | JoinKind::AuthorVolume => EntityKind::Author,
            JoinKind::SeriesStory => EntityKind::Series,
            JoinKind::StoryVolume => EntityKind::Story,
        }
    }

    pub fn right(&self) -> EntityKind {
        match self {
            JoinKind::AuthorSeries => EntityKind::Series,
            JoinKind::AuthorStory | JoinKind::SeriesStory => EntityKind::Story,
            JoinKind::AuthorVolume | JoinKind::StoryVolume => EntityKind::Volume,
        }
    }

    pub fn has_principal(&self) -> bool {
        self.left() == EntityKind::Author
    }

    pub fn has_ordinal(&self) -> bool {
        *self == JoinKind::SeriesStory
    }
}

/// Join row addressed from `parent` towards `child`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    pub parent: EntityRef,
    pub child: EntityRef,
    pub principal: Option<bool>,
    pub ordinal: Option<i32>,
}

impl Join {
    /// Fails with `InvalidRelationship` for pairs that have no join table
    pub fn new(parent: EntityRef, child: EntityRef) -> Result<Self> {
        if JoinKind::between(parent.kind, child.kind).is_none() {
            return Err(LibraryError::InvalidRelationship {
                parent: parent.kind.label().to_string(),
                child: child.kind.label().to_string(),
            });
        }
        Ok(Self {
            parent,
            child,
            principal: None,
            ordinal: None,
        })
    }

    /// Only kept for Author joins
    pub fn with_principal(mut self, principal: Option<bool>) -> Self {
        self.principal = if self.kind().has_principal() { principal } else { None };
        self
    }

    /// Only kept for Series–Story joins
    pub fn with_ordinal(mut self, ordinal: Option<i32>) -> Self {
        self.ordinal = if self.kind().has_ordinal() { ordinal } else { None };
        self
    }

    pub fn kind(&self) -> JoinKind {
        // Checked in new()
        JoinKind::between(self.parent.kind, self.child.kind).unwrap_or(JoinKind::StoryVolume)
    }

    /// Canonical (left id, right id) pair regardless of direction
    pub fn key(&self) -> (JoinKind, i64, i64) {
        let kind = self.kind();
        if self.parent.kind == kind.left() {
            (kind, self.parent.id, self.child.id)
        } else {
            (kind, self.child.id, self.parent.id)
        }
    }

    /// `/{parent}/{libraryId}/{parentId}/{children}/{childId}`
    pub fn path(&self, library_id: i64) -> String {
        format!(
            "/{}/{}/{}/{}/{}",
            self.parent.kind.segment(),
            library_id,
            self.parent.id,
            self.child.kind.segment(),
            self.child.id
        )
    }

    /// Query pairs for the join-insert call
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if self.principal == Some(true) {
            pairs.push(("principal".to_string(), "true".to_string()));
        }
        if let Some(ordinal) = self.ordinal {
            pairs.push(("ordinal".to_string(), ordinal.to_string()));
        }
        pairs
    }

    /// Same row with attributes cleared, as used for deletes
    pub fn bare(&self) -> Self {
        Self {
            principal: None,
            ordinal: None,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(kind: EntityKind, id: i64) -> EntityRef {
        EntityRef::new(kind, id)
    }

    #[test]
    fn test_invalid_pairs_rejected() {
        let result = Join::new(r(EntityKind::Series, 1), r(EntityKind::Volume, 2));
        assert!(matches!(result, Err(LibraryError::InvalidRelationship { .. })));

        let result = Join::new(r(EntityKind::Author, 1), r(EntityKind::Author, 2));
        assert!(result.is_err());

        let result = Join::new(r(EntityKind::Library, 1), r(EntityKind::Author, 2));
        assert!(result.is_err());
    }

    #[test]
    fn test_key_is_direction_independent() {
        let a = Join::new(r(EntityKind::Series, 7), r(EntityKind::Author, 3)).unwrap();
        let b = Join::new(r(EntityKind::Author, 3), r(EntityKind::Series, 7)).unwrap();
        assert_eq!(a.key(), b.key());
        assert_eq!(a.key(), (JoinKind::AuthorSeries, 3, 7));
    }

    #[test]
    fn test_attributes_only_where_meaningful() {
        let join = Join::new(r(EntityKind::Series, 7), r(EntityKind::Author, 3))
            .unwrap()
            .with_principal(Some(true))
            .with_ordinal(Some(4));
        assert_eq!(join.principal, Some(true));
        assert_eq!(join.ordinal, None);

        let join = Join::new(r(EntityKind::Series, 7), r(EntityKind::Story, 9))
            .unwrap()
            .with_principal(Some(true))
            .with_ordinal(Some(3));
        assert_eq!(join.principal, None);
        assert_eq!(join.ordinal, Some(3));
        assert_eq!(join.query_pairs(), vec![("ordinal".to_string(), "3".to_string())]);
    }

    #[test]
    fn test_path() {
        let join = Join::new(r(EntityKind::Series, 7), r(EntityKind::Author, 3))
            .unwrap()
            .with_principal(Some(true));
        assert_eq!(join.path(1), "/series/1/7/authors/3");
        assert_eq!(join.query_pairs(), vec![("principal".to_string(), "true".to_string())]);
        assert!(join.bare().query_pairs().is_empty());
    }
}
