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


//! Read-only digest of the guide's root entity

use crate::guide::parent::Parent;
use crate::models::{Author, Child, EntityKind};
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryEntry {
    pub label: String,
    /// "principal", "#3" and similar relationship markers
    pub detail: Option<String>,
    /// Writers of a story under a Series or Volume root
    pub writers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummarySection {
    pub kind: EntityKind,
    pub entries: Vec<SummaryEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub heading: String,
    pub attributes: Vec<(String, String)>,
    pub sections: Vec<SummarySection>,
    pub expanded: bool,
}

impl Summary {
    pub fn from_parent(parent: &Parent) -> Self {
        let heading = format!("{}: {}", parent.kind().label(), parent.label());
        let attributes = attributes(parent);

        let kinds: &[EntityKind] = match parent {
            Parent::Library(_) => &[],
            Parent::Author(_) => &[EntityKind::Series, EntityKind::Story, EntityKind::Volume],
            Parent::Series(_) => &[EntityKind::Author, EntityKind::Story],
            Parent::Story(_) => &[EntityKind::Author, EntityKind::Series, EntityKind::Volume],
            Parent::Volume(_) => &[EntityKind::Author, EntityKind::Story],
        };
        let with_writers = matches!(parent, Parent::Series(_) | Parent::Volume(_));

        let sections: Vec<SummarySection> = kinds
            .iter()
            .map(|&kind| SummarySection {
                kind,
                entries: parent
                    .children(kind)
                    .iter()
                    .map(|c| entry(c, with_writers))
                    .collect(),
            })
            .collect();

        let principals = parent
            .children(EntityKind::Author)
            .iter()
            .filter(|c| c.principal() == Some(true))
            .count();
        if principals > 1 {
            warn!(root = %parent.entity_ref(), principals, "more than one principal author");
        }

        Self {
            heading,
            attributes,
            sections,
            expanded: false,
        }
    }

    pub fn toggle(&mut self) {
        self.expanded = !self.expanded;
    }

    /// Text rendering: counts per section when collapsed, every entry when
    /// expanded
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![self.heading.clone()];
        for (name, value) in &self.attributes {
            lines.push(format!("  {}: {}", name, value));
        }

        for section in &self.sections {
            let title = plural(section.kind);
            if !self.expanded {
                lines.push(format!("  {} ({})", title, section.entries.len()));
                continue;
            }
            lines.push(format!("  {}:", title));
            if section.entries.is_empty() {
                lines.push("    (none)".to_string());
            }
            for entry in &section.entries {
                let mut line = format!("    {}", entry.label);
                if let Some(detail) = &entry.detail {
                    line.push_str(&format!(" [{}]", detail));
                }
                if !entry.writers.is_empty() {
                    line.push_str(&format!(" by {}", entry.writers.join(", ")));
                }
                lines.push(line);
            }
        }
        lines
    }
}

fn plural(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Library => "Libraries",
        EntityKind::Author => "Authors",
        EntityKind::Series => "Series",
        EntityKind::Story => "Stories",
        EntityKind::Volume => "Volumes",
    }
}

fn attributes(parent: &Parent) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let mut push = |name: &str, value: Option<String>| {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            out.push((name.to_string(), value));
        }
    };
    match parent {
        Parent::Library(l) => {
            push("Scope", Some(l.scope.clone()));
            push("Notes", l.notes.clone());
        }
        Parent::Author(a) => {
            push("Active", Some(a.active.to_string()));
            push("Notes", a.notes.clone());
        }
        Parent::Series(s) => {
            push("Copyright", s.copyright.clone());
            push("Active", Some(s.active.to_string()));
            push("Notes", s.notes.clone());
        }
        Parent::Story(s) => {
            push("Copyright", s.copyright.clone());
            push("Active", Some(s.active.to_string()));
            push("Notes", s.notes.clone());
        }
        Parent::Volume(v) => {
            push("Type", Some(v.volume_type.as_str().to_string()));
            push("Copyright", v.copyright.clone());
            push("ISBN", v.isbn.clone());
            push("Location", v.location.clone());
            push("Read", Some(v.read.to_string()));
            push("Notes", v.notes.clone());
        }
    }
    out
}

fn entry(child: &Child, with_writers: bool) -> SummaryEntry {
    let detail = match child {
        Child::Author(a) if a.principal == Some(true) => Some("principal".to_string()),
        Child::Story(s) => s.ordinal.map(|o| format!("#{}", o)),
        _ => None,
    };
    let writers = match child {
        Child::Story(s) if with_writers => s
            .authors
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(Author::display_name)
            .collect(),
        _ => Vec::new(),
    };
    SummaryEntry {
        label: child.label(),
        detail,
        writers,
    }
}
