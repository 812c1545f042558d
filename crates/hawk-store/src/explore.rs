// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Depth-bounded tree summary that never materializes shards.
// Author: Lukas Bower

use std::collections::BTreeMap;
use std::fmt;

use crate::error::Result;
use crate::tree::{ChildInfo, Group, Session};

/// Marker for an external reference whose shard is not on disk.
pub const UNDOWNLOADED: &str = "(undownloaded)";
/// Marker for a link whose shard is on disk but lacks the linked path.
pub const DANGLING: &str = "(dangling link)";
/// Marker for a group below the depth budget.
pub const TRUNCATED: &str = "...";

/// Summary of one child.
#[derive(Debug, Clone, PartialEq)]
pub enum Summary {
    /// `"<measurement> (<units>) <shape>"`.
    Leaf(String),
    /// Expanded group.
    Group(ExploreTree),
    /// Group not expanded because the depth budget ran out.
    Truncated,
    /// Shard not materialized yet.
    Undownloaded,
    /// Shard on disk, linked path absent from it.
    Dangling,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Summary::Leaf(text) => f.write_str(text),
            Summary::Group(tree) => write!(f, "{} entries", tree.len()),
            Summary::Truncated => f.write_str(TRUNCATED),
            Summary::Undownloaded => f.write_str(UNDOWNLOADED),
            Summary::Dangling => f.write_str(DANGLING),
        }
    }
}

/// Nested summary keyed by absolute path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExploreTree {
    entries: BTreeMap<String, Summary>,
}

impl ExploreTree {
    /// Summary of the child at absolute path `path`.
    pub fn get(&self, path: &str) -> Option<&Summary> {
        self.entries.get(path)
    }

    /// Entries in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Summary)> {
        self.entries.iter().map(|(path, summary)| (path.as_str(), summary))
    }

    /// Number of direct entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the explored group has no children.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn render(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        for (path, summary) in &self.entries {
            let pad = "  ".repeat(indent);
            match summary {
                Summary::Group(tree) => {
                    writeln!(f, "{pad}{path}/")?;
                    tree.render(f, indent + 1)?;
                }
                Summary::Truncated => writeln!(f, "{pad}{path}/ {TRUNCATED}")?,
                other => writeln!(f, "{pad}{path}: {other}")?,
            }
        }
        Ok(())
    }
}

impl fmt::Display for ExploreTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f, 0)
    }
}

/// Summarize `group` down to `max_depth` levels (0 is treated as 1).
pub fn explore(group: &Group, max_depth: usize) -> Result<ExploreTree> {
    group.session().check_open()?;
    explore_path(group.session(), group.path(), max_depth.max(1))
}

fn explore_path(session: &Session, path: &str, depth: usize) -> Result<ExploreTree> {
    let mut entries = BTreeMap::new();
    for (name, info) in session.children(path)? {
        let child = if path.is_empty() {
            name
        } else {
            format!("{path}/{name}")
        };
        let summary = match info {
            ChildInfo::Undownloaded => Summary::Undownloaded,
            ChildInfo::Dangling => Summary::Dangling,
            ChildInfo::Leaf {
                measurement,
                units,
                shape,
            } => Summary::Leaf(leaf_summary(measurement.as_deref(), units.as_deref(), &shape)),
            ChildInfo::Group if depth > 1 => Summary::Group(explore_path(session, &child, depth - 1)?),
            ChildInfo::Group => Summary::Truncated,
        };
        entries.insert(child, summary);
    }
    Ok(ExploreTree { entries })
}

/// One-line leaf description.
pub fn leaf_summary(measurement: Option<&str>, units: Option<&str>, shape: &[usize]) -> String {
    let dims = shape
        .iter()
        .map(usize::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "{} ({}) ({dims})",
        measurement.unwrap_or("?"),
        units.unwrap_or("?")
    )
}

impl Group {
    /// See [`explore`].
    pub fn explore(&self, max_depth: usize) -> Result<ExploreTree> {
        explore(self, max_depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_summary_formats_shape() {
        assert_eq!(
            leaf_summary(Some("acceleration"), Some("m/s^2"), &[4096, 3]),
            "acceleration (m/s^2) (4096, 3)"
        );
        assert_eq!(leaf_summary(None, None, &[8]), "? (?) (8)");
    }

    #[test]
    fn render_indents_nested_groups() {
        let mut inner = BTreeMap::new();
        inner.insert("LMS/BR_AR".to_string(), Summary::Truncated);
        inner.insert("LMS/xData".to_string(), Summary::Undownloaded);
        let mut outer = BTreeMap::new();
        outer.insert(
            "LMS".to_string(),
            Summary::Group(ExploreTree { entries: inner }),
        );
        let tree = ExploreTree { entries: outer };
        assert_eq!(
            tree.to_string(),
            "LMS/\n  LMS/BR_AR/ ...\n  LMS/xData: (undownloaded)\n"
        );
    }
}
