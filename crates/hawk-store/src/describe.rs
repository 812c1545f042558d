// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Merge a node's attributes with every ancestor's into one description.
// Author: Lukas Bower

//! Attribute inheritance.
//!
//! Layers are applied nearest first and later layers overwrite earlier ones:
//! positional fields, the node's own attributes, then each ancestor up to the
//! root. An ancestor therefore wins over a descendant for the same key.
//! Ancestors are read through the session without creating handles, so a
//! description never touches navigation state.

use crate::container::{AttrValue, Attributes};
use crate::error::Result;
use crate::path;
use crate::tree::{Group, Leaf, Node, Session};

/// Flat attribute mapping produced by [`describe`].
pub type Description = Attributes;

/// Names given to the leading path segments of a node.
pub const POSITIONAL_FIELDS: [&str; 5] = ["daq", "series", "repeat", "sensor", "signal"];

/// Describe any node.
pub fn describe(node: &Node) -> Result<Description> {
    match node {
        Node::Group(group) => group.describe(),
        Node::Leaf(leaf) => leaf.describe(),
    }
}

/// Positional fields for the segments present in `absolute`.
///
/// Labels are assigned by depth alone, one per leading segment. Nodes outside
/// the `daq/series/repeat/sensor/signal` layout (such as `LMS/xData/freq`)
/// still receive them, so `repeat` reads `"freq"` there; callers that need
/// layout-aware fields should check `series` against the campaign they expect.
pub fn positional_fields(absolute: &str) -> Description {
    POSITIONAL_FIELDS
        .iter()
        .zip(path::split(absolute))
        .map(|(field, segment)| ((*field).to_owned(), AttrValue::from(segment)))
        .collect()
}

fn describe_path(session: &Session, absolute: &str) -> Result<Description> {
    session.check_open()?;
    let mut out = positional_fields(absolute);
    out.extend(session.attrs(absolute)?);
    for ancestor in path::ancestors(absolute) {
        out.extend(session.attrs(&ancestor)?);
    }
    Ok(out)
}

impl Group {
    /// Own attributes merged with every ancestor's.
    pub fn describe(&self) -> Result<Description> {
        describe_path(self.session(), self.path())
    }
}

impl Leaf {
    /// Own attributes merged with every ancestor's.
    pub fn describe(&self) -> Result<Description> {
        describe_path(self.session(), self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_fields_follow_segments() {
        let fields = positional_fields("LMS/BR_AR/01/LLC-01/frf");
        assert_eq!(fields.len(), 5);
        assert_eq!(fields["daq"], AttrValue::from("LMS"));
        assert_eq!(fields["sensor"], AttrValue::from("LLC-01"));
        assert_eq!(fields["signal"], AttrValue::from("frf"));
    }

    #[test]
    fn labels_follow_depth_outside_the_test_layout() {
        let fields = positional_fields("LMS/xData/freq");
        assert_eq!(fields["series"], AttrValue::from("xData"));
        assert_eq!(fields["repeat"], AttrValue::from("freq"));
        assert!(!fields.contains_key("sensor"));
    }

    #[test]
    fn short_paths_have_fewer_fields() {
        assert!(positional_fields("").is_empty());
        let fields = positional_fields("NI/RPH_AR");
        assert_eq!(fields.keys().collect::<Vec<_>>(), vec!["daq", "series"]);
    }
}
