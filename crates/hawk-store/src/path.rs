// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Normalize navigation steps and derive the shard key owning a path.
// Author: Lukas Bower

//! Path resolution for lazy navigation.
//!
//! Absolute paths are slash-separated without a leading separator; the root is
//! the empty string. The shard key is a window of path segments joined by `_`
//! and must match the key format of the lookup table in use.

use serde::{Deserialize, Serialize};

/// Segment window used to derive a shard key from an absolute path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShardKeyRule {
    /// Number of leading segments skipped (after prefix stripping).
    pub offset: usize,
    /// Number of segments joined into the key.
    pub width: usize,
    /// Top-level segment removed before windowing when present.
    pub strip_prefix: Option<String>,
}

impl Default for ShardKeyRule {
    /// `DAQ/series/repeat/...` keyed as `series_repeat`.
    fn default() -> Self {
        Self {
            offset: 1,
            width: 2,
            strip_prefix: None,
        }
    }
}

impl ShardKeyRule {
    /// Derive the shard key for an absolute path.
    pub fn key_for(&self, absolute: &str) -> String {
        let mut segments: Vec<&str> = split(absolute).collect();
        if let (Some(prefix), Some(first)) = (self.strip_prefix.as_deref(), segments.first()) {
            if *first == prefix {
                segments.remove(0);
            }
        }
        segments
            .into_iter()
            .skip(self.offset)
            .take(self.width)
            .collect::<Vec<_>>()
            .join("_")
    }
}

/// Pure resolver turning `(base, child)` steps into `(absolute path, shard key)`.
#[derive(Debug, Clone, Default)]
pub struct PathResolver {
    rule: ShardKeyRule,
}

impl PathResolver {
    /// Build a resolver using the given shard-key rule.
    pub fn new(rule: ShardKeyRule) -> Self {
        Self { rule }
    }

    /// Rule this resolver keys paths with.
    pub fn rule(&self) -> &ShardKeyRule {
        &self.rule
    }

    /// Resolve `child` relative to `base`, returning the absolute path and its shard key.
    pub fn resolve(&self, base: &str, child: &str) -> (String, String) {
        let absolute = normalize(base, child);
        let key = self.rule.key_for(&absolute);
        (absolute, key)
    }
}

/// Join `child` onto `base` collapsing `.`, `..` and repeated separators.
///
/// A child starting with `/` is absolute and ignores `base`. `..` at the root
/// stays at the root.
pub fn normalize(base: &str, child: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    let start = if child.starts_with('/') { "" } else { base };
    for segment in split(start).chain(split(child)) {
        match segment {
            "." => {}
            ".." => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out.join("/")
}

/// Non-empty segments of a slash-separated path.
pub fn split(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

/// Absolute paths of every ancestor of `absolute`, nearest first, ending at the root.
pub fn ancestors(absolute: &str) -> Vec<String> {
    let segments: Vec<&str> = split(absolute).collect();
    (0..segments.len())
        .rev()
        .map(|len| segments[..len].join("/"))
        .collect()
}

/// Last segment of an absolute path (empty for the root).
pub fn basename(absolute: &str) -> &str {
    split(absolute).last().unwrap_or("")
}
