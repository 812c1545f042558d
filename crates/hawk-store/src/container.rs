// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: MessagePack hierarchical container holding one sub-tree per blob.
// Author: Lukas Bower

//! Hierarchical container blobs.
//!
//! A blob is a root [`GroupRecord`]. Groups own named children; leaves own a
//! [`Series`] and attributes; [`ExternalLink`]s point into another blob in the
//! same cache directory and only resolve once that blob has been materialized.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ContainerError;

/// Scalar or string attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    /// Integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// Text value.
    Text(String),
}

impl AttrValue {
    /// Text content, if this is a text attribute.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

/// Attribute mapping attached to groups and leaves.
pub type Attributes = BTreeMap<String, AttrValue>;

/// Fixed-shape numeric series stored row-major.
///
/// Shape is `(samples,)` or `(samples, repeats)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    shape: Vec<usize>,
    values: Vec<f64>,
}

impl Series {
    /// Series with an explicit shape; the value count must match.
    pub fn new(shape: Vec<usize>, values: Vec<f64>) -> Result<Self, ContainerError> {
        let series = Self { shape, values };
        series.check()?;
        Ok(series)
    }

    /// One-dimensional series.
    pub fn from_vec(values: Vec<f64>) -> Self {
        Self {
            shape: vec![values.len()],
            values,
        }
    }

    fn check(&self) -> Result<(), ContainerError> {
        let count = self
            .shape
            .iter()
            .try_fold(1usize, |acc, dim| acc.checked_mul(*dim));
        if count != Some(self.values.len()) {
            return Err(ContainerError::Shape {
                shape: self.shape.clone(),
                len: self.values.len(),
            });
        }
        Ok(())
    }

    /// Declared shape.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Row-major values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Consume the series, returning its values.
    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    /// Total number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the series holds no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Length of the first axis.
    pub fn samples(&self) -> usize {
        self.shape.first().copied().unwrap_or(0)
    }

    /// Product of the trailing axes (1 for a 1-D series).
    pub fn repeats(&self) -> usize {
        self.shape.iter().skip(1).product()
    }

    /// Value at `(sample, repeat)`.
    pub fn get(&self, sample: usize, repeat: usize) -> Option<f64> {
        let repeats = self.repeats();
        if sample >= self.samples() || repeat >= repeats {
            return None;
        }
        self.values.get(sample * repeats + repeat).copied()
    }
}

/// Named group of child entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupRecord {
    /// Group attributes.
    pub attrs: Attributes,
    /// Children in name order.
    pub children: BTreeMap<String, Entry>,
}

impl GroupRecord {
    /// Empty group.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attribute.
    #[must_use]
    pub fn with_attr(mut self, key: &str, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(key.to_owned(), value.into());
        self
    }

    /// Add a child entry.
    #[must_use]
    pub fn with_child(mut self, name: &str, entry: impl Into<Entry>) -> Self {
        self.insert(name, entry);
        self
    }

    /// Insert or replace a child entry.
    pub fn insert(&mut self, name: &str, entry: impl Into<Entry>) {
        self.children.insert(name.to_owned(), entry.into());
    }

    fn check(&self) -> Result<(), ContainerError> {
        for child in self.children.values() {
            match child {
                Entry::Group(group) => group.check()?,
                Entry::Leaf(leaf) => leaf.series.check()?,
                Entry::External(_) => {}
            }
        }
        Ok(())
    }
}

/// Measurement series with attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeafRecord {
    /// Leaf attributes (`measurement`, `units`, ...).
    pub attrs: Attributes,
    /// Stored values.
    pub series: Series,
}

impl LeafRecord {
    /// Leaf with no attributes.
    pub fn new(series: Series) -> Self {
        Self {
            attrs: Attributes::new(),
            series,
        }
    }

    /// Add an attribute.
    #[must_use]
    pub fn with_attr(mut self, key: &str, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(key.to_owned(), value.into());
        self
    }
}

/// Link to `path` inside the blob file `blob` of the same cache directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalLink {
    /// Target blob file name.
    pub blob: String,
    /// Path inside the target blob (empty for its root).
    pub path: String,
}

impl ExternalLink {
    /// Link to `path` inside `blob`.
    pub fn new(blob: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            blob: blob.into(),
            path: path.into(),
        }
    }
}

/// One child slot of a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Entry {
    /// Nested group.
    Group(GroupRecord),
    /// Leaf series.
    Leaf(LeafRecord),
    /// Reference into another blob.
    External(ExternalLink),
}

impl From<GroupRecord> for Entry {
    fn from(value: GroupRecord) -> Self {
        Self::Group(value)
    }
}

impl From<LeafRecord> for Entry {
    fn from(value: LeafRecord) -> Self {
        Self::Leaf(value)
    }
}

impl From<ExternalLink> for Entry {
    fn from(value: ExternalLink) -> Self {
        Self::External(value)
    }
}

/// A complete container file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Blob {
    /// Root group of the blob.
    pub root: GroupRecord,
}

impl Blob {
    /// Blob rooted at `root`.
    pub fn new(root: GroupRecord) -> Self {
        Self { root }
    }

    /// Decode a blob, rejecting series whose shape and length disagree.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ContainerError> {
        let blob: Blob = rmp_serde::from_slice(bytes)?;
        blob.root.check()?;
        Ok(blob)
    }

    /// Encode the blob.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ContainerError> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    /// Read and decode the blob at `path`.
    pub fn read(path: &Path) -> Result<Self, ContainerError> {
        let bytes = fs::read(path).map_err(|source| ContainerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(&bytes)
    }

    /// Write the blob to `path` through a sibling staging file.
    pub fn write(&self, path: &Path) -> Result<(), ContainerError> {
        let bytes = self.to_bytes()?;
        let staging = path.with_extension("tmp");
        let io_err = |source| ContainerError::Io {
            path: path.to_path_buf(),
            source,
        };
        fs::write(&staging, &bytes).map_err(io_err)?;
        fs::rename(&staging, path).map_err(io_err)?;
        Ok(())
    }
}
