// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Open dataset sessions and lazily materializing tree navigation.
// Author: Lukas Bower

//! Lazy tree navigation.
//!
//! A [`Dataset`] owns one open session over a cache directory. Handles
//! ([`Group`], [`Leaf`]) are `(session, absolute path)` pairs; they hold no
//! container state of their own. When a child lookup misses, the shard that
//! owns the requested path is materialized through the [`ShardFetcher`] and
//! the lookup is retried exactly once.
//!
//! Closing the session invalidates every handle: navigation and reads fail
//! with [`Error::ClosedSession`]. Values copied out with [`Leaf::read`] stay
//! valid after close and are the intended way to keep data around.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use log::{debug, info};

use crate::config::HawkConfig;
use crate::container::{AttrValue, Attributes, Blob, Entry, GroupRecord, LeafRecord, Series};
use crate::error::{Error, Result};
use crate::fetch::{blob_name, ShardFetcher};
use crate::lut::LookupTable;
use crate::path::{self, PathResolver};
use crate::transport::{HttpTransport, Transport};

// Bounds chains of external links so a cyclic link cannot recurse forever.
const MAX_LINK_HOPS: usize = 16;

/// Resolved position inside a blob.
pub(crate) enum Target<'a> {
    Group(&'a GroupRecord),
    Leaf(&'a LeafRecord),
}

enum Walk<R> {
    Found(R),
    Missing,
    NotAGroup,
}

/// What a node turned out to be after a successful lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeKind {
    Group,
    Leaf,
}

/// Classification of a child slot that never triggers a fetch.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ChildInfo {
    Group,
    Leaf {
        measurement: Option<String>,
        units: Option<String>,
        shape: Vec<usize>,
    },
    Undownloaded,
    /// Link whose blob is on disk but does not contain the linked path.
    Dangling,
}

pub(crate) struct Session {
    cache_dir: PathBuf,
    header: String,
    resolver: PathResolver,
    fetcher: ShardFetcher,
    blobs: Mutex<HashMap<String, Arc<Blob>>>,
    open: AtomicBool,
}

impl Session {
    pub(crate) fn check_open(&self) -> Result<()> {
        if self.open.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(Error::ClosedSession)
        }
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    fn close(&self) {
        if self.open.swap(false, Ordering::AcqRel) {
            if let Ok(mut blobs) = self.blobs.lock() {
                blobs.clear();
            }
            debug!("closed dataset at {}", self.cache_dir.display());
        }
    }

    /// Decoded blob `name`, or `None` when it is not on disk yet.
    fn load_blob(&self, name: &str) -> Result<Option<Arc<Blob>>> {
        self.check_open()?;
        if let Some(blob) = self
            .blobs
            .lock()
            .map_err(|_| Error::LockPoisoned)?
            .get(name)
        {
            return Ok(Some(Arc::clone(blob)));
        }
        let path = self.cache_dir.join(name);
        if !path.is_file() {
            return Ok(None);
        }
        let blob = Arc::new(Blob::read(&path).map_err(|source| Error::Container {
            blob: name.to_owned(),
            source,
        })?);
        self.blobs
            .lock()
            .map_err(|_| Error::LockPoisoned)?
            .insert(name.to_owned(), Arc::clone(&blob));
        Ok(Some(blob))
    }

    fn visit<R, F>(&self, absolute: &str, visit: F) -> Result<Walk<R>>
    where
        F: FnOnce(Target<'_>) -> R,
    {
        let header = self
            .load_blob(&self.header)?
            .ok_or_else(|| Error::NotFound(String::new()))?;
        let segments: Vec<&str> = path::split(absolute).collect();
        self.walk(&header.root, &segments, 0, visit)
    }

    fn walk<R, F>(
        &self,
        group: &GroupRecord,
        segments: &[&str],
        hops: usize,
        visit: F,
    ) -> Result<Walk<R>>
    where
        F: FnOnce(Target<'_>) -> R,
    {
        let Some((first, rest)) = segments.split_first() else {
            return Ok(Walk::Found(visit(Target::Group(group))));
        };
        let Some(entry) = group.children.get(*first) else {
            return Ok(Walk::Missing);
        };
        match entry {
            Entry::Group(child) => self.walk(child, rest, hops, visit),
            Entry::Leaf(leaf) if rest.is_empty() => Ok(Walk::Found(visit(Target::Leaf(leaf)))),
            Entry::Leaf(_) => Ok(Walk::NotAGroup),
            Entry::External(link) => {
                if hops >= MAX_LINK_HOPS {
                    return Ok(Walk::Missing);
                }
                let Some(blob) = self.load_blob(&link.blob)? else {
                    return Ok(Walk::Missing);
                };
                let target: Vec<&str> = path::split(&link.path)
                    .chain(rest.iter().copied())
                    .collect();
                self.walk(&blob.root, &target, hops + 1, visit)
            }
        }
    }

    /// Native lookup: `None` when the node is not materialized.
    pub(crate) fn lookup(&self, absolute: &str) -> Result<Option<NodeKind>> {
        let walk = self.visit(absolute, |target| match target {
            Target::Group(_) => NodeKind::Group,
            Target::Leaf(_) => NodeKind::Leaf,
        })?;
        match walk {
            Walk::Found(kind) => Ok(Some(kind)),
            Walk::Missing => Ok(None),
            Walk::NotAGroup => Err(Error::NotAGroup(absolute.to_owned())),
        }
    }

    fn require<R, F>(&self, absolute: &str, visit: F) -> Result<R>
    where
        F: FnOnce(Target<'_>) -> R,
    {
        match self.visit(absolute, visit)? {
            Walk::Found(value) => Ok(value),
            Walk::Missing => Err(Error::NotFound(absolute.to_owned())),
            Walk::NotAGroup => Err(Error::NotAGroup(absolute.to_owned())),
        }
    }

    /// Own attributes of a materialized node.
    pub(crate) fn attrs(&self, absolute: &str) -> Result<Attributes> {
        self.require(absolute, |target| match target {
            Target::Group(group) => group.attrs.clone(),
            Target::Leaf(leaf) => leaf.attrs.clone(),
        })
    }

    fn series(&self, absolute: &str) -> Result<Series> {
        self.require(absolute, |target| match target {
            Target::Leaf(leaf) => Some(leaf.series.clone()),
            Target::Group(_) => None,
        })?
        .ok_or_else(|| Error::NotALeaf(absolute.to_owned()))
    }

    fn shape(&self, absolute: &str) -> Result<Vec<usize>> {
        self.require(absolute, |target| match target {
            Target::Leaf(leaf) => Some(leaf.series.shape().to_vec()),
            Target::Group(_) => None,
        })?
        .ok_or_else(|| Error::NotALeaf(absolute.to_owned()))
    }

    /// Children of the group at `absolute`, classified without fetching.
    pub(crate) fn children(&self, absolute: &str) -> Result<Vec<(String, ChildInfo)>> {
        let entries = self.require(absolute, |target| match target {
            Target::Group(group) => Some(
                group
                    .children
                    .iter()
                    .map(|(name, entry)| -> Result<(String, ChildInfo)> {
                        Ok((name.clone(), self.classify(entry)?))
                    })
                    .collect::<Result<Vec<_>>>(),
            ),
            Target::Leaf(_) => None,
        })?;
        entries.ok_or_else(|| Error::NotAGroup(absolute.to_owned()))?
    }

    fn classify(&self, entry: &Entry) -> Result<ChildInfo> {
        match entry {
            Entry::Group(_) => Ok(ChildInfo::Group),
            Entry::Leaf(leaf) => Ok(leaf_info(leaf)),
            Entry::External(link) => {
                let Some(blob) = self.load_blob(&link.blob)? else {
                    return Ok(ChildInfo::Undownloaded);
                };
                let segments: Vec<&str> = path::split(&link.path).collect();
                let walk = self.walk(&blob.root, &segments, 1, |target| match target {
                    Target::Group(_) => ChildInfo::Group,
                    Target::Leaf(leaf) => leaf_info(leaf),
                })?;
                match walk {
                    Walk::Found(info) => Ok(info),
                    Walk::Missing | Walk::NotAGroup => {
                        debug!(
                            "link into {} is dangling: {:?} not present in the blob",
                            link.blob, link.path
                        );
                        Ok(ChildInfo::Dangling)
                    }
                }
            }
        }
    }
}

fn leaf_info(leaf: &LeafRecord) -> ChildInfo {
    let text = |key: &str| leaf.attrs.get(key).map(AttrValue::to_string);
    ChildInfo::Leaf {
        measurement: text("measurement"),
        units: text("units"),
        shape: leaf.series.shape().to_vec(),
    }
}

/// An open, lazily materialized dataset rooted at its header blob.
///
/// Dropping the dataset closes it.
pub struct Dataset {
    session: Arc<Session>,
}

impl Dataset {
    /// Open the dataset described by `config`, downloading its header if needed.
    pub fn open(config: &HawkConfig) -> Result<Self> {
        let table = LookupTable::from_path(&config.lookup_table)?;
        Self::open_with(config, table, Arc::new(HttpTransport::new()))
    }

    /// Open with an explicit lookup table and transport.
    pub fn open_with(
        config: &HawkConfig,
        table: LookupTable,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let cache_dir = config.data_dir.clone();
        fs::create_dir_all(&cache_dir).map_err(|source| Error::Io {
            path: cache_dir.clone(),
            source,
        })?;
        let fetcher = ShardFetcher::new(Arc::new(table), transport, config.remote.clone());
        fetcher
            .ensure(&config.header_key, &cache_dir)
            .map_err(Error::Open)?;
        let session = Arc::new(Session {
            cache_dir,
            header: blob_name(&config.header_key),
            resolver: PathResolver::new(config.shard_key.clone()),
            fetcher,
            blobs: Mutex::new(HashMap::new()),
            open: AtomicBool::new(true),
        });
        // Decode the header up front so a corrupt header fails at open.
        session.load_blob(&session.header)?;
        info!("opened dataset at {}", session.cache_dir.display());
        Ok(Self { session })
    }

    /// Root group (absolute path `""`).
    pub fn root(&self) -> Group {
        Group {
            session: Arc::clone(&self.session),
            path: String::new(),
        }
    }

    /// Navigate from the root, materializing shards as needed.
    pub fn get(&self, path: &str) -> Result<Node> {
        self.root().get(path)
    }

    /// Navigate to a group from the root.
    pub fn group(&self, path: &str) -> Result<Group> {
        self.root().group(path)
    }

    /// Navigate to a leaf from the root.
    pub fn leaf(&self, path: &str) -> Result<Leaf> {
        self.root().leaf(path)
    }

    /// Cache directory this dataset was opened against.
    pub fn cache_dir(&self) -> &Path {
        &self.session.cache_dir
    }

    /// Shard fetcher backing navigation.
    pub fn fetcher(&self) -> &ShardFetcher {
        &self.session.fetcher
    }

    /// Whether the session is still open.
    pub fn is_open(&self) -> bool {
        self.session.is_open()
    }

    /// Close the session; every handle obtained from it becomes unusable.
    pub fn close(&self) {
        self.session.close();
    }
}

impl Drop for Dataset {
    fn drop(&mut self) {
        self.session.close();
    }
}

impl fmt::Debug for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dataset")
            .field("cache_dir", &self.session.cache_dir)
            .field("open", &self.session.is_open())
            .finish()
    }
}

/// A group or a leaf.
#[derive(Clone, Debug)]
pub enum Node {
    /// Navigable group.
    Group(Group),
    /// Measurement series.
    Leaf(Leaf),
}

impl Node {
    fn new(session: Arc<Session>, path: String, kind: NodeKind) -> Self {
        match kind {
            NodeKind::Group => Node::Group(Group { session, path }),
            NodeKind::Leaf => Node::Leaf(Leaf { session, path }),
        }
    }

    /// Absolute path of the node.
    pub fn path(&self) -> &str {
        match self {
            Node::Group(group) => group.path(),
            Node::Leaf(leaf) => leaf.path(),
        }
    }

    /// Cache directory of the owning session, `None` once it is closed.
    pub fn cache_dir(&self) -> Option<PathBuf> {
        match self {
            Node::Group(group) => group.cache_dir(),
            Node::Leaf(leaf) => leaf.cache_dir(),
        }
    }

    /// Own attributes of the node.
    pub fn attrs(&self) -> Result<Attributes> {
        match self {
            Node::Group(group) => group.attrs(),
            Node::Leaf(leaf) => leaf.attrs(),
        }
    }

    /// The node as a group.
    pub fn into_group(self) -> Result<Group> {
        match self {
            Node::Group(group) => Ok(group),
            Node::Leaf(leaf) => Err(Error::NotAGroup(leaf.path)),
        }
    }

    /// The node as a leaf.
    pub fn into_leaf(self) -> Result<Leaf> {
        match self {
            Node::Leaf(leaf) => Ok(leaf),
            Node::Group(group) => Err(Error::NotALeaf(group.path)),
        }
    }
}

/// Handle to a group in an open dataset.
#[derive(Clone)]
pub struct Group {
    session: Arc<Session>,
    path: String,
}

impl Group {
    pub(crate) fn session(&self) -> &Session {
        &self.session
    }

    /// Absolute path (`""` for the root).
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Last path segment (`""` for the root).
    pub fn name(&self) -> &str {
        path::basename(&self.path)
    }

    /// Whether this is the dataset root.
    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// Cache directory of the owning session, `None` once it is closed.
    pub fn cache_dir(&self) -> Option<PathBuf> {
        self.session
            .is_open()
            .then(|| self.session.cache_dir.clone())
    }

    /// Enclosing group, `None` at the root.
    pub fn parent(&self) -> Option<Group> {
        path::ancestors(&self.path).into_iter().next().map(|path| Group {
            session: Arc::clone(&self.session),
            path,
        })
    }

    /// Look up `name` (relative, or absolute with a leading `/`).
    ///
    /// On a miss the owning shard is materialized and the lookup retried once.
    pub fn get(&self, name: &str) -> Result<Node> {
        self.session.check_open()?;
        let (absolute, key) = self.session.resolver.resolve(&self.path, name);
        if let Some(kind) = self.session.lookup(&absolute)? {
            return Ok(Node::new(Arc::clone(&self.session), absolute, kind));
        }
        debug!("{absolute:?} not materialized, ensuring shard {key:?}");
        self.session
            .fetcher
            .ensure(&key, &self.session.cache_dir)
            .map_err(|source| Error::Fetch {
                path: absolute.clone(),
                source,
            })?;
        match self.session.lookup(&absolute)? {
            Some(kind) => Ok(Node::new(Arc::clone(&self.session), absolute, kind)),
            None => Err(Error::MissingAfterFetch {
                path: absolute,
                key,
            }),
        }
    }

    /// [`Group::get`] requiring a group.
    pub fn group(&self, name: &str) -> Result<Group> {
        self.get(name)?.into_group()
    }

    /// [`Group::get`] requiring a leaf.
    pub fn leaf(&self, name: &str) -> Result<Leaf> {
        self.get(name)?.into_leaf()
    }

    /// Child names in native order, without fetching.
    pub fn keys(&self) -> Result<Vec<String>> {
        Ok(self
            .session
            .children(&self.path)?
            .into_iter()
            .map(|(name, _)| name)
            .collect())
    }

    /// Own attributes.
    pub fn attrs(&self) -> Result<Attributes> {
        self.session.attrs(&self.path)
    }
}

impl fmt::Debug for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group").field("path", &self.path).finish()
    }
}

/// Handle to a measurement series in an open dataset.
#[derive(Clone)]
pub struct Leaf {
    session: Arc<Session>,
    path: String,
}

impl Leaf {
    pub(crate) fn session(&self) -> &Session {
        &self.session
    }

    /// Absolute path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Last path segment.
    pub fn name(&self) -> &str {
        path::basename(&self.path)
    }

    /// Cache directory of the owning session, `None` once it is closed.
    pub fn cache_dir(&self) -> Option<PathBuf> {
        self.session
            .is_open()
            .then(|| self.session.cache_dir.clone())
    }

    /// Enclosing group.
    pub fn parent(&self) -> Group {
        Group {
            session: Arc::clone(&self.session),
            path: path::ancestors(&self.path)
                .into_iter()
                .next()
                .unwrap_or_default(),
        }
    }

    /// Own attributes.
    pub fn attrs(&self) -> Result<Attributes> {
        self.session.attrs(&self.path)
    }

    /// Copy the full series out of the container.
    pub fn read(&self) -> Result<Series> {
        self.session.series(&self.path)
    }

    /// Shape of the stored series.
    pub fn shape(&self) -> Result<Vec<usize>> {
        self.session.shape(&self.path)
    }

    /// The `measurement` attribute, if present.
    pub fn measurement(&self) -> Result<Option<String>> {
        Ok(self.attrs()?.get("measurement").map(AttrValue::to_string))
    }

    /// The `units` attribute, if present.
    pub fn units(&self) -> Result<Option<String>> {
        Ok(self.attrs()?.get("units").map(AttrValue::to_string))
    }
}

impl fmt::Debug for Leaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Leaf").field("path", &self.path).finish()
    }
}
