// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Error taxonomy for shard materialization and tree navigation.
// Author: Lukas Bower

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures raised by a [`crate::transport::Transport`].
#[derive(Debug, Error)]
pub enum TransportError {
    /// The remote answered with a non-success HTTP status.
    #[error("remote returned status {code}")]
    Status {
        /// HTTP status code.
        code: u16,
    },
    /// The request never produced a response (DNS, connect, TLS).
    #[error("connection failed: {0}")]
    Connection(String),
    /// The response body could not be streamed to the sink.
    #[error("transfer interrupted: {0}")]
    Io(#[from] io::Error),
}

/// Failures raised while materializing a shard into the cache directory.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The shard key has no lookup table entry.
    #[error("unknown shard {key:?}")]
    UnknownShard {
        /// Shard key that was requested.
        key: String,
    },
    /// The download itself failed.
    #[error("download of shard {key:?} from {locator} failed: {source}")]
    Transport {
        /// Shard key being fetched.
        key: String,
        /// Remote locator the download was attempted from.
        locator: String,
        /// Underlying transport failure.
        #[source]
        source: TransportError,
    },
    /// The downloaded (or re-verified) blob does not match the recorded digest.
    #[error("md5 mismatch for shard {key:?} (expected {expected}, got {actual}); check network connection and attempt redownload")]
    IntegrityMismatch {
        /// Shard key being verified.
        key: String,
        /// Digest recorded in the lookup table.
        expected: String,
        /// Digest computed from the bytes on disk.
        actual: String,
    },
    /// Local filesystem failure while staging or publishing a blob.
    #[error("cache io on {}: {source}", .path.display())]
    Io {
        /// Path being read or written.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
}

/// Failures loading the lookup table.
#[derive(Debug, Error)]
pub enum TableError {
    /// The table file could not be read.
    #[error("read lookup table {}: {source}", .path.display())]
    Read {
        /// Table path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// The table is not valid JSON of the expected shape.
    #[error("parse lookup table: {0}")]
    Parse(#[from] serde_json::Error),
    /// An entry carries neither a url nor a remote id.
    #[error("lookup table entry {0:?} has neither url nor id")]
    MissingLocator(String),
}

/// Failures decoding or encoding a container blob.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// The blob could not be read or written.
    #[error("blob io on {}: {source}", .path.display())]
    Io {
        /// Blob path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// The blob bytes are not a valid container document.
    #[error("decode blob: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
    /// The in-memory tree could not be serialized.
    #[error("encode blob: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    /// A series buffer disagrees with its declared shape.
    #[error("series of {len} values does not fit shape {shape:?}")]
    Shape {
        /// Declared shape.
        shape: Vec<usize>,
        /// Number of values provided.
        len: usize,
    },
}

/// Failures loading [`crate::config::HawkConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("read config {}: {source}", .path.display())]
    Read {
        /// Config path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// The config file is not valid TOML of the expected shape.
    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Errors surfaced by navigation, description and slicing.
#[derive(Debug, Error)]
pub enum Error {
    /// The node was missing and materializing its shard failed.
    #[error("{path:?} not found and its shard could not be materialized")]
    Fetch {
        /// Absolute path that was requested.
        path: String,
        /// Why the shard fetch failed.
        #[source]
        source: FetchError,
    },
    /// The shard was materialized but still does not contain the node.
    #[error("{path:?} still missing after materializing shard {key:?}; lookup table and data layout disagree")]
    MissingAfterFetch {
        /// Absolute path that was requested.
        path: String,
        /// Shard that was fetched.
        key: String,
    },
    /// An ancestor that must already be materialized is absent.
    #[error("{0:?} not found")]
    NotFound(String),
    /// A path segment passes through a leaf.
    #[error("{0:?} is not a group")]
    NotAGroup(String),
    /// A group was found where a leaf was required.
    #[error("{0:?} is not a leaf")]
    NotALeaf(String),
    /// The owning dataset has been closed.
    #[error("dataset session is closed")]
    ClosedSession,
    /// A cached blob could not be decoded.
    #[error("blob {blob:?}: {source}")]
    Container {
        /// Blob file name.
        blob: String,
        /// Decode failure.
        #[source]
        source: ContainerError,
    },
    /// Opening the dataset failed while materializing the header.
    #[error("open dataset: {0}")]
    Open(#[source] FetchError),
    /// The lookup table could not be loaded.
    #[error(transparent)]
    Table(#[from] TableError),
    /// Local filesystem failure outside the fetch path.
    #[error("io on {}: {source}", .path.display())]
    Io {
        /// Path involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// The session's blob cache lock was poisoned.
    #[error("blob cache lock poisoned")]
    LockPoisoned,
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;
