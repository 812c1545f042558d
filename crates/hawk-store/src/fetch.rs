// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Materialize and verify shard blobs in the local cache directory.
// Author: Lukas Bower

//! Shard fetcher.
//!
//! A blob that already exists under the cache directory is trusted without
//! re-verification. Missing blobs are downloaded to a staging file, digested
//! and renamed into place only when the digest matches the lookup table, so a
//! failed download never leaves a blob that a later call would trust.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info};
use md5::{Digest, Md5};

use crate::config::RemoteConfig;
use crate::error::FetchError;
use crate::lut::LookupTable;
use crate::transport::Transport;

/// File extension of cached blobs.
pub const BLOB_EXTENSION: &str = "msgpack";
const STAGING_SUFFIX: &str = "part";

/// File name of the blob holding shard `key`.
pub fn blob_name(key: &str) -> String {
    format!("{key}.{BLOB_EXTENSION}")
}

/// Lowercase hex md5 of the file at `path`.
pub fn file_digest(path: &Path) -> Result<String, FetchError> {
    let io_err = |source| FetchError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::open(path).map_err(io_err)?;
    let mut hasher = Md5::new();
    io::copy(&mut file, &mut hasher).map_err(io_err)?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Ensures shard blobs exist locally and match their recorded digests.
#[derive(Clone)]
pub struct ShardFetcher {
    table: Arc<LookupTable>,
    transport: Arc<dyn Transport>,
    remote: RemoteConfig,
}

impl ShardFetcher {
    /// Fetcher resolving keys through `table` and downloading over `transport`.
    pub fn new(table: Arc<LookupTable>, transport: Arc<dyn Transport>, remote: RemoteConfig) -> Self {
        Self {
            table,
            transport,
            remote,
        }
    }

    /// Lookup table backing this fetcher.
    pub fn table(&self) -> &LookupTable {
        &self.table
    }

    /// Where the blob for `key` lives under `cache_dir`.
    pub fn blob_path(&self, key: &str, cache_dir: &Path) -> PathBuf {
        cache_dir.join(blob_name(key))
    }

    /// Whether the blob for `key` is already on disk.
    pub fn is_materialized(&self, key: &str, cache_dir: &Path) -> bool {
        self.blob_path(key, cache_dir).is_file()
    }

    /// Make sure the blob for `key` exists under `cache_dir`.
    ///
    /// Existing blobs succeed immediately without network access. Otherwise the
    /// shard is downloaded once and published only if its md5 matches.
    pub fn ensure(&self, key: &str, cache_dir: &Path) -> Result<PathBuf, FetchError> {
        let target = self.blob_path(key, cache_dir);
        if target.is_file() {
            debug!("shard {key} already materialized at {}", target.display());
            return Ok(target);
        }
        let entry = self.table.get(key).ok_or_else(|| FetchError::UnknownShard {
            key: key.to_owned(),
        })?;
        let locator = entry.locator(&self.remote);
        let expected = entry.expected_digest();

        fs::create_dir_all(cache_dir).map_err(|source| FetchError::Io {
            path: cache_dir.to_path_buf(),
            source,
        })?;
        let staging = target.with_extension(format!("{BLOB_EXTENSION}.{STAGING_SUFFIX}"));

        info!("downloading shard {key} into {}", cache_dir.display());
        if let Err(err) = self.download(key, &locator, &staging) {
            let _ = fs::remove_file(&staging);
            return Err(err);
        }

        let actual = match file_digest(&staging) {
            Ok(actual) if actual == expected => actual,
            Ok(actual) => {
                let _ = fs::remove_file(&staging);
                return Err(FetchError::IntegrityMismatch {
                    key: key.to_owned(),
                    expected,
                    actual,
                });
            }
            Err(err) => {
                let _ = fs::remove_file(&staging);
                return Err(err);
            }
        };
        debug!("shard {key} digest {actual} verified");
        fs::rename(&staging, &target).map_err(|source| FetchError::Io {
            path: target.clone(),
            source,
        })?;
        info!("shard {key} done");
        Ok(target)
    }

    /// Re-digest an existing blob against the lookup table.
    ///
    /// Never called implicitly; a mismatch leaves the blob in place and the
    /// caller decides whether to delete and refetch it.
    pub fn verify(&self, key: &str, cache_dir: &Path) -> Result<(), FetchError> {
        let entry = self.table.get(key).ok_or_else(|| FetchError::UnknownShard {
            key: key.to_owned(),
        })?;
        let expected = entry.expected_digest();
        let actual = file_digest(&self.blob_path(key, cache_dir))?;
        if actual != expected {
            return Err(FetchError::IntegrityMismatch {
                key: key.to_owned(),
                expected,
                actual,
            });
        }
        Ok(())
    }

    fn download(&self, key: &str, locator: &str, staging: &Path) -> Result<(), FetchError> {
        let io_err = |source| FetchError::Io {
            path: staging.to_path_buf(),
            source,
        };
        let file = File::create(staging).map_err(io_err)?;
        let mut sink = BufWriter::new(file);
        let written = self
            .transport
            .fetch(locator, &mut sink)
            .map_err(|source| FetchError::Transport {
                key: key.to_owned(),
                locator: locator.to_owned(),
                source,
            })?;
        sink.flush().map_err(io_err)?;
        sink.get_ref().sync_all().map_err(io_err)?;
        debug!("shard {key}: {written} bytes from {locator}");
        Ok(())
    }
}
