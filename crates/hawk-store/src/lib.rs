// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Lazily materialized access to the sharded hawk measurement dataset.
// Author: Lukas Bower
#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Lazily materialized, digest-verified access to a sharded hierarchical
//! dataset.
//!
//! Only a header blob is needed to open a [`Dataset`]. Navigating to a path
//! whose shard is not yet in the cache directory downloads that shard, checks
//! its md5 against the [`LookupTable`], and resumes the lookup.
//!
//! ```no_run
//! use hawk_store::{Dataset, HawkConfig};
//!
//! # fn main() -> hawk_store::Result<()> {
//! let data = Dataset::open(&HawkConfig::from_env())?;
//! let frf = data.leaf("LMS/BR_AR/01/LLC-01/frf")?;
//! let values = frf.read()?;
//! println!("{:?} {:?}", values.shape(), frf.describe()?);
//! data.close();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod container;
pub mod describe;
pub mod error;
pub mod explore;
pub mod fetch;
pub mod lut;
pub mod path;
pub mod slice;
pub mod transport;
mod tree;

pub use config::{HawkConfig, RemoteConfig};
pub use container::{AttrValue, Attributes, Blob, Entry, ExternalLink, GroupRecord, LeafRecord, Series};
pub use describe::{describe, Description};
pub use error::{ConfigError, ContainerError, Error, FetchError, Result, TableError, TransportError};
pub use explore::{explore, ExploreTree, Summary};
pub use fetch::ShardFetcher;
pub use lut::{LookupTable, LutEntry};
pub use path::{PathResolver, ShardKeyRule};
pub use slice::{slice, Slice};
pub use transport::{HttpTransport, Transport};
pub use tree::{Dataset, Group, Leaf, Node};
