// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Shared fixtures for hawk-store integration tests.
// Author: Lukas Bower
#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use hawk_store::{
    Blob, Dataset, ExternalLink, GroupRecord, HawkConfig, LeafRecord, LookupTable, LutEntry,
    Series, Transport, TransportError,
};
use md5::{Digest, Md5};
use tempfile::TempDir;

/// In-memory remote that counts every request.
#[derive(Default)]
pub struct MemoryTransport {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    calls: AtomicUsize,
}

impl MemoryTransport {
    pub fn serve(&self, locator: &str, bytes: Vec<u8>) {
        self.objects
            .lock()
            .unwrap()
            .insert(locator.to_string(), bytes);
    }

    pub fn withdraw(&self, locator: &str) {
        self.objects.lock().unwrap().remove(locator);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Transport for MemoryTransport {
    fn fetch(&self, locator: &str, sink: &mut dyn Write) -> Result<u64, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let bytes = self
            .objects
            .lock()
            .unwrap()
            .get(locator)
            .cloned()
            .ok_or(TransportError::Status { code: 404 })?;
        sink.write_all(&bytes)?;
        Ok(bytes.len() as u64)
    }
}

pub fn md5_hex(bytes: &[u8]) -> String {
    format!("{:x}", Md5::digest(bytes))
}

pub fn locator(key: &str) -> String {
    format!("mem://{key}")
}

pub const ROOT_DOC: &str = "Hawk wing vibration test campaign";

fn leaf(values: Vec<f64>, measurement: &str, units: &str) -> LeafRecord {
    LeafRecord::new(Series::from_vec(values))
        .with_attr("measurement", measurement)
        .with_attr("units", units)
}

pub fn header() -> Blob {
    Blob::new(
        GroupRecord::new()
            .with_attr("description", ROOT_DOC)
            .with_attr("window", "hanning")
            .with_child(
                "LMS",
                GroupRecord::new()
                    .with_attr("system", "LMS SCADAS")
                    .with_attr("sample_rate", 2048_i64)
                    .with_child(
                        "xData",
                        GroupRecord::new().with_child(
                            "freq",
                            leaf(vec![0.0, 0.5, 1.0, 1.5], "frequency", "Hz"),
                        ),
                    )
                    .with_child(
                        "BR_AR",
                        GroupRecord::new()
                            .with_attr("excitation", "burst random")
                            .with_child("01", ExternalLink::new("BR_AR_01.msgpack", ""))
                            .with_child("02", ExternalLink::new("BR_AR_02.msgpack", "")),
                    ),
            ),
    )
}

pub fn repeat_shard(repeat: i64, offset: f64) -> Blob {
    let sensor = |shift: f64| {
        GroupRecord::new()
            .with_attr("position", "leading edge")
            .with_child(
                "frf",
                leaf(
                    (0..4).map(|i| offset + shift + i as f64).collect(),
                    "frequencyResponseFunction",
                    "(m/s^2)/N",
                )
                .with_attr("window", "none"),
            )
            .with_child("coh", leaf(vec![0.9, 0.8, 0.7], "coherence", "-"))
    };
    Blob::new(
        GroupRecord::new()
            .with_attr("repeat_index", repeat)
            .with_child("LLC-01", sensor(0.0))
            .with_child("LLC-02", sensor(100.0)),
    )
}

pub struct Fixture {
    pub dir: TempDir,
    pub transport: Arc<MemoryTransport>,
    pub table: LookupTable,
    pub config: HawkConfig,
}

impl Fixture {
    pub fn open(&self) -> Dataset {
        Dataset::open_with(&self.config, self.table.clone(), self.transport.clone())
            .expect("open dataset")
    }
}

/// Serve `blobs` under `mem://<key>` and build a table recording their digests.
pub fn publish(transport: &MemoryTransport, blobs: Vec<(&str, Blob)>) -> LookupTable {
    let mut entries = BTreeMap::new();
    for (key, blob) in blobs {
        let bytes = blob.to_bytes().expect("encode blob");
        entries.insert(
            key.to_string(),
            LutEntry {
                id: None,
                url: Some(locator(key)),
                md5: md5_hex(&bytes),
            },
        );
        transport.serve(&locator(key), bytes);
    }
    LookupTable::from_entries(entries).expect("table")
}

pub fn fixture() -> Fixture {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = TempDir::new().expect("tempdir");
    let transport = Arc::new(MemoryTransport::default());
    let table = publish(
        &transport,
        vec![
            ("SBW_header", header()),
            ("BR_AR_01", repeat_shard(1, 0.0)),
            ("BR_AR_02", repeat_shard(2, 10.0)),
        ],
    );
    let config = HawkConfig::default().with_data_dir(dir.path().join("hawk_data"));
    Fixture {
        dir,
        transport,
        table,
        config,
    }
}
