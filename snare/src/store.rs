// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gustavo Noronha Silva <gustavo@noronha.dev.br>

use std::collections::BTreeMap;

use log::trace;

use crate::error::{ConfigError, Result};

/// The maps the tracer reads its configuration from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MapName {
    UprobePointArgs,
    SyscallPointArgs,
    CommonFilter,
    SyscallFilter,
    Config,
    RevFilter,
    ThreadFilter,
}

impl MapName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MapName::UprobePointArgs => "uprobe_point_args_map",
            MapName::SyscallPointArgs => "syscall_point_args_map",
            MapName::CommonFilter => "common_filter",
            MapName::SyscallFilter => "syscall_filter",
            MapName::Config => "config_map",
            MapName::RevFilter => "rev_filter",
            MapName::ThreadFilter => "thread_filter",
        }
    }
}

/// Key/value sink the compiled records are handed to.
///
/// Each update is expected to be atomic. Failures are passed back to the caller untouched.
pub trait RecordStore {
    fn update(&mut self, map: MapName, key: &[u8], value: &[u8]) -> anyhow::Result<()>;

    fn lookup(&self, map: MapName, key: &[u8]) -> Option<Vec<u8>>;
}

/// In-process store, used for dumping the compiled configuration and in tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    maps: BTreeMap<MapName, BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self, map: MapName) -> usize {
        self.maps.get(&map).map_or(0, |entries| entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.maps.values().all(|entries| entries.is_empty())
    }

    /// All records, ordered by map and then by key bytes.
    pub fn iter(&self) -> impl Iterator<Item = (MapName, &[u8], &[u8])> {
        self.maps.iter().flat_map(|(&map, entries)| {
            entries
                .iter()
                .map(move |(key, value)| (map, key.as_slice(), value.as_slice()))
        })
    }
}

impl RecordStore for MemoryStore {
    fn update(&mut self, map: MapName, key: &[u8], value: &[u8]) -> anyhow::Result<()> {
        self.maps
            .entry(map)
            .or_default()
            .insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn lookup(&self, map: MapName, key: &[u8]) -> Option<Vec<u8>> {
        self.maps.get(&map)?.get(key).cloned()
    }
}

pub(crate) fn put<S: RecordStore + ?Sized>(
    store: &mut S,
    map: MapName,
    key: &[u8],
    value: &[u8],
) -> Result<()> {
    trace!(
        "{}: update key of {} bytes with {} bytes",
        map.as_str(),
        key.len(),
        value.len()
    );

    store
        .update(map, key, value)
        .map_err(|source| ConfigError::Store {
            map: map.as_str(),
            source,
        })
}
