// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gustavo Noronha Silva <gustavo@noronha.dev.br>

use log::{debug, info};
use snare_common::{
    CommonFilter, ConfigMap, RevFilterKey, ThreadFilterKey, FILTER_MODE_BLACKLIST,
    FILTER_MODE_UNKNOWN, FILTER_MODE_WHITELIST, FILTER_TAG_ALLOW, FILTER_TAG_DENY, MAGIC_PID,
    MAGIC_TID, MAGIC_UID, MAX_COUNT, REV_STRING_SIZE, THREAD_NAME_SIZE,
};

use crate::{
    error::{ConfigError, Result},
    hooks::UprobeConfig,
    store::{self, MapName, RecordStore},
    syscalls::{SyscallConfig, SyscallTable},
    wire::Encode as _,
};

/// Strings whose lookup gives away a rooted or instrumented device.
pub const REV_LIST: &[&str] = &[
    "/sbin/su",
    "/sbin/.magisk/",
    "/dev/.magisk",
    "/system/bin/magisk",
    "/system/bin/su",
    "/system/xbin/su",
    "/proc/mounts",
    "which su",
    "mount",
];

/// Busy threads that are never worth tracing.
pub const THREAD_BLACKLIST: &[&str] = &[
    "RenderThread",
    "FinalizerDaemon",
    "RxCachedThreadS",
    "mali-cmar-backe",
    "mali-utility-wo",
    "mali-mem-purge",
    "mali-hist-dump",
    "hwuiTask0",
    "hwuiTask1",
    "NDK MediaCodec_",
];

/// Fixed-capacity id list. Unused slots hold the sentinel and bit `i` of `mask` marks slot
/// `i` as used.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IdList {
    pub ids: [u32; MAX_COUNT],
    pub mask: u32,
    sentinel: u32,
}

impl IdList {
    pub fn empty(sentinel: u32) -> Self {
        IdList {
            ids: [sentinel; MAX_COUNT],
            mask: 0,
            sentinel,
        }
    }

    pub fn parse(spec: &str, sentinel: u32, what: &'static str) -> Result<Self> {
        let items: Vec<&str> = spec
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .collect();
        if items.len() > MAX_COUNT {
            return Err(ConfigError::CapacityExceeded {
                what,
                limit: MAX_COUNT,
                count: items.len(),
            });
        }

        let mut list = IdList::empty(sentinel);
        for (i, item) in items.into_iter().enumerate() {
            list.ids[i] = item
                .parse::<u32>()
                .map_err(|e| ConfigError::parse(spec, item, e))?;
            list.mask |= 1 << i;
        }

        Ok(list)
    }

    pub fn is_empty(&self) -> bool {
        self.mask == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.ids
            .iter()
            .enumerate()
            .filter(|(i, _)| self.mask & (1 << i) != 0)
            .map(|(_, &id)| id)
    }

    pub fn sentinel(&self) -> u32 {
        self.sentinel
    }
}

/// Copy `name` into a fixed-size key. Names that do not fit are rejected, never cut short.
pub fn fixed_name<const N: usize>(name: &str, what: &'static str) -> Result<[u8; N]> {
    if name.len() > N {
        return Err(ConfigError::NameTooLong {
            what,
            name: name.to_string(),
            limit: N,
            len: name.len(),
        });
    }

    let mut field = [0u8; N];
    field[..name.len()].copy_from_slice(name.as_bytes());
    Ok(field)
}

fn parse_names(spec: &str, what: &'static str) -> Result<Vec<String>> {
    let names: Vec<String> = spec
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect();
    if names.len() > MAX_COUNT {
        return Err(ConfigError::CapacityExceeded {
            what,
            limit: MAX_COUNT,
            count: names.len(),
        });
    }

    for name in &names {
        fixed_name::<THREAD_NAME_SIZE>(name, "thread name")?;
    }

    Ok(names)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FilterMode {
    #[default]
    Unknown,
    Whitelist,
    Blacklist,
}

impl FilterMode {
    fn as_raw(&self) -> u32 {
        match self {
            FilterMode::Unknown => FILTER_MODE_UNKNOWN,
            FilterMode::Whitelist => FILTER_MODE_WHITELIST,
            FilterMode::Blacklist => FILTER_MODE_BLACKLIST,
        }
    }
}

/// Everything the tracer is told before it starts: process filters, hook points in one
/// library and the syscall selection.
#[derive(Clone, Debug)]
pub struct ModuleConfig {
    pub self_pid: u32,
    pub is_32bit: bool,
    pub uid: u32,
    pub pid: u32,
    pub tid: u32,
    pub pid_whitelist: IdList,
    pub pid_blacklist: IdList,
    pub tid_whitelist: IdList,
    pub tid_blacklist: IdList,
    pub tname_whitelist: Vec<String>,
    pub tname_blacklist: Vec<String>,
    pub trace_isolated: bool,
    pub signal: u32,
    pub uprobe: UprobeConfig,
    pub syscall: SyscallConfig,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        ModuleConfig {
            self_pid: std::process::id(),
            is_32bit: false,
            uid: MAGIC_UID,
            pid: MAGIC_PID,
            tid: MAGIC_TID,
            pid_whitelist: IdList::empty(MAGIC_PID),
            pid_blacklist: IdList::empty(MAGIC_PID),
            tid_whitelist: IdList::empty(MAGIC_TID),
            tid_blacklist: IdList::empty(MAGIC_TID),
            tname_whitelist: vec![],
            tname_blacklist: vec![],
            trace_isolated: false,
            signal: 0,
            uprobe: UprobeConfig::default(),
            syscall: SyscallConfig::default(),
        }
    }
}

impl ModuleConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_pids_whitelist(&mut self, spec: &str) -> Result<()> {
        self.pid_whitelist = IdList::parse(spec, MAGIC_PID, "pid whitelist")?;
        Ok(())
    }

    pub fn set_pids_blacklist(&mut self, spec: &str) -> Result<()> {
        self.pid_blacklist = IdList::parse(spec, MAGIC_PID, "pid blacklist")?;
        Ok(())
    }

    pub fn set_tids_whitelist(&mut self, spec: &str) -> Result<()> {
        self.tid_whitelist = IdList::parse(spec, MAGIC_TID, "tid whitelist")?;
        Ok(())
    }

    pub fn set_tids_blacklist(&mut self, spec: &str) -> Result<()> {
        self.tid_blacklist = IdList::parse(spec, MAGIC_TID, "tid blacklist")?;
        Ok(())
    }

    pub fn set_tnames_whitelist(&mut self, spec: &str) -> Result<()> {
        self.tname_whitelist = parse_names(spec, "thread name whitelist")?;
        Ok(())
    }

    pub fn set_tnames_blacklist(&mut self, spec: &str) -> Result<()> {
        self.tname_blacklist = parse_names(spec, "thread name blacklist")?;
        Ok(())
    }

    pub fn filter_mode(&self) -> FilterMode {
        let narrowed = self.uid != MAGIC_UID
            || self.pid != MAGIC_PID
            || self.tid != MAGIC_TID
            || !self.pid_whitelist.is_empty()
            || !self.tid_whitelist.is_empty()
            || !self.tname_whitelist.is_empty();
        let excluded = !self.pid_blacklist.is_empty()
            || !self.tid_blacklist.is_empty()
            || !self.tname_blacklist.is_empty();

        if narrowed {
            FilterMode::Whitelist
        } else if excluded {
            FilterMode::Blacklist
        } else {
            FilterMode::Unknown
        }
    }

    pub fn common_filter(&self) -> CommonFilter {
        let filter = CommonFilter {
            is_32bit: self.is_32bit as u32,
            uid: self.uid,
            pid: self.pid,
            tid: self.tid,
            pid_list_mask: self.pid_whitelist.mask,
            pid_list: self.pid_whitelist.ids,
            blacklist_pids_mask: self.pid_blacklist.mask,
            blacklist_pids: self.pid_blacklist.ids,
            tid_list_mask: self.tid_whitelist.mask,
            tid_list: self.tid_whitelist.ids,
            blacklist_tids_mask: self.tid_blacklist.mask,
            blacklist_tids: self.tid_blacklist.ids,
            thread_name_whitelist: (!self.tname_whitelist.is_empty()) as u32,
            trace_isolated: self.trace_isolated as u32,
            signal: self.signal,
        };

        debug!(
            "CommonFilter{{uid={}, pid={}, tid={}, is_32bit={}, whitelist:{}}}",
            filter.uid, filter.pid, filter.tid, filter.is_32bit, filter.thread_name_whitelist
        );

        filter
    }

    pub fn config_map(&self) -> ConfigMap {
        ConfigMap {
            self_pid: self.self_pid,
            filter_mode: self.filter_mode().as_raw(),
        }
    }

    /// Validate everything that can only be checked against the environment. Must succeed
    /// before any record is written.
    pub fn check(&mut self) -> Result<()> {
        if self.uprobe.is_enabled() || !self.uprobe.lib_path.as_os_str().is_empty() {
            self.uprobe.check()?;
        }
        Ok(())
    }

    pub fn update_rev_filter<S: RecordStore + ?Sized>(&self, store: &mut S) -> Result<()> {
        for rev in REV_LIST {
            let key = RevFilterKey {
                rev_string: fixed_name::<REV_STRING_SIZE>(rev, "rev string")?,
            };
            store::put(
                store,
                MapName::RevFilter,
                &key.to_bytes(),
                &FILTER_TAG_DENY.to_bytes(),
            )?;
        }
        Ok(())
    }

    pub fn update_thread_filter<S: RecordStore + ?Sized>(&self, store: &mut S) -> Result<()> {
        let mut entries: Vec<(&str, u32)> = THREAD_BLACKLIST
            .iter()
            .map(|&name| (name, FILTER_TAG_DENY))
            .collect();
        entries.extend(
            self.tname_blacklist
                .iter()
                .map(|name| (name.as_str(), FILTER_TAG_DENY)),
        );
        entries.extend(
            self.tname_whitelist
                .iter()
                .map(|name| (name.as_str(), FILTER_TAG_ALLOW)),
        );

        for (name, tag) in entries {
            let key = ThreadFilterKey {
                thread_name: fixed_name::<THREAD_NAME_SIZE>(name, "thread name")?,
            };
            store::put(store, MapName::ThreadFilter, &key.to_bytes(), &tag.to_bytes())?;
        }
        Ok(())
    }

    /// Check the configuration, then hand every record to `store`. Stops at the first
    /// failure; nothing is retried.
    pub fn install<S: RecordStore + ?Sized>(
        &mut self,
        table: &SyscallTable,
        store: &mut S,
    ) -> Result<()> {
        self.check()?;

        store::put(
            store,
            MapName::CommonFilter,
            &0u32.to_bytes(),
            &self.common_filter().to_bytes(),
        )?;
        store::put(
            store,
            MapName::Config,
            &0u32.to_bytes(),
            &self.config_map().to_bytes(),
        )?;

        if self.syscall.is_enabled() {
            self.syscall.is_32bit = self.is_32bit;
            store::put(
                store,
                MapName::SyscallFilter,
                &0u32.to_bytes(),
                &self.syscall.filter().to_bytes(),
            )?;
            self.syscall.update_point_args(table, store)?;
            info!("{}", self.syscall.info(table));
        }

        if self.uprobe.is_enabled() {
            self.uprobe.update_point_args(store)?;
            info!(
                "{} hook points in {}",
                self.uprobe.points.len(),
                self.uprobe.lib_name
            );
        }

        self.update_rev_filter(store)?;
        self.update_thread_filter(store)?;

        Ok(())
    }
}
