// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gustavo Noronha Silva <gustavo@noronha.dev.br>

use std::collections::HashMap;

use log::{debug, trace};
use snare_common::{syscalls::ALIASES, PointArgsConfig, SyscallFilter, MAGIC_SYSCALL, MAX_COUNT};

use crate::{
    error::{ConfigError, Result},
    hooks::{args_config, ArgumentDescriptor, ReadStage},
    store::{self, MapName, RecordStore},
    types::TypeRegistry,
    wire::Encode as _,
};

/// Argument signatures of the syscalls worth decoding. `$N` stands for the register holding
/// syscall argument N. The third field lists arguments read when the syscall returns.
const SIGNATURES: &[(&str, &str, &[usize])] = &[
    ("read", "int,buf:$2,int", &[1]),
    ("write", "int,buf:$2,int", &[]),
    ("pread64", "int,buf:$2,int,int", &[1]),
    ("pwrite64", "int,buf:$2,int,int", &[]),
    ("readv", "int,iovec*,int", &[]),
    ("writev", "int,iovec*,int", &[]),
    ("open", "str,int,int", &[]),
    ("openat", "int,str,int,int", &[]),
    ("close", "int", &[]),
    ("lseek", "int,int,int", &[]),
    ("dup", "int", &[]),
    ("dup3", "int,int,int", &[]),
    ("fcntl", "int,int,int", &[]),
    ("ioctl", "int,int,int", &[]),
    ("getdents64", "int,buf:$2,int", &[1]),
    ("faccessat", "int,str,int,int", &[]),
    ("newfstatat", "int,str,stat*,int", &[2]),
    ("fstat", "int,stat*", &[1]),
    ("readlinkat", "int,str,buf:$3,int", &[2]),
    ("unlinkat", "int,str,int", &[]),
    ("mkdirat", "int,str,int", &[]),
    ("renameat", "int,str,int,str", &[]),
    ("chdir", "str", &[]),
    ("getcwd", "buf:$1,int", &[0]),
    ("memfd_create", "str,int", &[]),
    ("execve", "str,int,int", &[]),
    ("execveat", "int,str,int,int,int", &[]),
    ("exit", "int", &[]),
    ("exit_group", "int", &[]),
    ("kill", "int,int", &[]),
    ("tkill", "int,int", &[]),
    ("tgkill", "int,int,int", &[]),
    ("prctl", "int,int,int,int,int", &[]),
    ("ptrace", "int,int,int,int", &[]),
    ("mmap", "int,int,int,int,int,int", &[]),
    ("mprotect", "int,int,int", &[]),
    ("munmap", "int,int", &[]),
    ("socket", "int,int,int", &[]),
    ("bind", "int,sockaddr*,int", &[]),
    ("connect", "int,sockaddr*,int", &[]),
    ("sendto", "int,buf:$2,int,int,sockaddr*,int", &[]),
    ("recvfrom", "int,buf:$2,int,int,sockaddr*,int", &[1, 4]),
    ("nanosleep", "timespec*,timespec*", &[1]),
    ("clock_gettime", "int,timespec*", &[1]),
    ("rt_sigaction", "int,sigaction*,sigaction*", &[2]),
    ("getrandom", "buf:$1,int,int", &[0]),
];

const GENERIC_SIGNATURE: &str = "int,int,int,int,int,int";

/// A catalogued syscall: its number and how its arguments are captured.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WatchPoint {
    pub name: &'static str,
    pub nr: u32,
    pub args: Vec<ArgumentDescriptor>,
}

/// Name/number lookups for one architecture, built once and passed around by reference.
#[derive(Clone, Debug)]
pub struct SyscallTable {
    points: Vec<WatchPoint>,
    by_name: HashMap<&'static str, usize>,
    by_nr: HashMap<u32, usize>,
}

impl SyscallTable {
    /// The compiled-in table for the registry's architecture.
    pub fn new(registry: &TypeRegistry) -> Result<Self> {
        Self::from_entries(registry, registry.arch().syscall_table())
    }

    pub fn from_entries(
        registry: &TypeRegistry,
        entries: &[(&'static str, u32)],
    ) -> Result<Self> {
        let mut table = SyscallTable {
            points: Vec::with_capacity(entries.len()),
            by_name: HashMap::new(),
            by_nr: HashMap::new(),
        };

        for &(name, nr) in entries {
            let (signature, on_return) = SIGNATURES
                .iter()
                .find(|(n, _, _)| *n == name)
                .map_or((GENERIC_SIGNATURE, &[][..]), |&(_, sig, ret)| (sig, ret));

            let args = Self::resolve_signature(registry, name, signature, on_return)?;

            table.by_name.insert(name, table.points.len());
            table.by_nr.insert(nr, table.points.len());
            table.points.push(WatchPoint { name, nr, args });
        }

        trace!("syscall table built with {} entries", table.points.len());

        Ok(table)
    }

    fn resolve_signature(
        registry: &TypeRegistry,
        name: &str,
        signature: &str,
        on_return: &[usize],
    ) -> Result<Vec<ArgumentDescriptor>> {
        let arch = registry.arch();

        signature
            .split(',')
            .enumerate()
            .map(|(position, token)| {
                let token = match token.split_once('$') {
                    Some((prefix, slot)) => {
                        let reg = slot
                            .parse::<usize>()
                            .ok()
                            .and_then(|slot| arch.syscall_argument_register(slot))
                            .ok_or_else(|| ConfigError::UnknownRegister {
                                rule: name.to_string(),
                                register: token.to_string(),
                            })?;
                        format!("{prefix}{}", reg.name)
                    }
                    None => token.to_string(),
                };

                let mut arg = ArgumentDescriptor::new(position, registry.resolve(&token, name)?);
                if on_return.contains(&position) {
                    arg.read_stage = ReadStage::Return;
                }
                Ok::<_, ConfigError>(arg)
            })
            .collect()
    }

    pub fn nr_from_name(&self, name: &str) -> Option<u32> {
        self.get(name).map(|point| point.nr)
    }

    pub fn name_from_nr(&self, nr: u32) -> Option<&'static str> {
        self.by_nr.get(&nr).map(|&i| self.points[i].name)
    }

    /// Look up by name, accepting the non-`rt_` spelling of signal syscalls.
    pub fn get(&self, name: &str) -> Option<&WatchPoint> {
        let name = ALIASES
            .iter()
            .find(|(alias, _)| *alias == name)
            .map_or(name, |&(_, canonical)| canonical);

        self.by_name.get(name).map(|&i| &self.points[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &WatchPoint> {
        self.points.iter()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl WatchPoint {
    pub fn config(&self) -> PointArgsConfig {
        args_config(&self.args)
    }
}

/// Allow/deny lists of syscall numbers in the tracer's fixed-slot form.
///
/// Unused slots hold `MAGIC_SYSCALL`. The masks repeat the same information, bit `i` set when
/// slot `i` is in use; the tracer may check either, so both are kept.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyscallSelection {
    pub hook_all: bool,
    pub allow: [u32; MAX_COUNT],
    pub allow_mask: u32,
    pub deny: [u32; MAX_COUNT],
    pub deny_mask: u32,
}

impl Default for SyscallSelection {
    fn default() -> Self {
        SyscallSelection {
            hook_all: false,
            allow: [MAGIC_SYSCALL; MAX_COUNT],
            allow_mask: 0,
            deny: [MAGIC_SYSCALL; MAX_COUNT],
            deny_mask: 0,
        }
    }
}

fn split_list(spec: &str) -> Vec<&str> {
    spec.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .collect()
}

fn fill_slots(
    table: &SyscallTable,
    spec: &str,
    what: &'static str,
) -> Result<([u32; MAX_COUNT], u32)> {
    let items = split_list(spec);
    if items.len() > MAX_COUNT {
        return Err(ConfigError::CapacityExceeded {
            what,
            limit: MAX_COUNT,
            count: items.len(),
        });
    }

    let mut slots = [MAGIC_SYSCALL; MAX_COUNT];
    let mut mask = 0u32;
    for (i, name) in items.into_iter().enumerate() {
        let nr = table
            .nr_from_name(name)
            .ok_or_else(|| ConfigError::UnknownSyscall(name.to_string()))?;
        slots[i] = nr;
        mask |= 1 << i;
    }

    Ok((slots, mask))
}

impl SyscallSelection {
    pub fn select(table: &SyscallTable, allow_spec: &str, deny_spec: &str) -> Result<Self> {
        let mut selection = SyscallSelection::default();
        selection.set_allow(table, allow_spec)?;
        selection.set_deny(table, deny_spec)?;
        Ok(selection)
    }

    /// `all` anywhere in the list hooks every syscall and leaves the allow slots empty.
    pub fn set_allow(&mut self, table: &SyscallTable, spec: &str) -> Result<()> {
        if split_list(spec).contains(&"all") {
            self.hook_all = true;
            self.allow = [MAGIC_SYSCALL; MAX_COUNT];
            self.allow_mask = 0;
            return Ok(());
        }

        (self.allow, self.allow_mask) = fill_slots(table, spec, "syscall whitelist")?;
        self.hook_all = false;
        Ok(())
    }

    pub fn set_deny(&mut self, table: &SyscallTable, spec: &str) -> Result<()> {
        (self.deny, self.deny_mask) = fill_slots(table, spec, "syscall blacklist")?;
        Ok(())
    }

    pub fn allowed(&self) -> impl Iterator<Item = u32> + '_ {
        self.allow.iter().copied().filter(|&nr| nr != MAGIC_SYSCALL)
    }

    pub fn denied(&self) -> impl Iterator<Item = u32> + '_ {
        self.deny.iter().copied().filter(|&nr| nr != MAGIC_SYSCALL)
    }
}

#[derive(Clone, Debug, Default)]
pub struct SyscallConfig {
    pub enable: bool,
    pub is_32bit: bool,
    pub selection: SyscallSelection,
}

impl SyscallConfig {
    pub fn is_enabled(&self) -> bool {
        self.enable
    }

    pub fn set_syscall(&mut self, table: &SyscallTable, spec: &str) -> Result<()> {
        self.enable = true;
        self.selection.set_allow(table, spec)
    }

    pub fn set_syscall_blacklist(&mut self, table: &SyscallTable, spec: &str) -> Result<()> {
        self.selection.set_deny(table, spec)
    }

    pub fn filter(&self) -> SyscallFilter {
        SyscallFilter {
            is_32bit: self.is_32bit as u32,
            hook_all: self.selection.hook_all as u32,
            syscall_mask: self.selection.allow_mask,
            syscall: self.selection.allow,
            syscall_blacklist_mask: self.selection.deny_mask,
            syscall_blacklist: self.selection.deny,
        }
    }

    pub fn info(&self, table: &SyscallTable) -> String {
        if self.selection.hook_all {
            return "watch:all".to_string();
        }

        let names: Vec<&str> = self
            .selection
            .allowed()
            .filter_map(|nr| table.name_from_nr(nr))
            .collect();
        format!("watch:{}", names.join(","))
    }

    /// Write the argument record of every catalogued syscall, keyed by number.
    pub fn update_point_args<S: RecordStore + ?Sized>(
        &self,
        table: &SyscallTable,
        store: &mut S,
    ) -> Result<()> {
        for point in table.iter() {
            store::put(
                store,
                MapName::SyscallPointArgs,
                &point.nr.to_bytes(),
                &point.config().to_bytes(),
            )?;
        }
        debug!("wrote argument config for {} syscalls", table.len());
        Ok(())
    }
}
