// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gustavo Noronha Silva <gustavo@noronha.dev.br>

//! Records shared with the tracer.
//!
//! Every struct here is `#[repr(C)]` and made only of 4-byte fields, so the layout has no
//! padding and the serializer in the `snare` crate can reproduce it field by field.

#![no_std]

pub mod kernel_types;
pub mod syscalls;

/// Capacity of every fixed id array (syscalls, pids, tids). Masks are `u32`, so this must
/// stay at or below 32.
pub const MAX_COUNT: usize = 20;
pub const MAX_POINT_ARG_COUNT: usize = 10;

pub const REV_STRING_SIZE: usize = 32;
pub const THREAD_NAME_SIZE: usize = 16;

pub const MAGIC_UID: u32 = 0xffff_ffff;
pub const MAGIC_PID: u32 = 0xffff_ffff;
pub const MAGIC_TID: u32 = 0xffff_ffff;
pub const MAGIC_SYSCALL: u32 = 0xffff_ffff;

/// Register slot value meaning "no register".
pub const READ_INDEX_SKIP: u32 = 100;

pub const DEFAULT_BUFFER_SIZE: u32 = 256;

pub const ARG_KIND_INT: u32 = 1;
pub const ARG_KIND_STRING: u32 = 2;
pub const ARG_KIND_STRUCT: u32 = 3;
pub const ARG_KIND_BUFFER: u32 = 4;

pub const ARG_FLAG_POINTER: u32 = 1 << 0;

pub const READ_STAGE_ENTER: u32 = 1;
pub const READ_STAGE_RETURN: u32 = 2;

pub const LOC_DEFAULT: u32 = 0;
pub const LOC_REGISTER: u32 = 1;
pub const LOC_STACK: u32 = 2;

pub const FILTER_TAG_DENY: u32 = 1;
pub const FILTER_TAG_ALLOW: u32 = 2;

pub const FILTER_MODE_UNKNOWN: u32 = 0;
pub const FILTER_MODE_WHITELIST: u32 = 1;
pub const FILTER_MODE_BLACKLIST: u32 = 2;

/// How one argument is captured.
#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct PointArg {
    pub kind: u32,
    pub flags: u32,
    pub read_stage: u32,
    /// Literal byte count, or the struct size for struct arguments.
    pub size: u32,
    /// Register slot holding the byte count at capture time, or `READ_INDEX_SKIP`.
    pub size_index: u32,
    pub loc_kind: u32,
    pub loc_reg: u32,
    pub loc_offset: i32,
}

/// Value of the per-hook-point and per-syscall argument maps.
#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct PointArgsConfig {
    pub count: u32,
    pub args: [PointArg; MAX_POINT_ARG_COUNT],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SyscallFilter {
    pub is_32bit: u32,
    pub hook_all: u32,
    pub syscall_mask: u32,
    pub syscall: [u32; MAX_COUNT],
    pub syscall_blacklist_mask: u32,
    pub syscall_blacklist: [u32; MAX_COUNT],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CommonFilter {
    pub is_32bit: u32,
    pub uid: u32,
    pub pid: u32,
    pub tid: u32,
    pub pid_list_mask: u32,
    pub pid_list: [u32; MAX_COUNT],
    pub blacklist_pids_mask: u32,
    pub blacklist_pids: [u32; MAX_COUNT],
    pub tid_list_mask: u32,
    pub tid_list: [u32; MAX_COUNT],
    pub blacklist_tids_mask: u32,
    pub blacklist_tids: [u32; MAX_COUNT],
    pub thread_name_whitelist: u32,
    pub trace_isolated: u32,
    pub signal: u32,
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct ConfigMap {
    pub self_pid: u32,
    pub filter_mode: u32,
}

/// Key of the root/anti-debug string denylist map.
#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct RevFilterKey {
    pub rev_string: [u8; REV_STRING_SIZE],
}

/// Key of the thread name map.
#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct ThreadFilterKey {
    pub thread_name: [u8; THREAD_NAME_SIZE],
}
