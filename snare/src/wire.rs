// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gustavo Noronha Silva <gustavo@noronha.dev.br>

//! Byte layout of the records handed to the tracer.
//!
//! Fields are written in declaration order, little endian, matching the `#[repr(C)]`
//! definitions in `snare-common` byte for byte.

use std::mem::size_of;

use bytes::{BufMut, Bytes, BytesMut};
use snare_common::{
    CommonFilter, ConfigMap, PointArg, PointArgsConfig, RevFilterKey, SyscallFilter,
    ThreadFilterKey,
};

pub trait Encode: Sized {
    const SIZE: usize = size_of::<Self>();

    fn encode<B: BufMut>(&self, buf: &mut B);

    fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(Self::SIZE);
        self.encode(&mut buf);
        assert_eq!(buf.len(), Self::SIZE, "record layout mismatch");
        buf.freeze()
    }
}

fn put_u32s<B: BufMut>(buf: &mut B, values: &[u32]) {
    for &value in values {
        buf.put_u32_le(value);
    }
}

impl Encode for u32 {
    fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32_le(*self);
    }
}

impl Encode for PointArg {
    fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32_le(self.kind);
        buf.put_u32_le(self.flags);
        buf.put_u32_le(self.read_stage);
        buf.put_u32_le(self.size);
        buf.put_u32_le(self.size_index);
        buf.put_u32_le(self.loc_kind);
        buf.put_u32_le(self.loc_reg);
        buf.put_i32_le(self.loc_offset);
    }
}

impl Encode for PointArgsConfig {
    fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32_le(self.count);
        for arg in &self.args {
            arg.encode(buf);
        }
    }
}

impl Encode for SyscallFilter {
    fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32_le(self.is_32bit);
        buf.put_u32_le(self.hook_all);
        buf.put_u32_le(self.syscall_mask);
        put_u32s(buf, &self.syscall);
        buf.put_u32_le(self.syscall_blacklist_mask);
        put_u32s(buf, &self.syscall_blacklist);
    }
}

impl Encode for CommonFilter {
    fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32_le(self.is_32bit);
        buf.put_u32_le(self.uid);
        buf.put_u32_le(self.pid);
        buf.put_u32_le(self.tid);
        buf.put_u32_le(self.pid_list_mask);
        put_u32s(buf, &self.pid_list);
        buf.put_u32_le(self.blacklist_pids_mask);
        put_u32s(buf, &self.blacklist_pids);
        buf.put_u32_le(self.tid_list_mask);
        put_u32s(buf, &self.tid_list);
        buf.put_u32_le(self.blacklist_tids_mask);
        put_u32s(buf, &self.blacklist_tids);
        buf.put_u32_le(self.thread_name_whitelist);
        buf.put_u32_le(self.trace_isolated);
        buf.put_u32_le(self.signal);
    }
}

impl Encode for ConfigMap {
    fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32_le(self.self_pid);
        buf.put_u32_le(self.filter_mode);
    }
}

impl Encode for RevFilterKey {
    fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_slice(&self.rev_string);
    }
}

impl Encode for ThreadFilterKey {
    fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_slice(&self.thread_name);
    }
}
