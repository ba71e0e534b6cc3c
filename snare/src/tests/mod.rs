// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gustavo Noronha Silva <gustavo@noronha.dev.br>

use crate::{Arch, SyscallTable, TypeRegistry};

mod hooks;
mod types;

/// Path that is guaranteed to exist while tests run.
pub const EXISTING_LIB: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/Cargo.toml");

pub fn registry() -> TypeRegistry {
    TypeRegistry::new(Arch::Aarch64)
}

/// Small table with the numbers used in the selector examples.
pub fn small_table() -> SyscallTable {
    SyscallTable::from_entries(&registry(), &[("openat", 56), ("read", 0), ("write", 1)]).unwrap()
}
