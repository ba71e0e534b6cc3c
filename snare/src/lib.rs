// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gustavo Noronha Silva <gustavo@noronha.dev.br>

//! Compiles hook rules and process/syscall filters into the fixed-layout records the tracer
//! reads at runtime.

pub mod arch;
pub mod decode;
pub mod error;
pub mod filter;
pub mod hooks;
pub mod store;
pub mod syscalls;
pub mod types;
pub mod wire;

#[cfg(test)]
mod tests;

pub use arch::Arch;
pub use error::{ConfigError, Result};
pub use filter::ModuleConfig;
pub use hooks::{HookPoint, UprobeConfig};
pub use store::{MapName, MemoryStore, RecordStore};
pub use syscalls::{SyscallConfig, SyscallSelection, SyscallTable};
pub use types::TypeRegistry;
