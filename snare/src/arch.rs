// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gustavo Noronha Silva <gustavo@noronha.dev.br>

use clap::ValueEnum;
use snare_common::syscalls;

/// Architecture of the traced process. Picks the syscall numbering and the register names
/// accepted in hook rules.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, ValueEnum)]
pub enum Arch {
    #[default]
    Aarch64,
    #[value(name = "x86-64")]
    X86_64,
}

/// Register slot as written into argument records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Register {
    pub name: &'static str,
    pub slot: u32,
}

const AARCH64_REGISTERS: &[(&str, u32)] = &[
    ("x0", 0),
    ("x1", 1),
    ("x2", 2),
    ("x3", 3),
    ("x4", 4),
    ("x5", 5),
    ("x6", 6),
    ("x7", 7),
    ("x8", 8),
    ("x9", 9),
    ("x10", 10),
    ("x11", 11),
    ("x12", 12),
    ("x13", 13),
    ("x14", 14),
    ("x15", 15),
    ("x16", 16),
    ("x17", 17),
    ("x18", 18),
    ("x19", 19),
    ("x20", 20),
    ("x21", 21),
    ("x22", 22),
    ("x23", 23),
    ("x24", 24),
    ("x25", 25),
    ("x26", 26),
    ("x27", 27),
    ("x28", 28),
    ("fp", 29),
    ("x29", 29),
    ("lr", 30),
    ("x30", 30),
    ("sp", 31),
    ("pc", 32),
];

// Slots follow the argument order of the calling convention, then the rest.
const X86_64_REGISTERS: &[(&str, u32)] = &[
    ("rdi", 0),
    ("rsi", 1),
    ("rdx", 2),
    ("rcx", 3),
    ("r8", 4),
    ("r9", 5),
    ("rax", 6),
    ("rbx", 7),
    ("rbp", 8),
    ("r10", 9),
    ("r11", 10),
    ("r12", 11),
    ("r13", 12),
    ("r14", 13),
    ("r15", 14),
    ("rsp", 15),
    ("sp", 15),
    ("rip", 16),
    ("pc", 16),
];

impl Arch {
    pub fn register(&self, name: &str) -> Option<Register> {
        let table = match self {
            Arch::Aarch64 => AARCH64_REGISTERS,
            Arch::X86_64 => X86_64_REGISTERS,
        };

        table
            .iter()
            .find(|(n, _)| *n == name)
            .map(|&(name, slot)| Register { name, slot })
    }

    /// Register carrying syscall argument `position`.
    pub fn syscall_argument_register(&self, position: usize) -> Option<Register> {
        let name = match self {
            Arch::Aarch64 => ["x0", "x1", "x2", "x3", "x4", "x5"].get(position)?,
            Arch::X86_64 => ["rdi", "rsi", "rdx", "r10", "r8", "r9"].get(position)?,
        };
        self.register(name)
    }

    pub fn syscall_table(&self) -> &'static [(&'static str, u32)] {
        match self {
            Arch::Aarch64 => syscalls::aarch64::SYSCALLS,
            Arch::X86_64 => syscalls::x86_64::SYSCALLS,
        }
    }
}
