// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gustavo Noronha Silva <gustavo@noronha.dev.br>

pub mod aarch64;
pub mod x86_64;

/// Names accepted in place of the kernel's `rt_` variants.
pub const ALIASES: &[(&str, &str)] = &[
    ("sigaction", "rt_sigaction"),
    ("sigprocmask", "rt_sigprocmask"),
    ("sigreturn", "rt_sigreturn"),
    ("sigpending", "rt_sigpending"),
    ("sigtimedwait", "rt_sigtimedwait"),
    ("sigqueueinfo", "rt_sigqueueinfo"),
    ("sigsuspend", "rt_sigsuspend"),
    ("tgsigqueueinfo", "rt_tgsigqueueinfo"),
];
