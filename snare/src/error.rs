// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gustavo Noronha Silva <gustavo@noronha.dev.br>

use thiserror::Error;

pub type Result<T, E = ConfigError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("parse for {rule} failed, {token}: {reason}")]
    Parse {
        rule: String,
        token: String,
        reason: String,
    },

    #[error("parse for {rule} failed, {reason} type: {token}")]
    TypeResolution {
        rule: String,
        token: String,
        reason: &'static str,
    },

    #[error("parse for {rule} failed, unknown register: {register}")]
    UnknownRegister { rule: String, register: String },

    #[error("max {what} count is {limit}, provided count:{count}")]
    CapacityExceeded {
        what: &'static str,
        limit: usize,
        count: usize,
    },

    #[error("[{name}] {what} max len is {limit}, got {len}")]
    NameTooLong {
        what: &'static str,
        name: String,
        limit: usize,
        len: usize,
    },

    #[error("syscall [{0}] is not in the syscall table")]
    UnknownSyscall(String),

    #[error("need hook point count is 0")]
    NoHookPoints,

    #[error("library {path} is not accessible: {source}")]
    ResourceUnavailable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("updating {map} failed: {source}")]
    Store {
        map: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl ConfigError {
    /// Errors that point at a defect in the compiled-in tables rather than at the input.
    /// Callers should stop instead of trying another configuration.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ConfigError::UnknownSyscall(_))
    }

    pub(crate) fn parse(rule: &str, token: &str, reason: impl ToString) -> Self {
        ConfigError::Parse {
            rule: rule.to_string(),
            token: token.to_string(),
            reason: reason.to_string(),
        }
    }
}
