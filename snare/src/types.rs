// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gustavo Noronha Silva <gustavo@noronha.dev.br>

use std::{collections::HashMap, mem::size_of};

use log::trace;
use once_cell::sync::Lazy;
use regex::Regex;
use snare_common::{
    kernel_types::{Iovec, PthreadAttr, Sigaction, Sockaddr, Stat, Timespec},
    DEFAULT_BUFFER_SIZE,
};

use crate::{
    arch::{Arch, Register},
    error::{ConfigError, Result},
};

static STACK_LOCATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\w+)\+0x([[:xdigit:]]+)(?:-0x([[:xdigit:]]+))?$").expect("valid regex")
});

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StructDef {
    pub name: String,
    pub size: u32,
}

/// Where a buffer's byte count comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SizeSource {
    Literal(u32),
    /// Live value of this register when the hook fires.
    Register(Register),
}

/// Where a buffer's address comes from when not the argument's own register.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LocationSource {
    Register(Register),
    /// `base + add - sub`
    Stack { base: Register, add: u32, sub: u32 },
}

impl LocationSource {
    pub fn displacement(&self) -> i64 {
        match self {
            LocationSource::Register(_) => 0,
            LocationSource::Stack { add, sub, .. } => *add as i64 - *sub as i64,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BufferSpec {
    pub size: SizeSource,
    pub location: Option<LocationSource>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ArgKind {
    Int,
    Str,
    Struct { def: StructDef, pointer: bool },
    /// Always read through the pointer held in the register.
    Buffer(BufferSpec),
}

impl ArgKind {
    pub fn is_pointer(&self) -> bool {
        match self {
            ArgKind::Int | ArgKind::Str => false,
            ArgKind::Struct { pointer, .. } => *pointer,
            ArgKind::Buffer(_) => true,
        }
    }

    pub fn type_name(&self) -> String {
        match self {
            ArgKind::Int => "int".to_string(),
            ArgKind::Str => "str".to_string(),
            ArgKind::Struct { def, pointer } if *pointer => format!("{}*", def.name),
            ArgKind::Struct { def, .. } => def.name.clone(),
            ArgKind::Buffer(_) => "buf".to_string(),
        }
    }
}

/// Catalog of argument types accepted in hook rules.
///
/// Built once per configuration and handed by reference to whatever resolves argument tokens;
/// there is no process-wide instance.
#[derive(Clone, Debug)]
pub struct TypeRegistry {
    arch: Arch,
    structs: HashMap<String, StructDef>,
}

impl TypeRegistry {
    pub fn new(arch: Arch) -> Self {
        let mut registry = TypeRegistry {
            arch,
            structs: HashMap::new(),
        };

        registry.register_struct("pattr", "pthread_attr", size_of::<PthreadAttr>() as u32);
        registry.register_struct("timespec", "timespec", size_of::<Timespec>() as u32);
        registry.register_struct("stat", "stat", size_of::<Stat>() as u32);
        registry.register_struct("sockaddr", "sockaddr", size_of::<Sockaddr>() as u32);
        registry.register_struct("sigaction", "sigaction", size_of::<Sigaction>() as u32);
        registry.register_struct("iovec", "iovec", size_of::<Iovec>() as u32);

        registry
    }

    pub fn arch(&self) -> Arch {
        self.arch
    }

    /// Make `alias` and `alias*` resolve to a struct of `size` bytes.
    pub fn register_struct(&mut self, alias: &str, name: &str, size: u32) {
        self.structs.insert(
            alias.to_string(),
            StructDef {
                name: name.to_string(),
                size,
            },
        );
    }

    pub fn struct_def(&self, alias: &str) -> Option<&StructDef> {
        self.structs.get(alias)
    }

    /// Resolve one argument token. `rule` is only used for error reporting.
    pub fn resolve(&self, token: &str, rule: &str) -> Result<ArgKind> {
        let kind = match token {
            "str" => ArgKind::Str,
            "int" => ArgKind::Int,
            "buf" => ArgKind::Buffer(BufferSpec {
                size: SizeSource::Literal(DEFAULT_BUFFER_SIZE),
                location: None,
            }),
            _ if token.starts_with("buf:") => ArgKind::Buffer(self.resolve_buffer(token, rule)?),
            _ => {
                let (alias, pointer) = match token.strip_suffix('*') {
                    Some(alias) => (alias, true),
                    None => (token, false),
                };

                let def = self.structs.get(alias).ok_or_else(|| ConfigError::TypeResolution {
                    rule: rule.to_string(),
                    token: token.to_string(),
                    reason: "unknown",
                })?;

                ArgKind::Struct {
                    def: def.clone(),
                    pointer,
                }
            }
        };

        trace!("{rule}: {token} resolved to {kind:?}");

        Ok(kind)
    }

    fn resolve_buffer(&self, token: &str, rule: &str) -> Result<BufferSpec> {
        let items: Vec<&str> = token.split(':').collect();

        let (size, location) = match items.as_slice() {
            [_, size] => (self.resolve_size(size, token, rule)?, None),
            [_, size, location] => (
                self.resolve_size(size, token, rule)?,
                Some(self.resolve_location(location, token, rule)?),
            ),
            _ => {
                return Err(ConfigError::TypeResolution {
                    rule: rule.to_string(),
                    token: token.to_string(),
                    reason: "unexpected buffer",
                })
            }
        };

        Ok(BufferSpec { size, location })
    }

    fn resolve_size(&self, size: &str, token: &str, rule: &str) -> Result<SizeSource> {
        if size.is_empty() {
            return Err(ConfigError::parse(rule, token, "empty buffer size"));
        }

        if let Some(hex) = size.strip_prefix("0x") {
            if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(ConfigError::parse(rule, token, "invalid hex buffer size"));
            }
            return u32::from_str_radix(hex, 16)
                .map(SizeSource::Literal)
                .map_err(|e| ConfigError::parse(rule, token, e));
        }

        if size.bytes().all(|b| b.is_ascii_digit()) {
            return size
                .parse::<u32>()
                .map(SizeSource::Literal)
                .map_err(|e| ConfigError::parse(rule, token, e));
        }

        self.register(size, rule).map(SizeSource::Register)
    }

    fn resolve_location(&self, location: &str, token: &str, rule: &str) -> Result<LocationSource> {
        let Some(caps) = STACK_LOCATION.captures(location) else {
            return self.register(location, rule).map(LocationSource::Register);
        };

        let base = self.register(&caps[1], rule)?;
        let hex = |digits: &str| {
            u32::from_str_radix(digits, 16).map_err(|e| ConfigError::parse(rule, token, e))
        };
        let add = hex(&caps[2])?;
        let sub = match caps.get(3) {
            Some(sub) => hex(sub.as_str())?,
            None => 0,
        };

        let location = LocationSource::Stack { base, add, sub };
        if i32::try_from(location.displacement()).is_err() {
            return Err(ConfigError::parse(
                rule,
                token,
                "stack offset does not fit in 32 bits",
            ));
        }

        Ok(location)
    }

    fn register(&self, name: &str, rule: &str) -> Result<Register> {
        self.arch
            .register(name)
            .ok_or_else(|| ConfigError::UnknownRegister {
                rule: rule.to_string(),
                register: name.to_string(),
            })
    }
}
