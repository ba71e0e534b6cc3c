// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gustavo Noronha Silva <gustavo@noronha.dev.br>

use std::{
    fmt,
    path::{Path, PathBuf},
};

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use snare_common::{
    PointArg, PointArgsConfig, ARG_FLAG_POINTER, ARG_KIND_BUFFER, ARG_KIND_INT, ARG_KIND_STRING,
    ARG_KIND_STRUCT, LOC_DEFAULT, LOC_REGISTER, LOC_STACK, MAX_POINT_ARG_COUNT, READ_INDEX_SKIP,
    READ_STAGE_ENTER, READ_STAGE_RETURN,
};

use crate::{
    error::{ConfigError, Result},
    store::{self, MapName, RecordStore},
    types::{ArgKind, LocationSource, SizeSource, TypeRegistry},
    wire::Encode as _,
};

// TARGET[+0xOFFSET][[ARG,ARG,...]]
static HOOK_RULE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\w+)(\+0x[[:xdigit:]]+)?(?:\[(.+)\])?$").expect("valid regex")
});

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum HookTarget {
    /// Resolved to an address by whoever attaches the probe.
    Symbol(String),
    Offset(u64),
}

impl fmt::Display for HookTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookTarget::Symbol(name) => f.write_str(name),
            HookTarget::Offset(offset) => write!(f, "0x{offset:x}"),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ReadStage {
    #[default]
    Enter,
    Return,
}

impl ReadStage {
    fn as_raw(&self) -> u32 {
        match self {
            ReadStage::Enter => READ_STAGE_ENTER,
            ReadStage::Return => READ_STAGE_RETURN,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ArgumentDescriptor {
    pub name: String,
    pub read_stage: ReadStage,
    pub kind: ArgKind,
}

impl ArgumentDescriptor {
    pub fn new(position: usize, kind: ArgKind) -> Self {
        ArgumentDescriptor {
            name: format!("arg_{position}"),
            read_stage: ReadStage::Enter,
            kind,
        }
    }

    pub fn point_arg(&self) -> PointArg {
        let mut arg = PointArg {
            kind: ARG_KIND_INT,
            flags: if self.kind.is_pointer() {
                ARG_FLAG_POINTER
            } else {
                0
            },
            read_stage: self.read_stage.as_raw(),
            size: 0,
            size_index: READ_INDEX_SKIP,
            loc_kind: LOC_DEFAULT,
            loc_reg: READ_INDEX_SKIP,
            loc_offset: 0,
        };

        match &self.kind {
            ArgKind::Int => arg.size = 8,
            ArgKind::Str => arg.kind = ARG_KIND_STRING,
            ArgKind::Struct { def, .. } => {
                arg.kind = ARG_KIND_STRUCT;
                arg.size = def.size;
            }
            ArgKind::Buffer(spec) => {
                arg.kind = ARG_KIND_BUFFER;
                match spec.size {
                    SizeSource::Literal(size) => arg.size = size,
                    SizeSource::Register(reg) => arg.size_index = reg.slot,
                }
                match spec.location {
                    None => (),
                    Some(LocationSource::Register(reg)) => {
                        arg.loc_kind = LOC_REGISTER;
                        arg.loc_reg = reg.slot;
                    }
                    Some(location @ LocationSource::Stack { base, .. }) => {
                        arg.loc_kind = LOC_STACK;
                        arg.loc_reg = base.slot;
                        // Range checked when the token was resolved.
                        arg.loc_offset = location.displacement() as i32;
                    }
                }
            }
        }

        arg
    }
}

/// One probe site inside a library.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct HookPoint {
    /// Position in the rule list, and the key of this point's argument record.
    pub index: u32,
    pub target: HookTarget,
    pub extra_offset: u64,
    pub library_path: PathBuf,
    /// Empty means the hit is recorded without capturing anything.
    pub args: Vec<ArgumentDescriptor>,
}

/// Argument record for a capture list; hook points and syscalls share the layout.
pub fn args_config(args: &[ArgumentDescriptor]) -> PointArgsConfig {
    let mut config = PointArgsConfig {
        count: args.len().min(MAX_POINT_ARG_COUNT) as u32,
        ..Default::default()
    };

    for (slot, arg) in config.args.iter_mut().zip(args.iter()) {
        *slot = arg.point_arg();
    }

    config
}

impl HookPoint {
    pub fn config(&self) -> PointArgsConfig {
        args_config(&self.args)
    }
}

impl fmt::Display for HookPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.target)?;
        if self.extra_offset != 0 {
            write!(f, "+0x{:x}", self.extra_offset)?;
        }
        if !self.args.is_empty() {
            let types: Vec<String> = self.args.iter().map(|a| a.kind.type_name()).collect();
            write!(f, "[{}]", types.join(","))?;
        }
        Ok(())
    }
}

fn parse_hex(rule: &str, token: &str) -> Result<u64> {
    let digits = token.strip_prefix('+').unwrap_or(token);
    let digits = digits.strip_prefix("0x").unwrap_or(digits);
    u64::from_str_radix(digits, 16).map_err(|e| ConfigError::parse(rule, token, e))
}

/// Parse a single rule into the hook point at position `index`.
pub fn parse_rule(
    registry: &TypeRegistry,
    index: u32,
    rule: &str,
    library_path: &Path,
) -> Result<HookPoint> {
    let caps = HOOK_RULE.captures(rule).ok_or_else(|| {
        ConfigError::parse(rule, rule, "expected TARGET[+0xOFFSET][[ARG,...]]")
    })?;

    let sym_or_off = &caps[1];
    let target = if sym_or_off.starts_with("0x") {
        HookTarget::Offset(parse_hex(rule, sym_or_off)?)
    } else {
        HookTarget::Symbol(sym_or_off.to_string())
    };

    let extra_offset = match caps.get(2) {
        Some(off) => parse_hex(rule, off.as_str())?,
        None => 0,
    };

    if extra_offset != 0 && matches!(target, HookTarget::Offset(_)) {
        warn!("{rule}: extra offset only applies to symbol targets");
    }

    let mut args = vec![];
    if let Some(list) = caps.get(3) {
        let tokens: Vec<&str> = list.as_str().split(',').map(str::trim).collect();
        if tokens.len() > MAX_POINT_ARG_COUNT {
            return Err(ConfigError::CapacityExceeded {
                what: "hook point argument",
                limit: MAX_POINT_ARG_COUNT,
                count: tokens.len(),
            });
        }

        for (position, token) in tokens.into_iter().enumerate() {
            args.push(ArgumentDescriptor::new(position, registry.resolve(token, rule)?));
        }
    }

    Ok(HookPoint {
        index,
        target,
        extra_offset,
        library_path: library_path.to_path_buf(),
        args,
    })
}

/// Hook points inside one library.
#[derive(Clone, Debug, Default)]
pub struct UprobeConfig {
    pub lib_path: PathBuf,
    /// Last component of `lib_path`, filled in by [`UprobeConfig::check`].
    pub lib_name: String,
    pub points: Vec<HookPoint>,
}

impl UprobeConfig {
    pub fn new(lib_path: impl Into<PathBuf>) -> Self {
        UprobeConfig {
            lib_path: lib_path.into(),
            ..Default::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.points.is_empty()
    }

    /// Parse `rules` in order. Either every rule parses and replaces the current points, or
    /// nothing changes.
    pub fn parse<S: AsRef<str>>(&mut self, registry: &TypeRegistry, rules: &[S]) -> Result<()> {
        let points = rules
            .iter()
            .enumerate()
            .map(|(index, rule)| parse_rule(registry, index as u32, rule.as_ref(), &self.lib_path))
            .collect::<Result<Vec<_>>>()?;

        for point in &points {
            debug!("hook point {}: {point}", point.index);
        }

        self.points = points;
        Ok(())
    }

    pub fn check(&mut self) -> Result<()> {
        if self.points.is_empty() {
            return Err(ConfigError::NoHookPoints);
        }

        std::fs::metadata(&self.lib_path).map_err(|source| ConfigError::ResourceUnavailable {
            path: self.lib_path.display().to_string(),
            source,
        })?;

        self.lib_name = self
            .lib_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(())
    }

    pub fn update_point_args<S: RecordStore + ?Sized>(&self, store: &mut S) -> Result<()> {
        for point in &self.points {
            store::put(
                store,
                MapName::UprobePointArgs,
                &point.index.to_bytes(),
                &point.config().to_bytes(),
            )?;
        }
        Ok(())
    }
}
