// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gustavo Noronha Silva <gustavo@noronha.dev.br>

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Parser, ValueEnum};
use log::debug;
use snare::{Arch, MemoryStore, ModuleConfig, SyscallTable, TypeRegistry, UprobeConfig};

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum DumpFormat {
    #[default]
    Text,
    Hex,
}

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Library the hook points live in
    #[arg(short = 'l', long = "lib")]
    lib: Option<PathBuf>,

    /// Hook point rule, e.g. `write[int,buf:x2,int]` (can be repeated)
    #[arg(short = 'w', long = "point", action = clap::ArgAction::Append)]
    points: Vec<String>,

    /// Syscalls to trace, comma-separated, or `all`
    #[arg(short = 's', long = "syscall")]
    syscall: Option<String>,

    /// Syscalls to leave out, comma-separated
    #[arg(long = "no-syscall")]
    no_syscall: Option<String>,

    #[arg(short = 'u', long = "uid")]
    uid: Option<u32>,

    #[arg(short = 'p', long = "pid")]
    pid: Option<u32>,

    #[arg(short = 't', long = "tid")]
    tid: Option<u32>,

    #[arg(long = "pids-whitelist")]
    pids_whitelist: Option<String>,

    #[arg(long = "pids-blacklist")]
    pids_blacklist: Option<String>,

    #[arg(long = "tids-whitelist")]
    tids_whitelist: Option<String>,

    #[arg(long = "tids-blacklist")]
    tids_blacklist: Option<String>,

    #[arg(long = "tname-whitelist")]
    tname_whitelist: Option<String>,

    #[arg(long = "tname-blacklist")]
    tname_blacklist: Option<String>,

    #[arg(long = "arch", value_enum, default_value_t = Arch::default())]
    arch: Arch,

    #[arg(long = "is-32bit")]
    is_32bit: bool,

    /// Also trace isolated processes
    #[arg(long = "iso")]
    trace_isolated: bool,

    /// Signal sent to the traced thread when a hook point fires
    #[arg(long = "signal", default_value_t = 0)]
    signal: u32,

    /// Output format, `text` or `hex`
    #[arg(long = "format", value_enum, default_value_t = DumpFormat::default())]
    format: DumpFormat,
}

fn build_config(
    args: &Args,
    registry: &TypeRegistry,
    table: &SyscallTable,
) -> Result<ModuleConfig> {
    let mut config = ModuleConfig::new();
    config.is_32bit = args.is_32bit;
    config.trace_isolated = args.trace_isolated;
    config.signal = args.signal;

    if let Some(uid) = args.uid {
        config.uid = uid;
    }
    if let Some(pid) = args.pid {
        config.pid = pid;
    }
    if let Some(tid) = args.tid {
        config.tid = tid;
    }

    if let Some(spec) = &args.pids_whitelist {
        config.set_pids_whitelist(spec)?;
    }
    if let Some(spec) = &args.pids_blacklist {
        config.set_pids_blacklist(spec)?;
    }
    if let Some(spec) = &args.tids_whitelist {
        config.set_tids_whitelist(spec)?;
    }
    if let Some(spec) = &args.tids_blacklist {
        config.set_tids_blacklist(spec)?;
    }
    if let Some(spec) = &args.tname_whitelist {
        config.set_tnames_whitelist(spec)?;
    }
    if let Some(spec) = &args.tname_blacklist {
        config.set_tnames_blacklist(spec)?;
    }

    if let Some(spec) = &args.syscall {
        config.syscall.set_syscall(table, spec)?;
    }
    if let Some(spec) = &args.no_syscall {
        config.syscall.set_syscall_blacklist(table, spec)?;
    }

    if let Some(lib) = &args.lib {
        config.uprobe = UprobeConfig::new(lib);
        config
            .uprobe
            .parse(registry, args.points.as_slice())
            .context("Invalid hook point")?;
    } else if !args.points.is_empty() {
        anyhow::bail!("Hook points need a library, pass one with --lib");
    }

    Ok(config)
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();

    let registry = TypeRegistry::new(args.arch);
    let table = SyscallTable::new(&registry).context("Building the syscall table")?;
    debug!("{} syscalls known for {:?}", table.len(), args.arch);

    let mut config = build_config(&args, &registry, &table)?;

    let mut store = MemoryStore::new();
    config.install(&table, &mut store)?;

    match args.format {
        DumpFormat::Text => {
            for point in &config.uprobe.points {
                println!("hook point {}: {point}", point.index);
            }
            if config.syscall.is_enabled() {
                println!("{}", config.syscall.info(&table));
            }
            let mut last = None;
            for (map, _, _) in store.iter() {
                if last != Some(map) {
                    println!("{}: {} records", map.as_str(), store.len(map));
                    last = Some(map);
                }
            }
        }
        DumpFormat::Hex => {
            for (map, key, value) in store.iter() {
                println!("{} {} {}", map.as_str(), hex(key), hex(value));
            }
        }
    }

    Ok(())
}
