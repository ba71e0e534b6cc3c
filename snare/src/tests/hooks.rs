// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gustavo Noronha Silva <gustavo@noronha.dev.br>

use std::path::Path;

use snare_common::{
    ARG_FLAG_POINTER, ARG_KIND_BUFFER, ARG_KIND_INT, ARG_KIND_STRING, ARG_KIND_STRUCT,
    LOC_DEFAULT, LOC_STACK, READ_INDEX_SKIP, READ_STAGE_ENTER,
};

use super::{registry, EXISTING_LIB};
use crate::{
    hooks::{parse_rule, HookTarget},
    store::MapName,
    types::{ArgKind, BufferSpec, LocationSource, SizeSource},
    wire::Encode as _,
    ConfigError, HookPoint, MemoryStore, RecordStore, UprobeConfig,
};

fn parse(rule: &str) -> HookPoint {
    parse_rule(&registry(), 0, rule, Path::new("/system/lib64/libc.so")).unwrap()
}

fn kinds(point: &HookPoint) -> Vec<ArgKind> {
    point.args.iter().map(|a| a.kind.clone()).collect()
}

fn literal_buffer(size: u32) -> ArgKind {
    ArgKind::Buffer(BufferSpec {
        size: SizeSource::Literal(size),
        location: None,
    })
}

#[test]
fn symbol_with_zero_offset() {
    let point = parse("strstr+0x0[str,str]");
    assert_eq!(point.target, HookTarget::Symbol("strstr".to_string()));
    assert_eq!(point.extra_offset, 0);
    assert_eq!(kinds(&point), vec![ArgKind::Str, ArgKind::Str]);
    assert_eq!(point.args[0].name, "arg_0");
    assert_eq!(point.args[1].name, "arg_1");
}

#[test]
fn symbol_with_literal_buffer() {
    let point = parse("write[int,buf:128,int]");
    assert_eq!(point.target, HookTarget::Symbol("write".to_string()));
    assert_eq!(
        kinds(&point),
        vec![ArgKind::Int, literal_buffer(128), ArgKind::Int]
    );
}

#[test]
fn hex_target_is_an_offset() {
    let point = parse("0x89ab[buf:64,int]");
    assert_eq!(point.target, HookTarget::Offset(0x89ab));
    assert_eq!(kinds(&point), vec![literal_buffer(64), ArgKind::Int]);
}

#[test]
fn hex_target_with_stack_buffer() {
    let point = parse("0x89ab[buf:64:sp+0x20-0x8]");
    assert_eq!(point.target, HookTarget::Offset(0x89ab));
    assert_eq!(point.args.len(), 1);

    let ArgKind::Buffer(spec) = &point.args[0].kind else {
        panic!("expected a buffer, got {:?}", point.args[0].kind);
    };
    assert_eq!(spec.size, SizeSource::Literal(64));
    match spec.location {
        Some(LocationSource::Stack { base, add, sub }) => {
            assert_eq!(base.name, "sp");
            assert_eq!(add, 0x20);
            assert_eq!(sub, 0x8);
        }
        other => panic!("unexpected location {other:?}"),
    }

    let arg = point.config().args[0];
    assert_eq!(arg.kind, ARG_KIND_BUFFER);
    assert_eq!(arg.size, 64);
    assert_eq!(arg.loc_kind, LOC_STACK);
    assert_eq!(arg.loc_reg, 31);
    assert_eq!(arg.loc_offset, 0x18);
}

#[test]
fn bare_target_captures_nothing() {
    let point = parse("open");
    assert_eq!(point.target, HookTarget::Symbol("open".to_string()));
    assert!(point.args.is_empty());
    assert_eq!(point.config().count, 0);
}

#[test]
fn symbol_with_extra_offset() {
    let point = parse("JNI_OnLoad+0x1c[int]");
    assert_eq!(point.target, HookTarget::Symbol("JNI_OnLoad".to_string()));
    assert_eq!(point.extra_offset, 0x1c);
    assert_eq!(point.to_string(), "JNI_OnLoad+0x1c[int]");
}

#[test]
fn argument_tokens_are_trimmed() {
    let point = parse("write[int, buf:x2, int]");
    assert_eq!(point.args.len(), 3);
    assert!(matches!(
        point.args[1].kind,
        ArgKind::Buffer(BufferSpec {
            size: SizeSource::Register(_),
            ..
        })
    ));
}

#[test]
fn display_lists_types() {
    assert_eq!(
        parse("0x89ab[buf:64,pattr*]").to_string(),
        "0x89ab[buf,pthread_attr*]"
    );
    assert_eq!(parse("strlen").to_string(), "strlen");
}

#[test]
fn malformed_rules_fail() {
    for rule in ["", "write[", "write[]", "wr-ite[int]", "write+12[int]"] {
        match parse_rule(&registry(), 0, rule, Path::new("libc.so")) {
            Err(ConfigError::Parse { rule: r, .. }) => assert_eq!(r, rule),
            other => panic!("{rule:?}: unexpected {other:?}"),
        }
    }
}

#[test]
fn unknown_type_names_the_token() {
    match parse_rule(&registry(), 0, "write[int,foo]", Path::new("libc.so")) {
        Err(ConfigError::TypeResolution { rule, token, .. }) => {
            assert_eq!(rule, "write[int,foo]");
            assert_eq!(token, "foo");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn too_many_arguments() {
    let rule = format!("f[{}]", vec!["int"; 11].join(","));
    match parse_rule(&registry(), 0, &rule, Path::new("libc.so")) {
        Err(ConfigError::CapacityExceeded { limit, count, .. }) => {
            assert_eq!(limit, 10);
            assert_eq!(count, 11);
        }
        other => panic!("unexpected {other:?}"),
    }

    let rule = format!("f[{}]", vec!["int"; 10].join(","));
    assert_eq!(parse(&rule).config().count, 10);
}

#[test]
fn point_arg_layout() {
    let config = parse("f[int,str,stat*,buf:x2]").config();
    assert_eq!(config.count, 4);

    let [int, string, stat, buffer] = [
        config.args[0],
        config.args[1],
        config.args[2],
        config.args[3],
    ];

    assert_eq!(int.kind, ARG_KIND_INT);
    assert_eq!(int.size, 8);
    assert_eq!(int.flags, 0);
    assert_eq!(int.read_stage, READ_STAGE_ENTER);
    assert_eq!(int.size_index, READ_INDEX_SKIP);
    assert_eq!(int.loc_kind, LOC_DEFAULT);

    assert_eq!(string.kind, ARG_KIND_STRING);

    assert_eq!(stat.kind, ARG_KIND_STRUCT);
    assert_eq!(stat.size, 128);
    assert_eq!(stat.flags, ARG_FLAG_POINTER);

    assert_eq!(buffer.kind, ARG_KIND_BUFFER);
    assert_eq!(buffer.flags, ARG_FLAG_POINTER);
    assert_eq!(buffer.size, 0);
    assert_eq!(buffer.size_index, 2);

    // Unused slots stay zeroed.
    assert_eq!(config.args[4].kind, 0);
}

#[test]
fn batch_parse_keeps_order() {
    let mut uprobe = UprobeConfig::new(EXISTING_LIB);
    uprobe
        .parse(&registry(), &["strstr[str,str]", "0x1000", "write[int,buf:x2,int]"])
        .unwrap();

    assert_eq!(uprobe.points.len(), 3);
    for (i, point) in uprobe.points.iter().enumerate() {
        assert_eq!(point.index, i as u32);
        assert_eq!(point.library_path, Path::new(EXISTING_LIB));
    }
    assert_eq!(uprobe.points[1].target, HookTarget::Offset(0x1000));
}

#[test]
fn batch_parse_is_all_or_nothing() {
    let mut uprobe = UprobeConfig::new(EXISTING_LIB);
    uprobe.parse(&registry(), &["strstr[str,str]"]).unwrap();

    let result = uprobe.parse(&registry(), &["open[str,int]", "write[int,foo]"]);
    assert!(matches!(result, Err(ConfigError::TypeResolution { .. })));

    assert_eq!(uprobe.points.len(), 1);
    assert_eq!(
        uprobe.points[0].target,
        HookTarget::Symbol("strstr".to_string())
    );
}

#[test]
fn check_requires_points() {
    let mut uprobe = UprobeConfig::new(EXISTING_LIB);
    assert!(matches!(uprobe.check(), Err(ConfigError::NoHookPoints)));
}

#[test]
fn check_requires_library() {
    let mut uprobe = UprobeConfig::new("/nonexistent/libfoo.so");
    uprobe.parse(&registry(), &["foo"]).unwrap();

    let err = uprobe.check().unwrap_err();
    assert!(matches!(err, ConfigError::ResourceUnavailable { .. }));
    assert!(!err.is_fatal());
    assert!(err.to_string().contains("/nonexistent/libfoo.so"));
}

#[test]
fn check_fills_library_name() {
    let mut uprobe = UprobeConfig::new(EXISTING_LIB);
    uprobe.parse(&registry(), &["foo"]).unwrap();
    uprobe.check().unwrap();
    assert_eq!(uprobe.lib_name, "Cargo.toml");
}

#[test]
fn point_args_keyed_by_index() {
    let mut uprobe = UprobeConfig::new(EXISTING_LIB);
    uprobe
        .parse(&registry(), &["strstr[str,str]", "write[int,buf:128,int]"])
        .unwrap();

    let mut store = MemoryStore::new();
    uprobe.update_point_args(&mut store).unwrap();

    assert_eq!(store.len(MapName::UprobePointArgs), 2);
    let value = store
        .lookup(MapName::UprobePointArgs, &1u32.to_le_bytes())
        .unwrap();
    assert_eq!(value.len(), 324);
    assert_eq!(&value[..4], &3u32.to_le_bytes());
}

#[test]
fn bad_hex_names_the_substring() {
    for (rule, token) in [
        ("0x12g4[int]", "0x12g4"),
        ("0x1ffffffffffffffff", "0x1ffffffffffffffff"),
        ("foo+0x1ffffffffffffffff", "+0x1ffffffffffffffff"),
    ] {
        match parse_rule(&registry(), 0, rule, Path::new("libc.so")) {
            Err(ConfigError::Parse { rule: r, token: t, .. }) => {
                assert_eq!(r, rule);
                assert_eq!(t, token);
            }
            other => panic!("{rule}: unexpected {other:?}"),
        }
    }
}

#[test]
fn reparsing_gives_identical_records() {
    let rules = [
        "strstr+0x0[str,str]",
        "write[int,buf:x2,int]",
        "0x89ab[buf:64:sp+0x20-0x8,pattr*]",
        "open",
    ];

    let compile = || {
        let mut uprobe = UprobeConfig::new(EXISTING_LIB);
        uprobe.parse(&registry(), &rules).unwrap();
        uprobe
            .points
            .iter()
            .map(|point| (point.index, point.config().to_bytes()))
            .collect::<Vec<_>>()
    };

    let first = compile();
    assert_eq!(first.len(), rules.len());
    assert_eq!(first, compile());
}
