// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gustavo Noronha Silva <gustavo@noronha.dev.br>

use std::mem::size_of;

use snare_common::kernel_types::PthreadAttr;

use super::registry;
use crate::{
    arch::Register,
    types::{ArgKind, BufferSpec, LocationSource, SizeSource, StructDef},
    Arch, ConfigError, TypeRegistry,
};

const RULE: &str = "test[...]";

fn buffer(token: &str) -> BufferSpec {
    match registry().resolve(token, RULE).unwrap() {
        ArgKind::Buffer(spec) => spec,
        other => panic!("{token} resolved to {other:?}"),
    }
}

#[test]
fn resolve_scalars() {
    assert_eq!(registry().resolve("str", RULE).unwrap(), ArgKind::Str);
    assert_eq!(registry().resolve("int", RULE).unwrap(), ArgKind::Int);
}

#[test]
fn bare_buffer_defaults_to_256_bytes() {
    assert_eq!(
        buffer("buf"),
        BufferSpec {
            size: SizeSource::Literal(256),
            location: None,
        }
    );
}

#[test]
fn hex_and_decimal_sizes_agree() {
    assert_eq!(buffer("buf:0x40").size, SizeSource::Literal(64));
    assert_eq!(buffer("buf:64").size, SizeSource::Literal(64));
    assert_eq!(buffer("buf:0x40"), buffer("buf:64"));
}

#[test]
fn register_size_is_a_back_reference() {
    assert_eq!(
        buffer("buf:x1").size,
        SizeSource::Register(Register {
            name: "x1",
            slot: 1
        })
    );
}

#[test]
fn unknown_size_register_fails() {
    match registry().resolve("buf:foo", RULE) {
        Err(ConfigError::UnknownRegister { rule, register }) => {
            assert_eq!(rule, RULE);
            assert_eq!(register, "foo");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn malformed_sizes_fail() {
    for token in ["buf:0xzz", "buf:0x+40", "buf:0x", "buf:99999999999", "buf:"] {
        match registry().resolve(token, RULE) {
            Err(ConfigError::Parse { rule, token: t, .. }) => {
                assert_eq!(rule, RULE);
                assert_eq!(t, token);
            }
            other => panic!("{token}: unexpected {other:?}"),
        }
    }
}

#[test]
fn stack_location() {
    let spec = buffer("buf:64:sp+0x20-0x8");
    assert_eq!(spec.size, SizeSource::Literal(64));

    let location = spec.location.unwrap();
    assert_eq!(
        location,
        LocationSource::Stack {
            base: Register {
                name: "sp",
                slot: 31
            },
            add: 0x20,
            sub: 0x8,
        }
    );
    assert_eq!(location.displacement(), 0x18);
}

#[test]
fn stack_location_with_register_size() {
    let spec = buffer("buf:x1:sp+0x20-0x8");
    assert!(matches!(spec.size, SizeSource::Register(Register { slot: 1, .. })));
    assert!(matches!(spec.location, Some(LocationSource::Stack { .. })));
}

#[test]
fn stack_location_below_base() {
    let spec = buffer("buf:16:fp+0x8-0x20");
    assert_eq!(spec.location.unwrap().displacement(), -0x18);
}

#[test]
fn register_location() {
    let spec = buffer("buf:64:x3");
    assert_eq!(
        spec.location,
        Some(LocationSource::Register(Register {
            name: "x3",
            slot: 3
        }))
    );
}

#[test]
fn oversized_stack_offset_fails() {
    assert!(matches!(
        registry().resolve("buf:8:sp+0xffffffff", RULE),
        Err(ConfigError::Parse { .. })
    ));
}

#[test]
fn too_many_buffer_fields_fail() {
    match registry().resolve("buf:1:x2:x3", RULE) {
        Err(ConfigError::TypeResolution { token, .. }) => assert_eq!(token, "buf:1:x2:x3"),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn unknown_type_reports_token() {
    match registry().resolve("foo", "foo_hook[foo]") {
        Err(ConfigError::TypeResolution { rule, token, .. }) => {
            assert_eq!(token, "foo");
            assert_eq!(rule, "foo_hook[foo]");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn struct_aliases() {
    let def = StructDef {
        name: "pthread_attr".to_string(),
        size: size_of::<PthreadAttr>() as u32,
    };

    assert_eq!(
        registry().resolve("pattr", RULE).unwrap(),
        ArgKind::Struct {
            def: def.clone(),
            pointer: false
        }
    );

    let pointer = registry().resolve("pattr*", RULE).unwrap();
    assert_eq!(pointer, ArgKind::Struct { def, pointer: true });
    assert!(pointer.is_pointer());
    assert_eq!(pointer.type_name(), "pthread_attr*");
}

#[test]
fn registered_struct_alias() {
    let mut registry = TypeRegistry::new(Arch::Aarch64);
    assert!(registry.resolve("jstr", RULE).is_err());

    registry.register_struct("jstr", "JNIString", 24);
    assert_eq!(registry.struct_def("jstr").unwrap().size, 24);
    assert!(registry.resolve("jstr*", RULE).unwrap().is_pointer());
}

#[test]
fn register_names_follow_arch() {
    let x86 = TypeRegistry::new(Arch::X86_64);
    assert!(matches!(
        x86.resolve("buf:rdx", RULE).unwrap(),
        ArgKind::Buffer(BufferSpec {
            size: SizeSource::Register(Register { slot: 2, .. }),
            ..
        })
    ));
    assert!(registry().resolve("buf:rdx", RULE).is_err());
}

#[test]
fn buffers_are_pointers() {
    assert!(registry().resolve("buf", RULE).unwrap().is_pointer());
    assert!(!registry().resolve("int", RULE).unwrap().is_pointer());
}
