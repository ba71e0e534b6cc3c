// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gustavo Noronha Silva <gustavo@noronha.dev.br>

use std::fmt;

use crate::types::{ArgKind, SizeSource};

/// A captured argument, reinterpreted according to the type it was declared with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArgValue {
    Int(u64),
    Str(String),
    Bytes(Vec<u8>),
    Struct { name: String, bytes: Vec<u8> },
    Pointer { addr: u64, target: Box<ArgValue> },
}

impl ArgKind {
    /// Reinterpret what the tracer captured for an argument of this kind.
    ///
    /// `reg_value` is the raw register value and `data` the memory copied out for it, if any.
    /// `size_value` carries the live value of the size register for buffers whose size is a
    /// back-reference. Data is never read past what was captured.
    pub fn decode(&self, reg_value: u64, data: &[u8], size_value: Option<u64>) -> ArgValue {
        match self {
            ArgKind::Int => ArgValue::Int(reg_value),
            ArgKind::Str => {
                let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
                ArgValue::Pointer {
                    addr: reg_value,
                    target: Box::new(ArgValue::Str(
                        String::from_utf8_lossy(&data[..end]).into_owned(),
                    )),
                }
            }
            ArgKind::Struct { def, pointer } => {
                let len = data.len().min(def.size as usize);
                let value = ArgValue::Struct {
                    name: def.name.clone(),
                    bytes: data[..len].to_vec(),
                };

                if *pointer {
                    ArgValue::Pointer {
                        addr: reg_value,
                        target: Box::new(value),
                    }
                } else {
                    value
                }
            }
            ArgKind::Buffer(spec) => {
                let wanted = match spec.size {
                    SizeSource::Literal(size) => size as u64,
                    SizeSource::Register(_) => size_value.unwrap_or(0),
                };
                let len = data.len().min(wanted.min(usize::MAX as u64) as usize);

                ArgValue::Pointer {
                    addr: reg_value,
                    target: Box::new(ArgValue::Bytes(data[..len].to_vec())),
                }
            }
        }
    }
}

fn write_hex(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            f.write_str(" ")?;
        }
        write!(f, "{b:02x}")?;
    }
    Ok(())
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Int(value) => write!(f, "0x{value:x}"),
            ArgValue::Str(s) => write!(f, "{s:?}"),
            ArgValue::Bytes(bytes) => {
                f.write_str("[")?;
                write_hex(f, bytes)?;
                f.write_str("]")
            }
            ArgValue::Struct { name, bytes } => {
                write!(f, "{name}{{")?;
                write_hex(f, bytes)?;
                f.write_str("}")
            }
            ArgValue::Pointer { addr, target } => write!(f, "0x{addr:x}({target})"),
        }
    }
}
