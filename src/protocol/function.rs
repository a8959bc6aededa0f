//! Function-call trees used by recollection filters and computed
//! retrieves.
//!
//! The structure is recursive with no fixed depth bound, so both codec
//! directions run iteratively over explicit work stacks: adversarial
//! nesting depth costs heap, never call stack, and is capped by
//! `max_function_depth`.

use crate::error::{ProtocolError, Result};
use crate::protocol::schema;
use crate::stream::event::EventKind;
use crate::stream::format::{RawFormat, Utf8Format};
use crate::stream::reader::StreamingReader;
use crate::stream::writer::StreamingWriter;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// A named function application over an ordered argument list.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub args: Vec<Argument>,
}

/// One argument of a function: a nested call, a field reference, or a
/// typed literal.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub enum Argument {
    Function(Function),
    Reference(String),
    Static { type_name: String, value: Vec<u8> },
}

pub(crate) fn encode_function<W: Write>(
    writer: &mut StreamingWriter<W>,
    function: &Function,
) -> Result<()> {
    let max_depth = writer.config().max_function_depth;

    // (function, index of the next argument to emit)
    let mut work: Vec<(&Function, usize)> = Vec::new();
    writer.begin(&schema::FUNCTION)?;
    writer.write_value::<Utf8Format>(&schema::FUNCTION_NAME, &function.name)?;
    work.push((function, 0));

    while let Some(frame) = work.last_mut() {
        let (current, index) = (frame.0, frame.1);
        if index == current.args.len() {
            writer.end()?;
            work.pop();
            continue;
        }
        frame.1 += 1;
        let arg = &current.args[index];
        match arg {
            Argument::Reference(field) => {
                writer.write_value::<Utf8Format>(&schema::ARGUMENT_REFERENCE, field)?;
            }
            Argument::Static { type_name, value } => {
                writer.begin(&schema::ARGUMENT_STATIC)?;
                writer.write_value::<Utf8Format>(&schema::ARGUMENT_TYPE, type_name)?;
                writer.write_value::<RawFormat>(&schema::ARGUMENT_VALUE, value)?;
                writer.end()?;
            }
            Argument::Function(nested) => {
                if work.len() >= max_depth {
                    return Err(ProtocolError::DepthExceeded(work.len() + 1));
                }
                writer.begin(&schema::FUNCTION)?;
                writer.write_value::<Utf8Format>(&schema::FUNCTION_NAME, &nested.name)?;
                work.push((nested, 0));
            }
        }
    }
    Ok(())
}

/// Decode one function tree; the outermost Function container's Begin
/// event has already surfaced.
pub(crate) fn decode_function<R: Read>(reader: &mut StreamingReader<R>) -> Result<Function> {
    let max_depth = reader.config().max_function_depth;

    let mut stack: Vec<Function> = vec![Function {
        name: String::new(),
        args: Vec::new(),
    }];
    let mut named = vec![false];

    loop {
        let event = super::next_event(reader)?;
        match event.kind {
            EventKind::Begin if event.ty.is(&schema::FUNCTION_NAME) => {
                let top = stack.last_mut().expect("work stack is never empty");
                top.name = reader.read_value::<Utf8Format>()?;
                *named.last_mut().expect("parallel stack") = true;
            }
            EventKind::Begin if event.ty.is(&schema::ARGUMENT_REFERENCE) => {
                let field = reader.read_value::<Utf8Format>()?;
                stack
                    .last_mut()
                    .expect("work stack is never empty")
                    .args
                    .push(Argument::Reference(field));
            }
            EventKind::Begin if event.ty.is(&schema::ARGUMENT_STATIC) => {
                let arg = decode_static_argument(reader)?;
                stack
                    .last_mut()
                    .expect("work stack is never empty")
                    .args
                    .push(arg);
            }
            EventKind::Begin if event.ty.is(&schema::FUNCTION) => {
                if stack.len() >= max_depth {
                    return Err(ProtocolError::DepthExceeded(stack.len() + 1));
                }
                stack.push(Function {
                    name: String::new(),
                    args: Vec::new(),
                });
                named.push(false);
            }
            EventKind::End if event.ty.is(&schema::FUNCTION) => {
                let done = stack.pop().expect("work stack is never empty");
                if !named.pop().expect("parallel stack") {
                    return Err(ProtocolError::MissingElement {
                        context: schema::FUNCTION.name,
                        element: schema::FUNCTION_NAME.name,
                    });
                }
                match stack.last_mut() {
                    Some(parent) => parent.args.push(Argument::Function(done)),
                    None => return Ok(done),
                }
            }
            _ => return Err(super::unexpected(schema::FUNCTION.name, &event)),
        }
    }
}

fn decode_static_argument<R: Read>(reader: &mut StreamingReader<R>) -> Result<Argument> {
    let mut type_name = None;
    let mut value = None;
    loop {
        let event = super::next_event(reader)?;
        match event.kind {
            EventKind::Begin if event.ty.is(&schema::ARGUMENT_TYPE) => {
                type_name = Some(reader.read_value::<Utf8Format>()?);
            }
            EventKind::Begin if event.ty.is(&schema::ARGUMENT_VALUE) => {
                value = Some(reader.read_value::<RawFormat>()?);
            }
            EventKind::End if event.ty.is(&schema::ARGUMENT_STATIC) => {
                return Ok(Argument::Static {
                    type_name: type_name.ok_or(ProtocolError::MissingElement {
                        context: schema::ARGUMENT_STATIC.name,
                        element: schema::ARGUMENT_TYPE.name,
                    })?,
                    value: value.ok_or(ProtocolError::MissingElement {
                        context: schema::ARGUMENT_STATIC.name,
                        element: schema::ARGUMENT_VALUE.name,
                    })?,
                });
            }
            _ => return Err(super::unexpected(schema::ARGUMENT_STATIC.name, &event)),
        }
    }
}
