//! # Module format
//!
//! [`Module`] is the fully-parsed, in-memory form of a `.svm` image: the ADT
//! table, the constant pool, and the function table. [`Module::parse`] and
//! [`Module::dump`] are exact inverses of each other (§4.2, §6); the magic
//! number `0xBADDCAFE` is checked first and rejected with
//! [`Error::ParseError`] before anything else is read.
//!
//! Parsing an ADT constant reads `adt_id`, then `ctor_id`, then its field
//! list, each exactly once. Earlier drafts of this format read the ADT
//! table index twice and never read the constructor index at all.

use crate::error::Error;
use crate::opcode::{decode_code, encode_code, Instr};
use crate::wire::{Reader, Writer};

pub const MAGIC: u32 = 0xBADD_CAFE;

/// One constructor of an ADT: how many fields a value built with it carries.
#[derive(Debug, Clone)]
pub struct CtorDef {
    pub num_fields: u32,
}

/// One entry of the ADT table: the constructors a given ADT may be built with.
#[derive(Debug, Clone)]
pub struct AdtDef {
    pub ctors: Vec<CtorDef>,
}

/// A constant-pool entry. `Adt` is recursive: its fields are themselves
/// constants, constructed eagerly when the module loads.
#[derive(Debug, Clone)]
pub enum Constant {
    I8(i8),
    I32(i32),
    Adt {
        adt_id: u32,
        ctor_id: u32,
        fields: Vec<Constant>,
    },
}

/// A function body as it appears on the wire. Only managed (bytecode)
/// functions are part of the serialized module; foreign functions are
/// registered into a running interpreter afterward and never dumped.
#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub num_args: u32,
    pub num_locals: u32,
    pub code: Vec<Instr>,
}

/// A fully loaded module: everything a program needs except the host's
/// foreign-function bindings.
#[derive(Debug, Clone, Default)]
pub struct Module {
    pub adts: Vec<AdtDef>,
    pub constants: Vec<Constant>,
    pub functions: Vec<FunctionDef>,
}

fn parse_ctor(r: &mut Reader) -> Result<CtorDef, Error> {
    Ok(CtorDef {
        num_fields: r.read_u32()?,
    })
}

fn parse_adt(r: &mut Reader) -> Result<AdtDef, Error> {
    Ok(AdtDef {
        ctors: r.read_seq(parse_ctor)?,
    })
}

fn parse_constant(r: &mut Reader) -> Result<Constant, Error> {
    match r.read_u8()? {
        1 => Ok(Constant::I8(r.read_i8()?)),
        2 => Ok(Constant::I32(r.read_i32()?)),
        3 => {
            let adt_id = r.read_u32()?;
            let ctor_id = r.read_u32()?;
            let fields = r.read_seq(parse_constant)?;
            Ok(Constant::Adt {
                adt_id,
                ctor_id,
                fields,
            })
        }
        other => Err(Error::ParseError(format!(
            "unknown constant tag {}",
            other
        ))),
    }
}

fn parse_function(r: &mut Reader) -> Result<FunctionDef, Error> {
    let num_args = r.read_u32()?;
    let num_locals = r.read_u32()?;
    let code = decode_code(r)?;
    Ok(FunctionDef {
        num_args,
        num_locals,
        code,
    })
}

fn dump_ctor(w: &mut Writer, c: &CtorDef) {
    w.write_u32(c.num_fields);
}

fn dump_adt(w: &mut Writer, a: &AdtDef) {
    w.write_seq(&a.ctors, dump_ctor);
}

fn dump_constant(w: &mut Writer, c: &Constant) {
    match c {
        Constant::I8(v) => {
            w.write_u8(1);
            w.write_i8(*v);
        }
        Constant::I32(v) => {
            w.write_u8(2);
            w.write_i32(*v);
        }
        Constant::Adt {
            adt_id,
            ctor_id,
            fields,
        } => {
            w.write_u8(3);
            w.write_u32(*adt_id);
            w.write_u32(*ctor_id);
            w.write_seq(fields, dump_constant);
        }
    }
}

fn dump_function(w: &mut Writer, f: &FunctionDef) {
    w.write_u32(f.num_args);
    w.write_u32(f.num_locals);
    encode_code(w, &f.code);
}

impl Module {
    /// Parse a module image: magic number, ADT table, constant pool, then
    /// function table, in that order.
    pub fn parse(bytes: &[u8]) -> Result<Module, Error> {
        let mut r = Reader::new(bytes);
        let magic = r.read_u32()?;
        if magic != MAGIC {
            return Err(Error::ParseError(format!(
                "bad magic number: expected {:#010X}, got {:#010X}",
                MAGIC, magic
            )));
        }
        let adts = r.read_seq(parse_adt)?;
        let constants = r.read_seq(parse_constant)?;
        let functions = r.read_seq(parse_function)?;
        if !r.is_at_end() {
            return Err(Error::ParseError(
                "trailing bytes after function table".to_string(),
            ));
        }
        Ok(Module {
            adts,
            constants,
            functions,
        })
    }

    /// Serialize this module back into a byte image `parse` can read.
    pub fn dump(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.write_u32(MAGIC);
        w.write_seq(&self.adts, dump_adt);
        w.write_seq(&self.constants, dump_constant);
        w.write_seq(&self.functions, dump_function);
        w.into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::OperandType;

    fn sample_module() -> Module {
        Module {
            adts: vec![AdtDef {
                ctors: vec![CtorDef { num_fields: 2 }, CtorDef { num_fields: 0 }],
            }],
            constants: vec![
                Constant::I32(42),
                Constant::Adt {
                    adt_id: 0,
                    ctor_id: 0,
                    fields: vec![Constant::I8(1), Constant::I32(-1)],
                },
            ],
            functions: vec![FunctionDef {
                num_args: 1,
                num_locals: 1,
                code: vec![
                    Instr::Ldarg(0),
                    Instr::Ldc(0),
                    Instr::Add(OperandType::I32),
                    Instr::Ret,
                ],
            }],
        }
    }

    #[test]
    fn round_trips_through_dump_and_parse() {
        let module = sample_module();
        let bytes = module.dump();
        let parsed = Module::parse(&bytes).unwrap();

        assert_eq!(parsed.adts.len(), 1);
        assert_eq!(parsed.adts[0].ctors.len(), 2);
        assert_eq!(parsed.adts[0].ctors[0].num_fields, 2);
        assert_eq!(parsed.constants.len(), 2);
        match &parsed.constants[1] {
            Constant::Adt {
                adt_id,
                ctor_id,
                fields,
            } => {
                assert_eq!(*adt_id, 0);
                assert_eq!(*ctor_id, 0);
                assert_eq!(fields.len(), 2);
            }
            other => panic!("expected Adt constant, got {:?}", other),
        }
        assert_eq!(parsed.functions.len(), 1);
        assert_eq!(parsed.functions[0].code.len(), 4);
    }

    #[test]
    fn rejects_bad_magic() {
        let bytes = vec![0u8, 0, 0, 0];
        assert!(matches!(Module::parse(&bytes), Err(Error::ParseError(_))));
    }

    #[test]
    fn rejects_trailing_bytes() {
        let mut bytes = sample_module().dump();
        bytes.push(0xFF);
        assert!(matches!(Module::parse(&bytes), Err(Error::ParseError(_))));
    }
}
