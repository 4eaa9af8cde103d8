//! # Static validator
//!
//! A single linear pass over every function body, checked against the
//! module's own tables (§4.3). Validation never inspects runtime state; it
//! only rejects instructions whose immediates are out of range for the
//! table they index into. Field indices on `ldfld`/`stfld` are deliberately
//! left unchecked here: they depend on the dynamic constructor of the
//! popped ADT reference, which this pass cannot know.

use crate::error::Error;
use crate::module::Module;
use crate::opcode::Instr;

/// Walk every function in `module` and reject the first instruction whose
/// operand is out of range for its table.
pub fn validate(module: &Module) -> Result<(), Error> {
    for (fi, function) in module.functions.iter().enumerate() {
        for (ii, instr) in function.code.iter().enumerate() {
            check_instr(module, fi, ii, function.num_args, function.num_locals, function.code.len(), instr)?;
        }
    }
    Ok(())
}

fn fault(fi: usize, ii: usize, what: impl std::fmt::Display) -> Error {
    Error::InvalidBytecode(format!("function {} instruction {}: {}", fi, ii, what))
}

#[allow(clippy::too_many_arguments)]
fn check_instr(
    module: &Module,
    fi: usize,
    ii: usize,
    num_args: u32,
    num_locals: u32,
    code_len: usize,
    instr: &Instr,
) -> Result<(), Error> {
    let require = |cond: bool, what: &str| -> Result<(), Error> {
        if cond {
            Ok(())
        } else {
            Err(fault(fi, ii, what))
        }
    };

    match *instr {
        Instr::Ldloc(idx) | Instr::Stloc(idx) | Instr::Ldloca(idx) => {
            require(idx < num_locals, &format!("local index {} out of range (num_locals={})", idx, num_locals))
        }
        Instr::Ldarg(idx) | Instr::Starg(idx) | Instr::Ldarga(idx) => {
            require(idx < num_args, &format!("argument index {} out of range (num_args={})", idx, num_args))
        }
        Instr::Ldc(idx) => require(
            (idx as usize) < module.constants.len(),
            &format!("constant index {} out of range (pool len={})", idx, module.constants.len()),
        ),
        Instr::Call(idx) | Instr::Ldfuna(idx) => require(
            (idx as usize) < module.functions.len(),
            &format!("function index {} out of range (table len={})", idx, module.functions.len()),
        ),
        Instr::Br(target) | Instr::Brtrue(target) => require(
            (target as usize) < code_len,
            &format!("branch target {} out of range (code len={})", target, code_len),
        ),
        Instr::Mkadt(adt_id, ctor_id) => {
            let adt = module
                .adts
                .get(adt_id as usize)
                .ok_or_else(|| fault(fi, ii, format!("adt id {} out of range (adt table len={})", adt_id, module.adts.len())))?;
            require(
                (ctor_id as usize) < adt.ctors.len(),
                &format!("ctor id {} out of range for adt {} (ctors len={})", ctor_id, adt_id, adt.ctors.len()),
            )
        }
        // Arithmetic, bitwise, comparison, and no-index control opcodes carry
        // no table reference to check; their operand-type tags were already
        // validated to be in {1,2,3,4} during decoding.
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::FunctionDef;
    use crate::opcode::OperandType;

    fn module_with(functions: Vec<FunctionDef>) -> Module {
        Module {
            adts: vec![],
            constants: vec![],
            functions,
        }
    }

    #[test]
    fn rejects_out_of_range_local() {
        let module = module_with(vec![FunctionDef {
            num_args: 0,
            num_locals: 1,
            code: vec![Instr::Ldloc(5)],
        }]);
        assert!(matches!(validate(&module), Err(Error::InvalidBytecode(_))));
    }

    #[test]
    fn rejects_out_of_range_branch_target() {
        let module = module_with(vec![FunctionDef {
            num_args: 0,
            num_locals: 0,
            code: vec![Instr::Br(3)],
        }]);
        assert!(matches!(validate(&module), Err(Error::InvalidBytecode(_))));
    }

    #[test]
    fn accepts_well_formed_function() {
        let module = module_with(vec![FunctionDef {
            num_args: 1,
            num_locals: 1,
            code: vec![
                Instr::Ldarg(0),
                Instr::Stloc(0),
                Instr::Ldloc(0),
                Instr::Add(OperandType::I32),
                Instr::Ret,
            ],
        }]);
        assert!(validate(&module).is_ok());
    }

    #[test]
    fn does_not_check_field_indices() {
        let module = Module {
            adts: vec![crate::module::AdtDef {
                ctors: vec![crate::module::CtorDef { num_fields: 1 }],
            }],
            constants: vec![],
            functions: vec![FunctionDef {
                num_args: 0,
                num_locals: 0,
                code: vec![Instr::Ldfld(99)],
            }],
        };
        assert!(validate(&module).is_ok());
    }
}
