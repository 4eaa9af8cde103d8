//! # Stack manipulation, locals/args, and control-flow opcodes
//!
//! `dup drop ldc ldloc stloc ldarg starg ldloca ldarga ldfuna call calla
//! ret br brtrue ldind stind` (§4.5, §6).

use crate::error::Error;
use crate::interpreter::Interpreter;
use crate::value::Value;

pub(super) fn handle_dup(vm: &mut Interpreter) -> Result<(), Error> {
    let top = *vm
        .stack
        .last()
        .ok_or_else(|| Error::StackUnderflow("dup on an empty operand stack".to_string()))?;
    vm.stack.push(top);
    Ok(())
}

pub(super) fn handle_drop(vm: &mut Interpreter) -> Result<(), Error> {
    if vm.stack.len() == vm.current_base() + vm.current_num_locals() as usize {
        return Err(Error::StackUnderflow(
            "drop would consume a locals slot of the current frame".to_string(),
        ));
    }
    vm.pop()?;
    Ok(())
}

pub(super) fn handle_ldc(vm: &mut Interpreter, idx: u32) -> Result<(), Error> {
    let v = vm.materialize_constant(idx)?;
    vm.stack.push(v);
    Ok(())
}

pub(super) fn handle_ldloc(vm: &mut Interpreter, idx: u32) -> Result<(), Error> {
    let abs = vm.current_base() + idx as usize;
    vm.stack.push(read_slot(vm, abs, "ldloc")?);
    Ok(())
}

pub(super) fn handle_stloc(vm: &mut Interpreter, idx: u32) -> Result<(), Error> {
    let abs = vm.current_base() + idx as usize;
    let v = vm.pop()?;
    write_slot(vm, abs, v, "stloc")
}

pub(super) fn handle_ldarg(vm: &mut Interpreter, idx: u32) -> Result<(), Error> {
    let abs = arg_index(vm, idx)?;
    vm.stack.push(read_slot(vm, abs, "ldarg")?);
    Ok(())
}

pub(super) fn handle_starg(vm: &mut Interpreter, idx: u32) -> Result<(), Error> {
    let abs = arg_index(vm, idx)?;
    let v = vm.pop()?;
    write_slot(vm, abs, v, "starg")
}

pub(super) fn handle_ldloca(vm: &mut Interpreter, idx: u32) -> Result<(), Error> {
    let abs = vm.current_base() + idx as usize;
    vm.stack.push(Value::StackPtr(abs as u32));
    Ok(())
}

pub(super) fn handle_ldarga(vm: &mut Interpreter, idx: u32) -> Result<(), Error> {
    let abs = arg_index(vm, idx)?;
    vm.stack.push(Value::StackPtr(abs as u32));
    Ok(())
}

pub(super) fn handle_ldfuna(vm: &mut Interpreter, idx: u32) -> Result<(), Error> {
    vm.stack.push(Value::StackPtr(idx));
    Ok(())
}

pub(super) fn handle_call(vm: &mut Interpreter, idx: u32, advance_pc: &mut bool) -> Result<(), Error> {
    // The return address is the instruction after this one; it must be
    // committed to `pc` before `enter` captures it, since `enter` overwrites
    // `pc` for the callee.
    vm.pc += 1;
    vm.enter(idx)?;
    *advance_pc = false;
    Ok(())
}

pub(super) fn handle_calla(vm: &mut Interpreter, advance_pc: &mut bool) -> Result<(), Error> {
    let fn_ptr = vm.pop()?;
    let idx = match fn_ptr {
        Value::StackPtr(i) => i,
        other => {
            return Err(Error::InvalidBytecode(format!(
                "calla: expected a function pointer value, found {:?}",
                other
            )))
        }
    };
    vm.pc += 1;
    vm.enter(idx)?;
    *advance_pc = false;
    Ok(())
}

pub(super) fn handle_ret(vm: &mut Interpreter, advance_pc: &mut bool) -> Result<(), Error> {
    vm.leave()?;
    *advance_pc = false;
    Ok(())
}

pub(super) fn handle_br(vm: &mut Interpreter, target: u32, advance_pc: &mut bool) {
    vm.pc = target as usize;
    *advance_pc = false;
}

pub(super) fn handle_brtrue(vm: &mut Interpreter, target: u32, advance_pc: &mut bool) -> Result<(), Error> {
    let cond = vm.pop()?;
    let taken = match cond {
        Value::I8(v) => v != 0,
        other => {
            return Err(Error::InvalidBytecode(format!(
                "brtrue: expected an i8 condition, found {:?}",
                other
            )))
        }
    };
    if taken {
        vm.pc = target as usize;
        *advance_pc = false;
    }
    Ok(())
}

pub(super) fn handle_ldind(vm: &mut Interpreter) -> Result<(), Error> {
    let ptr = vm.pop()?;
    let abs = expect_stack_ptr(ptr, "ldind")?;
    let v = *vm
        .stack
        .get(abs as usize)
        .ok_or_else(|| Error::IndexOutOfBounds(format!("ldind: stack pointer {} out of range", abs)))?;
    vm.stack.push(v);
    Ok(())
}

pub(super) fn handle_stind(vm: &mut Interpreter) -> Result<(), Error> {
    let ptr = vm.pop()?;
    let abs = expect_stack_ptr(ptr, "stind")?;
    let v = vm.pop()?;
    let slot = vm
        .stack
        .get_mut(abs as usize)
        .ok_or_else(|| Error::IndexOutOfBounds(format!("stind: stack pointer {} out of range", abs)))?;
    *slot = v;
    Ok(())
}

fn arg_index(vm: &Interpreter, idx: u32) -> Result<usize, Error> {
    let num_args = vm.current_num_args() as usize;
    vm.current_base()
        .checked_sub(2 + num_args)
        .and_then(|base_of_args| base_of_args.checked_add(idx as usize))
        .ok_or_else(|| {
            Error::IndexOutOfBounds(format!(
                "argument index {} out of range (num_args={})",
                idx, num_args
            ))
        })
}

fn read_slot(vm: &Interpreter, abs: usize, op: &str) -> Result<Value, Error> {
    vm.stack
        .get(abs)
        .copied()
        .ok_or_else(|| Error::IndexOutOfBounds(format!("{}: stack slot {} out of range", op, abs)))
}

fn write_slot(vm: &mut Interpreter, abs: usize, v: Value, op: &str) -> Result<(), Error> {
    let slot = vm
        .stack
        .get_mut(abs)
        .ok_or_else(|| Error::IndexOutOfBounds(format!("{}: stack slot {} out of range", op, abs)))?;
    *slot = v;
    Ok(())
}

fn expect_stack_ptr(v: Value, op: &str) -> Result<u32, Error> {
    match v {
        Value::StackPtr(p) => Ok(p),
        other => Err(Error::InvalidBytecode(format!(
            "{}: expected a stack pointer value, found {:?}",
            op, other
        ))),
    }
}
