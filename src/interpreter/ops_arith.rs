//! # Arithmetic, bitwise, and comparison opcodes
//!
//! `add sub mul div rem band bor bxor bnot`, and the ten comparison
//! opcodes `teq tne tlt tlt_s tle tle_s tgt tgt_s tge tge_s` (§4.5, §9).
//!
//! Arithmetic and the unsuffixed comparisons operate on the unsigned
//! reinterpretation of a value's bit pattern; the `_s` comparison variants
//! operate on the signed reinterpretation. `tgt`/`tge` (and their `_s`
//! forms) use strictly-greater and greater-or-equal comparators. A reference
//! draft of this VM aliased them to `tlt`/`tle`'s comparator, which this
//! implementation does not reproduce.

use crate::error::Error;
use crate::interpreter::Interpreter;
use crate::opcode::OperandType;
use crate::value::Value;

pub(super) fn handle_add(vm: &mut Interpreter, t: OperandType) -> Result<(), Error> {
    binop(vm, t, |a, b| a.wrapping_add(b))
}

pub(super) fn handle_sub(vm: &mut Interpreter, t: OperandType) -> Result<(), Error> {
    binop(vm, t, |a, b| a.wrapping_sub(b))
}

pub(super) fn handle_mul(vm: &mut Interpreter, t: OperandType) -> Result<(), Error> {
    binop(vm, t, |a, b| a.wrapping_mul(b))
}

pub(super) fn handle_div(vm: &mut Interpreter, t: OperandType) -> Result<(), Error> {
    checked_binop(vm, t, |a, b| if b == 0 { None } else { Some(a.wrapping_div(b)) })
}

pub(super) fn handle_rem(vm: &mut Interpreter, t: OperandType) -> Result<(), Error> {
    checked_binop(vm, t, |a, b| if b == 0 { None } else { Some(a.wrapping_rem(b)) })
}

pub(super) fn handle_band(vm: &mut Interpreter, t: OperandType) -> Result<(), Error> {
    binop(vm, t, |a, b| a & b)
}

pub(super) fn handle_bor(vm: &mut Interpreter, t: OperandType) -> Result<(), Error> {
    binop(vm, t, |a, b| a | b)
}

pub(super) fn handle_bxor(vm: &mut Interpreter, t: OperandType) -> Result<(), Error> {
    binop(vm, t, |a, b| a ^ b)
}

pub(super) fn handle_bnot(vm: &mut Interpreter, t: OperandType) -> Result<(), Error> {
    unop(vm, t, |a| !a)
}

pub(super) fn handle_teq(vm: &mut Interpreter) -> Result<(), Error> {
    let b = vm.pop()?;
    let a = vm.pop()?;
    vm.stack.push(Value::I8((a == b) as i8));
    Ok(())
}

pub(super) fn handle_tne(vm: &mut Interpreter) -> Result<(), Error> {
    let b = vm.pop()?;
    let a = vm.pop()?;
    vm.stack.push(Value::I8((a != b) as i8));
    Ok(())
}

pub(super) fn handle_tlt(vm: &mut Interpreter, t: OperandType) -> Result<(), Error> {
    cmp_unsigned(vm, t, |a, b| a < b)
}

pub(super) fn handle_tle(vm: &mut Interpreter, t: OperandType) -> Result<(), Error> {
    cmp_unsigned(vm, t, |a, b| a <= b)
}

pub(super) fn handle_tgt(vm: &mut Interpreter, t: OperandType) -> Result<(), Error> {
    cmp_unsigned(vm, t, |a, b| a > b)
}

pub(super) fn handle_tge(vm: &mut Interpreter, t: OperandType) -> Result<(), Error> {
    cmp_unsigned(vm, t, |a, b| a >= b)
}

pub(super) fn handle_tlt_s(vm: &mut Interpreter, t: OperandType) -> Result<(), Error> {
    cmp_signed(vm, t, |a, b| a < b)
}

pub(super) fn handle_tle_s(vm: &mut Interpreter, t: OperandType) -> Result<(), Error> {
    cmp_signed(vm, t, |a, b| a <= b)
}

pub(super) fn handle_tgt_s(vm: &mut Interpreter, t: OperandType) -> Result<(), Error> {
    cmp_signed(vm, t, |a, b| a > b)
}

pub(super) fn handle_tge_s(vm: &mut Interpreter, t: OperandType) -> Result<(), Error> {
    cmp_signed(vm, t, |a, b| a >= b)
}

fn is_byte_width(t: OperandType) -> bool {
    matches!(t, OperandType::I8)
}

fn binop(vm: &mut Interpreter, t: OperandType, f: impl Fn(u32, u32) -> u32) -> Result<(), Error> {
    let b = vm.pop()?;
    let a = vm.pop()?;
    if is_byte_width(t) {
        let r = (f(a.raw8() as u32, b.raw8() as u32) as u8) as i8;
        vm.stack.push(Value::I8(r));
    } else {
        let r = f(a.raw32(), b.raw32()) as i32;
        vm.stack.push(Value::I32(r));
    }
    Ok(())
}

fn checked_binop(
    vm: &mut Interpreter,
    t: OperandType,
    f: impl Fn(u32, u32) -> Option<u32>,
) -> Result<(), Error> {
    let b = vm.pop()?;
    let a = vm.pop()?;
    if is_byte_width(t) {
        let r = f(a.raw8() as u32, b.raw8() as u32)
            .ok_or_else(|| Error::Arithmetic("division or remainder by zero".to_string()))?;
        vm.stack.push(Value::I8((r as u8) as i8));
    } else {
        let r = f(a.raw32(), b.raw32())
            .ok_or_else(|| Error::Arithmetic("division or remainder by zero".to_string()))?;
        vm.stack.push(Value::I32(r as i32));
    }
    Ok(())
}

fn unop(vm: &mut Interpreter, t: OperandType, f: impl Fn(u32) -> u32) -> Result<(), Error> {
    let a = vm.pop()?;
    if is_byte_width(t) {
        let r = (f(a.raw8() as u32) as u8) as i8;
        vm.stack.push(Value::I8(r));
    } else {
        let r = f(a.raw32()) as i32;
        vm.stack.push(Value::I32(r));
    }
    Ok(())
}

fn cmp_unsigned(vm: &mut Interpreter, t: OperandType, f: impl Fn(u32, u32) -> bool) -> Result<(), Error> {
    let b = vm.pop()?;
    let a = vm.pop()?;
    let (x, y) = if is_byte_width(t) {
        (a.raw8() as u32, b.raw8() as u32)
    } else {
        (a.raw32(), b.raw32())
    };
    vm.stack.push(Value::I8(f(x, y) as i8));
    Ok(())
}

fn cmp_signed(vm: &mut Interpreter, t: OperandType, f: impl Fn(i32, i32) -> bool) -> Result<(), Error> {
    let b = vm.pop()?;
    let a = vm.pop()?;
    let (x, y) = if is_byte_width(t) {
        (a.as_i8() as i32, b.as_i8() as i32)
    } else {
        (a.as_i32(), b.as_i32())
    };
    vm.stack.push(Value::I8(f(x, y) as i8));
    Ok(())
}
