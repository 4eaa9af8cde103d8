//! # ADT construction and field access
//!
//! `mkadt dladt ldctor ldfld stfld` (§4.5).

use crate::error::Error;
use crate::interpreter::Interpreter;
use crate::value::{AdtRecord, Value};

pub(super) fn handle_mkadt(vm: &mut Interpreter, adt_id: u32, ctor_id: u32) -> Result<(), Error> {
    let num_fields = vm.adt_ctor_num_fields(adt_id, ctor_id)? as usize;
    let mut fields = Vec::with_capacity(num_fields);
    for _ in 0..num_fields {
        fields.push(vm.pop()?);
    }
    fields.reverse();
    let handle = vm.heap.alloc(AdtRecord {
        adt_id,
        ctor_id,
        fields,
    });
    vm.stack.push(Value::AdtRef(handle));
    Ok(())
}

pub(super) fn handle_dladt(vm: &mut Interpreter) -> Result<(), Error> {
    let handle = expect_adt_ref(vm.pop()?, "dladt")?;
    vm.heap.free(handle)
}

pub(super) fn handle_ldctor(vm: &mut Interpreter) -> Result<(), Error> {
    let handle = expect_adt_ref(vm.pop()?, "ldctor")?;
    let ctor_id = vm.heap.get(handle)?.ctor_id;
    vm.stack.push(Value::I32(ctor_id as i32));
    Ok(())
}

pub(super) fn handle_ldfld(vm: &mut Interpreter, idx: u32) -> Result<(), Error> {
    let handle = expect_adt_ref(vm.pop()?, "ldfld")?;
    let record = vm.heap.get(handle)?;
    let v = *record.fields.get(idx as usize).ok_or_else(|| {
        Error::IndexOutOfBounds(format!(
            "ldfld: field index {} out of range ({} fields)",
            idx,
            record.fields.len()
        ))
    })?;
    vm.stack.push(v);
    Ok(())
}

pub(super) fn handle_stfld(vm: &mut Interpreter, idx: u32) -> Result<(), Error> {
    let handle = expect_adt_ref(vm.pop()?, "stfld")?;
    let v = vm.pop()?;
    let record = vm.heap.get_mut(handle)?;
    let slot = record
        .fields
        .get_mut(idx as usize)
        .ok_or_else(|| Error::IndexOutOfBounds(format!("stfld: field index {} out of range", idx)))?;
    *slot = v;
    Ok(())
}

fn expect_adt_ref(v: Value, op: &str) -> Result<u32, Error> {
    match v {
        Value::AdtRef(h) => Ok(h),
        other => Err(Error::InvalidBytecode(format!(
            "{}: expected an adt reference, found {:?}",
            op, other
        ))),
    }
}
