//! # Runtime values and the ADT heap
//!
//! [`Value`] is the tagged union every operand-stack slot, local, argument,
//! and ADT field holds. [`Heap`] is the arena `mkadt`/`dladt` allocate and
//! free records in, addressed by handle rather than raw pointer, so a
//! dangling handle is a checkable fault rather than undefined behavior
//! (§4.4, §9).

use crate::error::Error;

/// A runtime value. Stack slots, locals, arguments, and ADT fields are all
/// one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    I8(i8),
    I32(i32),
    /// An index into the enclosing function's decoded instruction stream,
    /// as produced by `ldfuna`/`ldloca`/`ldarga`.
    StackPtr(u32),
    /// A handle into the [`Heap`], as produced by `mkadt`.
    AdtRef(u32),
}

impl Value {
    /// Reinterpret this value's bit pattern as an unsigned byte, for 8-bit
    /// arithmetic, bitwise, and unsigned-comparison opcodes.
    pub fn raw8(self) -> u8 {
        match self {
            Value::I8(v) => v as u8,
            Value::I32(v) => v as u8,
            Value::StackPtr(v) => v as u8,
            Value::AdtRef(v) => v as u8,
        }
    }

    /// Reinterpret this value's bit pattern as an unsigned 32-bit word, for
    /// 32-bit arithmetic, bitwise, and unsigned-comparison opcodes.
    pub fn raw32(self) -> u32 {
        match self {
            Value::I8(v) => v as u8 as u32,
            Value::I32(v) => v as u32,
            Value::StackPtr(v) => v,
            Value::AdtRef(v) => v,
        }
    }

    /// Same bit pattern, interpreted as a signed byte.
    pub fn as_i8(self) -> i8 {
        self.raw8() as i8
    }

    /// Same bit pattern, interpreted as a signed 32-bit word.
    pub fn as_i32(self) -> i32 {
        self.raw32() as i32
    }
}

/// A single constructed ADT instance living on the heap.
#[derive(Debug, Clone)]
pub struct AdtRecord {
    pub adt_id: u32,
    pub ctor_id: u32,
    pub fields: Vec<Value>,
}

/// Arena of ADT records addressed by handle. Freed slots are tracked on a
/// free list and reused by later allocations; a handle into a freed or
/// never-allocated slot resolves to [`Error::IndexOutOfBounds`].
#[derive(Debug, Default)]
pub struct Heap {
    slots: Vec<Option<AdtRecord>>,
    free_list: Vec<u32>,
}

impl Heap {
    pub fn new() -> Self {
        Heap {
            slots: Vec::new(),
            free_list: Vec::new(),
        }
    }

    /// Allocate a new record, returning its handle.
    pub fn alloc(&mut self, record: AdtRecord) -> u32 {
        if let Some(handle) = self.free_list.pop() {
            self.slots[handle as usize] = Some(record);
            handle
        } else {
            let handle = self.slots.len() as u32;
            self.slots.push(Some(record));
            handle
        }
    }

    /// Free a record, making its handle available for reuse. Freeing an
    /// already-dangling or out-of-range handle is a fault, not a no-op:
    /// `dladt` is expected to be paired with a live `mkadt`.
    pub fn free(&mut self, handle: u32) -> Result<(), Error> {
        let slot = self.slots.get_mut(handle as usize).ok_or_else(|| {
            Error::IndexOutOfBounds(format!("dladt: handle {} was never allocated", handle))
        })?;
        if slot.take().is_none() {
            return Err(Error::IndexOutOfBounds(format!(
                "dladt: handle {} is already freed",
                handle
            )));
        }
        self.free_list.push(handle);
        Ok(())
    }

    pub fn get(&self, handle: u32) -> Result<&AdtRecord, Error> {
        self.slots
            .get(handle as usize)
            .and_then(|slot| slot.as_ref())
            .ok_or_else(|| {
                Error::IndexOutOfBounds(format!("handle {} is dangling or out of range", handle))
            })
    }

    pub fn get_mut(&mut self, handle: u32) -> Result<&mut AdtRecord, Error> {
        self.slots
            .get_mut(handle as usize)
            .and_then(|slot| slot.as_mut())
            .ok_or_else(|| {
                Error::IndexOutOfBounds(format!("handle {} is dangling or out of range", handle))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn teq_compares_discriminant_and_payload() {
        assert_eq!(Value::I32(5), Value::I32(5));
        assert_ne!(Value::I32(5), Value::I8(5));
        assert_ne!(Value::StackPtr(1), Value::AdtRef(1));
    }

    #[test]
    fn raw_reinterpretation_is_bitwise() {
        assert_eq!(Value::I8(-1).raw32(), 0xFF);
        assert_eq!(Value::I32(-1).as_i32(), -1);
        assert_eq!(Value::I32(-1).raw32(), u32::MAX);
    }

    #[test]
    fn heap_alloc_free_and_reuse() {
        let mut heap = Heap::new();
        let h = heap.alloc(AdtRecord {
            adt_id: 0,
            ctor_id: 0,
            fields: vec![Value::I32(1)],
        });
        assert!(heap.get(h).is_ok());
        heap.free(h).unwrap();
        assert!(matches!(heap.get(h), Err(Error::IndexOutOfBounds(_))));
        assert!(matches!(heap.free(h), Err(Error::IndexOutOfBounds(_))));

        let h2 = heap.alloc(AdtRecord {
            adt_id: 1,
            ctor_id: 0,
            fields: vec![],
        });
        assert_eq!(h2, h, "freed slot should be reused");
    }

    #[test]
    fn dangling_handle_is_index_out_of_bounds() {
        let heap = Heap::new();
        assert!(matches!(heap.get(0), Err(Error::IndexOutOfBounds(_))));
    }
}
