//! # Interpreter
//!
//! The stack machine itself: operand stack, frame stack, program counter,
//! and the dispatch loop that realizes every opcode's semantics (§4.5).
//! Per-concern handlers live in the `ops_arith`, `ops_control`, and
//! `ops_adt` submodules, mirroring how the opcode table in §6 groups them.

mod ops_adt;
mod ops_arith;
mod ops_control;
#[cfg(test)]
mod tests;

use crate::error::Error;
use crate::module::{AdtDef, Constant, Module};
use crate::opcode::Instr;
use crate::value::{AdtRecord, Heap, Value};

/// A foreign function: a host-provided closure invoked by function-table
/// index. Receives exactly `num_args` values and returns exactly one.
pub type ForeignFn = Box<dyn Fn(&[Value]) -> Value>;

/// One entry of the interpreter's function table: either a bytecode body
/// or a host-registered closure. Foreign slots never appear in a parsed
/// [`Module`]; they are added to a running interpreter explicitly.
enum FunctionSlot {
    Managed {
        num_args: u32,
        num_locals: u32,
        code: Vec<Instr>,
    },
    Foreign {
        num_args: u32,
        callable: ForeignFn,
    },
}

impl FunctionSlot {
    fn num_args(&self) -> u32 {
        match self {
            FunctionSlot::Managed { num_args, .. } => *num_args,
            FunctionSlot::Foreign { num_args, .. } => *num_args,
        }
    }
}

/// The stack machine: operand stack, frame stack, current function and
/// program counter, and the heap of live ADT records. Has no interior
/// mutability and no process-wide state, so multiple instances may coexist
/// (§5).
pub struct Interpreter {
    adts: Vec<AdtDef>,
    constants: Vec<Constant>,
    functions: Vec<FunctionSlot>,

    pub(crate) stack: Vec<Value>,
    frames: Vec<usize>,
    pub(crate) cf: u32,
    pub(crate) pc: usize,
    running: bool,
    pub(crate) heap: Heap,
}

impl Interpreter {
    /// Build an interpreter over a loaded module. Does not start execution:
    /// call [`Interpreter::run`] or step `[Interpreter::step`] repeatedly
    /// after registering any foreign functions the module's host expects.
    pub fn new(module: Module) -> Self {
        let functions = module
            .functions
            .into_iter()
            .map(|f| FunctionSlot::Managed {
                num_args: f.num_args,
                num_locals: f.num_locals,
                code: f.code,
            })
            .collect();
        Interpreter {
            adts: module.adts,
            constants: module.constants,
            functions,
            stack: Vec::new(),
            frames: Vec::new(),
            cf: 0,
            pc: 0,
            running: false,
            heap: Heap::new(),
        }
    }

    /// Register a foreign function at `index`. `index` must refer to an
    /// existing function-table slot, or be exactly `functions.len()` to
    /// append a new one.
    pub fn register_foreign(
        &mut self,
        index: usize,
        num_args: u32,
        callable: impl Fn(&[Value]) -> Value + 'static,
    ) -> Result<(), Error> {
        let slot = FunctionSlot::Foreign {
            num_args,
            callable: Box::new(callable),
        };
        if index < self.functions.len() {
            self.functions[index] = slot;
            Ok(())
        } else if index == self.functions.len() {
            self.functions.push(slot);
            Ok(())
        } else {
            Err(Error::InvalidBytecode(format!(
                "register_foreign: index {} is not contiguous with function table of length {}",
                index,
                self.functions.len()
            )))
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Start execution by entering function 0 (`MAIN`). Idempotent only in
    /// the sense that calling it twice re-enters function 0 on top of
    /// whatever state is already there; hosts should call this exactly once.
    pub fn start(&mut self) -> Result<(), Error> {
        self.running = true;
        self.enter(0)
    }

    /// Run until `running` clears or a fault occurs. Returns the value left
    /// on top of the operand stack when the root frame returns.
    pub fn run(&mut self) -> Result<Value, Error> {
        if !self.running && self.frames.is_empty() {
            self.start()?;
        }
        while self.running {
            self.step()?;
        }
        self.stack
            .last()
            .copied()
            .ok_or_else(|| Error::StackUnderflow("run: halted with an empty operand stack".to_string()))
    }

    /// Execute exactly one instruction.
    pub fn step(&mut self) -> Result<(), Error> {
        if !self.running {
            return Ok(());
        }
        let instr = *self.current_code().get(self.pc).ok_or_else(|| {
            Error::InvalidBytecode(format!(
                "pc {} out of range for function {} (code len={})",
                self.pc,
                self.cf,
                self.current_code().len()
            ))
        })?;

        let mut advance_pc = true;
        match instr {
            Instr::Add(t) => ops_arith::handle_add(self, t)?,
            Instr::Sub(t) => ops_arith::handle_sub(self, t)?,
            Instr::Mul(t) => ops_arith::handle_mul(self, t)?,
            Instr::Div(t) => ops_arith::handle_div(self, t)?,
            Instr::Rem(t) => ops_arith::handle_rem(self, t)?,
            Instr::BAnd(t) => ops_arith::handle_band(self, t)?,
            Instr::BOr(t) => ops_arith::handle_bor(self, t)?,
            Instr::BXor(t) => ops_arith::handle_bxor(self, t)?,
            Instr::BNot(t) => ops_arith::handle_bnot(self, t)?,
            Instr::Teq => ops_arith::handle_teq(self)?,
            Instr::Tne => ops_arith::handle_tne(self)?,
            Instr::Tlt(t) => ops_arith::handle_tlt(self, t)?,
            Instr::TltS(t) => ops_arith::handle_tlt_s(self, t)?,
            Instr::Tle(t) => ops_arith::handle_tle(self, t)?,
            Instr::TleS(t) => ops_arith::handle_tle_s(self, t)?,
            Instr::Tgt(t) => ops_arith::handle_tgt(self, t)?,
            Instr::TgtS(t) => ops_arith::handle_tgt_s(self, t)?,
            Instr::Tge(t) => ops_arith::handle_tge(self, t)?,
            Instr::TgeS(t) => ops_arith::handle_tge_s(self, t)?,

            Instr::Dup => ops_control::handle_dup(self)?,
            Instr::Drop => ops_control::handle_drop(self)?,
            Instr::Ldc(idx) => ops_control::handle_ldc(self, idx)?,
            Instr::Ldloc(idx) => ops_control::handle_ldloc(self, idx)?,
            Instr::Stloc(idx) => ops_control::handle_stloc(self, idx)?,
            Instr::Ldarg(idx) => ops_control::handle_ldarg(self, idx)?,
            Instr::Starg(idx) => ops_control::handle_starg(self, idx)?,
            Instr::Ldloca(idx) => ops_control::handle_ldloca(self, idx)?,
            Instr::Ldarga(idx) => ops_control::handle_ldarga(self, idx)?,
            Instr::Ldfuna(idx) => ops_control::handle_ldfuna(self, idx)?,
            Instr::Call(idx) => ops_control::handle_call(self, idx, &mut advance_pc)?,
            Instr::Calla => ops_control::handle_calla(self, &mut advance_pc)?,
            Instr::Ret => ops_control::handle_ret(self, &mut advance_pc)?,
            Instr::Br(target) => ops_control::handle_br(self, target, &mut advance_pc),
            Instr::Brtrue(target) => {
                ops_control::handle_brtrue(self, target, &mut advance_pc)?
            }
            Instr::Ldind => ops_control::handle_ldind(self)?,
            Instr::Stind => ops_control::handle_stind(self)?,

            Instr::Mkadt(adt_id, ctor_id) => {
                ops_adt::handle_mkadt(self, adt_id, ctor_id)?
            }
            Instr::Dladt => ops_adt::handle_dladt(self)?,
            Instr::Ldctor => ops_adt::handle_ldctor(self)?,
            Instr::Ldfld(idx) => ops_adt::handle_ldfld(self, idx)?,
            Instr::Stfld(idx) => ops_adt::handle_stfld(self, idx)?,
        }

        if advance_pc && self.running {
            self.pc += 1;
        }
        Ok(())
    }

    fn current_code(&self) -> &[crate::opcode::Instr] {
        match self.functions.get(self.cf as usize) {
            Some(FunctionSlot::Managed { code, .. }) => code,
            _ => {
                // `cf` is only ever set by `enter`, which has already
                // checked the index against the function table, or
                // restored from a value `enter` previously validated.
                panic!("invariant violation: cf {} does not name a managed function", self.cf)
            }
        }
    }

    pub(crate) fn pop(&mut self) -> Result<Value, Error> {
        self.stack
            .pop()
            .ok_or_else(|| Error::StackUnderflow("pop on an empty operand stack".to_string()))
    }

    pub(crate) fn current_base(&self) -> usize {
        *self.frames.last().expect("at least the root frame is always present")
    }

    pub(crate) fn current_num_locals(&self) -> u32 {
        match self.functions.get(self.cf as usize) {
            Some(FunctionSlot::Managed { num_locals, .. }) => *num_locals,
            _ => 0,
        }
    }

    pub(crate) fn current_num_args(&self) -> u32 {
        self.functions
            .get(self.cf as usize)
            .map(FunctionSlot::num_args)
            .unwrap_or(0)
    }

    /// `Enter(fn_idx)` from §4.5: grows a new frame for a managed function,
    /// or synchronously invokes a foreign callable and folds its result
    /// onto the stack in place of its arguments.
    pub(crate) fn enter(&mut self, fn_idx: u32) -> Result<(), Error> {
        let slot = self.functions.get(fn_idx as usize).ok_or_else(|| {
            Error::IndexOutOfBounds(format!(
                "calla/call: function index {} out of range (table len={})",
                fn_idx,
                self.functions.len()
            ))
        })?;
        match slot {
            FunctionSlot::Managed { num_locals, .. } => {
                let num_locals = *num_locals;
                self.stack.push(Value::I32(self.cf as i32));
                self.stack.push(Value::I32(self.pc as i32));
                let base = self.stack.len();
                self.stack.resize(base + num_locals as usize, Value::I32(0));
                self.frames.push(base);
                self.cf = fn_idx;
                self.pc = 0;
                Ok(())
            }
            FunctionSlot::Foreign { num_args, callable } => {
                let num_args = *num_args as usize;
                if self.stack.len() < num_args {
                    return Err(Error::StackUnderflow(format!(
                        "foreign function at index {} expects {} arguments, stack has {}",
                        fn_idx,
                        num_args,
                        self.stack.len()
                    )));
                }
                let off = self.stack.len() - num_args;
                let args: Vec<Value> = self.stack[off..].to_vec();
                let result = callable(&args);
                self.stack.truncate(off);
                self.stack.push(result);
                Ok(())
            }
        }
    }

    /// `Leave` from §4.5, triggered by `ret`.
    pub(crate) fn leave(&mut self) -> Result<(), Error> {
        let rv = self.pop()?;
        let base = self.current_base();
        self.stack.truncate(base);

        if self.frames.len() == 1 {
            self.frames.pop();
            self.stack.push(rv);
            self.running = false;
            return Ok(());
        }

        let saved_pc = self.pop()?;
        let saved_cf = self.pop()?;
        let returning_num_args = self.current_num_args() as usize;
        let trunc_to = self.stack.len().saturating_sub(returning_num_args);
        self.stack.truncate(trunc_to);
        self.stack.push(rv);
        self.frames.pop();

        self.cf = match saved_cf {
            Value::I32(v) => v as u32,
            other => {
                return Err(Error::InvalidBytecode(format!(
                    "corrupt saved caller-function slot: {:?}",
                    other
                )))
            }
        };
        self.pc = match saved_pc {
            Value::I32(v) => v as usize,
            other => {
                return Err(Error::InvalidBytecode(format!(
                    "corrupt saved program-counter slot: {:?}",
                    other
                )))
            }
        };
        Ok(())
    }

    pub(crate) fn constant(&self, idx: u32) -> Result<&Constant, Error> {
        self.constants.get(idx as usize).ok_or_else(|| {
            Error::InvalidBytecode(format!(
                "constant index {} out of range (pool len={})",
                idx,
                self.constants.len()
            ))
        })
    }

    pub(crate) fn adt_ctor_num_fields(&self, adt_id: u32, ctor_id: u32) -> Result<u32, Error> {
        let adt = self.adts.get(adt_id as usize).ok_or_else(|| {
            Error::InvalidBytecode(format!("adt id {} out of range", adt_id))
        })?;
        let ctor = adt.ctors.get(ctor_id as usize).ok_or_else(|| {
            Error::InvalidBytecode(format!("ctor id {} out of range for adt {}", ctor_id, adt_id))
        })?;
        Ok(ctor.num_fields)
    }

    /// Deep-copy a constant onto the heap (for ADT constants) or into a
    /// plain scalar `Value` (for `I8`/`I32`), producing a fresh `AdtRef`
    /// (and fresh arena records for every nested ADT) each time it loads.
    pub(crate) fn materialize_constant(&mut self, idx: u32) -> Result<Value, Error> {
        let constant = self.constant(idx)?.clone();
        self.materialize(&constant)
    }

    fn materialize(&mut self, constant: &Constant) -> Result<Value, Error> {
        match constant {
            Constant::I8(v) => Ok(Value::I8(*v)),
            Constant::I32(v) => Ok(Value::I32(*v)),
            Constant::Adt {
                adt_id,
                ctor_id,
                fields,
            } => {
                let mut materialized = Vec::with_capacity(fields.len());
                for field in fields {
                    materialized.push(self.materialize(field)?);
                }
                let handle = self.heap.alloc(AdtRecord {
                    adt_id: *adt_id,
                    ctor_id: *ctor_id,
                    fields: materialized,
                });
                Ok(Value::AdtRef(handle))
            }
        }
    }
}
