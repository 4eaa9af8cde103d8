//! A register-less, stack-based bytecode virtual machine: a module format,
//! a static validator, and a stack-machine interpreter.
//!
//! ```text
//! let module = Module::parse(&bytes)?;
//! validate(&module)?;
//! let mut vm = Interpreter::new(module);
//! vm.register_foreign(1, 1, |args| args[0])?;
//! let result = vm.run()?;
//! ```

mod error;
mod interpreter;
mod module;
mod opcode;
mod validator;
mod value;
mod wire;

pub use error::Error;
pub use interpreter::{ForeignFn, Interpreter};
pub use module::{AdtDef, Constant, CtorDef, FunctionDef, Module, MAGIC};
pub use opcode::{Instr, OperandType};
pub use validator::validate;
pub use value::{AdtRecord, Heap, Value};
