//! Scenario tests against the concrete walkthroughs of a module executing
//! end to end. Validator- and parser-rejection scenarios live beside the
//! components that raise them (`validator.rs`, `module.rs`); this module
//! covers the interpreter scenarios that need a full `run`.

use std::cell::RefCell;
use std::rc::Rc;

use crate::interpreter::Interpreter;
use crate::module::{AdtDef, CtorDef, FunctionDef, Module};
use crate::opcode::{Instr, OperandType};
use crate::value::Value;

fn module_with_one_function(
    num_args: u32,
    num_locals: u32,
    code: Vec<Instr>,
    constants: Vec<crate::module::Constant>,
) -> Module {
    Module {
        adts: vec![],
        constants,
        functions: vec![FunctionDef {
            num_args,
            num_locals,
            code,
        }],
    }
}

#[test]
fn s1_round_trip_and_run() {
    use crate::module::Constant;

    let module = module_with_one_function(
        0,
        1,
        vec![Instr::Ldc(0), Instr::Ret],
        vec![Constant::I32(1), Constant::I32(10)],
    );

    let bytes = module.dump();
    let parsed = Module::parse(&bytes).unwrap();
    crate::validator::validate(&parsed).unwrap();

    let mut vm = Interpreter::new(parsed);
    let rv = vm.run().unwrap();
    assert_eq!(rv, Value::I32(1));
}

#[test]
fn s2_loop_with_foreign_print() {
    use crate::module::Constant;

    // Function 0: local0 = 1; while local0 <= 10 { print(local0); local0 += 1 }; return local0.
    let code = vec![
        Instr::Ldc(0),                    // 0: push 1
        Instr::Stloc(0),                  // 1: local0 = 1
        Instr::Ldloc(0),                  // 2: loop check: push local0
        Instr::Ldc(1),                    // 3: push 10
        Instr::Tle(OperandType::I32),     // 4: local0 <= 10
        Instr::Brtrue(7),                 // 5: -> body
        Instr::Br(15),                    // 6: -> exit
        Instr::Ldloc(0),                  // 7: body: push local0
        Instr::Call(1),                   // 8: call foreign print
        Instr::Drop,                      // 9: discard its result
        Instr::Ldloc(0),                  // 10
        Instr::Ldc(0),                    // 11: push 1
        Instr::Add(OperandType::I32),     // 12
        Instr::Stloc(0),                  // 13: local0 += 1
        Instr::Br(2),                     // 14: loop back
        Instr::Ldloc(0),                  // 15: exit: push local0
        Instr::Ret,                       // 16
    ];

    let module = Module {
        adts: vec![],
        constants: vec![Constant::I32(1), Constant::I32(10)],
        functions: vec![
            FunctionDef {
                num_args: 0,
                num_locals: 1,
                code,
            },
            // Placeholder slot for the foreign print function; replaced
            // before the module runs.
            FunctionDef {
                num_args: 1,
                num_locals: 0,
                code: vec![],
            },
        ],
    };
    crate::validator::validate(&module).unwrap();

    let recorded = Rc::new(RefCell::new(Vec::new()));
    let recorded_for_closure = Rc::clone(&recorded);

    let mut vm = Interpreter::new(module);
    vm.register_foreign(1, 1, move |args: &[Value]| {
        match args[0] {
            Value::I32(v) => recorded_for_closure.borrow_mut().push(v),
            other => panic!("unexpected argument {:?}", other),
        }
        args[0]
    })
    .unwrap();

    let rv = vm.run().unwrap();
    assert_eq!(rv, Value::I32(11));
    assert_eq!(*recorded.borrow(), (1..=10).collect::<Vec<i32>>());
}

#[test]
fn s3_adt_construct_and_field_read() {
    use crate::module::Constant;

    let module = Module {
        adts: vec![AdtDef {
            ctors: vec![CtorDef { num_fields: 2 }],
        }],
        constants: vec![Constant::I32(7), Constant::I32(9)],
        functions: vec![FunctionDef {
            num_args: 0,
            num_locals: 1,
            code: vec![
                Instr::Ldc(0),
                Instr::Ldc(1),
                Instr::Mkadt(0, 0),
                Instr::Dup,
                Instr::Ldfld(0),
                Instr::Stloc(0),
                Instr::Ldfld(1),
                Instr::Ret,
            ],
        }],
    };
    crate::validator::validate(&module).unwrap();

    let mut vm = Interpreter::new(module);
    let rv = vm.run().unwrap();
    assert_eq!(rv, Value::I32(9));
}

#[test]
fn s4_unsigned_vs_signed_compare() {
    use crate::module::Constant;

    let unsigned_module = module_with_one_function(
        0,
        0,
        vec![
            Instr::Ldc(0),
            Instr::Ldc(1),
            Instr::Tlt(OperandType::I32),
            Instr::Ret,
        ],
        vec![Constant::I32(-1), Constant::I32(1)],
    );
    let mut vm = Interpreter::new(unsigned_module);
    assert_eq!(vm.run().unwrap(), Value::I8(0));

    let signed_module = module_with_one_function(
        0,
        0,
        vec![
            Instr::Ldc(0),
            Instr::Ldc(1),
            Instr::TltS(OperandType::I32),
            Instr::Ret,
        ],
        vec![Constant::I32(-1), Constant::I32(1)],
    );
    let mut vm = Interpreter::new(signed_module);
    assert_eq!(vm.run().unwrap(), Value::I8(1));
}

#[test]
fn tgt_is_not_aliased_to_tlt() {
    use crate::module::Constant;

    // 5 > 3 must be true under tgt; a buggy implementation that reuses
    // tlt's comparator would report false here.
    let module = module_with_one_function(
        0,
        0,
        vec![
            Instr::Ldc(0),
            Instr::Ldc(1),
            Instr::Tgt(OperandType::I32),
            Instr::Ret,
        ],
        vec![Constant::I32(5), Constant::I32(3)],
    );
    let mut vm = Interpreter::new(module);
    assert_eq!(vm.run().unwrap(), Value::I8(1));
}

#[test]
fn div_by_zero_is_an_arithmetic_fault() {
    use crate::module::Constant;

    let module = module_with_one_function(
        0,
        0,
        vec![
            Instr::Ldc(0),
            Instr::Ldc(1),
            Instr::Div(OperandType::I32),
            Instr::Ret,
        ],
        vec![Constant::I32(10), Constant::I32(0)],
    );
    let mut vm = Interpreter::new(module);
    assert!(matches!(vm.run(), Err(crate::error::Error::Arithmetic(_))));
}

#[test]
fn dangling_adt_handle_faults() {
    let module = Module {
        adts: vec![AdtDef {
            ctors: vec![CtorDef { num_fields: 0 }],
        }],
        constants: vec![],
        functions: vec![FunctionDef {
            num_args: 0,
            num_locals: 0,
            code: vec![
                Instr::Mkadt(0, 0),
                Instr::Dup,
                Instr::Dladt,
                Instr::Ldctor,
                Instr::Ret,
            ],
        }],
    };
    let mut vm = Interpreter::new(module);
    assert!(matches!(
        vm.run(),
        Err(crate::error::Error::IndexOutOfBounds(_))
    ));
}
