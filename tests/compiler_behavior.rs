//! Compiler-level behavior: constant pool dedup, slot reuse, union-mask
//! constraints, and the compile-time errors that replace what would
//! otherwise be runtime use-after-free / undefined-name bugs.

use arenalang::ast::{Expr, Literal, Program, Stmt};
use arenalang::instr::Opcode;
use arenalang::{CompileError, Compiler};

fn alloc(size: i32, body: Vec<Stmt>) -> Program {
    Program { stmts: vec![Stmt::Alloc { size: Expr::Literal(Literal::Int(size)), body, line: 1 }] }
}

fn assign(name: &str, value: Expr) -> Stmt {
    Stmt::Assign { name: name.to_string(), constraint: None, value, line: 1 }
}

#[test]
fn identical_literals_share_one_constant_pool_slot() {
    let program = alloc(
        16,
        vec![
            assign("a", Expr::Literal(Literal::Int(5))),
            assign("b", Expr::Literal(Literal::Int(5))),
            assign("c", Expr::Literal(Literal::Int(6))),
        ],
    );
    let code = Compiler::new().compile(&program).unwrap();
    assert_eq!(code.constants.len(), 2);
}

#[test]
fn reassigning_a_name_reuses_its_slot_rather_than_reallocating() {
    let program = alloc(
        16,
        vec![
            assign("x", Expr::Literal(Literal::Int(1))),
            assign("x", Expr::Literal(Literal::Int(2))),
        ],
    );
    let code = Compiler::new().compile(&program).unwrap();
    let allocs: Vec<i64> = code
        .instructions
        .iter()
        .filter(|i| i.opcode == Opcode::VarAlloc)
        .map(|i| i.argument)
        .collect();
    assert_eq!(allocs.len(), 1, "second assignment must not re-VAR_ALLOC the same slot");
}

#[test]
fn using_a_name_after_free_is_a_compile_error_not_a_runtime_one() {
    let program = alloc(
        16,
        vec![
            assign("x", Expr::Literal(Literal::Int(1))),
            Stmt::Free { name: "x".to_string(), line: 2 },
            assign("y", Expr::Ident("x".to_string())),
        ],
    );
    let errs = Compiler::new().compile(&program).unwrap_err();
    assert!(matches!(errs[0], CompileError::UndefinedVariable { ref name, .. } if name == "x"));
}

#[test]
fn unknown_type_name_in_a_union_constraint_is_rejected() {
    let program = alloc(
        16,
        vec![Stmt::Assign {
            name: "x".to_string(),
            constraint: Some(vec!["int".to_string(), "nope".to_string()]),
            value: Expr::Literal(Literal::Int(1)),
            line: 1,
        }],
    );
    let errs = Compiler::new().compile(&program).unwrap_err();
    assert!(matches!(errs[0], CompileError::UnknownTypeName { ref name, .. } if name == "nope"));
}

#[test]
fn statements_outside_any_alloc_block_are_rejected() {
    let program = Program { stmts: vec![assign("x", Expr::Literal(Literal::Int(1)))] };
    let errs = Compiler::new().compile(&program).unwrap_err();
    assert!(matches!(errs[0], CompileError::OutsideAllocBlock { .. }));
}

#[test]
fn undeclared_struct_type_in_a_literal_is_rejected() {
    let program = alloc(
        32,
        vec![assign(
            "v",
            Expr::StructLiteral { name: "missing".to_string(), fields: vec![] },
        )],
    );
    let errs = Compiler::new().compile(&program).unwrap_err();
    assert!(matches!(errs[0], CompileError::UndefinedStructType { ref name, .. } if name == "missing"));
}

#[test]
fn field_access_on_a_scalar_variable_is_rejected() {
    let program = alloc(
        16,
        vec![
            assign("x", Expr::Literal(Literal::Int(1))),
            Stmt::FieldAssign {
                target: "x".to_string(),
                field: "y".to_string(),
                value: Expr::Literal(Literal::Int(2)),
                line: 2,
            },
        ],
    );
    let errs = Compiler::new().compile(&program).unwrap_err();
    assert!(matches!(errs[0], CompileError::NotAStructOrTuple { ref name, .. } if name == "x"));
}
