//! Hand-built programs exercised by the `alc` demo binary. Each mirrors
//! one of the worked scenarios a host embedding this crate would run --
//! there is no surface parser in this crate, so programs are built
//! directly as [`ast::Program`] values.

use crate::ast::{Expr, Literal, Program, Stmt};

fn assign(name: &str, value: Expr, line: u32) -> Stmt {
    Stmt::Assign { name: name.to_string(), constraint: None, value, line }
}

fn assign_union(name: &str, constraint: &[&str], value: Expr, line: u32) -> Stmt {
    Stmt::Assign {
        name: name.to_string(),
        constraint: Some(constraint.iter().map(|s| s.to_string()).collect()),
        value,
        line,
    }
}

/// A union-typed slot reassigned across two of its member types, then
/// read back and printed.
pub fn union_slot_demo() -> Program {
    Program {
        stmts: vec![Stmt::Alloc {
            size: Expr::Literal(Literal::Int(32)),
            body: vec![
                assign_union("x", &["int", "bool"], Expr::Literal(Literal::Int(7)), 1),
                Stmt::Call { name: "print".to_string(), args: vec![Expr::Ident("x".to_string())], line: 2 },
                assign_union("x", &["int", "bool"], Expr::Literal(Literal::Bool(true)), 3),
                Stmt::Call { name: "print".to_string(), args: vec![Expr::Ident("x".to_string())], line: 4 },
                Stmt::Free { name: "x".to_string(), line: 5 },
            ],
            line: 1,
        }],
    }
}

/// A struct declared, populated field by field, and read back.
pub fn struct_demo() -> Program {
    Program {
        stmts: vec![
            Stmt::StructDecl {
                name: "vec2".to_string(),
                fields: vec![("x".to_string(), "int".to_string()), ("y".to_string(), "int".to_string())],
                line: 1,
            },
            Stmt::Alloc {
                size: Expr::Literal(Literal::Int(64)),
                body: vec![
                    assign(
                        "v",
                        Expr::StructLiteral {
                            name: "vec2".to_string(),
                            fields: vec![
                                ("x".to_string(), Expr::Literal(Literal::Int(3))),
                                ("y".to_string(), Expr::Literal(Literal::Int(7))),
                            ],
                        },
                        2,
                    ),
                    Stmt::Call {
                        name: "print".to_string(),
                        args: vec![Expr::Attribute(Box::new(Expr::Ident("v".to_string())), "x".to_string())],
                        line: 3,
                    },
                    Stmt::FieldAssign {
                        target: "v".to_string(),
                        field: "y".to_string(),
                        value: Expr::Literal(Literal::Int(9)),
                        line: 4,
                    },
                    Stmt::Call {
                        name: "print".to_string(),
                        args: vec![Expr::Attribute(Box::new(Expr::Ident("v".to_string())), "y".to_string())],
                        line: 5,
                    },
                ],
                line: 2,
            },
        ],
    }
}

/// An anonymous tuple literal.
pub fn tuple_demo() -> Program {
    Program {
        stmts: vec![Stmt::Alloc {
            size: Expr::Literal(Literal::Int(32)),
            body: vec![
                assign(
                    "pair",
                    Expr::TupleLiteral(vec![
                        Expr::Literal(Literal::Int(10)),
                        Expr::Literal(Literal::Bool(false)),
                    ]),
                    1,
                ),
                Stmt::Call {
                    name: "print".to_string(),
                    args: vec![Expr::Attribute(Box::new(Expr::Ident("pair".to_string())), "0".to_string())],
                    line: 2,
                },
            ],
        }],
    }
}

/// A pointer alias referencing a caller-chosen offset directly, with no
/// allocator ownership.
pub fn pointer_alias_demo() -> Program {
    Program {
        stmts: vec![Stmt::Alloc {
            size: Expr::Literal(Literal::Int(16)),
            body: vec![
                assign("base", Expr::Literal(Literal::Int(99)), 1),
                Stmt::Assign {
                    name: "p".to_string(),
                    constraint: None,
                    value: Expr::PointerDeref {
                        type_name: "int".to_string(),
                        offset: Box::new(Expr::Literal(Literal::Int(0))),
                    },
                    line: 2,
                },
                Stmt::Call { name: "print".to_string(), args: vec![Expr::Ident("p".to_string())], line: 3 },
            ],
        }],
    }
}

/// An allocation request that does not fit the declared arena, to
/// exercise the out-of-memory diagnostic.
pub fn out_of_memory_demo() -> Program {
    Program {
        stmts: vec![Stmt::Alloc {
            size: Expr::Literal(Literal::Int(4)),
            body: vec![assign("x", Expr::Literal(Literal::Long(1)), 1)],
            line: 1,
        }],
    }
}

pub fn all() -> Vec<(&'static str, Program)> {
    vec![
        ("union-slot", union_slot_demo()),
        ("struct", struct_demo()),
        ("tuple", tuple_demo()),
        ("pointer-alias", pointer_alias_demo()),
        ("out-of-memory", out_of_memory_demo()),
    ]
}
