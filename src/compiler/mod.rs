//! Statement-walk compiler: turns an [`ast::Program`] into arena-scoped
//! slot instructions plus a deduplicated constant pool.

pub mod symbol;

use thiserror::Error;

use crate::ast::{Expr, Literal, Program, Stmt};
use crate::instr::{ByteCode, Instruction};
use crate::stencil::{StencilError, StencilRegistry};
use crate::tag::{union_mask, Constant, TypeTag};
use symbol::SymbolTable;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompileError {
    #[error("line {line}: unknown type name '{name}'")]
    UnknownTypeName { name: String, line: u32 },
    #[error("line {line}: undefined variable '{name}'")]
    UndefinedVariable { name: String, line: u32 },
    #[error("line {line}: undefined struct type '{name}'")]
    UndefinedStructType { name: String, line: u32 },
    #[error("line {line}: variable '{name}' is not a struct or tuple")]
    NotAStructOrTuple { name: String, line: u32 },
    #[error("line {line}: struct '{stencil}' has no field '{field}'")]
    NoSuchField { stencil: String, field: String, line: u32 },
    #[error("line {line}: alloc size must be an integer literal")]
    NonLiteralAllocSize { line: u32 },
    #[error("line {line}: '{kind}' is not allowed outside an alloc block")]
    OutsideAllocBlock { kind: String, line: u32 },
    #[error("line {line}: unsupported expression in this position")]
    UnsupportedExpression { line: u32 },
    #[error("line {line}: {source}")]
    Stencil { source: StencilError, line: u32 },
}

impl CompileError {
    fn stencil(source: StencilError, line: u32) -> Self {
        CompileError::Stencil { source, line }
    }
}

/// Compiles an [`ast::Program`] into [`ByteCode`]. Owns the name-keyed
/// stencil registry, which persists for the life of the compiler (and so
/// across every `alloc` block in the program).
pub struct Compiler {
    stencils: StencilRegistry,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    pub fn new() -> Self {
        Compiler { stencils: StencilRegistry::new() }
    }

    /// Registers a stencil supplied by the host (embedding code), so
    /// scripts can use layouts with no `struct` declaration in source.
    pub fn register_stencil(
        &mut self,
        name: &str,
        fields: &[(&str, &str)],
    ) -> Result<(), CompileError> {
        let owned: Vec<(String, String)> =
            fields.iter().map(|(n, t)| (n.to_string(), t.to_string())).collect();
        self.stencils.register(name, &owned).map_err(|e| CompileError::stencil(e, 0))?;
        Ok(())
    }

    pub fn compile(&mut self, program: &Program) -> Result<ByteCode, Vec<CompileError>> {
        let mut ctx = CompileCtx { constants: Vec::new(), errors: Vec::new() };
        let mut instructions = Vec::new();

        for stmt in &program.stmts {
            self.compile_top_level(&mut ctx, &mut instructions, stmt);
        }

        if ctx.errors.is_empty() {
            Ok(ByteCode { instructions, constants: ctx.constants })
        } else {
            Err(ctx.errors)
        }
    }

    fn compile_top_level(
        &mut self,
        ctx: &mut CompileCtx,
        out: &mut Vec<Instruction>,
        stmt: &Stmt,
    ) {
        match stmt {
            Stmt::StructDecl { name, fields, line } => {
                if let Err(e) = self.stencils.register(name, fields) {
                    ctx.errors.push(CompileError::stencil(e, *line));
                }
            }
            Stmt::Alloc { size, body, line } => {
                let Some(capacity) = literal_alloc_size(size) else {
                    ctx.errors.push(CompileError::NonLiteralAllocSize { line: *line });
                    return;
                };
                out.push(Instruction::stack_alloc(capacity, *line));
                let mut scope = SymbolTable::new();
                for inner in body {
                    self.compile_scoped(ctx, out, &mut scope, inner);
                }
                out.push(Instruction::stack_free(*line));
            }
            other => {
                ctx.errors.push(CompileError::OutsideAllocBlock {
                    kind: stmt_kind(other),
                    line: stmt_line(other),
                });
            }
        }
    }

    fn compile_scoped(
        &mut self,
        ctx: &mut CompileCtx,
        out: &mut Vec<Instruction>,
        scope: &mut SymbolTable,
        stmt: &Stmt,
    ) {
        match stmt {
            Stmt::StructDecl { line, .. } => {
                // A nested struct declaration is legal (stencils are
                // program-global) but unusual; treat it the same as a
                // top-level declaration.
                if let Stmt::StructDecl { name, fields, .. } = stmt {
                    if let Err(e) = self.stencils.register(name, fields) {
                        ctx.errors.push(CompileError::stencil(e, *line));
                    }
                }
            }
            Stmt::Alloc { line, .. } => {
                ctx.errors.push(CompileError::OutsideAllocBlock {
                    kind: "nested alloc block".to_string(),
                    line: *line,
                });
            }
            Stmt::Free { name, line } => match scope.remove(name) {
                Some(sym) => out.push(Instruction::var_free(sym.slot_id, *line)),
                None => {
                    ctx.errors
                        .push(CompileError::UndefinedVariable { name: name.clone(), line: *line })
                }
            },
            Stmt::Call { name, args, line } => {
                let mut ok = true;
                for arg in args {
                    if self.compile_push(ctx, out, scope, arg, *line).is_none() {
                        ok = false;
                    }
                }
                if ok {
                    out.push(Instruction::call_nat(name, args.len(), *line));
                }
            }
            Stmt::FieldAssign { target, field, value, line } => {
                self.compile_field_assign(ctx, out, scope, target, field, value, *line);
            }
            Stmt::Assign { name, constraint, value, line } => {
                self.compile_assign(ctx, out, scope, name, constraint.as_deref(), value, *line);
            }
        }
    }

    fn compile_field_assign(
        &mut self,
        ctx: &mut CompileCtx,
        out: &mut Vec<Instruction>,
        scope: &mut SymbolTable,
        target: &str,
        field: &str,
        value: &Expr,
        line: u32,
    ) {
        let Some(sym) = scope.lookup(target).cloned() else {
            ctx.errors
                .push(CompileError::UndefinedVariable { name: target.to_string(), line });
            return;
        };
        let Some(stencil) = sym.stencil.as_ref() else {
            ctx.errors
                .push(CompileError::NotAStructOrTuple { name: target.to_string(), line });
            return;
        };
        let Some(field_layout) = stencil.lookup_field(field) else {
            ctx.errors.push(CompileError::NoSuchField {
                stencil: stencil.name.clone(),
                field: field.to_string(),
                line,
            });
            return;
        };
        let (offset, tag) = (field_layout.offset, field_layout.tag);
        if self.compile_push(ctx, out, scope, value, line).is_some() {
            out.push(Instruction::field_store(sym.slot_id, offset, tag as u8, line));
        }
    }

    fn compile_assign(
        &mut self,
        ctx: &mut CompileCtx,
        out: &mut Vec<Instruction>,
        scope: &mut SymbolTable,
        name: &str,
        constraint: Option<&[String]>,
        value: &Expr,
        line: u32,
    ) {
        match value {
            Expr::PointerDeref { type_name, offset } => {
                let Some(tag) = TypeTag::from_name(type_name) else {
                    ctx.errors.push(CompileError::UnknownTypeName {
                        name: type_name.clone(),
                        line,
                    });
                    return;
                };
                let offset_ok = match offset.as_ref() {
                    Expr::Literal(_) | Expr::Ident(_) => {
                        self.compile_push(ctx, out, scope, offset, line).is_some()
                    }
                    _ => {
                        ctx.errors.push(CompileError::UnsupportedExpression { line });
                        false
                    }
                };
                if !offset_ok {
                    return;
                }
                let (slot_id, _is_new) = scope.define(name, tag, tag.mask(), None);
                out.push(Instruction::var_ptr(slot_id, tag as u8, line));
            }
            Expr::StructLiteral { name: sname, fields } => {
                let Some(stencil) = self.stencils.lookup(sname) else {
                    ctx.errors.push(CompileError::UndefinedStructType {
                        name: sname.clone(),
                        line,
                    });
                    return;
                };
                let (slot_id, is_new) = scope.define(name, TypeTag::Byte, 0, Some(stencil.clone()));
                if is_new {
                    out.push(Instruction::stencil_alloc(slot_id, stencil.total_size, line));
                }
                for (fname, fexpr) in fields {
                    let Some(field_layout) = stencil.lookup_field(fname) else {
                        ctx.errors.push(CompileError::NoSuchField {
                            stencil: stencil.name.clone(),
                            field: fname.clone(),
                            line,
                        });
                        continue;
                    };
                    let (foffset, ftag) = (field_layout.offset, field_layout.tag);
                    if self.compile_push(ctx, out, scope, fexpr, line).is_some() {
                        out.push(Instruction::field_store(slot_id, foffset, ftag as u8, line));
                    }
                }
            }
            Expr::TupleLiteral(elems) => {
                let mut tags = Vec::with_capacity(elems.len());
                let mut ok = true;
                for e in elems {
                    match self.infer_tag(scope, e) {
                        Some(t) => tags.push(t),
                        None => {
                            ctx.errors.push(CompileError::UnsupportedExpression { line });
                            ok = false;
                        }
                    }
                }
                if !ok {
                    return;
                }
                let stencil = self.stencils.register_anonymous(&tags);
                let (slot_id, is_new) = scope.define(name, TypeTag::Byte, 0, Some(stencil.clone()));
                if is_new {
                    out.push(Instruction::stencil_alloc(slot_id, stencil.total_size, line));
                }
                for (i, e) in elems.iter().enumerate() {
                    let field_layout = stencil.lookup_index(i).expect("tag count matches fields");
                    let (foffset, ftag) = (field_layout.offset, field_layout.tag);
                    if self.compile_push(ctx, out, scope, e, line).is_some() {
                        out.push(Instruction::field_store(slot_id, foffset, ftag as u8, line));
                    }
                }
            }
            _ => {
                let Some(rhs_tag) = self.compile_push(ctx, out, scope, value, line) else {
                    return;
                };
                let mask = match constraint {
                    Some(names) => {
                        let mut tags = Vec::with_capacity(names.len());
                        let mut ok = true;
                        for n in names {
                            match TypeTag::from_name(n) {
                                Some(t) => tags.push(t),
                                None => {
                                    ctx.errors.push(CompileError::UnknownTypeName {
                                        name: n.clone(),
                                        line,
                                    });
                                    ok = false;
                                }
                            }
                        }
                        if !ok {
                            return;
                        }
                        union_mask(tags)
                    }
                    None => rhs_tag.mask(),
                };
                let (slot_id, is_new) = scope.define(name, rhs_tag, mask, None);
                if is_new {
                    out.push(Instruction::var_alloc(slot_id, mask, line));
                }
                out.push(Instruction::var_store(slot_id, line));
            }
        }
    }

    /// Compiles an expression that only ever *pushes a view onto the
    /// expression stack*: a literal, an identifier load, or a field load.
    /// Pointer dereferences and composite literals are never valid here --
    /// they are handled directly by `compile_assign`.
    fn compile_push(
        &mut self,
        ctx: &mut CompileCtx,
        out: &mut Vec<Instruction>,
        scope: &SymbolTable,
        expr: &Expr,
        line: u32,
    ) -> Option<TypeTag> {
        match expr {
            Expr::Literal(lit) => {
                let idx = ctx.add_constant(literal_to_constant(lit));
                out.push(Instruction::load_const(idx, line));
                Some(lit.tag())
            }
            Expr::Ident(name) => match scope.lookup(name) {
                Some(sym) => {
                    out.push(Instruction::var_load(sym.slot_id, line));
                    if sym.stencil.is_some() {
                        ctx.errors.push(CompileError::UnsupportedExpression { line });
                        return None;
                    }
                    Some(sym.tag)
                }
                None => {
                    ctx.errors
                        .push(CompileError::UndefinedVariable { name: name.clone(), line });
                    None
                }
            },
            Expr::Attribute(base, field) => {
                let Expr::Ident(base_name) = base.as_ref() else {
                    ctx.errors.push(CompileError::UnsupportedExpression { line });
                    return None;
                };
                let Some(sym) = scope.lookup(base_name) else {
                    ctx.errors
                        .push(CompileError::UndefinedVariable { name: base_name.clone(), line });
                    return None;
                };
                let Some(stencil) = sym.stencil.as_ref() else {
                    ctx.errors
                        .push(CompileError::NotAStructOrTuple { name: base_name.clone(), line });
                    return None;
                };
                let Some(field_layout) = stencil.lookup_field(field) else {
                    ctx.errors.push(CompileError::NoSuchField {
                        stencil: stencil.name.clone(),
                        field: field.clone(),
                        line,
                    });
                    return None;
                };
                out.push(Instruction::field_load(
                    sym.slot_id,
                    field_layout.offset,
                    field_layout.tag as u8,
                    line,
                ));
                Some(field_layout.tag)
            }
            Expr::PointerDeref { .. } | Expr::StructLiteral { .. } | Expr::TupleLiteral(_) => {
                ctx.errors.push(CompileError::UnsupportedExpression { line });
                None
            }
        }
    }

    /// Statically infers the tag an expression would push, without
    /// emitting any instructions. Used to size an anonymous tuple's
    /// synthesized stencil before compiling its field stores.
    fn infer_tag(&self, scope: &SymbolTable, expr: &Expr) -> Option<TypeTag> {
        match expr {
            Expr::Literal(lit) => Some(lit.tag()),
            Expr::Ident(name) => scope.lookup(name).filter(|s| s.stencil.is_none()).map(|s| s.tag),
            Expr::Attribute(base, field) => {
                let Expr::Ident(base_name) = base.as_ref() else { return None };
                let sym = scope.lookup(base_name)?;
                let stencil = sym.stencil.as_ref()?;
                stencil.lookup_field(field).map(|f| f.tag)
            }
            Expr::PointerDeref { type_name, .. } => TypeTag::from_name(type_name),
            Expr::StructLiteral { .. } | Expr::TupleLiteral(_) => None,
        }
    }
}

struct CompileCtx {
    constants: Vec<Constant>,
    errors: Vec<CompileError>,
}

impl CompileCtx {
    fn add_constant(&mut self, c: Constant) -> usize {
        if let Some(idx) = self.constants.iter().position(|existing| *existing == c) {
            return idx;
        }
        self.constants.push(c);
        self.constants.len() - 1
    }
}

/// Reduces an `alloc` block's size expression to a byte capacity,
/// requiring it to be a non-negative integer literal (`byte`/`short`/
/// `int`/`long`); anything else -- a non-literal expression, or a
/// literal of a non-integer type such as `bool`/`float` -- is rejected.
fn literal_alloc_size(expr: &Expr) -> Option<usize> {
    match expr {
        Expr::Literal(Literal::Byte(v)) => Some(*v as usize),
        Expr::Literal(Literal::Short(v)) => usize::try_from(*v).ok(),
        Expr::Literal(Literal::Int(v)) => usize::try_from(*v).ok(),
        Expr::Literal(Literal::Long(v)) => usize::try_from(*v).ok(),
        _ => None,
    }
}

fn literal_to_constant(lit: &Literal) -> Constant {
    match *lit {
        Literal::Byte(v) => Constant::byte(v),
        Literal::Short(v) => Constant::short(v),
        Literal::Int(v) => Constant::int(v),
        Literal::Long(v) => Constant::long(v),
        Literal::Float(v) => Constant::float(v),
        Literal::Decimal(v) => Constant::decimal(v),
        Literal::Char(v) => Constant::char_value(v),
        Literal::Bool(v) => Constant::bool_value(v),
    }
}

fn stmt_kind(stmt: &Stmt) -> String {
    match stmt {
        Stmt::Assign { .. } => "assignment".to_string(),
        Stmt::FieldAssign { .. } => "field assignment".to_string(),
        Stmt::Free { .. } => "free".to_string(),
        Stmt::StructDecl { .. } => "struct declaration".to_string(),
        Stmt::Call { .. } => "call".to_string(),
        Stmt::Alloc { .. } => "alloc block".to_string(),
    }
}

fn stmt_line(stmt: &Stmt) -> u32 {
    match stmt {
        Stmt::Assign { line, .. }
        | Stmt::FieldAssign { line, .. }
        | Stmt::Free { line, .. }
        | Stmt::StructDecl { line, .. }
        | Stmt::Call { line, .. }
        | Stmt::Alloc { line, .. } => *line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Expr, Literal, Program, Stmt};

    fn assign(name: &str, value: Expr) -> Stmt {
        Stmt::Assign { name: name.to_string(), constraint: None, value, line: 1 }
    }

    #[test]
    fn constant_dedup_reuses_pool_index() {
        let program = Program {
            stmts: vec![Stmt::Alloc {
                size: Expr::Literal(Literal::Int(8)),
                body: vec![
                    assign("x", Expr::Literal(Literal::Int(42))),
                    assign("y", Expr::Literal(Literal::Int(42))),
                ],
                line: 1,
            }],
        };
        let code = Compiler::new().compile(&program).unwrap();
        assert_eq!(code.constants.len(), 1);
        let loads: Vec<i64> = code
            .instructions
            .iter()
            .filter(|i| i.opcode == crate::instr::Opcode::LoadConst)
            .map(|i| i.argument)
            .collect();
        assert_eq!(loads, vec![0, 0]);
    }

    #[test]
    fn free_then_use_is_undefined_variable() {
        let program = Program {
            stmts: vec![Stmt::Alloc {
                size: Expr::Literal(Literal::Int(8)),
                body: vec![
                    assign("x", Expr::Literal(Literal::Int(42))),
                    Stmt::Free { name: "x".to_string(), line: 2 },
                    assign("y", Expr::Ident("x".to_string())),
                ],
                line: 1,
            }],
        };
        let errs = Compiler::new().compile(&program).unwrap_err();
        assert!(matches!(errs[0], CompileError::UndefinedVariable { .. }));
    }

    #[test]
    fn struct_layout_matches_spec_example() {
        let mut c = Compiler::new();
        let program = Program {
            stmts: vec![
                Stmt::StructDecl {
                    name: "vec2".to_string(),
                    fields: vec![
                        ("x".to_string(), "int".to_string()),
                        ("y".to_string(), "int".to_string()),
                    ],
                    line: 1,
                },
                Stmt::Alloc {
                    size: Expr::Literal(Literal::Int(32)),
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
                        ),
                        assign(
                            "a",
                            Expr::Attribute(Box::new(Expr::Ident("v".to_string())), "x".to_string()),
                        ),
                    ],
                    line: 2,
                },
            ],
        };
        let code = c.compile(&program).unwrap();
        assert!(code.instructions.iter().any(|i| i.opcode == crate::instr::Opcode::StencilAlloc));
    }

    #[test]
    fn unknown_type_name_in_constraint_is_compile_error() {
        let program = Program {
            stmts: vec![Stmt::Alloc {
                size: Expr::Literal(Literal::Int(8)),
                body: vec![Stmt::Assign {
                    name: "y".to_string(),
                    constraint: Some(vec!["int".to_string(), "stringy".to_string()]),
                    value: Expr::Literal(Literal::Int(1)),
                    line: 1,
                }],
                line: 1,
            }],
        };
        let errs = Compiler::new().compile(&program).unwrap_err();
        assert!(matches!(errs[0], CompileError::UnknownTypeName { .. }));
    }

    #[test]
    fn a_non_literal_alloc_size_is_rejected() {
        let program = Program {
            stmts: vec![Stmt::Alloc {
                size: Expr::Ident("n".to_string()),
                body: vec![],
                line: 1,
            }],
        };
        let errs = Compiler::new().compile(&program).unwrap_err();
        assert!(matches!(errs[0], CompileError::NonLiteralAllocSize { line: 1 }));
    }

    #[test]
    fn a_non_integer_literal_alloc_size_is_rejected() {
        let program = Program {
            stmts: vec![Stmt::Alloc {
                size: Expr::Literal(Literal::Bool(true)),
                body: vec![],
                line: 1,
            }],
        };
        let errs = Compiler::new().compile(&program).unwrap_err();
        assert!(matches!(errs[0], CompileError::NonLiteralAllocSize { line: 1 }));
    }
}
