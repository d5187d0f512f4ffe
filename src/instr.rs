//! Bytecode instruction shape: opcode mnemonics and the five operand
//! fields (`argument`, `offset`, `name`, `extra`, `source_line`) a
//! compiled arena program is made of.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    StackAlloc,
    StackFree,
    LoadConst,
    StackPop,
    VarAlloc,
    VarStore,
    VarLoad,
    VarFree,
    VarPtr,
    StencilAlloc,
    FieldStore,
    FieldLoad,
    CallNat,
}

impl Opcode {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Opcode::StackAlloc => "STACK_ALLOC",
            Opcode::StackFree => "STACK_FREE",
            Opcode::LoadConst => "LOAD_CONST",
            Opcode::StackPop => "STACK_POP",
            Opcode::VarAlloc => "VAR_ALLOC",
            Opcode::VarStore => "VAR_STORE",
            Opcode::VarLoad => "VAR_LOAD",
            Opcode::VarFree => "VAR_FREE",
            Opcode::VarPtr => "VAR_PTR",
            Opcode::StencilAlloc => "STENCIL_ALLOC",
            Opcode::FieldStore => "FIELD_STORE",
            Opcode::FieldLoad => "FIELD_LOAD",
            Opcode::CallNat => "CALL_NAT",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// One compiled instruction. Not every field is meaningful for every
/// opcode; see the per-opcode constructors below for the fields each
/// opcode actually uses.
#[derive(Debug, Clone)]
pub struct Instruction {
    pub opcode: Opcode,
    pub argument: i64,
    pub offset: i64,
    pub name: Option<String>,
    pub extra: u8,
    pub source_line: u32,
}

impl Instruction {
    fn bare(opcode: Opcode, line: u32) -> Self {
        Instruction { opcode, argument: 0, offset: 0, name: None, extra: 0, source_line: line }
    }

    pub fn stack_alloc(capacity: usize, line: u32) -> Self {
        Instruction { argument: capacity as i64, ..Self::bare(Opcode::StackAlloc, line) }
    }

    pub fn stack_free(line: u32) -> Self {
        Self::bare(Opcode::StackFree, line)
    }

    pub fn load_const(pool_idx: usize, line: u32) -> Self {
        Instruction { argument: pool_idx as i64, ..Self::bare(Opcode::LoadConst, line) }
    }

    pub fn stack_pop(line: u32) -> Self {
        Self::bare(Opcode::StackPop, line)
    }

    pub fn var_alloc(slot: usize, mask: u8, line: u32) -> Self {
        Instruction { argument: slot as i64, extra: mask, ..Self::bare(Opcode::VarAlloc, line) }
    }

    pub fn var_store(slot: usize, line: u32) -> Self {
        Instruction { argument: slot as i64, ..Self::bare(Opcode::VarStore, line) }
    }

    pub fn var_load(slot: usize, line: u32) -> Self {
        Instruction { argument: slot as i64, ..Self::bare(Opcode::VarLoad, line) }
    }

    pub fn var_free(slot: usize, line: u32) -> Self {
        Instruction { argument: slot as i64, ..Self::bare(Opcode::VarFree, line) }
    }

    pub fn var_ptr(slot: usize, tag: u8, line: u32) -> Self {
        Instruction { argument: slot as i64, extra: tag, ..Self::bare(Opcode::VarPtr, line) }
    }

    pub fn stencil_alloc(slot: usize, total_size: usize, line: u32) -> Self {
        Instruction {
            argument: slot as i64,
            offset: total_size as i64,
            ..Self::bare(Opcode::StencilAlloc, line)
        }
    }

    pub fn field_store(slot: usize, field_offset: usize, field_tag: u8, line: u32) -> Self {
        Instruction {
            argument: slot as i64,
            offset: field_offset as i64,
            extra: field_tag,
            ..Self::bare(Opcode::FieldStore, line)
        }
    }

    pub fn field_load(slot: usize, field_offset: usize, field_tag: u8, line: u32) -> Self {
        Instruction {
            argument: slot as i64,
            offset: field_offset as i64,
            extra: field_tag,
            ..Self::bare(Opcode::FieldLoad, line)
        }
    }

    pub fn call_nat(name: &str, argc: usize, line: u32) -> Self {
        Instruction {
            argument: argc as i64,
            name: Some(name.to_string()),
            ..Self::bare(Opcode::CallNat, line)
        }
    }
}

/// A compiled program: instructions plus the deduplicated constant pool
/// they reference by index.
#[derive(Debug, Clone, Default)]
pub struct ByteCode {
    pub instructions: Vec<Instruction>,
    pub constants: Vec<crate::tag::Constant>,
}
