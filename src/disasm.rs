//! Human-readable dump of a compiled [`ByteCode`]: the constant pool
//! followed by one line per instruction.
//!
//! There is no fixed-width encoding, so instructions are addressed by
//! index rather than byte offset.

use std::fmt::Write as _;

use crate::instr::{ByteCode, Opcode};

pub struct Disassembler;

impl Disassembler {
    pub fn disassemble(code: &ByteCode) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "constants:");
        for (i, c) in code.constants.iter().enumerate() {
            let _ = writeln!(out, "  [{i}] {} {}", c.tag, hex::encode(&c.bytes));
        }
        let _ = writeln!(out, "instructions:");
        for (i, instr) in code.instructions.iter().enumerate() {
            let mut operands = Vec::new();
            match instr.opcode {
                Opcode::StackAlloc => operands.push(format!("capacity={}", instr.argument)),
                Opcode::StackFree | Opcode::StackPop => {}
                Opcode::LoadConst => operands.push(format!("pool_idx={}", instr.argument)),
                Opcode::VarAlloc => {
                    operands.push(format!("slot={}", instr.argument));
                    operands.push(format!("mask={:#010b}", instr.extra));
                }
                Opcode::VarStore | Opcode::VarLoad | Opcode::VarFree => {
                    operands.push(format!("slot={}", instr.argument))
                }
                Opcode::VarPtr => {
                    operands.push(format!("slot={}", instr.argument));
                    operands.push(format!("tag={}", instr.extra));
                }
                Opcode::StencilAlloc => {
                    operands.push(format!("slot={}", instr.argument));
                    operands.push(format!("total_size={}", instr.offset));
                }
                Opcode::FieldStore | Opcode::FieldLoad => {
                    operands.push(format!("slot={}", instr.argument));
                    operands.push(format!("field_offset={}", instr.offset));
                    operands.push(format!("field_tag={}", instr.extra));
                }
                Opcode::CallNat => {
                    operands.push(format!("name={}", instr.name.as_deref().unwrap_or("?")));
                    operands.push(format!("argc={}", instr.argument));
                }
            }
            let _ = writeln!(
                out,
                "  {i:>4}: {:<13} {}  ; line {}",
                instr.opcode.mnemonic(),
                operands.join(" "),
                instr.source_line
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instr::Instruction;
    use crate::tag::Constant;

    #[test]
    fn disassembly_lists_constants_and_instructions() {
        let code = ByteCode {
            instructions: vec![
                Instruction::stack_alloc(16, 1),
                Instruction::load_const(0, 1),
                Instruction::stack_free(1),
            ],
            constants: vec![Constant::int(42)],
        };
        let text = Disassembler::disassemble(&code);
        assert!(text.contains("int 2a000000"));
        assert!(text.contains("STACK_ALLOC"));
        assert!(text.contains("pool_idx=0"));
    }
}
