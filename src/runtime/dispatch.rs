//! Per-opcode execution. Each function receives the live [`Frame`] plus
//! the expression stack and constant pool, and enforces the runtime
//! invariants the specification assigns to its opcode.

use std::collections::HashMap;

use crate::instr::Instruction;
use crate::tag::{tag_in_mask, max_size_for, Constant, TypeTag};

use super::native::{NativeContext, NativeRegistry};
use super::slot::SlotEntry;
use super::view::View;
use super::RuntimeError;

/// One live `alloc N { ... }` block: its private byte arena and the
/// slots currently defined within it. Nested alloc blocks are rejected at
/// compile time, so at most one frame is ever live at a time.
pub struct Frame {
    pub arena: crate::alloc::Allocator,
    pub slots: HashMap<i64, SlotEntry>,
}

impl Frame {
    pub fn new(capacity: usize) -> Self {
        Frame { arena: crate::alloc::Allocator::new(capacity), slots: HashMap::new() }
    }

    fn slot(&self, id: i64) -> Result<&SlotEntry, RuntimeError> {
        self.slots.get(&id).ok_or(RuntimeError::UseAfterFree { slot: id })
    }
}

pub fn stack_alloc(frame: &mut Option<Frame>, instr: &Instruction) -> Result<(), RuntimeError> {
    *frame = Some(Frame::new(instr.argument as usize));
    Ok(())
}

pub fn stack_free(frame: &mut Option<Frame>) -> Result<(), RuntimeError> {
    frame.take().ok_or(RuntimeError::NoActiveFrame)?;
    Ok(())
}

pub fn load_const(
    stack: &mut Vec<View>,
    constants: &[Constant],
    instr: &Instruction,
) -> Result<(), RuntimeError> {
    let idx = instr.argument as usize;
    let c = constants
        .get(idx)
        .ok_or(RuntimeError::ConstantIndexOutOfRange { index: idx })?;
    stack.push(View::new(c.tag, c.bytes.clone()));
    Ok(())
}

pub fn stack_pop(stack: &mut Vec<View>) -> Result<(), RuntimeError> {
    stack.pop().ok_or(RuntimeError::StackUnderflow)?;
    Ok(())
}

pub fn var_alloc(frame: &mut Option<Frame>, instr: &Instruction) -> Result<(), RuntimeError> {
    let frame = frame.as_mut().ok_or(RuntimeError::NoActiveFrame)?;
    let mask = instr.extra;
    let size = max_size_for(mask);
    let offset = frame.arena.alloc(size)?;
    frame.slots.insert(instr.argument, SlotEntry::owned(offset, size, mask));
    Ok(())
}

pub fn var_store(
    frame: &mut Option<Frame>,
    stack: &mut Vec<View>,
    instr: &Instruction,
) -> Result<(), RuntimeError> {
    let view = stack.pop().ok_or(RuntimeError::StackUnderflow)?;
    let frame = frame.as_mut().ok_or(RuntimeError::NoActiveFrame)?;
    let slot = frame.slot(instr.argument)?.clone();
    if !tag_in_mask(view.tag, slot.mask) {
        return Err(RuntimeError::TypeNotInMask { tag: view.tag, mask: slot.mask });
    }
    frame.arena.write(slot.offset, &view.bytes);
    frame.arena.zero_tail(slot.offset, view.bytes.len(), slot.size);
    if let Some(entry) = frame.slots.get_mut(&instr.argument) {
        entry.tag = Some(view.tag);
    }
    Ok(())
}

pub fn var_load(
    frame: &Option<Frame>,
    stack: &mut Vec<View>,
    instr: &Instruction,
) -> Result<(), RuntimeError> {
    let frame = frame.as_ref().ok_or(RuntimeError::NoActiveFrame)?;
    let slot = frame.slot(instr.argument)?;
    let tag = slot.tag.ok_or(RuntimeError::Uninitialized { slot: instr.argument })?;
    let bytes = frame.arena.slice(slot.offset, tag.width()).to_vec();
    stack.push(View::new(tag, bytes));
    Ok(())
}

pub fn var_free(frame: &mut Option<Frame>, instr: &Instruction) -> Result<(), RuntimeError> {
    let frame = frame.as_mut().ok_or(RuntimeError::NoActiveFrame)?;
    let slot = frame
        .slots
        .remove(&instr.argument)
        .ok_or(RuntimeError::DoubleFree { slot: instr.argument })?;
    if slot.is_alias {
        return Err(RuntimeError::CannotFreeAlias { slot: instr.argument });
    }
    frame.arena.free(slot.offset, slot.size);
    Ok(())
}

pub fn var_ptr(
    frame: &mut Option<Frame>,
    stack: &mut Vec<View>,
    instr: &Instruction,
) -> Result<(), RuntimeError> {
    let offset_view = stack.pop().ok_or(RuntimeError::StackUnderflow)?;
    let offset = offset_view
        .as_i64()
        .ok_or(RuntimeError::NonIntegerPointerOffset { tag: offset_view.tag })?;
    let frame = frame.as_mut().ok_or(RuntimeError::NoActiveFrame)?;
    let tag = TypeTag::from_u8(instr.extra).expect("compiler emits a valid tag byte");
    if offset < 0 || offset as usize + tag.width() > frame.arena.capacity() {
        return Err(RuntimeError::PointerOutOfBounds {
            offset,
            width: tag.width(),
            capacity: frame.arena.capacity(),
        });
    }
    frame.slots.insert(instr.argument, SlotEntry::alias(offset as usize, tag));
    Ok(())
}

pub fn stencil_alloc(frame: &mut Option<Frame>, instr: &Instruction) -> Result<(), RuntimeError> {
    let frame = frame.as_mut().ok_or(RuntimeError::NoActiveFrame)?;
    let size = instr.offset as usize;
    if let Some(existing) = frame.slots.get(&instr.argument) {
        if !existing.is_alias && existing.tag.is_none() && existing.size == size {
            return Ok(());
        }
    }
    let offset = frame.arena.alloc(size)?;
    frame.slots.insert(instr.argument, SlotEntry::owned(offset, size, 0));
    Ok(())
}

pub fn field_store(
    frame: &mut Option<Frame>,
    stack: &mut Vec<View>,
    instr: &Instruction,
) -> Result<(), RuntimeError> {
    let view = stack.pop().ok_or(RuntimeError::StackUnderflow)?;
    let frame = frame.as_mut().ok_or(RuntimeError::NoActiveFrame)?;
    let slot = frame.slot(instr.argument)?.clone();
    let field_tag = TypeTag::from_u8(instr.extra).expect("compiler emits a valid tag byte");
    if view.tag != field_tag {
        return Err(RuntimeError::FieldTypeMismatch { expected: field_tag, got: view.tag });
    }
    let field_offset = slot.offset + instr.offset as usize;
    frame.arena.write(field_offset, &view.bytes);
    Ok(())
}

pub fn field_load(
    frame: &Option<Frame>,
    stack: &mut Vec<View>,
    instr: &Instruction,
) -> Result<(), RuntimeError> {
    let frame = frame.as_ref().ok_or(RuntimeError::NoActiveFrame)?;
    let slot = frame.slot(instr.argument)?;
    let field_tag = TypeTag::from_u8(instr.extra).expect("compiler emits a valid tag byte");
    let field_offset = slot.offset + instr.offset as usize;
    let bytes = frame.arena.slice(field_offset, field_tag.width()).to_vec();
    stack.push(View::new(field_tag, bytes));
    Ok(())
}

pub fn call_nat(
    stack: &mut Vec<View>,
    instr: &Instruction,
    natives: &NativeRegistry,
    stdout: &mut dyn std::io::Write,
    stderr: &mut dyn std::io::Write,
) -> Result<(), RuntimeError> {
    let argc = instr.argument as usize;
    if stack.len() < argc {
        return Err(RuntimeError::StackUnderflow);
    }
    let args = stack.split_off(stack.len() - argc);
    let name = instr.name.as_deref().expect("compiler sets CALL_NAT name");
    let mut ctx = NativeContext { args, stdout, stderr };
    natives.call(name, &mut ctx)
}
