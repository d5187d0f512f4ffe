//! Stack-based interpreter: walks a compiled [`crate::instr::ByteCode`]
//! one instruction at a time, enforcing every runtime invariant the
//! allocator and slot model impose.

pub mod dispatch;
pub mod native;
pub mod slot;
pub mod view;

use std::io::{self, Write};
use std::sync::Arc;

use crossbeam_channel::Receiver;
use parking_lot::Mutex;
use thiserror::Error;

use crate::instr::ByteCode;
use crate::tag::TypeTag;
use dispatch::Frame;
use native::{NativeFn, NativeRegistry};
use view::View;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("no active alloc block")]
    NoActiveFrame,
    #[error(transparent)]
    Alloc(#[from] crate::alloc::AllocError),
    #[error("use after free on slot {slot}")]
    UseAfterFree { slot: i64 },
    #[error("uninitialized: slot {slot} was allocated but never stored")]
    Uninitialized { slot: i64 },
    #[error("double free on slot {slot}")]
    DoubleFree { slot: i64 },
    #[error("cannot free pointer alias: slot {slot} does not own its bytes")]
    CannotFreeAlias { slot: i64 },
    #[error("pointer out of bounds: offset {offset} (width {width}) exceeds a {capacity}-byte arena")]
    PointerOutOfBounds { offset: i64, width: usize, capacity: usize },
    #[error("pointer offset must be an integer type, got {tag}")]
    NonIntegerPointerOffset { tag: TypeTag },
    #[error("type mismatch: value of type {tag} is not a member of mask {mask:#010b}")]
    TypeNotInMask { tag: TypeTag, mask: u8 },
    #[error("field expected type {expected} but got {got}")]
    FieldTypeMismatch { expected: TypeTag, got: TypeTag },
    #[error("expression stack underflow")]
    StackUnderflow,
    #[error("constant pool index {index} out of range")]
    ConstantIndexOutOfRange { index: usize },
    #[error("unknown native function '{name}'")]
    UnknownNative { name: String },
    #[error("execution cancelled")]
    Cancelled,
    #[error("exceeded runaway-program guard of {limit} instructions")]
    InstructionLimitExceeded { limit: usize },
}

/// A `RuntimeError` wrapped with the instruction that produced it, per
/// the `line <n>: instr '<OPCODE>': <detail>` diagnostic format.
#[derive(Debug, Error)]
#[error("line {line}: instr '{opcode}': {source}")]
pub struct ExecError {
    pub line: u32,
    pub opcode: &'static str,
    #[source]
    pub source: RuntimeError,
}

/// Drives one `ByteCode` program to completion or to the first runtime
/// error, dispatching each instruction and checking the cancellation
/// channel between instructions.
pub struct Runtime {
    pub natives: NativeRegistry,
}

impl Runtime {
    pub fn new() -> Self {
        Runtime { natives: NativeRegistry::new() }
    }

    pub fn register_native(&mut self, name: &str, f: NativeFn) {
        self.natives.register(name, f);
    }

    pub fn run(
        &self,
        code: &ByteCode,
        cancel: Option<&Receiver<()>>,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
    ) -> Result<(), ExecError> {
        self.run_with_limit(code, cancel, None, stdout, stderr)
    }

    /// Like [`Runtime::run`], but aborts once more than `max_instructions`
    /// instructions have been dispatched -- the runaway-program guard a
    /// host configures via `VmConfig::max_instructions`.
    pub fn run_with_limit(
        &self,
        code: &ByteCode,
        cancel: Option<&Receiver<()>>,
        max_instructions: Option<usize>,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
    ) -> Result<(), ExecError> {
        let mut frame: Option<Frame> = None;
        let mut stack: Vec<View> = Vec::new();

        for (count, instr) in code.instructions.iter().enumerate() {
            if let Some(limit) = max_instructions {
                if count >= limit {
                    return Err(ExecError {
                        line: instr.source_line,
                        opcode: instr.opcode.mnemonic(),
                        source: RuntimeError::InstructionLimitExceeded { limit },
                    });
                }
            }
            if let Some(rx) = cancel {
                if rx.try_recv().is_ok() {
                    return Err(ExecError {
                        line: instr.source_line,
                        opcode: instr.opcode.mnemonic(),
                        source: RuntimeError::Cancelled,
                    });
                }
            }

            let result =
                self.exec_one(instr, &code.constants, &mut frame, &mut stack, stdout, stderr);
            if let Err(source) = result {
                return Err(ExecError { line: instr.source_line, opcode: instr.opcode.mnemonic(), source });
            }
        }
        Ok(())
    }

    fn exec_one(
        &self,
        instr: &crate::instr::Instruction,
        constants: &[crate::tag::Constant],
        frame: &mut Option<Frame>,
        stack: &mut Vec<View>,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
    ) -> Result<(), RuntimeError> {
        use crate::instr::Opcode::*;
        match instr.opcode {
            StackAlloc => dispatch::stack_alloc(frame, instr),
            StackFree => dispatch::stack_free(frame),
            LoadConst => dispatch::load_const(stack, constants, instr),
            StackPop => dispatch::stack_pop(stack),
            VarAlloc => dispatch::var_alloc(frame, instr),
            VarStore => dispatch::var_store(frame, stack, instr),
            VarLoad => dispatch::var_load(frame, stack, instr),
            VarFree => dispatch::var_free(frame, instr),
            VarPtr => dispatch::var_ptr(frame, stack, instr),
            StencilAlloc => dispatch::stencil_alloc(frame, instr),
            FieldStore => dispatch::field_store(frame, stack, instr),
            FieldLoad => dispatch::field_load(frame, stack, instr),
            CallNat => dispatch::call_nat(stack, instr, &self.natives, stdout, stderr),
        }
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

/// The embeddable top-level handle: serializes `Run` calls across
/// threads behind a mutex, per the "single-threaded cooperative
/// execution per call" concurrency model.
pub struct Vm {
    inner: Arc<Mutex<VmInner>>,
}

struct VmInner {
    runtime: Runtime,
    stdout: Box<dyn Write + Send>,
    stderr: Box<dyn Write + Send>,
    max_instructions: Option<usize>,
}

impl Vm {
    pub fn new() -> Self {
        Vm {
            inner: Arc::new(Mutex::new(VmInner {
                runtime: Runtime::new(),
                stdout: Box::new(io::stdout()),
                stderr: Box::new(io::stderr()),
                max_instructions: None,
            })),
        }
    }

    /// A `Vm` with output discarded, useful for tests and embeddings that
    /// only care about native-call side effects registered separately.
    pub fn new_ephemeral() -> Self {
        Vm {
            inner: Arc::new(Mutex::new(VmInner {
                runtime: Runtime::new(),
                stdout: Box::new(io::sink()),
                stderr: Box::new(io::sink()),
                max_instructions: None,
            })),
        }
    }

    pub fn set_stdout(&self, w: Box<dyn Write + Send>) {
        self.inner.lock().stdout = w;
    }

    pub fn set_stderr(&self, w: Box<dyn Write + Send>) {
        self.inner.lock().stderr = w;
    }

    pub fn register_native(&self, name: &str, f: NativeFn) {
        self.inner.lock().runtime.register_native(name, f);
    }

    /// Sets the runaway-program guard: a `Run` call that dispatches more
    /// than `limit` instructions aborts with `InstructionLimitExceeded`.
    /// `None` (the default) means unlimited.
    pub fn set_max_instructions(&self, limit: Option<usize>) {
        self.inner.lock().max_instructions = limit;
    }

    pub fn run(&self, code: &ByteCode, cancel: Option<&Receiver<()>>) -> Result<(), ExecError> {
        let mut inner = self.inner.lock();
        let VmInner { runtime, stdout, stderr, max_instructions } = &mut *inner;
        runtime.run_with_limit(code, cancel, *max_instructions, stdout.as_mut(), stderr.as_mut())
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}
