//! WebAssembly runtime implementation
//!
//! This module provides the execution engine: the operand stack, activation
//! frames, the control-flow pre-indexer, memory/table/global state, and the
//! byte-level instruction dispatcher.

pub mod control;
pub mod executor;
pub mod frame;
pub mod instance;
pub mod memory;
pub mod ops;
pub mod stack;
pub mod table;
pub mod value;

pub use executor::Executor;
pub use instance::Instance;
pub use memory::Memory;
pub use table::Table;
pub use value::Value;

use crate::reader::ReadError;

/// A trap: an unrecoverable semantic error raised during pre-indexing,
/// instantiation, or execution. Every trap aborts the run; the driver
/// reports it as the single line `!trap` on stdout.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("operand stack underflow")]
    StackUnderflow,
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },
    #[error("malformed code: {0}")]
    Code(#[from] ReadError),
    #[error("unsupported opcode 0x{opcode:02x} ({mnemonic})")]
    UnsupportedOpcode { opcode: u8, mnemonic: &'static str },
    #[error("non-empty blocktype 0x{0:02x} is not supported")]
    UnsupportedBlockType(u8),
    #[error("else without matching if")]
    ElseWithoutIf,
    #[error("end without matching block/loop/if")]
    UnbalancedEnd,
    #[error("unclosed block/loop/if at end of code")]
    UnclosedBlock,
    #[error("no control metadata for offset {0}")]
    MissingControlEntry(usize),
    #[error("program counter ran past end of code")]
    CodeUnderrun,
    #[error("call stack underflow")]
    CallStackUnderflow,
    #[error("call stack exhausted")]
    CallStackOverflow,
    #[error("function index out of bounds: {0}")]
    FunctionIndexOutOfBounds(u32),
    #[error("unknown export: {0}")]
    UnknownExport(String),
    #[error("invalid function type index: {0}")]
    InvalidTypeIndex(u32),
    #[error("local variable index out of bounds: {0}")]
    LocalIndexOutOfBounds(u32),
    #[error("global variable index out of bounds: {0}")]
    GlobalIndexOutOfBounds(u32),
    #[error("branch label index out of bounds: {0}")]
    LabelIndexOutOfBounds(u32),
    #[error("out of bounds memory access")]
    MemoryOutOfBounds,
    #[error("negative memory address")]
    NegativeAddress,
    #[error("data segment does not fit in linear memory")]
    DataSegmentOutOfBounds,
    #[error("element segment does not fit in table")]
    ElementSegmentOutOfBounds,
    #[error("at most one linear memory is supported")]
    MultipleMemories,
    #[error("imported tables are not supported")]
    ImportedTable,
    #[error("table index out of bounds: {0}")]
    TableIndexOutOfBounds(u32),
    #[error("out of bounds table element access: {0}")]
    TableElementOutOfBounds(u32),
    #[error("uninitialized table element {0}")]
    NullTableElement(u32),
    #[error("indirect call type mismatch: expected {expected}, got {actual}")]
    IndirectCallTypeMismatch { expected: String, actual: String },
    #[error("integer divide by zero")]
    DivisionByZero,
    #[error("integer overflow")]
    IntegerOverflow,
    #[error("invalid conversion to integer: {0}")]
    InvalidConversion(String),
    #[error("not enough values on the operand stack for function return")]
    ResultUnderflow,
    #[error("operand stack does not match the expected result count")]
    ResultArityMismatch,
    #[error("unreachable executed")]
    Unreachable,
}
