//! WebAssembly instruction executor
//!
//! The dispatcher runs a tight loop over raw code bytes: pop the top frame's
//! program counter, read one opcode and its immediates, mutate the operand
//! and call stacks, and advance or jump the counter. Structured control flow
//! resolves through the per-function [`ControlMap`] built on first entry, so
//! every branch is a constant-time `pc` assignment.

use super::{
    control::ControlMap,
    frame::{Frame, Label, LabelKind},
    memory::Memory,
    ops,
    stack::Stack,
    table::Table,
    RuntimeError, Value,
};
use crate::module::Module;
use crate::opcode::{self as op, MemArg};
use crate::reader::Reader;
use once_cell::unsync::OnceCell;
use std::rc::Rc;
use tracing::trace;

/// Maximum call stack depth to prevent runaway recursion
const MAX_CALL_DEPTH: usize = 1000;

/// Executes WebAssembly instructions against one runtime image
pub struct Executor<'a> {
    module: &'a Module,
    stack: Stack,
    call_stack: Vec<Frame>,
    memory: Memory,
    tables: Vec<Table>,
    globals: Vec<Value>,
    /// Function handle table, indexed by module function index
    functions: Vec<u32>,
    /// Per-function control maps, built on first invocation and reused
    ctrl_maps: Vec<OnceCell<Rc<ControlMap>>>,
}

impl<'a> Executor<'a> {
    /// Materialise the runtime image for a module: zeroed linear memory with
    /// data segments applied, tables with element segments applied, globals
    /// set to their initial values.
    ///
    /// # Errors
    /// Instantiation traps: a data segment past the end of memory, an
    /// element segment past the end of its table, a segment targeting an
    /// imported table, more than one memory.
    pub fn new(module: &'a Module) -> Result<Self, RuntimeError> {
        if module.memories.len() > 1 {
            return Err(RuntimeError::MultipleMemories);
        }
        let mut memory = Memory::new(module.initial_memory_pages())?;
        for segment in &module.data {
            memory.init_segment(segment.offset, &segment.bytes)?;
        }

        let mut tables: Vec<Table> = module.tables.iter().map(|t| Table::new(t.initial_size)).collect();
        for segment in &module.elements {
            if segment.table_index < module.imported_tables {
                return Err(RuntimeError::ImportedTable);
            }
            let local_idx = (segment.table_index - module.imported_tables) as usize;
            let table = tables
                .get_mut(local_idx)
                .ok_or(RuntimeError::TableIndexOutOfBounds(segment.table_index))?;
            table.init_segment(segment.offset, &segment.func_indices)?;
        }

        let globals = module.globals.iter().map(|g| g.init).collect();
        let functions = (0..module.functions.len() as u32).collect();
        let ctrl_maps = module.functions.iter().map(|_| OnceCell::new()).collect();

        Ok(Executor {
            module,
            stack: Stack::new(),
            call_stack: Vec::new(),
            memory,
            tables,
            globals,
            functions,
            ctrl_maps,
        })
    }

    /// Push `args`, invoke the function, and run the dispatch loop until the
    /// call stack empties. Returns the results in declaration order, with
    /// their kinds checked against the signature.
    pub fn invoke(&mut self, func_idx: u32, args: Vec<Value>) -> Result<Vec<Value>, RuntimeError> {
        self.stack.push_all(args);
        self.push_frame(func_idx)?;

        while !self.call_stack.is_empty() {
            self.step()?;
        }

        let sig = self
            .module
            .signature(func_idx)
            .ok_or(RuntimeError::FunctionIndexOutOfBounds(func_idx))?;
        if self.stack.depth() != sig.results.len() {
            return Err(RuntimeError::ResultArityMismatch);
        }
        let mut results = Vec::with_capacity(sig.results.len());
        for result_type in sig.results.iter().rev() {
            results.push(self.stack.pop_typed(*result_type)?);
        }
        results.reverse();
        Ok(results)
    }

    /// Linear memory, for inspection after a run
    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    fn top_frame(&self) -> Result<&Frame, RuntimeError> {
        self.call_stack.last().ok_or(RuntimeError::CallStackUnderflow)
    }

    fn top_frame_mut(&mut self) -> Result<&mut Frame, RuntimeError> {
        self.call_stack.last_mut().ok_or(RuntimeError::CallStackUnderflow)
    }

    fn set_pc(&mut self, pc: usize) -> Result<(), RuntimeError> {
        self.top_frame_mut()?.pc = pc;
        Ok(())
    }

    /// Control map for a function, computed on first use
    fn control_map(&self, func_idx: u32) -> Result<Rc<ControlMap>, RuntimeError> {
        let cell = self
            .ctrl_maps
            .get(func_idx as usize)
            .ok_or(RuntimeError::FunctionIndexOutOfBounds(func_idx))?;
        let map = cell.get_or_try_init(|| {
            let code = &self.module.functions[func_idx as usize].code;
            ControlMap::build(code).map(Rc::new)
        })?;
        Ok(map.clone())
    }

    /// Create a frame for `func_idx`: pop its parameters off the operand
    /// stack in reverse, zero-fill the pure locals, seed the label stack
    /// with the implicit function-body label, and push the frame.
    fn push_frame(&mut self, func_idx: u32) -> Result<(), RuntimeError> {
        if self.call_stack.len() >= MAX_CALL_DEPTH {
            return Err(RuntimeError::CallStackOverflow);
        }

        let func = self
            .module
            .functions
            .get(func_idx as usize)
            .ok_or(RuntimeError::FunctionIndexOutOfBounds(func_idx))?;
        let sig = self
            .module
            .types
            .get(func.type_index as usize)
            .ok_or(RuntimeError::InvalidTypeIndex(func.type_index))?;

        let param_count = sig.params.len();
        if self.stack.depth() < param_count {
            return Err(RuntimeError::StackUnderflow);
        }

        // Parameters were pushed left to right, so popping assigns them in
        // reverse declaration order.
        let mut locals = vec![Value::I32(0); param_count + func.local_count()];
        for i in 0..param_count {
            locals[param_count - 1 - i] = self.stack.pop()?;
        }
        let mut next_local = param_count;
        for group in &func.locals {
            for _ in 0..group.count {
                locals[next_local] = Value::zero(group.value_type);
                next_local += 1;
            }
        }

        let ctrl = self.control_map(func_idx)?;
        let stack_height_on_entry = self.stack.depth();

        let mut frame = Frame {
            func_idx,
            pc: 0,
            locals,
            labels: Vec::new(),
            stack_height_on_entry,
            ctrl,
        };
        frame.labels.push(Label {
            kind: LabelKind::ImplicitFunction,
            stack_height: stack_height_on_entry,
            target_pc: frame.ctrl.body_end(),
        });

        trace!(
            func = func_idx,
            locals = frame.locals.len(),
            depth = self.call_stack.len() + 1,
            "push frame"
        );
        self.call_stack.push(frame);
        Ok(())
    }

    /// Return from the top frame: collect the declared results off the top
    /// of the stack, restore the caller's operand-stack height, pop the
    /// frame, and re-push the results in original order.
    fn return_from_frame(&mut self) -> Result<(), RuntimeError> {
        let frame = self.top_frame()?;
        let func_idx = frame.func_idx;
        let entry_height = frame.stack_height_on_entry;
        let sig = self
            .module
            .signature(func_idx)
            .ok_or(RuntimeError::FunctionIndexOutOfBounds(func_idx))?;
        let result_count = sig.results.len();

        if self.stack.depth() < result_count {
            return Err(RuntimeError::ResultUnderflow);
        }
        let mut results = Vec::with_capacity(result_count);
        for _ in 0..result_count {
            results.push(self.stack.pop()?);
        }
        results.reverse();

        self.stack.truncate(entry_height);
        self.call_stack.pop();
        trace!(func = func_idx, results = result_count, "return");
        self.stack.push_all(results);
        Ok(())
    }

    /// `br depth`: expose the target label and transfer control to it.
    ///
    /// A branch to a loop keeps the loop's own label (its `end` is still
    /// ahead); a branch to a block or if consumes the target and lands past
    /// its `end`; a branch to the implicit function label is a return. In
    /// every case the operand stack falls back to the target's watermark.
    fn branch(&mut self, depth: u32) -> Result<(), RuntimeError> {
        let (target_idx, target) = {
            let frame = self.top_frame()?;
            let len = frame.labels.len();
            if depth as usize >= len {
                return Err(RuntimeError::LabelIndexOutOfBounds(depth));
            }
            let idx = len - 1 - depth as usize;
            (idx, frame.labels[idx])
        };

        trace!(depth, kind = ?target.kind, target_pc = target.target_pc, "branch");
        match target.kind {
            LabelKind::ImplicitFunction => self.return_from_frame(),
            LabelKind::Loop => {
                let frame = self.top_frame_mut()?;
                frame.labels.truncate(target_idx + 1);
                frame.pc = target.target_pc;
                self.stack.truncate(target.stack_height);
                Ok(())
            }
            LabelKind::Block | LabelKind::If => {
                let frame = self.top_frame_mut()?;
                frame.labels.truncate(target_idx);
                frame.pc = target.target_pc;
                self.stack.truncate(target.stack_height);
                Ok(())
            }
        }
    }

    /// Execute one instruction of the top frame
    fn step(&mut self) -> Result<(), RuntimeError> {
        let module = self.module;
        let (func_idx, pc) = {
            let frame = self.top_frame()?;
            (frame.func_idx, frame.pc)
        };
        let code: &'a [u8] = &module
            .functions
            .get(func_idx as usize)
            .ok_or(RuntimeError::FunctionIndexOutOfBounds(func_idx))?
            .code;
        if pc >= code.len() {
            return Err(RuntimeError::CodeUnderrun);
        }

        let header = pc;
        let mut reader = Reader::at(code, pc);
        let opcode = reader.read_byte()?;

        match opcode {
            op::NOP => self.set_pc(reader.pos())?,
            op::UNREACHABLE => return Err(RuntimeError::Unreachable),

            // Constants
            op::I32_CONST => {
                let v = reader.read_vs32()?;
                self.set_pc(reader.pos())?;
                self.stack.push(Value::I32(v));
            }
            op::I64_CONST => {
                let v = reader.read_vs64()?;
                self.set_pc(reader.pos())?;
                self.stack.push(Value::I64(v));
            }
            op::F32_CONST => {
                let raw = reader.read_u32_raw()?;
                self.set_pc(reader.pos())?;
                self.stack.push(Value::F32(f32::from_bits(raw)));
            }
            op::F64_CONST => {
                let raw = reader.read_u64_raw()?;
                self.set_pc(reader.pos())?;
                self.stack.push(Value::F64(f64::from_bits(raw)));
            }

            // Variable access
            op::LOCAL_GET => {
                let idx = reader.read_vu32()?;
                let frame = self.top_frame_mut()?;
                frame.pc = reader.pos();
                let value = *frame
                    .locals
                    .get(idx as usize)
                    .ok_or(RuntimeError::LocalIndexOutOfBounds(idx))?;
                self.stack.push(value);
            }
            op::LOCAL_SET => {
                let idx = reader.read_vu32()?;
                let value = self.stack.pop()?;
                let frame = self.top_frame_mut()?;
                frame.pc = reader.pos();
                let slot = frame
                    .locals
                    .get_mut(idx as usize)
                    .ok_or(RuntimeError::LocalIndexOutOfBounds(idx))?;
                *slot = value;
            }
            op::LOCAL_TEE => {
                let idx = reader.read_vu32()?;
                let value = *self.stack.peek().ok_or(RuntimeError::StackUnderflow)?;
                let frame = self.top_frame_mut()?;
                frame.pc = reader.pos();
                let slot = frame
                    .locals
                    .get_mut(idx as usize)
                    .ok_or(RuntimeError::LocalIndexOutOfBounds(idx))?;
                *slot = value;
            }
            op::GLOBAL_GET => {
                let idx = reader.read_vu32()?;
                self.set_pc(reader.pos())?;
                let value = *self
                    .globals
                    .get(idx as usize)
                    .ok_or(RuntimeError::GlobalIndexOutOfBounds(idx))?;
                self.stack.push(value);
            }
            op::GLOBAL_SET => {
                let idx = reader.read_vu32()?;
                self.set_pc(reader.pos())?;
                let value = self.stack.pop()?;
                let slot = self
                    .globals
                    .get_mut(idx as usize)
                    .ok_or(RuntimeError::GlobalIndexOutOfBounds(idx))?;
                *slot = value;
            }

            // Structured control flow
            op::BLOCK => {
                let block_type = reader.read_byte()?;
                if block_type != op::BLOCKTYPE_EMPTY {
                    return Err(RuntimeError::UnsupportedBlockType(block_type));
                }
                let meta = *self.top_frame()?.ctrl.meta(header)?;
                let label = Label {
                    kind: LabelKind::Block,
                    stack_height: self.stack.depth(),
                    target_pc: meta.end_pc + 1,
                };
                let frame = self.top_frame_mut()?;
                frame.pc = reader.pos();
                frame.labels.push(label);
            }
            op::LOOP => {
                let block_type = reader.read_byte()?;
                if block_type != op::BLOCKTYPE_EMPTY {
                    return Err(RuntimeError::UnsupportedBlockType(block_type));
                }
                // A branch to a loop lands on the first body instruction
                let label = Label {
                    kind: LabelKind::Loop,
                    stack_height: self.stack.depth(),
                    target_pc: reader.pos(),
                };
                let frame = self.top_frame_mut()?;
                frame.pc = reader.pos();
                frame.labels.push(label);
            }
            op::IF => {
                let block_type = reader.read_byte()?;
                if block_type != op::BLOCKTYPE_EMPTY {
                    return Err(RuntimeError::UnsupportedBlockType(block_type));
                }
                let meta = *self.top_frame()?.ctrl.meta(header)?;
                let condition = self.stack.pop_i32()?;
                let label = Label {
                    kind: LabelKind::If,
                    stack_height: self.stack.depth(),
                    target_pc: meta.end_pc + 1,
                };
                let frame = self.top_frame_mut()?;
                frame.labels.push(label);
                frame.pc = if condition != 0 {
                    reader.pos()
                } else {
                    // Fall to the else branch, or land on the `end` itself
                    // so it still closes the label just pushed
                    meta.else_pc.unwrap_or(meta.end_pc)
                };
            }
            op::ELSE => {
                // Reached only by falling off the end of the truthy branch;
                // a false condition jumps straight into the else body
                let frame = self.top_frame_mut()?;
                let label = *frame.labels.last().ok_or(RuntimeError::ElseWithoutIf)?;
                if label.kind != LabelKind::If {
                    return Err(RuntimeError::ElseWithoutIf);
                }
                frame.labels.pop();
                frame.pc = label.target_pc;
                self.stack.truncate(label.stack_height);
            }
            op::END => {
                let label = self
                    .top_frame_mut()?
                    .labels
                    .pop()
                    .ok_or(RuntimeError::UnbalancedEnd)?;
                match label.kind {
                    LabelKind::ImplicitFunction => self.return_from_frame()?,
                    _ => {
                        // Non-function ends carry no results in this engine
                        self.stack.truncate(label.stack_height);
                        self.set_pc(reader.pos())?;
                    }
                }
            }
            op::BR => {
                let depth = reader.read_vu32()?;
                self.branch(depth)?;
            }
            op::BR_IF => {
                let depth = reader.read_vu32()?;
                let condition = self.stack.pop_i32()?;
                if condition != 0 {
                    self.branch(depth)?;
                } else {
                    self.set_pc(reader.pos())?;
                }
            }
            op::BR_TABLE => {
                let target_count = reader.read_vu32()?;
                let mut targets = Vec::with_capacity(target_count as usize);
                for _ in 0..target_count {
                    targets.push(reader.read_vu32()?);
                }
                let default = reader.read_vu32()?;
                let index = self.stack.pop_i32()?;
                let depth = if index >= 0 && (index as usize) < targets.len() {
                    targets[index as usize]
                } else {
                    default
                };
                self.branch(depth)?;
            }
            op::RETURN => self.return_from_frame()?,

            // Calls
            op::CALL => {
                let idx = reader.read_vu32()?;
                self.set_pc(reader.pos())?;
                let handle = *self
                    .functions
                    .get(idx as usize)
                    .ok_or(RuntimeError::FunctionIndexOutOfBounds(idx))?;
                self.push_frame(handle)?;
            }
            op::CALL_INDIRECT => {
                let type_index = reader.read_vu32()?;
                let table_index = reader.read_vu32()?;
                self.set_pc(reader.pos())?;

                let element = self.stack.pop_i32()?;
                if element < 0 {
                    return Err(RuntimeError::TableElementOutOfBounds(element as u32));
                }
                if table_index < self.module.imported_tables {
                    return Err(RuntimeError::ImportedTable);
                }
                let local_idx = (table_index - self.module.imported_tables) as usize;
                let table = self
                    .tables
                    .get(local_idx)
                    .ok_or(RuntimeError::TableIndexOutOfBounds(table_index))?;
                let handle = table
                    .get(element as u32)?
                    .ok_or(RuntimeError::NullTableElement(element as u32))?;

                let expected = self
                    .module
                    .types
                    .get(type_index as usize)
                    .ok_or(RuntimeError::InvalidTypeIndex(type_index))?;
                let actual = self
                    .module
                    .signature(handle)
                    .ok_or(RuntimeError::FunctionIndexOutOfBounds(handle))?;
                if actual != expected {
                    return Err(RuntimeError::IndirectCallTypeMismatch {
                        expected: expected.to_string(),
                        actual: actual.to_string(),
                    });
                }
                self.push_frame(handle)?;
            }

            // Memory access
            op::I32_LOAD..=op::I64_STORE32 => {
                let memarg = read_memarg(&mut reader)?;
                self.set_pc(reader.pos())?;
                self.memory_op(opcode, &memarg)?;
            }

            // Everything else operates on the stack alone
            _ => {
                self.set_pc(reader.pos())?;
                value_op(opcode, &mut self.stack)?;
            }
        }

        Ok(())
    }

    fn memory_op(&mut self, opcode: u8, memarg: &MemArg) -> Result<(), RuntimeError> {
        let stack = &mut self.stack;
        match opcode {
            op::I32_LOAD => ops::memory::i32_load(stack, &self.memory, memarg),
            op::I64_LOAD => ops::memory::i64_load(stack, &self.memory, memarg),
            op::F32_LOAD => ops::memory::f32_load(stack, &self.memory, memarg),
            op::F64_LOAD => ops::memory::f64_load(stack, &self.memory, memarg),
            op::I32_LOAD8_S => ops::memory::i32_load8_s(stack, &self.memory, memarg),
            op::I32_LOAD8_U => ops::memory::i32_load8_u(stack, &self.memory, memarg),
            op::I32_LOAD16_S => ops::memory::i32_load16_s(stack, &self.memory, memarg),
            op::I32_LOAD16_U => ops::memory::i32_load16_u(stack, &self.memory, memarg),
            op::I64_LOAD8_S => ops::memory::i64_load8_s(stack, &self.memory, memarg),
            op::I64_LOAD8_U => ops::memory::i64_load8_u(stack, &self.memory, memarg),
            op::I64_LOAD16_S => ops::memory::i64_load16_s(stack, &self.memory, memarg),
            op::I64_LOAD16_U => ops::memory::i64_load16_u(stack, &self.memory, memarg),
            op::I64_LOAD32_S => ops::memory::i64_load32_s(stack, &self.memory, memarg),
            op::I64_LOAD32_U => ops::memory::i64_load32_u(stack, &self.memory, memarg),
            op::I32_STORE => ops::memory::i32_store(stack, &mut self.memory, memarg),
            op::I64_STORE => ops::memory::i64_store(stack, &mut self.memory, memarg),
            op::F32_STORE => ops::memory::f32_store(stack, &mut self.memory, memarg),
            op::F64_STORE => ops::memory::f64_store(stack, &mut self.memory, memarg),
            op::I32_STORE8 => ops::memory::i32_store8(stack, &mut self.memory, memarg),
            op::I32_STORE16 => ops::memory::i32_store16(stack, &mut self.memory, memarg),
            op::I64_STORE8 => ops::memory::i64_store8(stack, &mut self.memory, memarg),
            op::I64_STORE16 => ops::memory::i64_store16(stack, &mut self.memory, memarg),
            op::I64_STORE32 => ops::memory::i64_store32(stack, &mut self.memory, memarg),
            _ => Err(RuntimeError::UnsupportedOpcode {
                opcode,
                mnemonic: op::mnemonic(opcode),
            }),
        }
    }
}

fn read_memarg(reader: &mut Reader<'_>) -> Result<MemArg, RuntimeError> {
    Ok(MemArg {
        align: reader.read_vu32()?,
        offset: reader.read_vu32()?,
    })
}

/// Dispatch for the pure stack operations: arithmetic, comparison, bitwise,
/// conversion, and parametric instructions. Anything unrecognised traps.
fn value_op(opcode: u8, stack: &mut Stack) -> Result<(), RuntimeError> {
    match opcode {
        op::DROP => ops::parametric::drop(stack),
        op::SELECT => ops::parametric::select(stack),

        op::I32_EQZ => ops::comparison::i32_eqz(stack),
        op::I32_EQ => ops::comparison::i32_eq(stack),
        op::I32_NE => ops::comparison::i32_ne(stack),
        op::I32_LT_S => ops::comparison::i32_lt_s(stack),
        op::I32_LT_U => ops::comparison::i32_lt_u(stack),
        op::I32_GT_S => ops::comparison::i32_gt_s(stack),
        op::I32_GT_U => ops::comparison::i32_gt_u(stack),
        op::I32_LE_S => ops::comparison::i32_le_s(stack),
        op::I32_LE_U => ops::comparison::i32_le_u(stack),
        op::I32_GE_S => ops::comparison::i32_ge_s(stack),
        op::I32_GE_U => ops::comparison::i32_ge_u(stack),

        op::I64_EQZ => ops::comparison::i64_eqz(stack),
        op::I64_EQ => ops::comparison::i64_eq(stack),
        op::I64_NE => ops::comparison::i64_ne(stack),
        op::I64_LT_S => ops::comparison::i64_lt_s(stack),
        op::I64_LT_U => ops::comparison::i64_lt_u(stack),
        op::I64_GT_S => ops::comparison::i64_gt_s(stack),
        op::I64_GT_U => ops::comparison::i64_gt_u(stack),
        op::I64_LE_S => ops::comparison::i64_le_s(stack),
        op::I64_LE_U => ops::comparison::i64_le_u(stack),
        op::I64_GE_S => ops::comparison::i64_ge_s(stack),
        op::I64_GE_U => ops::comparison::i64_ge_u(stack),

        op::F32_EQ => ops::comparison::f32_eq(stack),
        op::F32_NE => ops::comparison::f32_ne(stack),
        op::F32_LT => ops::comparison::f32_lt(stack),
        op::F32_GT => ops::comparison::f32_gt(stack),
        op::F32_LE => ops::comparison::f32_le(stack),
        op::F32_GE => ops::comparison::f32_ge(stack),

        op::F64_EQ => ops::comparison::f64_eq(stack),
        op::F64_NE => ops::comparison::f64_ne(stack),
        op::F64_LT => ops::comparison::f64_lt(stack),
        op::F64_GT => ops::comparison::f64_gt(stack),
        op::F64_LE => ops::comparison::f64_le(stack),
        op::F64_GE => ops::comparison::f64_ge(stack),

        op::I32_CLZ => ops::bitwise::i32_clz(stack),
        op::I32_CTZ => ops::bitwise::i32_ctz(stack),
        op::I32_POPCNT => ops::bitwise::i32_popcnt(stack),
        op::I32_ADD => ops::numeric::i32_add(stack),
        op::I32_SUB => ops::numeric::i32_sub(stack),
        op::I32_MUL => ops::numeric::i32_mul(stack),
        op::I32_DIV_S => ops::numeric::i32_div_s(stack),
        op::I32_DIV_U => ops::numeric::i32_div_u(stack),
        op::I32_REM_S => ops::numeric::i32_rem_s(stack),
        op::I32_REM_U => ops::numeric::i32_rem_u(stack),
        op::I32_AND => ops::bitwise::i32_and(stack),
        op::I32_OR => ops::bitwise::i32_or(stack),
        op::I32_XOR => ops::bitwise::i32_xor(stack),
        op::I32_SHL => ops::bitwise::i32_shl(stack),
        op::I32_SHR_S => ops::bitwise::i32_shr_s(stack),
        op::I32_SHR_U => ops::bitwise::i32_shr_u(stack),
        op::I32_ROTL => ops::bitwise::i32_rotl(stack),
        op::I32_ROTR => ops::bitwise::i32_rotr(stack),

        op::I64_CLZ => ops::bitwise::i64_clz(stack),
        op::I64_CTZ => ops::bitwise::i64_ctz(stack),
        op::I64_POPCNT => ops::bitwise::i64_popcnt(stack),
        op::I64_ADD => ops::numeric::i64_add(stack),
        op::I64_SUB => ops::numeric::i64_sub(stack),
        op::I64_MUL => ops::numeric::i64_mul(stack),
        op::I64_DIV_S => ops::numeric::i64_div_s(stack),
        op::I64_DIV_U => ops::numeric::i64_div_u(stack),
        op::I64_REM_S => ops::numeric::i64_rem_s(stack),
        op::I64_REM_U => ops::numeric::i64_rem_u(stack),
        op::I64_AND => ops::bitwise::i64_and(stack),
        op::I64_OR => ops::bitwise::i64_or(stack),
        op::I64_XOR => ops::bitwise::i64_xor(stack),
        op::I64_SHL => ops::bitwise::i64_shl(stack),
        op::I64_SHR_S => ops::bitwise::i64_shr_s(stack),
        op::I64_SHR_U => ops::bitwise::i64_shr_u(stack),
        op::I64_ROTL => ops::bitwise::i64_rotl(stack),
        op::I64_ROTR => ops::bitwise::i64_rotr(stack),

        op::F32_ABS => ops::numeric::f32_abs(stack),
        op::F32_NEG => ops::numeric::f32_neg(stack),
        op::F32_CEIL => ops::numeric::f32_ceil(stack),
        op::F32_FLOOR => ops::numeric::f32_floor(stack),
        op::F32_TRUNC => ops::numeric::f32_trunc(stack),
        op::F32_NEAREST => ops::numeric::f32_nearest(stack),
        op::F32_SQRT => ops::numeric::f32_sqrt(stack),
        op::F32_ADD => ops::numeric::f32_add(stack),
        op::F32_SUB => ops::numeric::f32_sub(stack),
        op::F32_MUL => ops::numeric::f32_mul(stack),
        op::F32_DIV => ops::numeric::f32_div(stack),
        op::F32_MIN => ops::numeric::f32_min(stack),
        op::F32_MAX => ops::numeric::f32_max(stack),
        op::F32_COPYSIGN => ops::numeric::f32_copysign(stack),

        op::F64_ABS => ops::numeric::f64_abs(stack),
        op::F64_NEG => ops::numeric::f64_neg(stack),
        op::F64_CEIL => ops::numeric::f64_ceil(stack),
        op::F64_FLOOR => ops::numeric::f64_floor(stack),
        op::F64_TRUNC => ops::numeric::f64_trunc(stack),
        op::F64_NEAREST => ops::numeric::f64_nearest(stack),
        op::F64_SQRT => ops::numeric::f64_sqrt(stack),
        op::F64_ADD => ops::numeric::f64_add(stack),
        op::F64_SUB => ops::numeric::f64_sub(stack),
        op::F64_MUL => ops::numeric::f64_mul(stack),
        op::F64_DIV => ops::numeric::f64_div(stack),
        op::F64_MIN => ops::numeric::f64_min(stack),
        op::F64_MAX => ops::numeric::f64_max(stack),
        op::F64_COPYSIGN => ops::numeric::f64_copysign(stack),

        op::I32_WRAP_I64 => ops::conversion::i32_wrap_i64(stack),
        op::I32_TRUNC_F32_S => ops::conversion::i32_trunc_f32_s(stack),
        op::I32_TRUNC_F32_U => ops::conversion::i32_trunc_f32_u(stack),
        op::I32_TRUNC_F64_S => ops::conversion::i32_trunc_f64_s(stack),
        op::I32_TRUNC_F64_U => ops::conversion::i32_trunc_f64_u(stack),
        op::I64_EXTEND_I32_S => ops::conversion::i64_extend_i32_s(stack),
        op::I64_EXTEND_I32_U => ops::conversion::i64_extend_i32_u(stack),
        op::I64_TRUNC_F32_S => ops::conversion::i64_trunc_f32_s(stack),
        op::I64_TRUNC_F32_U => ops::conversion::i64_trunc_f32_u(stack),
        op::I64_TRUNC_F64_S => ops::conversion::i64_trunc_f64_s(stack),
        op::I64_TRUNC_F64_U => ops::conversion::i64_trunc_f64_u(stack),
        op::F32_CONVERT_I32_S => ops::conversion::f32_convert_i32_s(stack),
        op::F32_CONVERT_I32_U => ops::conversion::f32_convert_i32_u(stack),
        op::F32_CONVERT_I64_S => ops::conversion::f32_convert_i64_s(stack),
        op::F32_CONVERT_I64_U => ops::conversion::f32_convert_i64_u(stack),
        op::F32_DEMOTE_F64 => ops::conversion::f32_demote_f64(stack),
        op::F64_CONVERT_I32_S => ops::conversion::f64_convert_i32_s(stack),
        op::F64_CONVERT_I32_U => ops::conversion::f64_convert_i32_u(stack),
        op::F64_CONVERT_I64_S => ops::conversion::f64_convert_i64_s(stack),
        op::F64_CONVERT_I64_U => ops::conversion::f64_convert_i64_u(stack),
        op::F64_PROMOTE_F32 => ops::conversion::f64_promote_f32(stack),
        op::I32_REINTERPRET_F32 => ops::conversion::i32_reinterpret_f32(stack),
        op::I64_REINTERPRET_F64 => ops::conversion::i64_reinterpret_f64(stack),
        op::F32_REINTERPRET_I32 => ops::conversion::f32_reinterpret_i32(stack),
        op::F64_REINTERPRET_I64 => ops::conversion::f64_reinterpret_i64(stack),

        _ => Err(RuntimeError::UnsupportedOpcode {
            opcode,
            mnemonic: op::mnemonic(opcode),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{Export, ExportKind, Function, FunctionType, MemoryType, Module, ValueType};
    use crate::reader::emit_vu32;

    fn single_function_module(params: Vec<ValueType>, results: Vec<ValueType>, code: Vec<u8>) -> Module {
        Module {
            types: vec![FunctionType { params, results }],
            functions: vec![Function {
                type_index: 0,
                locals: vec![],
                code,
            }],
            memories: vec![MemoryType { initial_pages: 1 }],
            exports: vec![Export {
                name: "main".to_string(),
                kind: ExportKind::Function,
                index: 0,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_identity_function() {
        let module = single_function_module(
            vec![ValueType::I32],
            vec![ValueType::I32],
            vec![op::LOCAL_GET, 0x00, op::END],
        );
        let mut exec = Executor::new(&module).unwrap();
        let results = exec.invoke(0, vec![Value::I32(42)]).unwrap();
        assert_eq!(results, vec![Value::I32(42)]);
    }

    #[test]
    fn test_add_two_params() {
        let module = single_function_module(
            vec![ValueType::I32, ValueType::I32],
            vec![ValueType::I32],
            vec![op::LOCAL_GET, 0x00, op::LOCAL_GET, 0x01, op::I32_ADD, op::END],
        );
        let mut exec = Executor::new(&module).unwrap();
        let results = exec.invoke(0, vec![Value::I32(2), Value::I32(3)]).unwrap();
        assert_eq!(results, vec![Value::I32(5)]);
    }

    #[test]
    fn test_unreachable_traps() {
        let module = single_function_module(vec![], vec![], vec![op::UNREACHABLE, op::END]);
        let mut exec = Executor::new(&module).unwrap();
        assert!(matches!(
            exec.invoke(0, vec![]),
            Err(RuntimeError::Unreachable)
        ));
    }

    #[test]
    fn test_if_without_else_false_condition() {
        // if (param) { unreachable }; return 7
        let code = vec![
            op::LOCAL_GET,
            0x00,
            op::IF,
            op::BLOCKTYPE_EMPTY,
            op::UNREACHABLE,
            op::END,
            op::I32_CONST,
            0x07,
            op::END,
        ];
        let module = single_function_module(vec![ValueType::I32], vec![ValueType::I32], code);

        let mut exec = Executor::new(&module).unwrap();
        let results = exec.invoke(0, vec![Value::I32(0)]).unwrap();
        assert_eq!(results, vec![Value::I32(7)]);

        let mut exec = Executor::new(&module).unwrap();
        assert!(exec.invoke(0, vec![Value::I32(1)]).is_err());
    }

    #[test]
    fn test_br_in_block_exits() {
        // block { br 0; unreachable }; return 1
        let code = vec![
            op::BLOCK,
            op::BLOCKTYPE_EMPTY,
            op::BR,
            0x00,
            op::UNREACHABLE,
            op::END,
            op::I32_CONST,
            0x01,
            op::END,
        ];
        let module = single_function_module(vec![], vec![ValueType::I32], code);
        let mut exec = Executor::new(&module).unwrap();
        assert_eq!(exec.invoke(0, vec![]).unwrap(), vec![Value::I32(1)]);
    }

    #[test]
    fn test_br_if_pops_through_loop_label() {
        // Sum 1..=n with a loop in a block; br_if 1 must branch through
        // both the loop and the block label.
        let mut code = vec![op::BLOCK, op::BLOCKTYPE_EMPTY, op::LOOP, op::BLOCKTYPE_EMPTY];
        // if n == 0, exit the block
        code.extend([op::LOCAL_GET, 0x00, op::I32_EQZ, op::BR_IF, 0x01]);
        // sum += n
        code.extend([op::LOCAL_GET, 0x01, op::LOCAL_GET, 0x00, op::I32_ADD, op::LOCAL_SET, 0x01]);
        // n -= 1
        code.extend([op::LOCAL_GET, 0x00, op::I32_CONST, 0x01, op::I32_SUB, op::LOCAL_SET, 0x00]);
        // repeat
        code.extend([op::BR, 0x00, op::END, op::END, op::LOCAL_GET, 0x01, op::END]);

        let mut module = single_function_module(vec![ValueType::I32], vec![ValueType::I32], code);
        module.functions[0].locals = vec![crate::module::LocalGroup {
            count: 1,
            value_type: ValueType::I32,
        }];

        let mut exec = Executor::new(&module).unwrap();
        assert_eq!(exec.invoke(0, vec![Value::I32(10)]).unwrap(), vec![Value::I32(55)]);
    }

    #[test]
    fn test_direct_call() {
        // func 0: main() -> i32 { call 1; }  func 1: () -> i32 { 9 }
        let module = Module {
            types: vec![FunctionType {
                params: vec![],
                results: vec![ValueType::I32],
            }],
            functions: vec![
                Function {
                    type_index: 0,
                    locals: vec![],
                    code: vec![op::CALL, 0x01, op::END],
                },
                Function {
                    type_index: 0,
                    locals: vec![],
                    code: vec![op::I32_CONST, 0x09, op::END],
                },
            ],
            ..Default::default()
        };
        let mut exec = Executor::new(&module).unwrap();
        assert_eq!(exec.invoke(0, vec![]).unwrap(), vec![Value::I32(9)]);
    }

    #[test]
    fn test_runaway_recursion_traps() {
        let module = single_function_module(vec![], vec![], vec![op::CALL, 0x00, op::END]);
        let mut exec = Executor::new(&module).unwrap();
        assert!(matches!(
            exec.invoke(0, vec![]),
            Err(RuntimeError::CallStackOverflow)
        ));
    }

    #[test]
    fn test_call_indirect_dispatch_and_mismatch() {
        use crate::module::{ElementSegment, TableType};

        let module = Module {
            types: vec![
                FunctionType {
                    params: vec![],
                    results: vec![ValueType::I32],
                },
                FunctionType {
                    params: vec![ValueType::I32],
                    results: vec![ValueType::I32],
                },
            ],
            functions: vec![
                // main(x) -> i32: call_indirect type 0, table 0, element x
                Function {
                    type_index: 1,
                    locals: vec![],
                    code: vec![
                        op::LOCAL_GET,
                        0x00,
                        op::CALL_INDIRECT,
                        0x00,
                        0x00,
                        op::END,
                    ],
                },
                Function {
                    type_index: 0,
                    locals: vec![],
                    code: vec![op::I32_CONST, 0x0B, op::END],
                },
                // Wrong signature for type 0
                Function {
                    type_index: 1,
                    locals: vec![],
                    code: vec![op::LOCAL_GET, 0x00, op::END],
                },
            ],
            tables: vec![TableType { initial_size: 4 }],
            elements: vec![ElementSegment {
                table_index: 0,
                offset: 0,
                func_indices: vec![1, 2],
            }],
            ..Default::default()
        };

        let mut exec = Executor::new(&module).unwrap();
        assert_eq!(exec.invoke(0, vec![Value::I32(0)]).unwrap(), vec![Value::I32(11)]);

        // Element 1 has a mismatched signature
        let mut exec = Executor::new(&module).unwrap();
        assert!(matches!(
            exec.invoke(0, vec![Value::I32(1)]),
            Err(RuntimeError::IndirectCallTypeMismatch { .. })
        ));

        // Element 2 is null
        let mut exec = Executor::new(&module).unwrap();
        assert!(matches!(
            exec.invoke(0, vec![Value::I32(2)]),
            Err(RuntimeError::NullTableElement(2))
        ));

        // Element 9 is out of bounds, and so is a negative index
        let mut exec = Executor::new(&module).unwrap();
        assert!(matches!(
            exec.invoke(0, vec![Value::I32(9)]),
            Err(RuntimeError::TableElementOutOfBounds(9))
        ));
        let mut exec = Executor::new(&module).unwrap();
        assert!(matches!(
            exec.invoke(0, vec![Value::I32(-1)]),
            Err(RuntimeError::TableElementOutOfBounds(_))
        ));
    }

    #[test]
    fn test_br_table_selects_target() {
        // block { block { br_table [1, 0] default 1 (x) ; } return 10 } return 20
        // index 0 -> depth 1 (outer) -> 20; index 1 -> depth 0 (inner) -> 10;
        // out of range -> default depth 1 -> 20
        let mut code = vec![
            op::BLOCK,
            op::BLOCKTYPE_EMPTY,
            op::BLOCK,
            op::BLOCKTYPE_EMPTY,
            op::LOCAL_GET,
            0x00,
            op::BR_TABLE,
        ];
        code.extend(emit_vu32(2)); // two explicit targets
        code.extend(emit_vu32(1));
        code.extend(emit_vu32(0));
        code.extend(emit_vu32(1)); // default
        code.extend([
            op::END,
            op::I32_CONST,
            0x0A,
            op::RETURN,
            op::END,
            op::I32_CONST,
            0x14,
            op::END,
        ]);
        let module = single_function_module(vec![ValueType::I32], vec![ValueType::I32], code);

        let run = |arg: i32| {
            let mut exec = Executor::new(&module).unwrap();
            exec.invoke(0, vec![Value::I32(arg)]).unwrap()
        };
        assert_eq!(run(0), vec![Value::I32(20)]);
        assert_eq!(run(1), vec![Value::I32(10)]);
        assert_eq!(run(5), vec![Value::I32(20)]);
        assert_eq!(run(-1), vec![Value::I32(20)]);
    }

    #[test]
    fn test_return_restores_caller_stack() {
        // main pushes a value, calls a function that returns one result,
        // then adds them.
        let module = Module {
            types: vec![
                FunctionType {
                    params: vec![],
                    results: vec![ValueType::I32],
                },
                FunctionType {
                    params: vec![],
                    results: vec![ValueType::I32],
                },
            ],
            functions: vec![
                Function {
                    type_index: 0,
                    locals: vec![],
                    code: vec![
                        op::I32_CONST,
                        0x05,
                        op::CALL,
                        0x01,
                        op::I32_ADD,
                        op::END,
                    ],
                },
                Function {
                    type_index: 1,
                    locals: vec![],
                    code: vec![op::I32_CONST, 0x02, op::I32_CONST, 0x03, op::DROP, op::RETURN, op::END],
                },
            ],
            ..Default::default()
        };
        let mut exec = Executor::new(&module).unwrap();
        assert_eq!(exec.invoke(0, vec![]).unwrap(), vec![Value::I32(7)]);
    }

    #[test]
    fn test_global_get_set() {
        use crate::module::Global;

        let mut module = single_function_module(
            vec![],
            vec![ValueType::I32],
            vec![
                op::GLOBAL_GET,
                0x00,
                op::I32_CONST,
                0x01,
                op::I32_ADD,
                op::GLOBAL_SET,
                0x00,
                op::GLOBAL_GET,
                0x00,
                op::END,
            ],
        );
        module.globals = vec![Global {
            value_type: ValueType::I32,
            mutable: true,
            init: Value::I32(41),
        }];

        let mut exec = Executor::new(&module).unwrap();
        assert_eq!(exec.invoke(0, vec![]).unwrap(), vec![Value::I32(42)]);
    }

    #[test]
    fn test_unsupported_opcode_traps() {
        let module = single_function_module(vec![], vec![], vec![op::MEMORY_GROW, 0x00, op::END]);
        let mut exec = Executor::new(&module).unwrap();
        assert!(matches!(
            exec.invoke(0, vec![]),
            Err(RuntimeError::UnsupportedOpcode { .. })
        ));
    }

    #[test]
    fn test_result_arity_checked() {
        // Declared () -> i32 but leaves nothing on the stack
        let module = single_function_module(vec![], vec![ValueType::I32], vec![op::NOP, op::END]);
        let mut exec = Executor::new(&module).unwrap();
        assert!(matches!(
            exec.invoke(0, vec![]),
            Err(RuntimeError::ResultUnderflow)
        ));
    }

    #[test]
    fn test_data_segment_instantiation() {
        use crate::module::DataSegment;

        // main() -> i32 { i32.load8_u(3) }
        let mut module = single_function_module(
            vec![],
            vec![ValueType::I32],
            vec![
                op::I32_CONST,
                0x03,
                op::I32_LOAD8_U,
                0x00,
                0x00,
                op::END,
            ],
        );
        module.data = vec![DataSegment {
            offset: 0,
            bytes: vec![10, 20, 30, 40],
        }];

        let mut exec = Executor::new(&module).unwrap();
        assert_eq!(exec.invoke(0, vec![]).unwrap(), vec![Value::I32(40)]);
        assert_eq!(exec.memory().read_u8(0).unwrap(), 10);
    }

    #[test]
    fn test_data_segment_overflow_traps() {
        use crate::module::DataSegment;

        let mut module = single_function_module(vec![], vec![], vec![op::END]);
        module.data = vec![DataSegment {
            offset: crate::runtime::memory::PAGE_SIZE as u32 - 1,
            bytes: vec![1, 2],
        }];
        assert!(matches!(
            Executor::new(&module),
            Err(RuntimeError::DataSegmentOutOfBounds)
        ));
    }
}
