//! Control-flow pre-indexing
//!
//! Before a function executes for the first time, a single linear scan over
//! its code bytes pairs every `block`/`loop`/`if` header with the offsets of
//! its `else` (if any) and matching `end`. Branches then resolve in constant
//! time: the dispatcher never has to walk forward looking for an `end`.

use super::frame::LabelKind;
use super::RuntimeError;
use crate::opcode as op;
use crate::reader::Reader;
use std::collections::HashMap;

/// Pre-indexed targets for one structured header
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CtrlMeta {
    pub kind: LabelKind,
    /// Offset just past the `else` opcode, for an `if` that has one
    pub else_pc: Option<usize>,
    /// Offset of the matching `end` opcode byte
    pub end_pc: usize,
}

/// Complete control-flow index for one function body
///
/// The function body's own implicit region is kept out of the header table
/// (a `block` whose header is the very first code byte would otherwise
/// collide with it) and recorded as `body_end` instead.
#[derive(Debug)]
pub struct ControlMap {
    entries: HashMap<usize, CtrlMeta>,
    body_end: usize,
}

impl ControlMap {
    /// Scan `code` once and build the lookup table.
    ///
    /// Errors are traps raised at pre-index time: a non-empty blocktype, an
    /// `else` outside an `if`, an unmatched `end`, or a structured region
    /// left open at end of code.
    pub fn build(code: &[u8]) -> Result<ControlMap, RuntimeError> {
        let mut entries = HashMap::new();
        let mut body_end = None;
        // Working stack of open regions; `None` header marks the implicit
        // function body seeded below.
        let mut ctrl_stack: Vec<(Option<usize>, LabelKind, Option<usize>)> =
            vec![(None, LabelKind::ImplicitFunction, None)];

        let mut reader = Reader::new(code);
        while reader.has_more() {
            let header = reader.pos();
            let opcode = reader.read_byte()?;
            match opcode {
                op::BLOCK | op::LOOP | op::IF => {
                    let block_type = reader.read_byte()?;
                    if block_type != op::BLOCKTYPE_EMPTY {
                        return Err(RuntimeError::UnsupportedBlockType(block_type));
                    }
                    let kind = match opcode {
                        op::LOOP => LabelKind::Loop,
                        op::IF => LabelKind::If,
                        _ => LabelKind::Block,
                    };
                    ctrl_stack.push((Some(header), kind, None));
                }
                op::ELSE => {
                    match ctrl_stack.last_mut() {
                        Some((_, LabelKind::If, else_pc)) => *else_pc = Some(reader.pos()),
                        _ => return Err(RuntimeError::ElseWithoutIf),
                    }
                }
                op::END => {
                    let (opened, kind, else_pc) =
                        ctrl_stack.pop().ok_or(RuntimeError::UnbalancedEnd)?;
                    match opened {
                        Some(offset) => {
                            entries.insert(
                                offset,
                                CtrlMeta {
                                    kind,
                                    else_pc,
                                    end_pc: header,
                                },
                            );
                        }
                        None => body_end = Some(header),
                    }
                }
                _ => skip_immediates(opcode, &mut reader)?,
            }
        }

        if !ctrl_stack.is_empty() {
            return Err(RuntimeError::UnclosedBlock);
        }
        let body_end = body_end.ok_or(RuntimeError::UnclosedBlock)?;

        Ok(ControlMap { entries, body_end })
    }

    /// Targets for the structured header at `offset`
    pub fn meta(&self, offset: usize) -> Result<&CtrlMeta, RuntimeError> {
        self.entries
            .get(&offset)
            .ok_or(RuntimeError::MissingControlEntry(offset))
    }

    /// Offset of the `end` byte that closes the function body
    pub fn body_end(&self) -> usize {
        self.body_end
    }

    /// A map with no structured regions, for frames built by hand in tests
    pub fn empty(body_end: usize) -> ControlMap {
        ControlMap {
            entries: HashMap::new(),
            body_end,
        }
    }
}

/// Advance the cursor past the immediates of `opcode`.
///
/// Covers every instruction the dispatcher handles; opcodes with no
/// immediates (including ones the dispatcher will trap on) fall through
/// untouched.
fn skip_immediates(opcode: u8, reader: &mut Reader<'_>) -> Result<(), RuntimeError> {
    match opcode {
        // One u32 immediate
        op::BR
        | op::BR_IF
        | op::CALL
        | op::LOCAL_GET
        | op::LOCAL_SET
        | op::LOCAL_TEE
        | op::GLOBAL_GET
        | op::GLOBAL_SET
        | op::MEMORY_SIZE
        | op::MEMORY_GROW => {
            reader.read_vu32()?;
        }
        // Two u32 immediates: align/offset pairs and call_indirect
        op::CALL_INDIRECT | op::I32_LOAD..=op::I64_STORE32 => {
            reader.read_vu32()?;
            reader.read_vu32()?;
        }
        op::BR_TABLE => {
            let target_count = reader.read_vu32()?;
            for _ in 0..target_count {
                reader.read_vu32()?;
            }
            reader.read_vu32()?;
        }
        op::I32_CONST => {
            reader.read_vs32()?;
        }
        op::I64_CONST => {
            reader.read_vs64()?;
        }
        op::F32_CONST => {
            reader.read_u32_raw()?;
        }
        op::F64_CONST => {
            reader.read_u64_raw()?;
        }
        _ => {}
    }
    Ok(())
}
