//! Activation frames and the per-frame label stack
//!
//! A frame is the record of one in-flight function call: its locals, its
//! saved program counter, and the stack of labels for the structured control
//! regions currently entered. The bottom label of every live frame is always
//! the implicit function-body label.

use super::control::ControlMap;
use super::Value;
use std::rc::Rc;

/// Kind of a structured control region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    /// The function body itself; closing it returns from the frame
    ImplicitFunction,
    Block,
    Loop,
    If,
}

/// A label on a frame's label stack
///
/// `target_pc` is where a branch to this label lands: the first instruction
/// of the body for a loop (so a branch re-iterates), the byte just past the
/// matching `end` for a block or if, and the final `end` byte itself for the
/// implicit function label (so a branch to it performs the return).
#[derive(Debug, Clone, Copy)]
pub struct Label {
    pub kind: LabelKind,
    /// Operand-stack depth when this label was entered
    pub stack_height: usize,
    pub target_pc: usize,
}

/// Execution frame for one function activation
#[derive(Debug)]
pub struct Frame {
    /// Index of the executing function in the module's function index space
    pub func_idx: u32,
    /// Byte offset of the next instruction within the function's code
    pub pc: usize,
    /// Parameters followed by zero-initialized pure locals
    pub locals: Vec<Value>,
    pub labels: Vec<Label>,
    /// Operand-stack depth at entry, after the parameters were popped;
    /// restored on return
    pub stack_height_on_entry: usize,
    /// Pre-indexed control-flow targets for this function
    pub ctrl: Rc<ControlMap>,
}

impl Frame {
    /// The label `depth` entries down from the top of the label stack
    pub fn label_from_top(&self, depth: u32) -> Option<&Label> {
        let len = self.labels.len();
        if (depth as usize) < len {
            self.labels.get(len - 1 - depth as usize)
        } else {
            None
        }
    }
}
