//! WebAssembly tables
//!
//! A table is a fixed-size vector of function handles (module function
//! indices), consulted by `call_indirect`. Slots start out null; element
//! segments fill them at instantiation. Any type mismatch or null entry at
//! call time must trap, since tables are what stand between an i32 index
//! and a function call.

use super::RuntimeError;

/// A table instance holding optional function handles
#[derive(Debug)]
pub struct Table {
    elements: Vec<Option<u32>>,
}

impl Table {
    /// Create a table of `initial_size` null entries
    pub fn new(initial_size: u32) -> Self {
        Table {
            elements: vec![None; initial_size as usize],
        }
    }

    /// Number of elements
    pub fn size(&self) -> u32 {
        self.elements.len() as u32
    }

    /// The function handle at `index`; `None` for a null slot
    pub fn get(&self, index: u32) -> Result<Option<u32>, RuntimeError> {
        self.elements
            .get(index as usize)
            .copied()
            .ok_or(RuntimeError::TableElementOutOfBounds(index))
    }

    /// Write an element segment's function handles starting at `offset`;
    /// traps when the write would run past the table
    pub fn init_segment(&mut self, offset: u32, func_indices: &[u32]) -> Result<(), RuntimeError> {
        let start = offset as usize;
        let end = start
            .checked_add(func_indices.len())
            .ok_or(RuntimeError::ElementSegmentOutOfBounds)?;
        if end > self.elements.len() {
            return Err(RuntimeError::ElementSegmentOutOfBounds);
        }
        for (slot, func_idx) in self.elements[start..end].iter_mut().zip(func_indices) {
            *slot = Some(*func_idx);
        }
        Ok(())
    }
}
