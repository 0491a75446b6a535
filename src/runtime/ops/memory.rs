//! Memory load and store operations
//!
//! Every access pops an i32 base address, adds the immediate offset, and
//! bounds-checks the full width against linear memory. The engine holds
//! addresses as signed i32 values, so a negative base traps outright; the
//! addition is done in 64 bits so it cannot wrap. Byte order is
//! little-endian throughout. The alignment immediate is a hint only.

use super::{MemArg, Memory, RuntimeError, Stack, Value};

/// Effective address of an access: popped base plus constant offset,
/// evaluated as an unsigned 64-bit sum
#[inline]
fn effective_address(base: i32, memarg: &MemArg) -> Result<u64, RuntimeError> {
    if base < 0 {
        return Err(RuntimeError::NegativeAddress);
    }
    Ok(base as u64 + memarg.offset as u64)
}

// Loads

pub fn i32_load(stack: &mut Stack, memory: &Memory, memarg: &MemArg) -> Result<(), RuntimeError> {
    let addr = stack.pop_i32()?;
    let ea = effective_address(addr, memarg)?;
    stack.push(Value::I32(memory.read_i32(ea)?));
    Ok(())
}

pub fn i64_load(stack: &mut Stack, memory: &Memory, memarg: &MemArg) -> Result<(), RuntimeError> {
    let addr = stack.pop_i32()?;
    let ea = effective_address(addr, memarg)?;
    stack.push(Value::I64(memory.read_i64(ea)?));
    Ok(())
}

pub fn f32_load(stack: &mut Stack, memory: &Memory, memarg: &MemArg) -> Result<(), RuntimeError> {
    let addr = stack.pop_i32()?;
    let ea = effective_address(addr, memarg)?;
    stack.push(Value::F32(memory.read_f32(ea)?));
    Ok(())
}

pub fn f64_load(stack: &mut Stack, memory: &Memory, memarg: &MemArg) -> Result<(), RuntimeError> {
    let addr = stack.pop_i32()?;
    let ea = effective_address(addr, memarg)?;
    stack.push(Value::F64(memory.read_f64(ea)?));
    Ok(())
}

pub fn i32_load8_s(stack: &mut Stack, memory: &Memory, memarg: &MemArg) -> Result<(), RuntimeError> {
    let addr = stack.pop_i32()?;
    let ea = effective_address(addr, memarg)?;
    stack.push(Value::I32(memory.read_i8(ea)? as i32));
    Ok(())
}

pub fn i32_load8_u(stack: &mut Stack, memory: &Memory, memarg: &MemArg) -> Result<(), RuntimeError> {
    let addr = stack.pop_i32()?;
    let ea = effective_address(addr, memarg)?;
    stack.push(Value::I32(memory.read_u8(ea)? as i32));
    Ok(())
}

pub fn i32_load16_s(stack: &mut Stack, memory: &Memory, memarg: &MemArg) -> Result<(), RuntimeError> {
    let addr = stack.pop_i32()?;
    let ea = effective_address(addr, memarg)?;
    stack.push(Value::I32(memory.read_i16(ea)? as i32));
    Ok(())
}

pub fn i32_load16_u(stack: &mut Stack, memory: &Memory, memarg: &MemArg) -> Result<(), RuntimeError> {
    let addr = stack.pop_i32()?;
    let ea = effective_address(addr, memarg)?;
    stack.push(Value::I32(memory.read_u16(ea)? as i32));
    Ok(())
}

pub fn i64_load8_s(stack: &mut Stack, memory: &Memory, memarg: &MemArg) -> Result<(), RuntimeError> {
    let addr = stack.pop_i32()?;
    let ea = effective_address(addr, memarg)?;
    stack.push(Value::I64(memory.read_i8(ea)? as i64));
    Ok(())
}

pub fn i64_load8_u(stack: &mut Stack, memory: &Memory, memarg: &MemArg) -> Result<(), RuntimeError> {
    let addr = stack.pop_i32()?;
    let ea = effective_address(addr, memarg)?;
    stack.push(Value::I64(memory.read_u8(ea)? as i64));
    Ok(())
}

pub fn i64_load16_s(stack: &mut Stack, memory: &Memory, memarg: &MemArg) -> Result<(), RuntimeError> {
    let addr = stack.pop_i32()?;
    let ea = effective_address(addr, memarg)?;
    stack.push(Value::I64(memory.read_i16(ea)? as i64));
    Ok(())
}

pub fn i64_load16_u(stack: &mut Stack, memory: &Memory, memarg: &MemArg) -> Result<(), RuntimeError> {
    let addr = stack.pop_i32()?;
    let ea = effective_address(addr, memarg)?;
    stack.push(Value::I64(memory.read_u16(ea)? as i64));
    Ok(())
}

pub fn i64_load32_s(stack: &mut Stack, memory: &Memory, memarg: &MemArg) -> Result<(), RuntimeError> {
    let addr = stack.pop_i32()?;
    let ea = effective_address(addr, memarg)?;
    stack.push(Value::I64(memory.read_i32(ea)? as i64));
    Ok(())
}

pub fn i64_load32_u(stack: &mut Stack, memory: &Memory, memarg: &MemArg) -> Result<(), RuntimeError> {
    let addr = stack.pop_i32()?;
    let ea = effective_address(addr, memarg)?;
    stack.push(Value::I64(memory.read_u32(ea)? as i64));
    Ok(())
}

// Stores. The value is on top of the stack, above the address.

pub fn i32_store(stack: &mut Stack, memory: &mut Memory, memarg: &MemArg) -> Result<(), RuntimeError> {
    let value = stack.pop_i32()?;
    let addr = stack.pop_i32()?;
    let ea = effective_address(addr, memarg)?;
    memory.write_u32(ea, value as u32)
}

pub fn i64_store(stack: &mut Stack, memory: &mut Memory, memarg: &MemArg) -> Result<(), RuntimeError> {
    let value = stack.pop_i64()?;
    let addr = stack.pop_i32()?;
    let ea = effective_address(addr, memarg)?;
    memory.write_u64(ea, value as u64)
}

pub fn f32_store(stack: &mut Stack, memory: &mut Memory, memarg: &MemArg) -> Result<(), RuntimeError> {
    let value = stack.pop_f32()?;
    let addr = stack.pop_i32()?;
    let ea = effective_address(addr, memarg)?;
    memory.write_f32(ea, value)
}

pub fn f64_store(stack: &mut Stack, memory: &mut Memory, memarg: &MemArg) -> Result<(), RuntimeError> {
    let value = stack.pop_f64()?;
    let addr = stack.pop_i32()?;
    let ea = effective_address(addr, memarg)?;
    memory.write_f64(ea, value)
}

pub fn i32_store8(stack: &mut Stack, memory: &mut Memory, memarg: &MemArg) -> Result<(), RuntimeError> {
    let value = stack.pop_i32()?;
    let addr = stack.pop_i32()?;
    let ea = effective_address(addr, memarg)?;
    memory.write_u8(ea, value as u8)
}

pub fn i32_store16(stack: &mut Stack, memory: &mut Memory, memarg: &MemArg) -> Result<(), RuntimeError> {
    let value = stack.pop_i32()?;
    let addr = stack.pop_i32()?;
    let ea = effective_address(addr, memarg)?;
    memory.write_u16(ea, value as u16)
}

pub fn i64_store8(stack: &mut Stack, memory: &mut Memory, memarg: &MemArg) -> Result<(), RuntimeError> {
    let value = stack.pop_i64()?;
    let addr = stack.pop_i32()?;
    let ea = effective_address(addr, memarg)?;
    memory.write_u8(ea, value as u8)
}

pub fn i64_store16(stack: &mut Stack, memory: &mut Memory, memarg: &MemArg) -> Result<(), RuntimeError> {
    let value = stack.pop_i64()?;
    let addr = stack.pop_i32()?;
    let ea = effective_address(addr, memarg)?;
    memory.write_u16(ea, value as u16)
}

pub fn i64_store32(stack: &mut Stack, memory: &mut Memory, memarg: &MemArg) -> Result<(), RuntimeError> {
    let value = stack.pop_i64()?;
    let addr = stack.pop_i32()?;
    let ea = effective_address(addr, memarg)?;
    memory.write_u32(ea, value as u32)
}
