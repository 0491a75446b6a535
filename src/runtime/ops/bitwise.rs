//! Bitwise and bit-counting operations
//!
//! Shift and rotate counts are taken modulo the operand width, per
//! WebAssembly semantics.

use super::{RuntimeError, Stack, Value};

// i32

pub fn i32_and(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i32()?;
    let c1 = stack.pop_i32()?;
    stack.push(Value::I32(c1 & c2));
    Ok(())
}

pub fn i32_or(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i32()?;
    let c1 = stack.pop_i32()?;
    stack.push(Value::I32(c1 | c2));
    Ok(())
}

pub fn i32_xor(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i32()?;
    let c1 = stack.pop_i32()?;
    stack.push(Value::I32(c1 ^ c2));
    Ok(())
}

pub fn i32_shl(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i32()?;
    let c1 = stack.pop_i32()?;
    stack.push(Value::I32(c1.wrapping_shl(c2 as u32)));
    Ok(())
}

/// i32.shr_s: arithmetic shift, keeping the sign bit
pub fn i32_shr_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i32()?;
    let c1 = stack.pop_i32()?;
    stack.push(Value::I32(c1.wrapping_shr(c2 as u32)));
    Ok(())
}

/// i32.shr_u: logical shift over the unsigned bit pattern
pub fn i32_shr_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i32()?;
    let c1 = stack.pop_i32()?;
    stack.push(Value::I32(((c1 as u32).wrapping_shr(c2 as u32)) as i32));
    Ok(())
}

pub fn i32_rotl(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i32()?;
    let c1 = stack.pop_i32()?;
    stack.push(Value::I32((c1 as u32).rotate_left(c2 as u32) as i32));
    Ok(())
}

pub fn i32_rotr(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i32()?;
    let c1 = stack.pop_i32()?;
    stack.push(Value::I32((c1 as u32).rotate_right(c2 as u32) as i32));
    Ok(())
}

pub fn i32_clz(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c = stack.pop_i32()?;
    stack.push(Value::I32(c.leading_zeros() as i32));
    Ok(())
}

pub fn i32_ctz(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c = stack.pop_i32()?;
    stack.push(Value::I32(c.trailing_zeros() as i32));
    Ok(())
}

pub fn i32_popcnt(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c = stack.pop_i32()?;
    stack.push(Value::I32(c.count_ones() as i32));
    Ok(())
}

// i64

pub fn i64_and(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i64()?;
    let c1 = stack.pop_i64()?;
    stack.push(Value::I64(c1 & c2));
    Ok(())
}

pub fn i64_or(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i64()?;
    let c1 = stack.pop_i64()?;
    stack.push(Value::I64(c1 | c2));
    Ok(())
}

pub fn i64_xor(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i64()?;
    let c1 = stack.pop_i64()?;
    stack.push(Value::I64(c1 ^ c2));
    Ok(())
}

pub fn i64_shl(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i64()?;
    let c1 = stack.pop_i64()?;
    stack.push(Value::I64(c1.wrapping_shl(c2 as u32)));
    Ok(())
}

pub fn i64_shr_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i64()?;
    let c1 = stack.pop_i64()?;
    stack.push(Value::I64(c1.wrapping_shr(c2 as u32)));
    Ok(())
}

pub fn i64_shr_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i64()?;
    let c1 = stack.pop_i64()?;
    stack.push(Value::I64(((c1 as u64).wrapping_shr(c2 as u32)) as i64));
    Ok(())
}

pub fn i64_rotl(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i64()?;
    let c1 = stack.pop_i64()?;
    stack.push(Value::I64((c1 as u64).rotate_left(c2 as u32) as i64));
    Ok(())
}

pub fn i64_rotr(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i64()?;
    let c1 = stack.pop_i64()?;
    stack.push(Value::I64((c1 as u64).rotate_right(c2 as u32) as i64));
    Ok(())
}

pub fn i64_clz(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c = stack.pop_i64()?;
    stack.push(Value::I64(c.leading_zeros() as i64));
    Ok(())
}

pub fn i64_ctz(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c = stack.pop_i64()?;
    stack.push(Value::I64(c.trailing_zeros() as i64));
    Ok(())
}

pub fn i64_popcnt(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c = stack.pop_i64()?;
    stack.push(Value::I64(c.count_ones() as i64));
    Ok(())
}
