//! Conversion operations between the four value types
//!
//! The `trunc` family converts float to integer and traps on NaN and on
//! values whose truncation falls outside the target range. `convert`,
//! `demote`/`promote`, and the reinterpret casts never trap.

use super::{RuntimeError, Stack, Value};

pub fn i32_wrap_i64(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c = stack.pop_i64()?;
    stack.push(Value::I32(c as i32));
    Ok(())
}

pub fn i64_extend_i32_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c = stack.pop_i32()?;
    stack.push(Value::I64(c as i64));
    Ok(())
}

pub fn i64_extend_i32_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c = stack.pop_i32()?;
    stack.push(Value::I64((c as u32) as i64));
    Ok(())
}

// Truncating float-to-int conversions. The bounds are the smallest and
// largest floats whose truncation still fits the target; both endpoints of
// the exclusive side are exactly representable, so plain comparisons are
// enough.

fn trunc_checked_f64(value: f64, lo: f64, hi: f64) -> Result<f64, RuntimeError> {
    if value.is_nan() {
        return Err(RuntimeError::InvalidConversion("NaN".to_string()));
    }
    let truncated = value.trunc();
    if truncated < lo || truncated > hi {
        return Err(RuntimeError::IntegerOverflow);
    }
    Ok(truncated)
}

pub fn i32_trunc_f32_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c = stack.pop_f32()?;
    let t = trunc_checked_f64(c as f64, -2147483648.0, 2147483647.0)?;
    stack.push(Value::I32(t as i32));
    Ok(())
}

pub fn i32_trunc_f32_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c = stack.pop_f32()?;
    let t = trunc_checked_f64(c as f64, 0.0, 4294967295.0)?;
    stack.push(Value::I32(t as u32 as i32));
    Ok(())
}

pub fn i32_trunc_f64_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c = stack.pop_f64()?;
    let t = trunc_checked_f64(c, -2147483648.0, 2147483647.0)?;
    stack.push(Value::I32(t as i32));
    Ok(())
}

pub fn i32_trunc_f64_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c = stack.pop_f64()?;
    let t = trunc_checked_f64(c, 0.0, 4294967295.0)?;
    stack.push(Value::I32(t as u32 as i32));
    Ok(())
}

// For the 64-bit targets the upper bound 2^63 (or 2^64) itself is exactly
// representable but out of range, so the check is exclusive there.

fn trunc_checked_i64(value: f64, lo: f64, hi_exclusive: f64) -> Result<f64, RuntimeError> {
    if value.is_nan() {
        return Err(RuntimeError::InvalidConversion("NaN".to_string()));
    }
    let truncated = value.trunc();
    if truncated < lo || truncated >= hi_exclusive {
        return Err(RuntimeError::IntegerOverflow);
    }
    Ok(truncated)
}

pub fn i64_trunc_f32_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c = stack.pop_f32()?;
    let t = trunc_checked_i64(c as f64, -9223372036854775808.0, 9223372036854775808.0)?;
    stack.push(Value::I64(t as i64));
    Ok(())
}

pub fn i64_trunc_f32_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c = stack.pop_f32()?;
    let t = trunc_checked_i64(c as f64, 0.0, 18446744073709551616.0)?;
    stack.push(Value::I64(t as u64 as i64));
    Ok(())
}

pub fn i64_trunc_f64_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c = stack.pop_f64()?;
    let t = trunc_checked_i64(c, -9223372036854775808.0, 9223372036854775808.0)?;
    stack.push(Value::I64(t as i64));
    Ok(())
}

pub fn i64_trunc_f64_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c = stack.pop_f64()?;
    let t = trunc_checked_i64(c, 0.0, 18446744073709551616.0)?;
    stack.push(Value::I64(t as u64 as i64));
    Ok(())
}

// Int-to-float conversions

pub fn f32_convert_i32_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c = stack.pop_i32()?;
    stack.push(Value::F32(c as f32));
    Ok(())
}

pub fn f32_convert_i32_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c = stack.pop_i32()?;
    stack.push(Value::F32((c as u32) as f32));
    Ok(())
}

pub fn f32_convert_i64_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c = stack.pop_i64()?;
    stack.push(Value::F32(c as f32));
    Ok(())
}

pub fn f32_convert_i64_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c = stack.pop_i64()?;
    stack.push(Value::F32((c as u64) as f32));
    Ok(())
}

pub fn f64_convert_i32_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c = stack.pop_i32()?;
    stack.push(Value::F64(c as f64));
    Ok(())
}

pub fn f64_convert_i32_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c = stack.pop_i32()?;
    stack.push(Value::F64((c as u32) as f64));
    Ok(())
}

pub fn f64_convert_i64_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c = stack.pop_i64()?;
    stack.push(Value::F64(c as f64));
    Ok(())
}

pub fn f64_convert_i64_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c = stack.pop_i64()?;
    stack.push(Value::F64((c as u64) as f64));
    Ok(())
}

pub fn f32_demote_f64(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c = stack.pop_f64()?;
    stack.push(Value::F32(c as f32));
    Ok(())
}

pub fn f64_promote_f32(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c = stack.pop_f32()?;
    stack.push(Value::F64(c as f64));
    Ok(())
}

// Bit-pattern reinterpretations

pub fn i32_reinterpret_f32(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c = stack.pop_f32()?;
    stack.push(Value::I32(c.to_bits() as i32));
    Ok(())
}

pub fn i64_reinterpret_f64(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c = stack.pop_f64()?;
    stack.push(Value::I64(c.to_bits() as i64));
    Ok(())
}

pub fn f32_reinterpret_i32(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c = stack.pop_i32()?;
    stack.push(Value::F32(f32::from_bits(c as u32)));
    Ok(())
}

pub fn f64_reinterpret_i64(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c = stack.pop_i64()?;
    stack.push(Value::F64(f64::from_bits(c as u64)));
    Ok(())
}
