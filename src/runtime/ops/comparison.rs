//! Test and comparison operations
//!
//! Every comparison pushes an i32 that is 1 or 0. The `_u` forms compare
//! the reinterpreted unsigned bit patterns; the floating-point forms are
//! IEEE-754 ordered comparisons, so any NaN operand makes `eq`/`lt`/...
//! false and `ne` true.

use super::{RuntimeError, Stack, Value};

#[inline]
fn push_bool(stack: &mut Stack, cond: bool) {
    stack.push(Value::I32(cond as i32));
}

// i32

pub fn i32_eqz(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c = stack.pop_i32()?;
    push_bool(stack, c == 0);
    Ok(())
}

pub fn i32_eq(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i32()?;
    let c1 = stack.pop_i32()?;
    push_bool(stack, c1 == c2);
    Ok(())
}

pub fn i32_ne(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i32()?;
    let c1 = stack.pop_i32()?;
    push_bool(stack, c1 != c2);
    Ok(())
}

pub fn i32_lt_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i32()?;
    let c1 = stack.pop_i32()?;
    push_bool(stack, c1 < c2);
    Ok(())
}

pub fn i32_lt_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i32()?;
    let c1 = stack.pop_i32()?;
    push_bool(stack, (c1 as u32) < (c2 as u32));
    Ok(())
}

pub fn i32_gt_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i32()?;
    let c1 = stack.pop_i32()?;
    push_bool(stack, c1 > c2);
    Ok(())
}

pub fn i32_gt_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i32()?;
    let c1 = stack.pop_i32()?;
    push_bool(stack, (c1 as u32) > (c2 as u32));
    Ok(())
}

pub fn i32_le_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i32()?;
    let c1 = stack.pop_i32()?;
    push_bool(stack, c1 <= c2);
    Ok(())
}

pub fn i32_le_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i32()?;
    let c1 = stack.pop_i32()?;
    push_bool(stack, (c1 as u32) <= (c2 as u32));
    Ok(())
}

pub fn i32_ge_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i32()?;
    let c1 = stack.pop_i32()?;
    push_bool(stack, c1 >= c2);
    Ok(())
}

pub fn i32_ge_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i32()?;
    let c1 = stack.pop_i32()?;
    push_bool(stack, (c1 as u32) >= (c2 as u32));
    Ok(())
}

// i64

pub fn i64_eqz(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c = stack.pop_i64()?;
    push_bool(stack, c == 0);
    Ok(())
}

pub fn i64_eq(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i64()?;
    let c1 = stack.pop_i64()?;
    push_bool(stack, c1 == c2);
    Ok(())
}

pub fn i64_ne(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i64()?;
    let c1 = stack.pop_i64()?;
    push_bool(stack, c1 != c2);
    Ok(())
}

pub fn i64_lt_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i64()?;
    let c1 = stack.pop_i64()?;
    push_bool(stack, c1 < c2);
    Ok(())
}

pub fn i64_lt_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i64()?;
    let c1 = stack.pop_i64()?;
    push_bool(stack, (c1 as u64) < (c2 as u64));
    Ok(())
}

pub fn i64_gt_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i64()?;
    let c1 = stack.pop_i64()?;
    push_bool(stack, c1 > c2);
    Ok(())
}

pub fn i64_gt_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i64()?;
    let c1 = stack.pop_i64()?;
    push_bool(stack, (c1 as u64) > (c2 as u64));
    Ok(())
}

pub fn i64_le_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i64()?;
    let c1 = stack.pop_i64()?;
    push_bool(stack, c1 <= c2);
    Ok(())
}

pub fn i64_le_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i64()?;
    let c1 = stack.pop_i64()?;
    push_bool(stack, (c1 as u64) <= (c2 as u64));
    Ok(())
}

pub fn i64_ge_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i64()?;
    let c1 = stack.pop_i64()?;
    push_bool(stack, c1 >= c2);
    Ok(())
}

pub fn i64_ge_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i64()?;
    let c1 = stack.pop_i64()?;
    push_bool(stack, (c1 as u64) >= (c2 as u64));
    Ok(())
}

// f32

pub fn f32_eq(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_f32()?;
    let c1 = stack.pop_f32()?;
    push_bool(stack, c1 == c2);
    Ok(())
}

pub fn f32_ne(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_f32()?;
    let c1 = stack.pop_f32()?;
    push_bool(stack, c1 != c2);
    Ok(())
}

pub fn f32_lt(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_f32()?;
    let c1 = stack.pop_f32()?;
    push_bool(stack, c1 < c2);
    Ok(())
}

pub fn f32_gt(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_f32()?;
    let c1 = stack.pop_f32()?;
    push_bool(stack, c1 > c2);
    Ok(())
}

pub fn f32_le(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_f32()?;
    let c1 = stack.pop_f32()?;
    push_bool(stack, c1 <= c2);
    Ok(())
}

pub fn f32_ge(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_f32()?;
    let c1 = stack.pop_f32()?;
    push_bool(stack, c1 >= c2);
    Ok(())
}

// f64

pub fn f64_eq(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_f64()?;
    let c1 = stack.pop_f64()?;
    push_bool(stack, c1 == c2);
    Ok(())
}

pub fn f64_ne(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_f64()?;
    let c1 = stack.pop_f64()?;
    push_bool(stack, c1 != c2);
    Ok(())
}

pub fn f64_lt(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_f64()?;
    let c1 = stack.pop_f64()?;
    push_bool(stack, c1 < c2);
    Ok(())
}

pub fn f64_gt(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_f64()?;
    let c1 = stack.pop_f64()?;
    push_bool(stack, c1 > c2);
    Ok(())
}

pub fn f64_le(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_f64()?;
    let c1 = stack.pop_f64()?;
    push_bool(stack, c1 <= c2);
    Ok(())
}

pub fn f64_ge(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_f64()?;
    let c1 = stack.pop_f64()?;
    push_bool(stack, c1 >= c2);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(f: fn(&mut Stack) -> Result<(), RuntimeError>, v1: Value, v2: Value) -> i32 {
        let mut stack = Stack::new();
        stack.push(v1);
        stack.push(v2);
        f(&mut stack).unwrap();
        stack.pop_i32().unwrap()
    }

    #[test]
    fn test_i32_signed_vs_unsigned() {
        assert_eq!(eval(i32_lt_s, Value::I32(-1), Value::I32(1)), 1);
        // -1 reinterprets as u32::MAX
        assert_eq!(eval(i32_lt_u, Value::I32(-1), Value::I32(1)), 0);
        assert_eq!(eval(i32_gt_u, Value::I32(-1), Value::I32(1)), 1);
        assert_eq!(eval(i32_ge_s, Value::I32(5), Value::I32(5)), 1);
        assert_eq!(eval(i32_le_u, Value::I32(0), Value::I32(-1)), 1);
    }

    #[test]
    fn test_eqz() {
        let mut stack = Stack::new();
        stack.push(Value::I32(0));
        i32_eqz(&mut stack).unwrap();
        assert_eq!(stack.pop_i32().unwrap(), 1);

        stack.push(Value::I64(3));
        i64_eqz(&mut stack).unwrap();
        assert_eq!(stack.pop_i32().unwrap(), 0);
    }

    #[test]
    fn test_i64_comparisons() {
        assert_eq!(eval(i64_eq, Value::I64(7), Value::I64(7)), 1);
        assert_eq!(eval(i64_lt_s, Value::I64(i64::MIN), Value::I64(0)), 1);
        assert_eq!(eval(i64_lt_u, Value::I64(-1), Value::I64(0)), 0);
    }

    #[test]
    fn test_float_ordered_comparisons() {
        assert_eq!(eval(f64_lt, Value::F64(1.0), Value::F64(2.0)), 1);
        assert_eq!(eval(f64_ge, Value::F64(2.0), Value::F64(2.0)), 1);
        assert_eq!(eval(f32_gt, Value::F32(2.5), Value::F32(1.5)), 1);

        // NaN compares false except through ne
        assert_eq!(eval(f64_eq, Value::F64(f64::NAN), Value::F64(f64::NAN)), 0);
        assert_eq!(eval(f64_le, Value::F64(f64::NAN), Value::F64(1.0)), 0);
        assert_eq!(eval(f64_ne, Value::F64(f64::NAN), Value::F64(1.0)), 1);
    }
}
