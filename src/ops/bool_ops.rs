//! Boolean ops: `not`, `and`, `or`. Zero is false, anything else is true;
//! results are normalised to exactly 0 or 1. Grounded on `bool_ops.go`.

use crate::error::OpResult;
use crate::machine::Machine;

pub(crate) fn not(m: &mut Machine, _imm: Option<u32>) -> OpResult<()> {
    let a = m.p_peek(1)?;
    m.p_set(1, (a == 0) as u32)
}

pub(crate) fn and(m: &mut Machine, _imm: Option<u32>) -> OpResult<()> {
    let b = m.pop()?;
    let a = m.p_peek(1)?;
    m.p_set(1, ((a != 0) && (b != 0)) as u32)
}

pub(crate) fn or(m: &mut Machine, _imm: Option<u32>) -> OpResult<()> {
    let b = m.pop()?;
    let a = m.p_peek(1)?;
    m.p_set(1, ((a != 0) || (b != 0)) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine_with(values: &[u32]) -> Machine {
        let mut m = Machine::new(0, 0x1000);
        for &v in values {
            m.push(v).unwrap();
        }
        m
    }

    #[test]
    fn not_normalises_any_nonzero_to_one() {
        let mut m = machine_with(&[42]);
        not(&mut m, None).unwrap();
        assert_eq!(m.p_peek(1).unwrap(), 0);

        let mut m = machine_with(&[0]);
        not(&mut m, None).unwrap();
        assert_eq!(m.p_peek(1).unwrap(), 1);
    }

    #[test]
    fn and_is_true_only_when_both_operands_are_nonzero() {
        let mut m = machine_with(&[5, 2]);
        and(&mut m, None).unwrap();
        assert_eq!(m.p_peek(1).unwrap(), 1);

        let mut m = machine_with(&[5, 0]);
        and(&mut m, None).unwrap();
        assert_eq!(m.p_peek(1).unwrap(), 0);
    }

    #[test]
    fn or_is_true_when_either_operand_is_nonzero() {
        let mut m = machine_with(&[0, 2]);
        or(&mut m, None).unwrap();
        assert_eq!(m.p_peek(1).unwrap(), 1);

        let mut m = machine_with(&[0, 0]);
        or(&mut m, None).unwrap();
        assert_eq!(m.p_peek(1).unwrap(), 0);
    }
}
