use crate::ProtocolError;

/// The most digits that a single numeric field may have.
pub const MAX_DIGITS: usize = 5;

/// Collects the decimal digits of one numeric field.
#[derive(Clone, Debug, Default)]
pub struct DigitAccumulator {
    value: i32,
    len: usize,
}

impl DigitAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, byte: u8) -> Result<(), ProtocolError> {
        if !byte.is_ascii_digit() {
            return Err(ProtocolError::UnexpectedByte {
                byte,
                phase: crate::Phase::Accumulate,
            });
        }
        if self.len == MAX_DIGITS {
            return Err(ProtocolError::FieldTooLong);
        }
        self.value = self.value * 10 + i32::from(byte - b'0');
        self.len += 1;
        Ok(())
    }

    /// Returns the accumulated value, and starts over.
    pub fn finish(&mut self) -> Result<i32, ProtocolError> {
        if self.is_empty() {
            return Err(ProtocolError::EmptyField);
        }
        let ret = self.value;
        self.reset();
        Ok(ret)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn too_long() {
        let mut acc = DigitAccumulator::new();
        for b in b"12345" {
            acc.push(*b).unwrap();
        }
        assert_eq!(acc.push(b'6'), Err(ProtocolError::FieldTooLong));
        assert_eq!(acc.finish(), Ok(12345));
    }

    #[test]
    fn empty() {
        let mut acc = DigitAccumulator::new();
        assert_eq!(acc.finish(), Err(ProtocolError::EmptyField));
    }

    #[test]
    fn rejects_non_digits() {
        let mut acc = DigitAccumulator::new();
        acc.push(b'4').unwrap();
        assert!(matches!(
            acc.push(b'-'),
            Err(ProtocolError::UnexpectedByte { byte: b'-', .. })
        ));
        // The bad byte doesn't disturb what we had.
        assert_eq!(acc.finish(), Ok(4));
    }

    proptest! {
        #[test]
        fn parses_what_it_was_given(n in 0..=99999i32) {
            let mut acc = DigitAccumulator::new();
            for b in n.to_string().bytes() {
                acc.push(b).unwrap();
            }
            prop_assert_eq!(acc.finish(), Ok(n));
            prop_assert!(acc.is_empty());
        }
    }
}
