// Copyright (C) 2024 Ethan Uppal and Utku Melemetci. All rights reserved.

use crate::arch::{JumpTarget, RegisterIndex, Word, WORD_BYTES};
use static_assertions::const_assert_eq;

/// Number of bytes an immediate operand occupies in the instruction stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperandWidth {
    Byte = 1,
    Half = 2,
    Full = 4,
}

const_assert_eq!(OperandWidth::Full as usize, WORD_BYTES);

impl OperandWidth {
    pub const fn bytes(self) -> usize {
        self as usize
    }
}

/// Types that appear as immediate operands after an opcode.
pub trait Immediate: Copy {
    const WIDTH: OperandWidth;

    /// Appends the little-endian bytes of `self` to `out`.
    fn encode_le(self, out: &mut Vec<u8>);
}

macro_rules! immediates {
    ($($T:ty => $width:ident),* $(,)?) => {
        $(
            impl Immediate for $T {
                const WIDTH: OperandWidth = OperandWidth::$width;

                fn encode_le(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }
            }

            const_assert_eq!(
                core::mem::size_of::<$T>(),
                OperandWidth::$width.bytes()
            );
        )*
    };
}

immediates! {
    RegisterIndex => Byte,
    JumpTarget => Half,
    Word => Full,
}

/// Decodes up to a full word of little-endian bytes. Bytes fill the word from
/// the least significant end, so narrower immediates come out zero-extended.
pub fn decode_le(bytes: &[u8]) -> Word {
    debug_assert!(bytes.len() <= WORD_BYTES);
    let mut word = [0; WORD_BYTES];
    word[..bytes.len()].copy_from_slice(bytes);
    Word::from_le_bytes(word)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_little_endian() {
        assert_eq!(0x1234, decode_le(&[0x34, 0x12]));
        assert_eq!(0x04030201, decode_le(&[1, 2, 3, 4]));
    }

    #[test]
    fn narrow_immediates_are_zero_extended() {
        assert_eq!(255, decode_le(&[0xff]));
        assert_eq!(0xffff, decode_le(&[0xff, 0xff]));
        assert_eq!(-1, decode_le(&[0xff; 4]));
    }

    #[test]
    fn encodes_little_endian() {
        let mut out = vec![];
        (-2 as Word).encode_le(&mut out);
        (0x0102 as JumpTarget).encode_le(&mut out);
        (7 as RegisterIndex).encode_le(&mut out);
        assert_eq!(vec![0xfe, 0xff, 0xff, 0xff, 0x02, 0x01, 0x07], out);
    }
}
