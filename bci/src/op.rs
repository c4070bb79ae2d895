// Copyright (C) 2024 Ethan Uppal. All rights reserved.

use enum_tags::enum_tags;
use num_traits::AsPrimitive;

use crate::{
    arch::{JumpTarget, RegisterIndex, Word},
    coding::{Immediate, OperandWidth},
};
use static_assertions::{const_assert, const_assert_eq};

/// Smallest sized integer type that can fit an op code.
pub type RawOpCode = u8;

/// Bits for opcode.
pub const OPCODE_BITS: usize = 8;
const_assert!(OPCODE_BITS <= RawOpCode::BITS as usize);

#[rustfmt::skip]
mod encoding_layout {
    use super::*;

//  +------------------------------------------------------------------------------------+
//  | Encodings. One opcode byte, then an immediate whose width depends only on the      |
//  | opcode. Immediates are little-endian. No padding, no alignment.                    |
//  +------------------------------------------------------------------------------------+
//  | N  (no operand):       NOP POP ADD SUB MUL DIV PRINT STOP                          |
//  | R  (register, 1 byte): LOAD STORE                                                  |
      const_assert_eq!(<RegisterIndex as Immediate>::WIDTH.bytes(), 1);
//  | T  (target, 2 bytes):  JMP JZ JNZ                                                  |
      const_assert_eq!(<JumpTarget as Immediate>::WIDTH.bytes(), 2);
//  | W  (word, 4 bytes):    PUSH                                                        |
      const_assert_eq!(<Word as Immediate>::WIDTH.bytes(), 4);
//  +------------------------------------------------------------------------------------+
}

/// A VM operation. Opcode bytes are assigned in declaration order, starting at
/// `0x00` for [`Op::Nop`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[enum_tags(public, repr(RawOpCode))]
pub enum Op {
    /// `Self::Nop` has no effect.
    Nop,
    /// `Self::Push(v)` pushes `v`.
    Push(Word),
    /// `Self::Pop` discards the top of the stack.
    Pop,
    /// `Self::Load(r)` pushes the contents of register `r`.
    Load(RegisterIndex),
    /// `Self::Store(r)` moves the top of the stack into register `r`.
    Store(RegisterIndex),
    /// `Self::Jmp(t)` continues execution at byte offset `t`.
    Jmp(JumpTarget),
    /// `Self::Jz(t)` pops the top of the stack and jumps to `t` if it was
    /// zero.
    Jz(JumpTarget),
    /// `Self::Jnz(t)` pops the top of the stack and jumps to `t` if it was
    /// not zero.
    Jnz(JumpTarget),
    Add,
    /// `Self::Sub` replaces `b, a` (with `a` on top) by `b - a`.
    Sub,
    Mul,
    /// `Self::Div` replaces `b, a` (with `a` on top) by `b / a`, truncating
    /// toward zero.
    Div,
    /// `Self::Print` pops the top of the stack and writes it in decimal
    /// followed by a newline.
    Print,
    /// `Self::Stop` halts the machine.
    Stop,
}

const_assert_eq!(Op::NOP_TAG, 0x00);
const_assert_eq!(Op::STOP_TAG, 0x0d);
const_assert!(Op::TAG_COUNT <= 1 << OPCODE_BITS);

impl Op {
    pub const fn opcode(&self) -> RawOpCode {
        self.tag()
    }

    /// Width of the immediate operand following `opcode`, or `None` if the
    /// opcode takes no operand or is unknown.
    pub const fn operand_width(opcode: RawOpCode) -> Option<OperandWidth> {
        match opcode {
            Self::PUSH_TAG => Some(<Word as Immediate>::WIDTH),
            Self::LOAD_TAG | Self::STORE_TAG => {
                Some(<RegisterIndex as Immediate>::WIDTH)
            }
            Self::JMP_TAG | Self::JZ_TAG | Self::JNZ_TAG => {
                Some(<JumpTarget as Immediate>::WIDTH)
            }
            _ => None,
        }
    }

    /// Number of bytes this operation occupies when encoded.
    pub const fn encoded_len(&self) -> usize {
        match Self::operand_width(self.opcode()) {
            Some(width) => 1 + width.bytes(),
            None => 1,
        }
    }

    /// Rebuilds an operation from its opcode and the immediate read for it.
    /// Narrow immediates keep only their low bytes.
    pub fn from_parts(opcode: RawOpCode, immediate: Word) -> Option<Self> {
        Some(match opcode {
            Self::NOP_TAG => Self::Nop,
            Self::PUSH_TAG => Self::Push(immediate),
            Self::POP_TAG => Self::Pop,
            Self::LOAD_TAG => Self::Load(immediate.as_()),
            Self::STORE_TAG => Self::Store(immediate.as_()),
            Self::JMP_TAG => Self::Jmp(immediate.as_()),
            Self::JZ_TAG => Self::Jz(immediate.as_()),
            Self::JNZ_TAG => Self::Jnz(immediate.as_()),
            Self::ADD_TAG => Self::Add,
            Self::SUB_TAG => Self::Sub,
            Self::MUL_TAG => Self::Mul,
            Self::DIV_TAG => Self::Div,
            Self::PRINT_TAG => Self::Print,
            Self::STOP_TAG => Self::Stop,
            _ => return None,
        })
    }

    /// Appends the byte encoding of this operation to `out`.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        out.push(self.opcode());
        match *self {
            Self::Push(value) => value.encode_le(out),
            Self::Load(register) | Self::Store(register) => {
                register.encode_le(out)
            }
            Self::Jmp(target) | Self::Jz(target) | Self::Jnz(target) => {
                target.encode_le(out)
            }
            Self::Nop
            | Self::Pop
            | Self::Add
            | Self::Sub
            | Self::Mul
            | Self::Div
            | Self::Print
            | Self::Stop => {}
        }
    }
}

/// Encodes a sequence of operations into the flat byte format the machine
/// loads.
pub fn encode_program(program: &[Op]) -> Vec<u8> {
    let mut bytes =
        Vec::with_capacity(program.iter().map(Op::encoded_len).sum());
    for op in program {
        op.encode_into(&mut bytes);
    }
    bytes
}

/// Byte offset at which `program[index]` starts once encoded.
pub fn offset_of(program: &[Op], index: usize) -> usize {
    program[..index].iter().map(Op::encoded_len).sum()
}

#[cfg(test)]
mod tests {
    use crate::op::{encode_program, offset_of, Op};

    #[test]
    fn opcodes_follow_declaration_order() {
        let ops = [
            Op::Nop,
            Op::Push(0),
            Op::Pop,
            Op::Load(0),
            Op::Store(0),
            Op::Jmp(0),
            Op::Jz(0),
            Op::Jnz(0),
            Op::Add,
            Op::Sub,
            Op::Mul,
            Op::Div,
            Op::Print,
            Op::Stop,
        ];
        assert_eq!(Op::TAG_COUNT, ops.len());
        for (expected, op) in ops.iter().enumerate() {
            assert_eq!(expected as u8, op.opcode());
            assert_eq!(Some(op.mnemonic()), Op::mnemonic_of_tag(op.opcode()));
        }
        assert_eq!(None, Op::mnemonic_of_tag(0xff));
    }

    #[test]
    fn encodes_correctly() {
        assert_eq!(vec![0x00], encode_program(&[Op::Nop]));
        assert_eq!(
            vec![0x01, 0xfe, 0xff, 0xff, 0xff],
            encode_program(&[Op::Push(-2)])
        );
        assert_eq!(vec![0x04, 0x07], encode_program(&[Op::Store(7)]));
        assert_eq!(vec![0x06, 0x34, 0x12], encode_program(&[Op::Jz(0x1234)]));
    }

    #[test]
    fn encoded_len_matches_encoding() {
        for op in [Op::Push(5), Op::Load(1), Op::Jnz(3), Op::Print] {
            assert_eq!(op.encoded_len(), encode_program(&[op]).len());
        }
    }

    #[test]
    fn from_parts_rebuilds_operands() {
        assert_eq!(Some(Op::Push(-9)), Op::from_parts(Op::PUSH_TAG, -9));
        assert_eq!(Some(Op::Load(200)), Op::from_parts(Op::LOAD_TAG, 200));
        assert_eq!(Some(Op::Jmp(0xffff)), Op::from_parts(Op::JMP_TAG, 0xffff));
        assert_eq!(Some(Op::Stop), Op::from_parts(Op::STOP_TAG, 0));
        assert_eq!(None, Op::from_parts(Op::TAG_COUNT as u8, 0));
    }

    #[test]
    fn offsets_account_for_operands() {
        let program = [Op::Push(0), Op::Jz(0), Op::Push(1), Op::Print, Op::Stop];
        assert_eq!(0, offset_of(&program, 0));
        assert_eq!(5, offset_of(&program, 1));
        assert_eq!(8, offset_of(&program, 2));
        assert_eq!(14, offset_of(&program, 4));
    }
}
