// Copyright (C) 2024 Ethan Uppal and Utku Melemetci. All rights reserved.

use static_assertions::const_assert;

/// Value held by a stack slot or a register.
pub type Word = i32;
pub type RegisterIndex = u8;
pub type JumpTarget = u16;
pub type InstructionAddress = usize;

pub const WORD_BYTES: usize = Word::BITS as usize / 8;

pub const REGISTER_INDEX_BITS: usize = 8;
const_assert!(REGISTER_INDEX_BITS <= RegisterIndex::BITS as usize);

/// Every register index an instruction can encode names a register.
pub const REGISTER_COUNT: usize = 1 << REGISTER_INDEX_BITS;

pub const STACK_CAPACITY: usize = 256;
const_assert!(STACK_CAPACITY > 0);

pub const JUMP_TARGET_BITS: usize = 16;
const_assert!(JUMP_TARGET_BITS <= JumpTarget::BITS as usize);

/// Size of instruction memory in bytes.
pub const INSTRUCTION_CAPACITY: usize = 1 << JUMP_TARGET_BITS;
const_assert!(JumpTarget::MAX as usize <= INSTRUCTION_CAPACITY);
