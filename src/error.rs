//! Error types for the recompiler front-end.

use thiserror::Error;

use crate::ir::block::Block;
use crate::ir::flags::ArmFlags;
use crate::ir::types::Type;

/// Fatal translation failure. Unsupported or undecodable instructions are
/// not errors; they produce an `Interpret` terminal instead.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslateError {
    #[error("code fetch faulted at {address:#010x}")]
    MemoryFault { address: u32 },
}

/// IR construction contract violation. These indicate a bug in the caller
/// (a correct translator never triggers them) and are also what the
/// verification pass reports when a block has been corrupted.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrError {
    #[error("operand {slot} of {inst} has type {actual}, expected {expected}")]
    TypeMismatch {
        inst: u32,
        slot: usize,
        expected: Type,
        actual: Type,
    },

    #[error("write mask {requested:?} exceeds the opcode default {default:?}")]
    IllegalFlagWiden {
        requested: ArmFlags,
        default: ArmFlags,
    },

    #[error("operand reference %{reference} is not part of this block")]
    OperandNotInBlock { reference: u32 },

    #[error("instruction {inst} expects {expected} operands, got {actual}")]
    ArityMismatch {
        inst: u32,
        expected: usize,
        actual: usize,
    },

    #[error("use-list of %{inst} disagrees with operand slots")]
    UseListMismatch { inst: u32 },

    #[error("block has {len} instructions, exceeding the {}-instruction bound", Block::MAX_INSTRUCTIONS)]
    BlockTooLarge { len: usize },

    #[error("block terminal was never set")]
    MissingTerminal,
}

/// Result alias for translation.
pub type TranslateResult<T> = Result<T, TranslateError>;
