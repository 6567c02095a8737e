//! ARM/Thumb dynamic recompiler front-end.
//!
//! This crate reads a guest instruction stream starting at a program
//! counter location, decodes each instruction, and lowers it into an SSA
//! intermediate representation: a single basic block of microinstructions
//! ended by an explicit control-transfer terminal. Each IR node is a
//! microinstruction of an idealised ARM CPU.
//!
//! Downstream consumers (optimization passes, register allocation, host
//! code emission, the interpreter fallback) live elsewhere; they receive a
//! fully-owned [`ir::block::Block`] from [`frontend::translate::translate`].
//! Opcodes the translator cannot lower produce an `Interpret` terminal
//! rather than an error, so translation always yields a runnable block.

pub mod error;
pub mod frontend;
pub mod ir;

pub use error::{IrError, TranslateError};
pub use frontend::translate::translate;
pub use ir::block::Block;
pub use ir::location::LocationDescriptor;
