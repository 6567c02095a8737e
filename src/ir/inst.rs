use std::fmt;

use crate::ir::flags::ArmFlags;
use crate::ir::opcode::Opcode;
use crate::ir::types::Type;
use crate::ir::value::{InstRef, Use};

/// Maximum number of operand slots per microinstruction.
pub const MAX_ARGS: usize = 2;

/// A single microinstruction in SSA form.
///
/// Operand slots hold references into the owning block's arena. Slot
/// contents are only ever edited through the block's mutation primitives,
/// which keep the use-lists consistent.
#[derive(Debug, Clone)]
pub struct Inst {
    /// The operation (with its immediate fields) this instruction performs.
    pub op: Opcode,
    /// Operand slots; the first `num_args()` are populated.
    pub(crate) args: [Option<InstRef>; MAX_ARGS],
    /// (user, slot) pairs that reference this instruction's result.
    pub(crate) uses: Vec<Use>,
    /// Flags this instance writes. Starts at the opcode default and may
    /// only ever be narrowed.
    pub(crate) write_flags: ArmFlags,
}

impl Inst {
    pub(crate) fn new(op: Opcode, args: &[InstRef], write_flags: ArmFlags) -> Self {
        debug_assert!(args.len() <= MAX_ARGS);
        let mut slots = [None; MAX_ARGS];
        for (i, arg) in args.iter().enumerate() {
            slots[i] = Some(*arg);
        }
        Self { op, args: slots, uses: Vec::new(), write_flags }
    }

    /// The type this instruction's result has.
    pub fn return_type(&self) -> Type {
        self.op.return_type()
    }

    /// Number of operand slots in use.
    pub fn num_args(&self) -> usize {
        self.op.num_args()
    }

    /// Operand at `slot`. Panics if the slot is out of range for the opcode.
    pub fn arg(&self, slot: usize) -> InstRef {
        assert!(slot < self.num_args(), "operand slot {} out of range for {}", slot, self.op);
        self.args[slot].expect("populated operand slot")
    }

    /// Iterate over the populated operand slots.
    pub fn arg_refs(&self) -> impl Iterator<Item = InstRef> + '_ {
        self.args[..self.num_args()].iter().map(|a| a.expect("populated operand slot"))
    }

    /// Flags this instruction reads.
    pub fn read_flags(&self) -> ArmFlags {
        self.op.read_flags()
    }

    /// Flags this instruction writes.
    pub fn write_flags(&self) -> ArmFlags {
        self.write_flags
    }

    pub fn has_uses(&self) -> bool {
        !self.uses.is_empty()
    }

    pub fn use_count(&self) -> usize {
        self.uses.len()
    }

    /// The use-list: every (user, slot) pair referencing this result.
    pub fn uses(&self) -> &[Use] {
        &self.uses
    }

    pub fn has_side_effect(&self) -> bool {
        self.op.has_side_effect()
    }
}

impl fmt::Display for Inst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.op)?;
        // Opcodes with an immediate field already printed it; operands
        // continue that list.
        let continues = matches!(self.op, Opcode::ConstU32(_) | Opcode::GetGPR(_) | Opcode::SetGPR(_));
        for (i, arg) in self.arg_refs().enumerate() {
            let sep = if i > 0 || continues { ", " } else { " " };
            write!(f, "{}{}", sep, arg)?;
        }
        if !self.write_flags.is_empty() {
            write!(f, " [writes {:?}]", self.write_flags)?;
        }
        Ok(())
    }
}
