use std::fmt;

use crate::error::IrError;
use crate::ir::inst::Inst;
use crate::ir::location::LocationDescriptor;
use crate::ir::terminal::Terminal;
use crate::ir::types::Type;
use crate::ir::value::{InstRef, Use};

/// An IR basic block: a sequence of microinstructions followed by a
/// terminal. Instructions live in a `Vec<Inst>` arena indexed by
/// `InstRef`; operand and use-list edges are arena indices, so dropping
/// the block releases every node without any cycle bookkeeping.
///
/// All operand-slot mutation goes through [`Block::set_operand`] and
/// [`Block::replace_all_uses_with`], which keep use-lists consistent.
#[derive(Debug, Clone)]
pub struct Block {
    /// The location this block translates.
    pub location: LocationDescriptor,
    /// Arena of instructions, in append (= program) order.
    instructions: Vec<Inst>,
    /// Block terminator.
    pub terminal: Terminal,
    /// Number of guest cycles (instructions) this block represents.
    pub cycle_count: u64,
}

impl Block {
    /// A block never outgrows one guest code page: 4 KiB of ARM code is
    /// at most 1024 instructions, and the translator budgets its IR
    /// emission against the same bound.
    pub const MAX_INSTRUCTIONS: usize = 1024;

    /// Create a new empty block at the given location.
    pub fn new(location: LocationDescriptor) -> Self {
        Self {
            location,
            instructions: Vec::new(),
            terminal: Terminal::Invalid,
            cycle_count: 0,
        }
    }

    /// Append an instruction and register its operand uses.
    ///
    /// Arguments must already live in this arena (appending can only
    /// reference earlier instructions, which makes dominance-by-order
    /// hold trivially). The caller (the builder) has already validated
    /// types and arity.
    pub(crate) fn append(&mut self, inst: Inst) -> InstRef {
        let user = InstRef(self.instructions.len() as u32);
        for (slot, arg) in inst.arg_refs().enumerate() {
            debug_assert!(arg.index() < self.instructions.len());
            self.instructions[arg.index()].uses.push(Use { user, slot });
        }
        self.instructions.push(inst);
        user
    }

    /// Get an instruction by reference.
    pub fn get(&self, r: InstRef) -> &Inst {
        &self.instructions[r.index()]
    }

    /// Whether `r` refers to an instruction of this block.
    pub fn contains(&self, r: InstRef) -> bool {
        r.index() < self.instructions.len()
    }

    pub fn inst_count(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Iterate instructions in program order with their refs.
    pub fn iter(&self) -> impl Iterator<Item = (InstRef, &Inst)> {
        self.instructions.iter().enumerate().map(|(i, inst)| (InstRef(i as u32), inst))
    }

    /// Set the terminal. May be called repeatedly while translating;
    /// the last call wins.
    pub fn set_terminal(&mut self, terminal: Terminal) {
        self.terminal = terminal;
    }

    /// Narrow an instruction's write mask. Widening past the opcode
    /// default is rejected.
    pub fn narrow_write_flags(&mut self, r: InstRef, flags: crate::ir::flags::ArmFlags) -> Result<(), IrError> {
        let default = self.instructions[r.index()].op.default_write_flags();
        if !default.contains(flags) {
            return Err(IrError::IllegalFlagWiden { requested: flags, default });
        }
        self.instructions[r.index()].write_flags = flags;
        Ok(())
    }

    /// Point operand `slot` of `user` at `new_arg`, de-registering the
    /// old use and registering the new one.
    pub fn set_operand(&mut self, user: InstRef, slot: usize, new_arg: InstRef) -> Result<(), IrError> {
        let inst = &self.instructions[user.index()];
        if slot >= inst.num_args() {
            return Err(IrError::ArityMismatch {
                inst: user.0,
                expected: inst.num_args(),
                actual: slot + 1,
            });
        }
        if !self.contains(new_arg) {
            return Err(IrError::OperandNotInBlock { reference: new_arg.0 });
        }
        let expected = inst.op.arg_types()[slot];
        let actual = self.instructions[new_arg.index()].return_type();
        if actual != expected {
            return Err(IrError::TypeMismatch { inst: user.0, slot, expected, actual });
        }

        let old_arg = self.instructions[user.index()].arg(slot);
        if old_arg == new_arg {
            return Ok(());
        }
        self.instructions[old_arg.index()].uses.retain(|u| !(u.user == user && u.slot == slot));
        self.instructions[new_arg.index()].uses.push(Use { user, slot });
        self.instructions[user.index()].args[slot] = Some(new_arg);
        Ok(())
    }

    /// Replace every use of `old` with `new`. Afterwards `old` has an
    /// empty use-list and `new` carries the former uses. Replacing a
    /// value with itself is a no-op. Fails if the types differ.
    pub fn replace_all_uses_with(&mut self, old: InstRef, new: InstRef) -> Result<(), IrError> {
        if !self.contains(new) {
            return Err(IrError::OperandNotInBlock { reference: new.0 });
        }
        let old_ty = self.instructions[old.index()].return_type();
        let new_ty = self.instructions[new.index()].return_type();
        if old_ty != new_ty {
            return Err(IrError::TypeMismatch {
                inst: new.0,
                slot: 0,
                expected: old_ty,
                actual: new_ty,
            });
        }
        if old == new {
            return Ok(());
        }

        let moved = std::mem::take(&mut self.instructions[old.index()].uses);
        for u in &moved {
            self.instructions[u.user.index()].args[u.slot] = Some(new);
        }
        self.instructions[new.index()].uses.extend(moved);
        Ok(())
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Block {} (cycles: {}):", self.location, self.cycle_count)?;
        for (r, inst) in self.iter() {
            if inst.return_type() != Type::Void {
                writeln!(f, "  {} = {}", r, inst)?;
            } else {
                writeln!(f, "  {}", inst)?;
            }
        }
        writeln!(f, "  terminal: {}", self.terminal)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::types::Reg;
    use crate::ir::builder::IREmitter;
    use crate::ir::flags::ArmFlags;
    use crate::ir::opcode::Opcode;

    fn sample_block() -> (Block, InstRef, InstRef, InstRef) {
        let mut ir = IREmitter::new(LocationDescriptor::at(0x1000));
        let r1 = ir.get_gpr(Reg::R1);
        let one = ir.const_u32(1);
        let sum = ir.inst(Opcode::Add, &[r1, one], None).unwrap();
        ir.set_gpr(Reg::R0, sum).unwrap();
        (ir.finish(), r1, one, sum)
    }

    #[test]
    fn test_append_registers_uses() {
        let (block, r1, one, sum) = sample_block();
        assert_eq!(block.inst_count(), 4);
        assert_eq!(block.get(r1).uses(), &[Use { user: sum, slot: 0 }]);
        assert_eq!(block.get(one).uses(), &[Use { user: sum, slot: 1 }]);
        assert_eq!(block.get(sum).use_count(), 1);
    }

    #[test]
    fn test_set_operand_moves_use() {
        let (mut block, r1, one, sum) = sample_block();
        block.set_operand(sum, 1, r1).unwrap();
        assert_eq!(block.get(sum).arg(1), r1);
        assert!(block.get(one).uses().is_empty());
        assert_eq!(block.get(r1).use_count(), 2);
    }

    #[test]
    fn test_set_operand_rejects_void() {
        let mut ir = IREmitter::new(LocationDescriptor::at(0));
        let x = ir.const_u32(7);
        let set = ir.set_gpr(Reg::R2, x).unwrap();
        let y = ir.const_u32(9);
        let sum = ir.inst(Opcode::Add, &[x, y], None).unwrap();
        let mut block = ir.finish();
        // A Void-typed result must not become an operand.
        let err = block.set_operand(sum, 0, set).unwrap_err();
        assert!(matches!(err, IrError::TypeMismatch { .. }));
    }

    #[test]
    fn test_replace_all_uses_with() {
        let (mut block, r1, one, sum) = sample_block();
        block.replace_all_uses_with(one, r1).unwrap();
        assert!(block.get(one).uses().is_empty());
        assert_eq!(block.get(sum).arg(0), r1);
        assert_eq!(block.get(sum).arg(1), r1);
        assert_eq!(block.get(r1).use_count(), 2);
    }

    #[test]
    fn test_replace_all_uses_with_self_is_noop() {
        let (mut block, r1, _, sum) = sample_block();
        block.replace_all_uses_with(r1, r1).unwrap();
        assert_eq!(block.get(r1).uses(), &[Use { user: sum, slot: 0 }]);
    }

    #[test]
    fn test_replace_all_uses_with_type_mismatch() {
        let mut ir = IREmitter::new(LocationDescriptor::at(0));
        let x = ir.const_u32(1);
        let set = ir.set_gpr(Reg::R0, x).unwrap();
        let mut block = ir.finish();
        let err = block.replace_all_uses_with(x, set).unwrap_err();
        assert!(matches!(err, IrError::TypeMismatch { .. }));
    }

    #[test]
    fn test_narrow_write_flags() {
        let (mut block, _, _, sum) = sample_block();
        block.narrow_write_flags(sum, ArmFlags::empty()).unwrap();
        assert_eq!(block.get(sum).write_flags(), ArmFlags::empty());
        let err = block.narrow_write_flags(sum, ArmFlags::ANY).unwrap_err();
        assert!(matches!(err, IrError::IllegalFlagWiden { .. }));
    }

    #[test]
    fn test_display() {
        let (block, ..) = sample_block();
        let s = format!("{}", block);
        assert!(s.contains("GetGPR R1"));
        assert!(s.contains("Add"));
        assert!(s.contains("SetGPR R0"));
    }
}
