use crate::error::IrError;
use crate::frontend::types::Reg;
use crate::ir::block::Block;
use crate::ir::flags::ArmFlags;
use crate::ir::inst::Inst;
use crate::ir::location::LocationDescriptor;
use crate::ir::opcode::Opcode;
use crate::ir::terminal::Terminal;
use crate::ir::value::InstRef;

/// The builder API for constructing an IR block.
///
/// Owns the in-progress block and is the only way to append
/// instructions, which lets it enforce the SSA invariants: operand
/// arity and types are checked against the opcode metadata, operands
/// must already be appended, and write masks can only narrow the
/// opcode default. [`IREmitter::finish`] consumes the builder, so a
/// finished block can no longer be appended to.
pub struct IREmitter {
    block: Block,
}

impl IREmitter {
    pub fn new(location: LocationDescriptor) -> Self {
        Self { block: Block::new(location) }
    }

    /// Read-only view of the block under construction.
    pub fn block(&self) -> &Block {
        &self.block
    }

    /// Append a microinstruction.
    ///
    /// `write_flags` overrides the opcode's default write mask; `None`
    /// keeps the default. The override must be a subset of the default.
    pub fn inst(
        &mut self,
        op: Opcode,
        args: &[InstRef],
        write_flags: Option<ArmFlags>,
    ) -> Result<InstRef, IrError> {
        let info = op.info();
        let next = InstRef(self.block.inst_count() as u32);

        if args.len() != info.args.len() {
            return Err(IrError::ArityMismatch {
                inst: next.0,
                expected: info.args.len(),
                actual: args.len(),
            });
        }
        for (slot, (arg, expected)) in args.iter().zip(info.args).enumerate() {
            if !self.block.contains(*arg) {
                return Err(IrError::OperandNotInBlock { reference: arg.0 });
            }
            let actual = self.block.get(*arg).return_type();
            if actual != *expected {
                return Err(IrError::TypeMismatch {
                    inst: next.0,
                    slot,
                    expected: *expected,
                    actual,
                });
            }
        }

        let flags = match write_flags {
            Some(requested) => {
                if !info.default_write_flags.contains(requested) {
                    return Err(IrError::IllegalFlagWiden {
                        requested,
                        default: info.default_write_flags,
                    });
                }
                requested
            }
            None => info.default_write_flags,
        };

        Ok(self.block.append(Inst::new(op, args, flags)))
    }

    // --- Value producers ---

    pub fn const_u32(&mut self, value: u32) -> InstRef {
        self.block.append(Inst::new(Opcode::ConstU32(value), &[], ArmFlags::empty()))
    }

    pub fn get_gpr(&mut self, reg: Reg) -> InstRef {
        debug_assert!(reg != Reg::R15, "PC reads are materialized as constants");
        self.block.append(Inst::new(Opcode::GetGPR(reg), &[], ArmFlags::empty()))
    }

    // --- Side effects ---

    pub fn set_gpr(&mut self, reg: Reg, value: InstRef) -> Result<InstRef, IrError> {
        self.inst(Opcode::SetGPR(reg), &[value], None)
    }

    pub fn push_rsb_hint(&mut self, return_addr: InstRef) -> Result<InstRef, IrError> {
        self.inst(Opcode::PushRSBHint, &[return_addr], None)
    }

    pub fn alu_write_pc(&mut self, value: InstRef) -> Result<InstRef, IrError> {
        self.inst(Opcode::AluWritePC, &[value], None)
    }

    pub fn load_write_pc(&mut self, value: InstRef) -> Result<InstRef, IrError> {
        self.inst(Opcode::LoadWritePC, &[value], None)
    }

    pub fn read32(&mut self, address: InstRef) -> Result<InstRef, IrError> {
        self.inst(Opcode::Read32, &[address], None)
    }

    pub fn clear_exclusive(&mut self) -> Result<InstRef, IrError> {
        self.inst(Opcode::ClearExclusive, &[], None)
    }

    // --- Terminal ---

    /// Set the block terminal. May be called repeatedly while the block
    /// is under construction; the last call wins.
    pub fn set_term(&mut self, terminal: Terminal) {
        self.block.set_terminal(terminal);
    }

    pub fn term_is_set(&self) -> bool {
        !self.block.terminal.is_invalid()
    }

    /// Record one translated guest instruction for cycle accounting.
    pub fn add_cycle(&mut self) {
        self.block.cycle_count += 1;
    }

    /// Finalize: hand the block to the caller. Consuming the builder is
    /// what makes a finished block immutable to construction.
    pub fn finish(self) -> Block {
        self.block
    }
}
