//! Verification pass: audits a block against the SSA invariants.
//!
//! The builder makes these violations unreachable through its public
//! contract, so a failure here means a rewriting pass corrupted the
//! block (or the graph primitives have a bug).

use crate::error::IrError;
use crate::ir::block::Block;
use crate::ir::types::Type;
use crate::ir::value::Use;

/// Check every block invariant:
///
/// 1. operand types and arity match the opcode metadata,
/// 2. no `Void`-typed value is used as an operand,
/// 3. operands reference earlier instructions only (dominance by order),
/// 4. use-lists and operand slots agree exactly,
/// 5. write masks are within the opcode defaults,
/// 6. the terminal has been set,
/// 7. the block stays within its one-page instruction bound.
pub fn verify(block: &Block) -> Result<(), IrError> {
    if block.inst_count() > Block::MAX_INSTRUCTIONS {
        return Err(IrError::BlockTooLarge { len: block.inst_count() });
    }

    for (r, inst) in block.iter() {
        let info = inst.op.info();

        for (slot, (arg, expected)) in inst.arg_refs().zip(info.args).enumerate() {
            if arg.index() >= r.index() {
                return Err(IrError::OperandNotInBlock { reference: arg.0 });
            }
            let actual = block.get(arg).return_type();
            if actual == Type::Void || actual != *expected {
                return Err(IrError::TypeMismatch {
                    inst: r.0,
                    slot,
                    expected: *expected,
                    actual,
                });
            }
        }

        if !info.default_write_flags.contains(inst.write_flags()) {
            return Err(IrError::IllegalFlagWiden {
                requested: inst.write_flags(),
                default: info.default_write_flags,
            });
        }

        // Every recorded use must name a live operand slot holding us.
        for u in inst.uses() {
            if !block.contains(u.user) {
                return Err(IrError::UseListMismatch { inst: r.0 });
            }
            let user = block.get(u.user);
            if u.slot >= user.num_args() || user.arg(u.slot) != r {
                return Err(IrError::UseListMismatch { inst: r.0 });
            }
        }
    }

    // Converse direction: every operand edge is recorded exactly once.
    for (r, inst) in block.iter() {
        for (slot, arg) in inst.arg_refs().enumerate() {
            let record = Use { user: r, slot };
            let count = block.get(arg).uses().iter().filter(|u| **u == record).count();
            if count != 1 {
                return Err(IrError::UseListMismatch { inst: arg.0 });
            }
        }
    }

    if block.terminal.is_invalid() {
        return Err(IrError::MissingTerminal);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::types::Reg;
    use crate::ir::builder::IREmitter;
    use crate::ir::location::LocationDescriptor;
    use crate::ir::opcode::Opcode;
    use crate::ir::terminal::Terminal;

    #[test]
    fn test_verify_accepts_valid_block() {
        let mut ir = IREmitter::new(LocationDescriptor::at(0));
        let a = ir.get_gpr(Reg::R1);
        let b = ir.const_u32(2);
        let sum = ir.inst(Opcode::Add, &[a, b], None).unwrap();
        ir.set_gpr(Reg::R1, sum).unwrap();
        ir.set_term(Terminal::ReturnToDispatch);
        verify(&ir.finish()).unwrap();
    }

    #[test]
    fn test_verify_rejects_missing_terminal() {
        let ir = IREmitter::new(LocationDescriptor::at(0));
        let err = verify(&ir.finish()).unwrap_err();
        assert!(matches!(err, IrError::MissingTerminal));
    }

    #[test]
    fn test_verify_rejects_oversized_block() {
        let mut ir = IREmitter::new(LocationDescriptor::at(0));
        for i in 0..=Block::MAX_INSTRUCTIONS as u32 {
            ir.const_u32(i);
        }
        ir.set_term(Terminal::ReturnToDispatch);
        let err = verify(&ir.finish()).unwrap_err();
        assert!(matches!(err, IrError::BlockTooLarge { len } if len == Block::MAX_INSTRUCTIONS + 1));
    }

    #[test]
    fn test_verify_tracks_rewrites() {
        let mut ir = IREmitter::new(LocationDescriptor::at(0));
        let a = ir.const_u32(1);
        let b = ir.const_u32(1);
        let sum = ir.inst(Opcode::Add, &[a, b], None).unwrap();
        ir.set_gpr(Reg::R0, sum).unwrap();
        ir.set_term(Terminal::ReturnToDispatch);
        let mut block = ir.finish();

        // Fold the duplicate constant; the use-lists must stay coherent.
        block.replace_all_uses_with(b, a).unwrap();
        verify(&block).unwrap();
    }
}
