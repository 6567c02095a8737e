use crate::frontend::decoder::DecodedArm;
use crate::frontend::types::Reg;
use crate::ir::opcode::Opcode;

use super::Translator;

/// CLZ: count leading zeros.
pub(super) fn arm_clz(tr: &mut Translator, inst: &DecodedArm) {
    if inst.rd() == Reg::R15 || inst.rm() == Reg::R15 {
        return tr.fallback_to_interpreter();
    }
    if tr.condition_passed(inst.cond()) {
        let rm = tr.get_reg(inst.rm());
        let result = tr.emit(Opcode::CountLeadingZeros, &[rm], None);
        tr.set_reg(inst.rd(), result);
    }
    if !tr.stop_compilation {
        tr.advance_pc();
    }
}

/// CLREX: clear the exclusive access record. Unconditional encoding.
pub(super) fn arm_clrex(tr: &mut Translator) {
    tr.clear_exclusive();
    tr.advance_pc();
}

/// NOP and the hint encodings that behave as NOP.
pub(super) fn arm_nop(tr: &mut Translator, inst: &DecodedArm) {
    tr.condition_passed(inst.cond());
    if !tr.stop_compilation {
        tr.advance_pc();
    }
}

/// PLD: preload hint. Correctness does not require the prefetch.
pub(super) fn arm_pld(tr: &mut Translator) {
    tr.advance_pc();
}
