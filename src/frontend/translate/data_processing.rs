use crate::frontend::decoder::{arm_expand_imm, ArmInstId, DecodedArm};
use crate::frontend::types::Reg;
use crate::ir::flags::ArmFlags;
use crate::ir::opcode::Opcode;
use crate::ir::value::InstRef;

use super::helpers::{emit_imm_shift, emit_reg_shift};
use super::Translator;

/// The shifter operand of a data-processing instruction, left
/// unmaterialized until the condition gate has passed.
enum Operand2 {
    Imm(u32),
    Value(InstRef),
}

/// ARM data processing, modified-immediate operand.
pub(super) fn arm_dp_imm(tr: &mut Translator, inst: &DecodedArm) {
    let Some(op) = DpOp::from_id(inst.id) else {
        return tr.fallback_to_interpreter();
    };
    if !op.expressible(inst.s_flag()) {
        return tr.fallback_to_interpreter();
    }

    if tr.condition_passed(inst.cond()) {
        let imm32 = arm_expand_imm(inst.rotate(), inst.imm8());
        dp_common(tr, op, inst.rn(), inst.rd(), inst.s_flag(), Operand2::Imm(imm32));
    }
    if !tr.stop_compilation {
        tr.advance_pc();
    }
}

/// ARM data processing, register operand shifted by immediate.
pub(super) fn arm_dp_reg(tr: &mut Translator, inst: &DecodedArm) {
    let Some(op) = DpOp::from_id(inst.id) else {
        return tr.fallback_to_interpreter();
    };
    if !op.expressible(inst.s_flag()) {
        return tr.fallback_to_interpreter();
    }

    if tr.condition_passed(inst.cond()) {
        let rm = tr.get_reg(inst.rm());
        let shifted = emit_imm_shift(tr, rm, inst.shift_type(), inst.imm5());
        dp_common(tr, op, inst.rn(), inst.rd(), inst.s_flag(), Operand2::Value(shifted));
    }
    if !tr.stop_compilation {
        tr.advance_pc();
    }
}

/// ARM data processing, register operand shifted by register.
pub(super) fn arm_dp_rsr(tr: &mut Translator, inst: &DecodedArm) {
    let Some(op) = DpOp::from_id(inst.id) else {
        return tr.fallback_to_interpreter();
    };
    if !op.expressible(inst.s_flag()) {
        return tr.fallback_to_interpreter();
    }
    // Any PC participation in the rsr form is UNPREDICTABLE.
    if inst.rd() == Reg::R15 || inst.rn() == Reg::R15
        || inst.rm() == Reg::R15 || inst.rs() == Reg::R15
    {
        return tr.fallback_to_interpreter();
    }

    if tr.condition_passed(inst.cond()) {
        let rm = tr.get_reg(inst.rm());
        let rs = tr.get_reg(inst.rs());
        let shifted = emit_reg_shift(tr, rm, inst.shift_type(), rs);
        dp_common(tr, op, inst.rn(), inst.rd(), inst.s_flag(), Operand2::Value(shifted));
    }
    if !tr.stop_compilation {
        tr.advance_pc();
    }
}

/// MOVW: 16-bit immediate load, never flag-setting.
pub(super) fn arm_movw(tr: &mut Translator, inst: &DecodedArm) {
    if inst.rd() == Reg::R15 {
        return tr.fallback_to_interpreter();
    }
    if tr.condition_passed(inst.cond()) {
        let value = tr.const_u32(inst.imm16());
        tr.set_reg(inst.rd(), value);
    }
    if !tr.stop_compilation {
        tr.advance_pc();
    }
}

/// Common execute stage for all three operand forms.
fn dp_common(tr: &mut Translator, op: DpOp, rn: Reg, rd: Reg, s: bool, operand2: Operand2) {
    let flags = if s || op.is_compare() {
        None // keep the opcode's NZCV default
    } else {
        Some(ArmFlags::empty())
    };

    // Operand order mirrors the architecture: Rn first, then the
    // shifter operand.
    let result = match op {
        DpOp::Mov => {
            let op2 = materialize(tr, operand2);
            Some(op2)
        }
        DpOp::Mvn => {
            let op2 = materialize(tr, operand2);
            Some(tr.emit(Opcode::Not, &[op2], None))
        }
        DpOp::Add | DpOp::Cmn => {
            let n = tr.get_reg(rn);
            let op2 = materialize(tr, operand2);
            Some(tr.emit(Opcode::Add, &[n, op2], flags))
        }
        DpOp::Adc => {
            let n = tr.get_reg(rn);
            let op2 = materialize(tr, operand2);
            Some(tr.emit(Opcode::AddWithCarry, &[n, op2], flags))
        }
        DpOp::Sub | DpOp::Cmp => {
            let n = tr.get_reg(rn);
            let op2 = materialize(tr, operand2);
            Some(tr.emit(Opcode::Sub, &[n, op2], flags))
        }
        DpOp::Rsb => {
            let n = tr.get_reg(rn);
            let op2 = materialize(tr, operand2);
            Some(tr.emit(Opcode::Sub, &[op2, n], flags))
        }
        DpOp::Sbc => {
            // Rn + ~op2 + C: the architecture's own definition of
            // subtract-with-carry, including its NZCV results.
            let n = tr.get_reg(rn);
            let op2 = materialize(tr, operand2);
            let not_op2 = tr.emit(Opcode::Not, &[op2], None);
            Some(tr.emit(Opcode::AddWithCarry, &[n, not_op2], flags))
        }
        DpOp::Rsc => {
            let n = tr.get_reg(rn);
            let op2 = materialize(tr, operand2);
            let not_n = tr.emit(Opcode::Not, &[n], None);
            Some(tr.emit(Opcode::AddWithCarry, &[op2, not_n], flags))
        }
        DpOp::And => {
            let n = tr.get_reg(rn);
            let op2 = materialize(tr, operand2);
            Some(tr.emit(Opcode::And, &[n, op2], flags))
        }
        DpOp::Eor => {
            let n = tr.get_reg(rn);
            let op2 = materialize(tr, operand2);
            Some(tr.emit(Opcode::Eor, &[n, op2], flags))
        }
        DpOp::Bic => {
            let n = tr.get_reg(rn);
            let op2 = materialize(tr, operand2);
            let not_op2 = tr.emit(Opcode::Not, &[op2], None);
            Some(tr.emit(Opcode::And, &[n, not_op2], flags))
        }
        // Rejected by `expressible` before we get here.
        DpOp::Orr | DpOp::Tst | DpOp::Teq => None,
    };

    let Some(result) = result else {
        return tr.fallback_to_interpreter();
    };

    if !op.is_compare() {
        if rd == Reg::R15 {
            tr.alu_write_pc(result);
        } else {
            tr.set_reg(rd, result);
        }
    }
}

fn materialize(tr: &mut Translator, operand2: Operand2) -> InstRef {
    match operand2 {
        Operand2::Imm(value) => tr.const_u32(value),
        Operand2::Value(v) => v,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DpOp {
    And, Eor, Sub, Rsb, Add, Adc, Sbc, Rsc,
    Tst, Teq, Cmp, Cmn,
    Orr, Mov, Bic, Mvn,
}

impl DpOp {
    fn from_id(id: ArmInstId) -> Option<Self> {
        use ArmInstId::*;
        Some(match id {
            AND_imm | AND_reg | AND_rsr => DpOp::And,
            EOR_imm | EOR_reg | EOR_rsr => DpOp::Eor,
            SUB_imm | SUB_reg | SUB_rsr => DpOp::Sub,
            RSB_imm | RSB_reg | RSB_rsr => DpOp::Rsb,
            ADD_imm | ADD_reg | ADD_rsr => DpOp::Add,
            ADC_imm | ADC_reg | ADC_rsr => DpOp::Adc,
            SBC_imm | SBC_reg | SBC_rsr => DpOp::Sbc,
            RSC_imm | RSC_reg | RSC_rsr => DpOp::Rsc,
            TST_imm | TST_reg | TST_rsr => DpOp::Tst,
            TEQ_imm | TEQ_reg | TEQ_rsr => DpOp::Teq,
            CMP_imm | CMP_reg | CMP_rsr => DpOp::Cmp,
            CMN_imm | CMN_reg | CMN_rsr => DpOp::Cmn,
            ORR_imm | ORR_reg | ORR_rsr => DpOp::Orr,
            MOV_imm | MOV_reg | MOV_rsr => DpOp::Mov,
            BIC_imm | BIC_reg | BIC_rsr => DpOp::Bic,
            MVN_imm | MVN_reg | MVN_rsr => DpOp::Mvn,
            _ => return None,
        })
    }

    fn is_compare(self) -> bool {
        matches!(self, DpOp::Tst | DpOp::Teq | DpOp::Cmp | DpOp::Cmn)
    }

    /// Whether this operation can be lowered with the given S bit.
    ///
    /// The arithmetic group defines NZCV from its own operands. The
    /// logical group's C result is the shifter carry-out, which the
    /// two-operand IR ops cannot observe, so their flag-setting forms
    /// (and the always-flag-setting TST/TEQ) go to the interpreter.
    /// ORR has no IR counterpart at all.
    fn expressible(self, s: bool) -> bool {
        match self {
            DpOp::Add | DpOp::Adc | DpOp::Sub | DpOp::Sbc
            | DpOp::Rsb | DpOp::Rsc | DpOp::Cmp | DpOp::Cmn => true,
            DpOp::And | DpOp::Eor | DpOp::Bic | DpOp::Mov | DpOp::Mvn => !s,
            DpOp::Orr | DpOp::Tst | DpOp::Teq => false,
        }
    }
}
