use crate::frontend::types::ShiftType;
use crate::ir::flags::ArmFlags;
use crate::ir::opcode::Opcode;
use crate::ir::value::InstRef;

use super::Translator;

/// Lower a shift-by-immediate operand. The flag-setting forms that
/// would need the shifter's carry-out are not lowered, so the shift's
/// C write is suppressed.
pub(super) fn emit_imm_shift(
    tr: &mut Translator,
    value: InstRef,
    shift_type: ShiftType,
    imm5: u32,
) -> InstRef {
    const NO_FLAGS: Option<ArmFlags> = Some(ArmFlags::empty());
    match shift_type {
        ShiftType::LSL => {
            if imm5 == 0 {
                value
            } else {
                let amount = tr.const_u32(imm5);
                tr.emit(Opcode::LogicalShiftLeft, &[value, amount], NO_FLAGS)
            }
        }
        ShiftType::LSR => {
            let amount = tr.const_u32(if imm5 == 0 { 32 } else { imm5 });
            tr.emit(Opcode::LogicalShiftRight, &[value, amount], NO_FLAGS)
        }
        ShiftType::ASR => {
            let amount = tr.const_u32(if imm5 == 0 { 32 } else { imm5 });
            tr.emit(Opcode::ArithmeticShiftRight, &[value, amount], NO_FLAGS)
        }
        ShiftType::ROR => {
            if imm5 == 0 {
                // Encoding ROR #0 means RRX.
                tr.emit(Opcode::RotateRightExtended, &[value], NO_FLAGS)
            } else {
                let amount = tr.const_u32(imm5);
                tr.emit(Opcode::RotateRight, &[value, amount], NO_FLAGS)
            }
        }
    }
}

/// Lower a shift-by-register operand. Only the low byte of the amount
/// register participates.
pub(super) fn emit_reg_shift(
    tr: &mut Translator,
    value: InstRef,
    shift_type: ShiftType,
    amount: InstRef,
) -> InstRef {
    const NO_FLAGS: Option<ArmFlags> = Some(ArmFlags::empty());
    let mask = tr.const_u32(0xFF);
    let amount = tr.emit(Opcode::And, &[amount, mask], NO_FLAGS);
    let op = match shift_type {
        ShiftType::LSL => Opcode::LogicalShiftLeft,
        ShiftType::LSR => Opcode::LogicalShiftRight,
        ShiftType::ASR => Opcode::ArithmeticShiftRight,
        ShiftType::ROR => Opcode::RotateRight,
    };
    tr.emit(op, &[value, amount], NO_FLAGS)
}
