use crate::frontend::decoder::{ArmInstId, DecodedArm};
use crate::frontend::types::Reg;
use crate::ir::flags::ArmFlags;
use crate::ir::opcode::Opcode;
use crate::ir::terminal::Terminal;
use crate::ir::value::InstRef;

use super::helpers::emit_imm_shift;
use super::Translator;

const NO_FLAGS: Option<ArmFlags> = Some(ArmFlags::empty());

/// LDR (immediate / literal).
pub(super) fn arm_ldr_imm(tr: &mut Translator, inst: &DecodedArm) {
    let rn = inst.rn();
    let rt = inst.rt();
    let (p, u, w) = (inst.p_flag(), inst.u_flag(), inst.w_flag());
    let wback = !p || w;

    // Write-back through PC, or a base that is also the destination, is
    // UNPREDICTABLE.
    if wback && (rn == Reg::R15 || rn == rt) {
        return tr.fallback_to_interpreter();
    }

    if tr.condition_passed(inst.cond()) {
        let base = tr.get_reg(rn);
        let offset_addr = offset_address_imm(tr, base, u, inst.imm12());
        let address = if p { offset_addr } else { base };
        if wback {
            tr.set_reg(rn, offset_addr);
        }
        load_word_into(tr, rt, address);
    }
    if !tr.stop_compilation {
        tr.advance_pc();
    }
}

/// LDR (register offset, optionally shifted).
pub(super) fn arm_ldr_reg(tr: &mut Translator, inst: &DecodedArm) {
    let rn = inst.rn();
    let rt = inst.rt();
    let rm = inst.rm();
    let (p, u, w) = (inst.p_flag(), inst.u_flag(), inst.w_flag());
    let wback = !p || w;

    if rm == Reg::R15 || (wback && (rn == Reg::R15 || rn == rt)) {
        return tr.fallback_to_interpreter();
    }

    if tr.condition_passed(inst.cond()) {
        let base = tr.get_reg(rn);
        let rm_val = tr.get_reg(rm);
        let offset = emit_imm_shift(tr, rm_val, inst.shift_type(), inst.imm5());
        let op = if u { Opcode::Add } else { Opcode::Sub };
        let offset_addr = tr.emit(op, &[base, offset], NO_FLAGS);
        let address = if p { offset_addr } else { base };
        if wback {
            tr.set_reg(rn, offset_addr);
        }
        load_word_into(tr, rt, address);
    }
    if !tr.stop_compilation {
        tr.advance_pc();
    }
}

/// LDM and its addressing variants (IA/IB/DA/DB).
pub(super) fn arm_ldm(tr: &mut Translator, inst: &DecodedArm) {
    let rn = inst.rn();
    let list = inst.register_list() as u32;
    let count = list.count_ones();
    let (ib, da, db) = (
        inst.id == ArmInstId::LDMIB,
        inst.id == ArmInstId::LDMDA,
        inst.id == ArmInstId::LDMDB,
    );
    let wback = inst.w_flag();

    // Empty list, PC base, and write-back of a loaded base are all
    // UNPREDICTABLE.
    if list == 0 || rn == Reg::R15 || (wback && list & (1 << rn.number()) != 0) {
        return tr.fallback_to_interpreter();
    }

    if tr.condition_passed(inst.cond()) {
        let base = tr.get_reg(rn);

        // Lowest-numbered register always loads from the lowest address.
        let first_offset: i64 = match (ib, da, db) {
            (true, _, _) => 4,                         // IB
            (_, true, _) => 4 - 4 * count as i64,      // DA
            (_, _, true) => -4 * (count as i64),       // DB
            _ => 0,                                    // IA
        };

        let mut pc_value: Option<InstRef> = None;
        let mut slot = 0i64;
        for index in 0..16u32 {
            if list & (1 << index) == 0 {
                continue;
            }
            let address = offset_address(tr, base, first_offset + 4 * slot);
            let data = tr.read32(address);
            if index == 15 {
                pc_value = Some(data);
            } else {
                tr.set_reg(Reg::from_u8(index as u8), data);
            }
            slot += 1;
        }

        if wback {
            let amount = 4 * count as i64;
            let new_base = offset_address(tr, base, if da || db { -amount } else { amount });
            tr.set_reg(rn, new_base);
        }

        if let Some(value) = pc_value {
            // Loading the PC is a return; predict it through the RSB.
            tr.load_write_pc(value, Terminal::PopRSBHint);
        }
    }
    if !tr.stop_compilation {
        tr.advance_pc();
    }
}

/// Base ± imm12 address, folding the zero-offset case onto the base.
fn offset_address_imm(tr: &mut Translator, base: InstRef, u: bool, imm12: u32) -> InstRef {
    if imm12 == 0 {
        return base;
    }
    let offset = tr.const_u32(imm12);
    let op = if u { Opcode::Add } else { Opcode::Sub };
    tr.emit(op, &[base, offset], NO_FLAGS)
}

/// Base plus a small signed displacement.
fn offset_address(tr: &mut Translator, base: InstRef, displacement: i64) -> InstRef {
    if displacement == 0 {
        return base;
    }
    let magnitude = tr.const_u32(displacement.unsigned_abs() as u32);
    let op = if displacement > 0 { Opcode::Add } else { Opcode::Sub };
    tr.emit(op, &[base, magnitude], NO_FLAGS)
}

/// Finish a word load: writes to the PC exchange and close the block.
fn load_word_into(tr: &mut Translator, rt: Reg, address: InstRef) {
    let data = tr.read32(address);
    if rt == Reg::R15 {
        tr.load_write_pc(data, Terminal::PopRSBHint);
    } else {
        tr.set_reg(rt, data);
    }
}
