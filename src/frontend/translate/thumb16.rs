use crate::frontend::decoder::sign_extend;
use crate::frontend::decoder_thumb16::DecodedThumb16;
use crate::frontend::types::Reg;
use crate::ir::flags::ArmFlags;
use crate::ir::opcode::Opcode;
use crate::ir::terminal::Terminal;
use crate::ir::value::InstRef;

use super::Translator;

// Thumb16 lowerings cover the encodings that do not set flags: the
// high-register special-data group, branches, word loads, SP/PC address
// arithmetic, and POP. Everything flag-setting falls back (the IR cannot
// express the Thumb ALU group's NZ writes), as does everything the ARM
// path also declines.

const NO_FLAGS: Option<ArmFlags> = Some(ArmFlags::empty());

/// MOV (register, high-register form, T2). No flags. `MOV PC, Rm`
/// branches without interworking.
pub(super) fn thumb_mov_reg(tr: &mut Translator, inst: &DecodedThumb16) {
    let rd = inst.rdn_hi();
    let value = tr.get_reg(inst.rm_hi());
    if rd == Reg::R15 {
        tr.alu_write_pc(value);
        return;
    }
    tr.set_reg(rd, value);
    tr.advance_pc();
}

/// ADD (register, high-register form, T2). No flags.
pub(super) fn thumb_add_reg(tr: &mut Translator, inst: &DecodedThumb16) {
    let rdn = inst.rdn_hi();
    let n = tr.get_reg(rdn);
    let m = tr.get_reg(inst.rm_hi());
    let result = tr.emit(Opcode::Add, &[n, m], NO_FLAGS);
    if rdn == Reg::R15 {
        tr.alu_write_pc(result);
        return;
    }
    tr.set_reg(rdn, result);
    tr.advance_pc();
}

/// BX: branch and exchange; `BX LR` predicts the return.
pub(super) fn thumb_bx(tr: &mut Translator, inst: &DecodedThumb16) {
    let rm = inst.rm_hi();
    let target = tr.get_reg(rm);
    let terminal = if rm == Reg::R14 {
        Terminal::PopRSBHint
    } else {
        Terminal::ReturnToDispatch
    };
    tr.load_write_pc(target, terminal);
}

/// BLX (register): indirect call. The Thumb return address carries the
/// T bit in bit 0.
pub(super) fn thumb_blx_reg(tr: &mut Translator, inst: &DecodedThumb16) {
    let target = tr.get_reg(inst.rm_hi());
    let return_addr = tr.const_u32(tr.current.pc().wrapping_add(2) | 1);
    tr.push_rsb_hint(return_addr);
    tr.load_write_pc(target, Terminal::ReturnToDispatch);
}

/// B (conditional, T1).
pub(super) fn thumb_b_cond(tr: &mut Translator, inst: &DecodedThumb16) {
    if tr.condition_passed(inst.cond()) {
        let offset = sign_extend(inst.imm8() << 1, 9);
        let target = tr.current.pc().wrapping_add(4).wrapping_add(offset);
        tr.stop_with(Terminal::link_block(tr.current.set_pc(target)));
    }
}

/// B (unconditional, T2).
pub(super) fn thumb_b_uncond(tr: &mut Translator, inst: &DecodedThumb16) {
    let offset = sign_extend(inst.imm11() << 1, 12);
    let target = tr.current.pc().wrapping_add(4).wrapping_add(offset);
    tr.stop_with(Terminal::link_block(tr.current.set_pc(target)));
}

/// LDR (literal): the address is fully known at translation time.
pub(super) fn thumb_ldr_lit(tr: &mut Translator, inst: &DecodedThumb16) {
    let base = tr.current.pc().wrapping_add(4) & !3;
    let address = tr.const_u32(base.wrapping_add(inst.imm8() * 4));
    let data = tr.read32(address);
    tr.set_reg(inst.rt_hi(), data);
    tr.advance_pc();
}

/// LDR (immediate, T1).
pub(super) fn thumb_ldr_imm(tr: &mut Translator, inst: &DecodedThumb16) {
    load_word(tr, inst.rn_lo(), inst.imm5() * 4, inst.rd_lo());
}

/// LDR (SP-relative, T2).
pub(super) fn thumb_ldr_sp(tr: &mut Translator, inst: &DecodedThumb16) {
    load_word(tr, Reg::SP, inst.imm8() * 4, inst.rt_hi());
}

/// LDR (register).
pub(super) fn thumb_ldr_reg(tr: &mut Translator, inst: &DecodedThumb16) {
    let base = tr.get_reg(inst.rn_lo());
    let offset = tr.get_reg(inst.rm_lo());
    let address = tr.emit(Opcode::Add, &[base, offset], NO_FLAGS);
    let data = tr.read32(address);
    tr.set_reg(inst.rd_lo(), data);
    tr.advance_pc();
}

/// ADR: PC-relative address generation.
pub(super) fn thumb_adr(tr: &mut Translator, inst: &DecodedThumb16) {
    let base = tr.current.pc().wrapping_add(4) & !3;
    let value = tr.const_u32(base.wrapping_add(inst.imm8() * 4));
    tr.set_reg(inst.rt_hi(), value);
    tr.advance_pc();
}

/// ADD Rd, SP, #imm8*4 (T1).
pub(super) fn thumb_add_sp_t1(tr: &mut Translator, inst: &DecodedThumb16) {
    let sp = tr.get_reg(Reg::SP);
    let offset = tr.const_u32(inst.imm8() * 4);
    let result = tr.emit(Opcode::Add, &[sp, offset], NO_FLAGS);
    tr.set_reg(inst.rt_hi(), result);
    tr.advance_pc();
}

/// ADD SP, #imm7*4.
pub(super) fn thumb_add_sp_imm7(tr: &mut Translator, inst: &DecodedThumb16) {
    adjust_sp(tr, Opcode::Add, inst.imm7() * 4);
}

/// SUB SP, #imm7*4.
pub(super) fn thumb_sub_sp_imm7(tr: &mut Translator, inst: &DecodedThumb16) {
    adjust_sp(tr, Opcode::Sub, inst.imm7() * 4);
}

/// POP: loads ascending from SP, optionally ending in a predicted
/// return through the PC.
pub(super) fn thumb_pop(tr: &mut Translator, inst: &DecodedThumb16) {
    let list = inst.register_list() as u32;
    let pop_pc = inst.pclr_bit();
    let count = list.count_ones() + pop_pc as u32;
    if count == 0 {
        return tr.fallback_to_interpreter();
    }

    let sp = tr.get_reg(Reg::SP);
    let mut slot = 0u32;
    let mut pc_value: Option<InstRef> = None;

    for index in 0..8u32 {
        if list & (1 << index) == 0 {
            continue;
        }
        let address = pop_address(tr, sp, slot);
        let data = tr.read32(address);
        tr.set_reg(Reg::from_u8(index as u8), data);
        slot += 1;
    }
    if pop_pc {
        let address = pop_address(tr, sp, slot);
        pc_value = Some(tr.read32(address));
    }

    let adjust = tr.const_u32(4 * count);
    let new_sp = tr.emit(Opcode::Add, &[sp, adjust], NO_FLAGS);
    tr.set_reg(Reg::SP, new_sp);

    if let Some(value) = pc_value {
        tr.load_write_pc(value, Terminal::PopRSBHint);
        return;
    }
    tr.advance_pc();
}

/// NOP and NOP-compatible hints.
pub(super) fn thumb_nop(tr: &mut Translator) {
    tr.advance_pc();
}

fn load_word(tr: &mut Translator, rn: Reg, byte_offset: u32, rt: Reg) {
    let base = tr.get_reg(rn);
    let address = if byte_offset == 0 {
        base
    } else {
        let offset = tr.const_u32(byte_offset);
        tr.emit(Opcode::Add, &[base, offset], NO_FLAGS)
    };
    let data = tr.read32(address);
    tr.set_reg(rt, data);
    tr.advance_pc();
}

fn adjust_sp(tr: &mut Translator, op: Opcode, amount: u32) {
    let sp = tr.get_reg(Reg::SP);
    let offset = tr.const_u32(amount);
    let result = tr.emit(op, &[sp, offset], NO_FLAGS);
    tr.set_reg(Reg::SP, result);
    tr.advance_pc();
}

fn pop_address(tr: &mut Translator, sp: InstRef, slot: u32) -> InstRef {
    if slot == 0 {
        return sp;
    }
    let offset = tr.const_u32(4 * slot);
    tr.emit(Opcode::Add, &[sp, offset], NO_FLAGS)
}
