use crate::frontend::decoder::{sign_extend, DecodedArm};
use crate::frontend::types::Reg;
use crate::ir::terminal::Terminal;

use super::Translator;

/// B: PC-relative branch. The 24-bit immediate is sign-extended, shifted
/// left by two, and taken relative to the PC read value (pc + 8).
pub(super) fn arm_b(tr: &mut Translator, inst: &DecodedArm) {
    if tr.condition_passed(inst.cond()) {
        let offset = sign_extend(inst.imm24() << 2, 26);
        let target = tr.current.pc().wrapping_add(8).wrapping_add(offset);
        tr.stop_with(Terminal::link_block(tr.current.set_pc(target)));
    }
}

/// BL: branch with link. The RSB push both writes the link register and
/// records the return-address prediction.
pub(super) fn arm_bl(tr: &mut Translator, inst: &DecodedArm) {
    if tr.condition_passed(inst.cond()) {
        let offset = sign_extend(inst.imm24() << 2, 26);
        let target = tr.current.pc().wrapping_add(8).wrapping_add(offset);

        let return_addr = tr.const_u32(tr.current.pc().wrapping_add(4));
        tr.push_rsb_hint(return_addr);

        tr.stop_with(Terminal::link_block(tr.current.set_pc(target)));
    }
}

/// BLX (immediate): call with ARM-to-Thumb exchange. Lives in the
/// unconditional space; the H bit supplies a halfword offset.
pub(super) fn arm_blx_imm(tr: &mut Translator, inst: &DecodedArm) {
    let h = if inst.h_flag() { 2u32 } else { 0 };
    let offset = sign_extend(inst.imm24() << 2, 26).wrapping_add(h);
    let target = tr.current.pc().wrapping_add(8).wrapping_add(offset);

    let return_addr = tr.const_u32(tr.current.pc().wrapping_add(4));
    tr.push_rsb_hint(return_addr);

    let next = tr.current.set_pc(target).set_t_flag(true);
    tr.stop_with(Terminal::link_block(next));
}

/// BX: branch and exchange. `BX LR` is the canonical return, so it
/// closes the block with the RSB prediction.
pub(super) fn arm_bx(tr: &mut Translator, inst: &DecodedArm) {
    if tr.condition_passed(inst.cond()) {
        let rm = inst.rm();
        let target = tr.get_reg(rm);
        let terminal = if rm == Reg::R14 {
            Terminal::PopRSBHint
        } else {
            Terminal::ReturnToDispatch
        };
        tr.load_write_pc(target, terminal);
    }
}

/// BLX (register): indirect call with exchange.
pub(super) fn arm_blx_reg(tr: &mut Translator, inst: &DecodedArm) {
    if tr.condition_passed(inst.cond()) {
        // Read the target before the RSB push clobbers R14.
        let target = tr.get_reg(inst.rm());

        let return_addr = tr.const_u32(tr.current.pc().wrapping_add(4));
        tr.push_rsb_hint(return_addr);

        tr.load_write_pc(target, Terminal::ReturnToDispatch);
    }
}
