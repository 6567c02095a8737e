mod branch;
mod data_processing;
mod helpers;
mod load_store;
mod misc;
mod thumb16;

use log::{debug, trace};

use crate::error::{TranslateError, TranslateResult};
use crate::frontend::decoder::{decode_arm, ArmInstId, DecodedArm};
use crate::frontend::decoder_thumb16::{decode_thumb16, Thumb16InstId};
use crate::frontend::types::Reg;
use crate::ir::block::Block;
use crate::ir::builder::IREmitter;
use crate::ir::cond::Cond;
use crate::ir::flags::ArmFlags;
use crate::ir::location::LocationDescriptor;
use crate::ir::opcode::Opcode;
use crate::ir::terminal::Terminal;
use crate::ir::value::InstRef;

/// Headroom kept under [`Block::MAX_INSTRUCTIONS`] while the decode loop
/// runs: the largest single lowering (a full-list LDM is about 50
/// microinstructions) plus the deferred write-back (up to 15 `SetGPR`s).
/// Stopping once less than this much room remains guarantees the
/// finished block never exceeds the bound.
const IR_INSTRUCTION_HEADROOM: usize = 80;

/// Translate a straight-line region of guest code starting at `location`
/// into a single IR basic block.
///
/// `read_code` is the guest-memory fetch contract: a 32-bit read of code
/// memory. `None` (an unmapped fetch) is a fatal error. Undecodable
/// words and opcodes without a lowering degrade gracefully to an
/// `Interpret` terminal instead.
pub fn translate(
    location: LocationDescriptor,
    read_code: &dyn Fn(u32) -> Option<u32>,
) -> TranslateResult<Block> {
    Translator::new(location, read_code).translate()
}

/// Per-block translation state.
pub(crate) struct Translator<'a> {
    ir: IREmitter,
    /// Location of the instruction currently being lowered; advanced as
    /// the block grows.
    current: LocationDescriptor,
    /// Current SSA value for R0..R14, materialized lazily. R15 is never
    /// cached; PC reads are constants.
    reg_values: [Option<InstRef>; 15],
    /// Registers written inside the block; these get one deferred
    /// `SetGPR` each at block end.
    reg_dirty: u16,
    instructions_translated: usize,
    stop_compilation: bool,
    read_code: &'a dyn Fn(u32) -> Option<u32>,
}

impl<'a> Translator<'a> {
    fn new(location: LocationDescriptor, read_code: &'a dyn Fn(u32) -> Option<u32>) -> Self {
        Self {
            ir: IREmitter::new(location),
            current: location,
            reg_values: [None; 15],
            reg_dirty: 0,
            instructions_translated: 0,
            stop_compilation: false,
            read_code,
        }
    }

    fn translate(mut self) -> TranslateResult<Block> {
        loop {
            if self.current.t_flag() {
                self.translate_thumb_instruction()?;
            } else {
                self.translate_arm_instruction()?;
            }
            self.instructions_translated += 1;
            self.ir.add_cycle();

            if self.stop_compilation {
                break;
            }
            // One block never crosses a code page; page-granular cache
            // invalidation depends on it.
            if self.current.pc() & 0xFFF == 0 {
                break;
            }
            // Dense lowerings emit several microinstructions per guest
            // instruction; stop while a worst-case lowering and the
            // write-back still fit under the block bound.
            if self.ir.block().inst_count() + IR_INSTRUCTION_HEADROOM > Block::MAX_INSTRUCTIONS {
                break;
            }
        }

        self.writeback_registers();

        if !self.ir.term_is_set() {
            self.ir.set_term(Terminal::link_block(self.current));
        }

        let block = self.ir.finish();
        debug!(
            "translated block {}: {} guest instructions, {} ir instructions",
            block.location,
            self.instructions_translated,
            block.inst_count()
        );
        Ok(block)
    }

    fn translate_arm_instruction(&mut self) -> TranslateResult<()> {
        let address = self.current.pc() & !3;
        let word = (self.read_code)(address).ok_or(TranslateError::MemoryFault { address })?;
        let inst = decode_arm(word);
        trace!("{}: {:08x} {:?}", self.current, word, inst.id);
        self.dispatch_arm(&inst);
        Ok(())
    }

    fn translate_thumb_instruction(&mut self) -> TranslateResult<()> {
        let pc = self.current.pc();
        let address = pc & !3;
        let word = (self.read_code)(address).ok_or(TranslateError::MemoryFault { address })?;
        let hw = if pc & 2 != 0 { (word >> 16) as u16 } else { word as u16 };
        let inst = decode_thumb16(hw);
        trace!("{}: {:04x} {:?}", self.current, hw, inst.id);
        self.dispatch_thumb16(&inst);
        Ok(())
    }

    fn dispatch_arm(&mut self, inst: &DecodedArm) {
        use ArmInstId::*;
        match inst.id {
            // Data processing
            AND_imm | EOR_imm | SUB_imm | RSB_imm | ADD_imm | ADC_imm | SBC_imm | RSC_imm
            | TST_imm | TEQ_imm | CMP_imm | CMN_imm | ORR_imm | MOV_imm | BIC_imm | MVN_imm => {
                data_processing::arm_dp_imm(self, inst)
            }
            AND_reg | EOR_reg | SUB_reg | RSB_reg | ADD_reg | ADC_reg | SBC_reg | RSC_reg
            | TST_reg | TEQ_reg | CMP_reg | CMN_reg | ORR_reg | MOV_reg | BIC_reg | MVN_reg => {
                data_processing::arm_dp_reg(self, inst)
            }
            AND_rsr | EOR_rsr | SUB_rsr | RSB_rsr | ADD_rsr | ADC_rsr | SBC_rsr | RSC_rsr
            | TST_rsr | TEQ_rsr | CMP_rsr | CMN_rsr | ORR_rsr | MOV_rsr | BIC_rsr | MVN_rsr => {
                data_processing::arm_dp_rsr(self, inst)
            }
            MOVW => data_processing::arm_movw(self, inst),

            // Branches
            B => branch::arm_b(self, inst),
            BL => branch::arm_bl(self, inst),
            BX => branch::arm_bx(self, inst),
            BLX_reg => branch::arm_blx_reg(self, inst),
            BLX_imm => branch::arm_blx_imm(self, inst),

            // Loads
            LDR_imm => load_store::arm_ldr_imm(self, inst),
            LDR_reg => load_store::arm_ldr_reg(self, inst),
            LDM | LDMDA | LDMDB | LDMIB => load_store::arm_ldm(self, inst),

            // Misc
            CLZ => misc::arm_clz(self, inst),
            CLREX => misc::arm_clrex(self),
            NOP => misc::arm_nop(self, inst),
            PLD => misc::arm_pld(self),

            // Everything below has no lowering (yet, or by design:
            // stores have no IR write op, the logical group's shifter
            // carry is inexpressible, coprocessors are out of scope).
            MOVT | BXJ
            | STR_imm | STR_reg | STRB_imm | STRB_reg | STRH_imm | STRH_reg
            | STRD_imm | STRD_reg | LDRB_imm | LDRB_reg | LDRH_imm | LDRH_reg
            | LDRSB_imm | LDRSB_reg | LDRSH_imm | LDRSH_reg | LDRD_imm | LDRD_reg
            | LDRT | LDRBT | STRT | STRBT
            | STM | STMDA | STMDB | STMIB | STM_usr | LDM_usr
            | MUL | MLA | UMAAL | MLS | UMULL | UMLAL | SMULL | SMLAL
            | SEL | REV | REV16 | REVSH
            | SSAT | USAT | SSAT16 | USAT16
            | QADD | QSUB | QDADD | QDSUB
            | PKHBT | PKHTB | SBFX | UBFX | BFC | BFI | USAD8 | USADA8
            | SXTB | SXTH | SXTB16 | SXTAB | SXTAH | SXTAB16
            | UXTB | UXTH | UXTB16 | UXTAB | UXTAH | UXTAB16
            | SWP | SWPB | LDREX | LDREXB | LDREXH | LDREXD
            | STREX | STREXB | STREXH | STREXD
            | MRS | MSR_imm | MSR_reg | SETEND | CPS
            | YIELD | WFE | WFI | SEV
            | DMB | DSB | ISB
            | SVC | UDF | BKPT
            | CDP | LDC | STC | MCR | MRC | MCRR | MRRC
            | Unknown => self.fallback_to_interpreter(),
        }
    }

    fn dispatch_thumb16(&mut self, inst: &crate::frontend::decoder_thumb16::DecodedThumb16) {
        use Thumb16InstId::*;
        match inst.id {
            MOV_reg_t2 => thumb16::thumb_mov_reg(self, inst),
            ADD_reg_t2 => thumb16::thumb_add_reg(self, inst),
            BX => thumb16::thumb_bx(self, inst),
            BLX_reg => thumb16::thumb_blx_reg(self, inst),
            B_cond => thumb16::thumb_b_cond(self, inst),
            B_uncond => thumb16::thumb_b_uncond(self, inst),
            LDR_lit => thumb16::thumb_ldr_lit(self, inst),
            LDR_imm => thumb16::thumb_ldr_imm(self, inst),
            LDR_sp => thumb16::thumb_ldr_sp(self, inst),
            LDR_reg => thumb16::thumb_ldr_reg(self, inst),
            ADR => thumb16::thumb_adr(self, inst),
            ADD_sp_t1 => thumb16::thumb_add_sp_t1(self, inst),
            ADD_sp_imm7 => thumb16::thumb_add_sp_imm7(self, inst),
            SUB_sp_imm7 => thumb16::thumb_sub_sp_imm7(self, inst),
            POP => thumb16::thumb_pop(self, inst),
            NOP => thumb16::thumb_nop(self),

            // Flag-setting ALU forms, stores, and the rest interpret.
            LSL_imm | LSR_imm | ASR_imm | ADD_reg_t1 | SUB_reg_t1 | ADD_imm3 | SUB_imm3
            | MOV_imm | CMP_imm | ADD_imm8 | SUB_imm8
            | AND_reg | EOR_reg | LSL_reg | LSR_reg | ASR_reg | ADC_reg | SBC_reg | ROR_reg
            | TST_reg | RSB_imm | CMP_reg_t1 | CMN_reg | ORR_reg | MUL_reg | BIC_reg | MVN_reg
            | CMP_reg_t2
            | STR_reg | STRH_reg | STRB_reg | LDRSB_reg | LDRH_reg | LDRB_reg | LDRSH_reg
            | STR_imm | STRB_imm | LDRB_imm | STRH_imm | LDRH_imm | STR_sp
            | SXTH | SXTB | UXTH | UXTB
            | PUSH | REV | REV16 | REVSH
            | YIELD | WFE | WFI | SEV
            | BKPT | SETEND | CPS | STMIA | LDMIA
            | SVC | UDF | Wide32 | Unknown => self.fallback_to_interpreter(),
        }
    }

    // --- Register value tracking ---

    /// Current SSA value of `reg`. R15 reads materialize the
    /// architectural PC offset: `pc + 8` in ARM state, `pc + 4` in Thumb.
    fn get_reg(&mut self, reg: Reg) -> InstRef {
        if reg == Reg::R15 {
            let offset = if self.current.t_flag() { 4 } else { 8 };
            return self.ir.const_u32(self.current.pc().wrapping_add(offset));
        }
        let index = reg.number();
        match self.reg_values[index] {
            Some(value) => value,
            None => {
                let value = self.ir.get_gpr(reg);
                self.reg_values[index] = Some(value);
                value
            }
        }
    }

    /// Record a register write. The architectural `SetGPR` is deferred to
    /// block end, so intra-block readers see the SSA value directly.
    fn set_reg(&mut self, reg: Reg, value: InstRef) {
        debug_assert!(reg != Reg::R15, "PC writes go through AluWritePC/LoadWritePC");
        let index = reg.number();
        self.reg_values[index] = Some(value);
        self.reg_dirty |= 1 << index;
    }

    /// Emit the deferred write-back: one `SetGPR` per register written in
    /// the block, in register index order, ahead of the terminal.
    fn writeback_registers(&mut self) {
        for index in 0..15 {
            if self.reg_dirty & (1 << index) != 0 {
                let value = self.reg_values[index].expect("dirty register has a value");
                self.ir
                    .set_gpr(Reg::from_u8(index as u8), value)
                    .expect("register write-back is well-typed");
            }
        }
    }

    // --- Lowering helpers shared by the visitor modules ---

    fn const_u32(&mut self, value: u32) -> InstRef {
        self.ir.const_u32(value)
    }

    /// Append a microinstruction. `write_flags` of `None` keeps the
    /// opcode default. The builder's contract errors cannot occur for
    /// the well-typed instructions the lowerings emit.
    fn emit(&mut self, op: Opcode, args: &[InstRef], write_flags: Option<ArmFlags>) -> InstRef {
        self.ir
            .inst(op, args, write_flags)
            .expect("lowering emitted an ill-typed microinstruction")
    }

    /// Close the block with `terminal` and stop the decode loop.
    fn stop_with(&mut self, terminal: Terminal) {
        self.ir.set_term(terminal);
        self.stop_compilation = true;
    }

    /// Ask the dispatcher to interpret the instruction at the current
    /// location. The conservative path for everything not lowered.
    fn fallback_to_interpreter(&mut self) {
        debug!("{}: falling back to interpreter", self.current);
        self.stop_with(Terminal::interpret(self.current));
    }

    /// Gate a lowering on its condition field. An instruction whose
    /// condition matches the block's condition context executes
    /// unconditionally within the block; any other condition ends the
    /// block and defers to a successor translated under that condition.
    fn condition_passed(&mut self, cond: Cond) -> bool {
        if cond == self.current.cond() {
            return true;
        }
        let successor = self.current.set_cond(cond);
        self.stop_with(Terminal::link_block(successor));
        false
    }

    /// Advance past the instruction just lowered.
    fn advance_pc(&mut self) {
        let step = if self.current.t_flag() { 2 } else { 4 };
        self.current = self.current.advance_pc(step);
    }

    fn read32(&mut self, address: InstRef) -> InstRef {
        self.ir.read32(address).expect("memory read is well-typed")
    }

    fn push_rsb_hint(&mut self, return_addr: InstRef) {
        self.ir
            .push_rsb_hint(return_addr)
            .expect("RSB push is well-typed");
    }

    fn clear_exclusive(&mut self) {
        self.ir
            .clear_exclusive()
            .expect("exclusive-monitor clear is well-typed");
    }

    /// Lower an ALU write to the PC and close the block.
    fn alu_write_pc(&mut self, value: InstRef) {
        self.ir.alu_write_pc(value).expect("PC write is well-typed");
        self.stop_with(Terminal::ReturnToDispatch);
    }

    /// Lower a load-style write to the PC (sets the T bit from bit 0)
    /// and close the block with the given return prediction.
    fn load_write_pc(&mut self, value: InstRef, terminal: Terminal) {
        self.ir.load_write_pc(value).expect("PC write is well-typed");
        self.stop_with(terminal);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::ir::verification::verify;

    fn code(words: &[(u32, u32)]) -> HashMap<u32, u32> {
        words.iter().copied().collect()
    }

    fn translate_at(loc: LocationDescriptor, words: &[(u32, u32)]) -> Block {
        let map = code(words);
        let read = move |addr: u32| map.get(&addr).copied();
        let block = translate(loc, &read).unwrap();
        verify(&block).unwrap();
        block
    }

    fn ops(block: &Block) -> Vec<Opcode> {
        block.iter().map(|(_, inst)| inst.op).collect()
    }

    // An unsupported first opcode yields an empty block that defers the
    // instruction to the interpreter.
    #[test]
    fn test_unsupported_opcode_interprets() {
        let loc = LocationDescriptor::at(0x1000);
        let block = translate_at(loc, &[(0x1000, 0xEF00_0000)]); // SVC #0
        assert!(block.is_empty());
        assert_eq!(block.terminal, Terminal::Interpret { next: loc });
    }

    // An undecodable word is handled exactly like an unsupported opcode.
    #[test]
    fn test_decode_failure_interprets() {
        let loc = LocationDescriptor::at(0x1000);
        let block = translate_at(loc, &[(0x1000, 0xF700_0000)]);
        assert_eq!(block.terminal, Terminal::Interpret { next: loc });
    }

    // ADD R0, R1, #1 with S=0: flags suppressed, deferred write-back,
    // page-boundary fall-through to the next block.
    #[test]
    fn test_add_immediate() {
        let loc = LocationDescriptor::at(0xFFC);
        let block = translate_at(loc, &[(0xFFC, 0xE281_0001)]);

        assert_eq!(
            ops(&block),
            vec![
                Opcode::GetGPR(Reg::R1),
                Opcode::ConstU32(1),
                Opcode::Add,
                Opcode::SetGPR(Reg::R0),
            ]
        );
        let add = InstRef(2);
        assert_eq!(block.get(add).write_flags(), ArmFlags::empty());
        assert_eq!(block.get(add).arg(0), InstRef(0));
        assert_eq!(block.get(add).arg(1), InstRef(1));
        assert_eq!(block.get(InstRef(3)).arg(0), add);
        assert_eq!(block.terminal, Terminal::LinkBlock { next: loc.set_pc(0x1000) });
    }

    // ADDS writes the full NZCV set.
    #[test]
    fn test_flag_setting_add() {
        let loc = LocationDescriptor::at(0xFFC);
        let block = translate_at(loc, &[(0xFFC, 0xE291_0001)]);
        assert_eq!(block.get(InstRef(2)).op, Opcode::Add);
        assert_eq!(block.get(InstRef(2)).write_flags(), ArmFlags::NZCV);
    }

    // A condition not matching the block's context closes the block and
    // chains to the same PC under that condition.
    #[test]
    fn test_condition_mismatch_links_conditional_block() {
        let loc = LocationDescriptor::at(0x1000);
        let block = translate_at(loc, &[(0x1000, 0x0281_0001)]); // ADDEQ R0, R1, #1
        assert!(block.is_empty());
        assert_eq!(
            block.terminal,
            Terminal::LinkBlock { next: loc.set_cond(Cond::EQ) }
        );
    }

    // An instruction matching a non-AL condition context lowers inline.
    #[test]
    fn test_condition_match_lowers_inline() {
        let loc = LocationDescriptor::at(0xFFC).set_cond(Cond::EQ);
        let block = translate_at(loc, &[(0xFFC, 0x0281_0001)]);
        assert_eq!(block.inst_count(), 4);
        assert_eq!(
            block.terminal,
            Terminal::LinkBlock { next: loc.set_pc(0x1000) }
        );
    }

    // B: signed 24-bit offset, shifted left twice, relative to pc + 8.
    #[test]
    fn test_branch_forward() {
        let loc = LocationDescriptor::at(0x1000);
        let block = translate_at(loc, &[(0x1000, 0xEA00_003E)]); // B +0xF8
        assert!(block.is_empty());
        assert_eq!(
            block.terminal,
            Terminal::LinkBlock { next: loc.set_pc(0x1100) }
        );
    }

    #[test]
    fn test_branch_backward_sign_extends() {
        let loc = LocationDescriptor::at(0x1000);
        let block = translate_at(loc, &[(0x1000, 0xEAFF_FFFD)]); // B -12
        assert_eq!(
            block.terminal,
            Terminal::LinkBlock { next: loc.set_pc(0xFFC) }
        );
    }

    // A run of supported instructions stops at the 4 KiB page boundary
    // and falls through with a LinkBlock.
    #[test]
    fn test_page_boundary_stop() {
        let loc = LocationDescriptor::at(0xFF0);
        let add = 0xE281_0001; // ADD R0, R1, #1
        let block = translate_at(
            loc,
            &[(0xFF0, add), (0xFF4, add), (0xFF8, add), (0xFFC, add), (0x1000, add)],
        );

        // One lazy GetGPR, then (const, add) per instruction, then the
        // single deferred write-back.
        assert_eq!(block.inst_count(), 1 + 2 * 4 + 1);
        assert_eq!(block.cycle_count, 4);
        assert_eq!(
            block.terminal,
            Terminal::LinkBlock { next: loc.set_pc(0x1000) }
        );
    }

    // Deferred write-back emits one SetGPR per written register, in
    // register index order, after all computation.
    #[test]
    fn test_writeback_order_and_caching() {
        let loc = LocationDescriptor::at(0xFF8);
        let block = translate_at(
            loc,
            &[
                (0xFF8, 0xE281_2001), // ADD R2, R1, #1
                (0xFFC, 0xE282_0002), // ADD R0, R2, #2
            ],
        );

        let o = ops(&block);
        assert_eq!(
            o,
            vec![
                Opcode::GetGPR(Reg::R1),
                Opcode::ConstU32(1),
                Opcode::Add,
                Opcode::ConstU32(2),
                Opcode::Add,
                Opcode::SetGPR(Reg::R0),
                Opcode::SetGPR(Reg::R2),
            ]
        );
        // The second add consumes the first add's SSA value, not a
        // re-read of R2.
        assert_eq!(block.get(InstRef(4)).arg(0), InstRef(2));
        // Write-backs carry the final values.
        assert_eq!(block.get(InstRef(5)).arg(0), InstRef(4)); // R0
        assert_eq!(block.get(InstRef(6)).arg(0), InstRef(2)); // R2
    }

    // BL records the return address on the RSB and links to the target.
    #[test]
    fn test_bl_pushes_rsb_hint() {
        let loc = LocationDescriptor::at(0x1000);
        let block = translate_at(loc, &[(0x1000, 0xEB00_003E)]); // BL +0xF8
        assert_eq!(
            ops(&block),
            vec![Opcode::ConstU32(0x1004), Opcode::PushRSBHint]
        );
        assert_eq!(
            block.terminal,
            Terminal::LinkBlock { next: loc.set_pc(0x1100) }
        );
    }

    // BX LR is a predicted return.
    #[test]
    fn test_bx_lr_predicts_return() {
        let loc = LocationDescriptor::at(0x1000);
        let block = translate_at(loc, &[(0x1000, 0xE12F_FF1E)]); // BX LR
        assert_eq!(
            ops(&block),
            vec![Opcode::GetGPR(Reg::R14), Opcode::LoadWritePC]
        );
        assert_eq!(block.terminal, Terminal::PopRSBHint);
    }

    // MOV PC, Rm goes through AluWritePC and returns to dispatch.
    #[test]
    fn test_mov_to_pc() {
        let loc = LocationDescriptor::at(0x1000);
        let block = translate_at(loc, &[(0x1000, 0xE1A0_F002)]); // MOV PC, R2
        assert_eq!(
            ops(&block),
            vec![Opcode::GetGPR(Reg::R2), Opcode::AluWritePC]
        );
        assert_eq!(block.terminal, Terminal::ReturnToDispatch);
    }

    // SBC lowers through the add-with-carry identity.
    #[test]
    fn test_sbc_lowering() {
        let loc = LocationDescriptor::at(0xFFC);
        let block = translate_at(loc, &[(0xFFC, 0xE2C1_0001)]); // SBC R0, R1, #1
        assert_eq!(
            ops(&block),
            vec![
                Opcode::GetGPR(Reg::R1),
                Opcode::ConstU32(1),
                Opcode::Not,
                Opcode::AddWithCarry,
                Opcode::SetGPR(Reg::R0),
            ]
        );
    }

    // Flag-setting logical forms cannot express the shifter carry and
    // defer to the interpreter.
    #[test]
    fn test_flag_setting_logical_falls_back() {
        let loc = LocationDescriptor::at(0x1000);
        let block = translate_at(loc, &[(0x1000, 0xE3B0_0001)]); // MOVS R0, #1
        assert!(block.is_empty());
        assert_eq!(block.terminal, Terminal::Interpret { next: loc });
    }

    // LDR from a PC-relative address reads through a translation-time
    // constant base.
    #[test]
    fn test_ldr_literal() {
        let loc = LocationDescriptor::at(0xFFC);
        let block = translate_at(loc, &[(0xFFC, 0xE59F_0004)]); // LDR R0, [PC, #4]
        assert_eq!(
            ops(&block),
            vec![
                Opcode::ConstU32(0x1004), // pc + 8
                Opcode::ConstU32(4),
                Opcode::Add,
                Opcode::Read32,
                Opcode::SetGPR(Reg::R0),
            ]
        );
    }

    // LDM with PC in the list is a predicted return through LoadWritePC.
    #[test]
    fn test_ldm_with_pc_returns() {
        let loc = LocationDescriptor::at(0x1000);
        let block = translate_at(loc, &[(0x1000, 0xE8BD_8010)]); // LDMIA SP!, {R4, PC}
        let o = ops(&block);
        assert_eq!(o[0], Opcode::GetGPR(Reg::R13));
        assert_eq!(o.iter().filter(|op| **op == Opcode::Read32).count(), 2);
        assert!(o.contains(&Opcode::LoadWritePC));
        assert_eq!(block.terminal, Terminal::PopRSBHint);
        // SP write-back and R4 both land in the deferred SetGPRs.
        assert!(o.contains(&Opcode::SetGPR(Reg::R4)));
        assert!(o.contains(&Opcode::SetGPR(Reg::R13)));
    }

    // A faulting code fetch is fatal, not an interpret fallback.
    #[test]
    fn test_memory_fault_is_fatal() {
        let loc = LocationDescriptor::at(0x1000);
        let read = |_: u32| -> Option<u32> { None };
        let err = translate(loc, &read).unwrap_err();
        assert_eq!(err, TranslateError::MemoryFault { address: 0x1000 });
    }

    // Thumb state: PC reads are pc + 4 and the PC step is 2.
    #[test]
    fn test_thumb_pc_read_offset() {
        let loc = LocationDescriptor::at(0xFFE).set_t_flag(true);
        // MOV R8, PC in the high halfword of the page-final word.
        let block = translate_at(loc, &[(0xFFC, 0x46F8_0000)]);
        assert_eq!(
            ops(&block),
            vec![Opcode::ConstU32(0x1002), Opcode::SetGPR(Reg::R8)]
        );
        assert_eq!(
            block.terminal,
            Terminal::LinkBlock { next: loc.set_pc(0x1000) }
        );
    }

    // Thumb halfwords select the correct half of the fetched word.
    #[test]
    fn test_thumb_halfword_fetch() {
        let loc = LocationDescriptor::at(0x1002).set_t_flag(true);
        // Word at 0x1000 holds [0x1000]=NOP-ish, [0x1002]=B +8.
        let block = translate_at(loc, &[(0x1000, 0xE004_0000)]);
        assert_eq!(
            block.terminal,
            Terminal::LinkBlock { next: loc.set_pc(0x1002 + 4 + 8) }
        );
    }

    #[test]
    fn test_thumb_b_cond_mismatch() {
        let loc = LocationDescriptor::at(0x1000).set_t_flag(true);
        // BEQ +0
        let block = translate_at(loc, &[(0x1000, 0x0000_D000)]);
        assert!(block.is_empty());
        assert_eq!(
            block.terminal,
            Terminal::LinkBlock { next: loc.set_cond(Cond::EQ) }
        );
    }

    // Thumb POP {R4, PC}: ascending loads from SP, SP adjust, predicted
    // return.
    #[test]
    fn test_thumb_pop_pc() {
        let loc = LocationDescriptor::at(0x1000).set_t_flag(true);
        let block = translate_at(loc, &[(0x1000, 0x0000_BD10)]); // POP {R4, PC}
        let o = ops(&block);
        assert_eq!(o.iter().filter(|op| **op == Opcode::Read32).count(), 2);
        assert!(o.contains(&Opcode::LoadWritePC));
        assert!(o.contains(&Opcode::SetGPR(Reg::R4)));
        assert!(o.contains(&Opcode::SetGPR(Reg::R13)));
        assert_eq!(block.terminal, Terminal::PopRSBHint);
    }

    // Thumb flag-setting ALU encodings interpret.
    #[test]
    fn test_thumb_flag_setting_falls_back() {
        let loc = LocationDescriptor::at(0x1000).set_t_flag(true);
        let block = translate_at(loc, &[(0x1000, 0x0000_2001)]); // MOVS R0, #1
        assert!(block.is_empty());
        assert_eq!(block.terminal, Terminal::Interpret { next: loc });
    }

    // The NOP hint emits nothing but still advances the block.
    #[test]
    fn test_nop_advances() {
        let loc = LocationDescriptor::at(0xFFC);
        let block = translate_at(loc, &[(0xFFC, 0xE320_F000)]);
        assert!(block.is_empty());
        assert_eq!(
            block.terminal,
            Terminal::LinkBlock { next: loc.set_pc(0x1000) }
        );
    }

    // CLREX lowers to the exclusive-monitor clear.
    #[test]
    fn test_clrex() {
        let loc = LocationDescriptor::at(0xFFC);
        let block = translate_at(loc, &[(0xFFC, 0xF57F_F01F)]);
        assert_eq!(ops(&block), vec![Opcode::ClearExclusive]);
    }

    // CLZ lowers to CountLeadingZeros.
    #[test]
    fn test_clz() {
        let loc = LocationDescriptor::at(0xFFC);
        let block = translate_at(loc, &[(0xFFC, 0xE16F_0F11)]); // CLZ R0, R1
        assert_eq!(
            ops(&block),
            vec![
                Opcode::GetGPR(Reg::R1),
                Opcode::CountLeadingZeros,
                Opcode::SetGPR(Reg::R0),
            ]
        );
    }

    // Register-shifted-register operands mask the amount to a byte.
    #[test]
    fn test_dp_rsr_masks_shift_amount() {
        let loc = LocationDescriptor::at(0xFFC);
        let block = translate_at(loc, &[(0xFFC, 0xE081_0312)]); // ADD R0, R1, R2, LSL R3
        let o = ops(&block);
        assert!(o.contains(&Opcode::ConstU32(0xFF)));
        assert!(o.contains(&Opcode::And));
        assert!(o.contains(&Opcode::LogicalShiftLeft));
        assert_eq!(*o.last().unwrap(), Opcode::SetGPR(Reg::R0));
    }

    // Dense lowerings (several microinstructions per guest instruction)
    // must not push a page-bounded block past its instruction limit: the
    // IR budget stops the loop before the page boundary does.
    #[test]
    fn test_ir_budget_bounds_block_size() {
        let loc = LocationDescriptor::at(0);
        // A full page of ADD R0, R1, R2, LSL R3 (4 microinstructions per
        // guest instruction once the register reads are cached).
        let words: Vec<(u32, u32)> = (0..1024u32).map(|i| (i * 4, 0xE081_0312)).collect();
        let block = translate_at(loc, &words);

        assert!(block.inst_count() <= Block::MAX_INSTRUCTIONS);
        assert!(block.cycle_count < 1024); // budget fired first
        assert!(matches!(block.terminal, Terminal::LinkBlock { .. }));
    }

    // RRX shows up for ROR #0 operands, with its carry write suppressed
    // in address/operand position.
    #[test]
    fn test_rrx_operand() {
        let loc = LocationDescriptor::at(0xFFC);
        let block = translate_at(loc, &[(0xFFC, 0xE081_0062)]); // ADD R0, R1, R2, RRX
        let o = ops(&block);
        let rrx = o.iter().position(|op| *op == Opcode::RotateRightExtended).unwrap();
        assert_eq!(block.get(InstRef(rrx as u32)).write_flags(), ArmFlags::empty());
    }
}
