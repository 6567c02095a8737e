use std::fmt;

use crate::frontend::types::Reg;
use crate::ir::flags::ArmFlags;
use crate::ir::types::Type;

/// The operation of a microinstruction. These are suboperations of a
/// decoded ARM instruction; a single guest instruction may lower to zero
/// or more of them. Per-variant fields are immediates fixed at append
/// time; value operands are held separately in the instruction's
/// operand slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    // Simple values
    ConstU32(u32),
    GetGPR(Reg),

    // Architectural write-back
    SetGPR(Reg),

    // Hints. Sets R14 and records return info on the return stack buffer.
    PushRSBHint,

    // PC writes (ARMv6 semantics)
    AluWritePC,  // R15 := $0 & (T ? 0xFFFFFFFE : 0xFFFFFFFC)
    LoadWritePC, // T := $0 & 1, R15 := $0 & 0xFFFFFFFE

    // ALU
    Add,
    AddWithCarry,
    Sub,
    And,
    Eor,
    Not,
    LogicalShiftLeft,
    LogicalShiftRight,
    ArithmeticShiftRight,
    RotateRight,
    RotateRightExtended,
    CountLeadingZeros,

    // Synchronization
    ClearExclusive,

    // Memory
    Read32,
}

/// Static metadata for an opcode: return type, operand types, and the
/// flag masks it reads and (by default) writes.
#[derive(Debug, Clone, Copy)]
pub struct OpcodeInfo {
    pub ret: Type,
    pub args: &'static [Type],
    pub read_flags: ArmFlags,
    pub default_write_flags: ArmFlags,
    pub side_effect: bool,
}

impl Opcode {
    /// Metadata lookup. Exhaustive over the enumeration: extending
    /// `Opcode` without a row here is a compile error.
    pub fn info(self) -> OpcodeInfo {
        use Opcode::*;
        const V: Type = Type::Void;
        const U32: Type = Type::U32;
        const NONE: ArmFlags = ArmFlags::empty();
        const C: ArmFlags = ArmFlags::C;
        const NZC: ArmFlags = ArmFlags::NZC;
        const NZCV: ArmFlags = ArmFlags::NZCV;

        fn row(ret: Type, args: &'static [Type], read: ArmFlags, write: ArmFlags, side_effect: bool) -> OpcodeInfo {
            OpcodeInfo { ret, args, read_flags: read, default_write_flags: write, side_effect }
        }

        match self {
            ConstU32(_) => row(U32, &[], NONE, NONE, false),
            GetGPR(_) => row(U32, &[], NONE, NONE, false),
            SetGPR(_) => row(V, &[U32], NONE, NONE, true),
            PushRSBHint => row(V, &[U32], NONE, NONE, true),
            AluWritePC => row(V, &[U32], NONE, NONE, true),
            LoadWritePC => row(V, &[U32], NONE, NONE, true),
            Add => row(U32, &[U32, U32], NONE, NZCV, false),
            AddWithCarry => row(U32, &[U32, U32], C, NZCV, false),
            Sub => row(U32, &[U32, U32], NONE, NZCV, false),
            And => row(U32, &[U32, U32], NONE, NZC, false),
            Eor => row(U32, &[U32, U32], NONE, NZC, false),
            Not => row(U32, &[U32], NONE, NONE, false),
            // Shifts pass the carry through when the amount is zero.
            LogicalShiftLeft => row(U32, &[U32, U32], C, C, false),
            LogicalShiftRight => row(U32, &[U32, U32], C, C, false),
            ArithmeticShiftRight => row(U32, &[U32, U32], C, C, false),
            RotateRight => row(U32, &[U32, U32], C, C, false),
            // The default mask keeps C writable for flag-setting users;
            // operand-position uses narrow it to empty.
            RotateRightExtended => row(U32, &[U32], C, C, false),
            CountLeadingZeros => row(U32, &[U32], NONE, NONE, false),
            ClearExclusive => row(V, &[], NONE, NONE, true),
            Read32 => row(U32, &[U32], NONE, NONE, true),
        }
    }

    pub fn return_type(self) -> Type {
        self.info().ret
    }

    pub fn arg_types(self) -> &'static [Type] {
        self.info().args
    }

    pub fn num_args(self) -> usize {
        self.info().args.len()
    }

    pub fn read_flags(self) -> ArmFlags {
        self.info().read_flags
    }

    pub fn default_write_flags(self) -> ArmFlags {
        self.info().default_write_flags
    }

    /// True if the instruction has an effect beyond its result value
    /// (architectural state write, RSB push, or an observable memory
    /// access) and must survive dead-code elimination.
    pub fn has_side_effect(self) -> bool {
        self.info().side_effect
    }

    pub fn is_memory_read(self) -> bool {
        matches!(self, Opcode::Read32)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Opcode::*;
        match self {
            ConstU32(v) => write!(f, "ConstU32 #{:#x}", v),
            GetGPR(r) => write!(f, "GetGPR {}", r),
            SetGPR(r) => write!(f, "SetGPR {}", r),
            PushRSBHint => write!(f, "PushRSBHint"),
            AluWritePC => write!(f, "AluWritePC"),
            LoadWritePC => write!(f, "LoadWritePC"),
            Add => write!(f, "Add"),
            AddWithCarry => write!(f, "AddWithCarry"),
            Sub => write!(f, "Sub"),
            And => write!(f, "And"),
            Eor => write!(f, "Eor"),
            Not => write!(f, "Not"),
            LogicalShiftLeft => write!(f, "LogicalShiftLeft"),
            LogicalShiftRight => write!(f, "LogicalShiftRight"),
            ArithmeticShiftRight => write!(f, "ArithmeticShiftRight"),
            RotateRight => write!(f, "RotateRight"),
            RotateRightExtended => write!(f, "RotateRightExtended"),
            CountLeadingZeros => write!(f, "CountLeadingZeros"),
            ClearExclusive => write!(f, "ClearExclusive"),
            Read32 => write!(f, "Read32"),
        }
    }
}
