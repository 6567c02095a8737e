use std::fmt;

/// General-purpose register (R0-R15).
/// R13 = SP, R14 = LR, R15 = PC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Reg {
    R0 = 0, R1, R2, R3, R4, R5, R6, R7,
    R8, R9, R10, R11, R12, R13, R14, R15,
}

impl Reg {
    pub const SP: Reg = Reg::R13;
    pub const LR: Reg = Reg::R14;
    pub const PC: Reg = Reg::R15;

    pub fn number(self) -> usize {
        self as usize
    }

    pub fn from_u8(val: u8) -> Self {
        match val & 0xF {
            0 => Reg::R0, 1 => Reg::R1, 2 => Reg::R2, 3 => Reg::R3,
            4 => Reg::R4, 5 => Reg::R5, 6 => Reg::R6, 7 => Reg::R7,
            8 => Reg::R8, 9 => Reg::R9, 10 => Reg::R10, 11 => Reg::R11,
            12 => Reg::R12, 13 => Reg::R13, 14 => Reg::R14, 15 => Reg::R15,
            _ => unreachable!(),
        }
    }

    pub fn from_u32(val: u32) -> Self {
        Self::from_u8(val as u8)
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Reg::R13 => write!(f, "SP"),
            Reg::R14 => write!(f, "LR"),
            Reg::R15 => write!(f, "PC"),
            r => write!(f, "R{}", r as u8),
        }
    }
}

/// Bitmask of registers (bits 0-15 correspond to R0-R15).
pub type RegList = u16;

/// Shift type for data processing operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ShiftType {
    LSL = 0,
    LSR = 1,
    ASR = 2,
    ROR = 3,
}

impl ShiftType {
    pub fn from_u8(val: u8) -> Self {
        match val & 3 {
            0 => ShiftType::LSL,
            1 => ShiftType::LSR,
            2 => ShiftType::ASR,
            3 => ShiftType::ROR,
            _ => unreachable!(),
        }
    }

    pub fn from_u32(val: u32) -> Self {
        Self::from_u8(val as u8)
    }
}
