use bitflags::bitflags;

bitflags! {
    /// Mask of ARM status flags a microinstruction reads or writes.
    ///
    /// Multiple flags can be active simultaneously (OR'd together).
    /// Analysis passes may narrow an instruction's write mask but never
    /// widen it past the opcode default.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ArmFlags: u32 {
        /// Negative.
        const N  = 1 << 0;
        /// Zero.
        const Z  = 1 << 1;
        /// Carry.
        const C  = 1 << 2;
        /// Overflow.
        const V  = 1 << 3;
        /// Sticky saturation.
        const Q  = 1 << 4;
        /// SIMD greater-or-equal lanes.
        const GE = 1 << 5;

        const NZC  = Self::N.bits() | Self::Z.bits() | Self::C.bits();
        const NZCV = Self::NZC.bits() | Self::V.bits();
        const ANY  = Self::NZCV.bits() | Self::Q.bits() | Self::GE.bits();
    }
}
