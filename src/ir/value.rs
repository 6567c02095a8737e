use std::fmt;

/// Index into a block's instruction arena. The block owns every
/// instruction; an `InstRef` is a lookup key, never a lifetime root,
/// so operand edges cannot form ownership cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstRef(pub u32);

impl InstRef {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for InstRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// One entry in a value's use-list: which instruction uses it, and in
/// which operand slot. For every operand edge `user.args[slot] == v`
/// the pair appears exactly once in `v`'s use-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Use {
    pub user: InstRef,
    pub slot: usize,
}
