use std::fmt;

use crate::ir::cond::Cond;
use crate::ir::location::LocationDescriptor;

/// Terminal instruction of an IR block: describes how control leaves the
/// block after its instructions execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminal {
    /// Unset sentinel. Never present in a finished block.
    Invalid,

    /// Return control to the dispatcher (which reads current CPU state).
    ReturnToDispatch,

    /// Pop a predicted return target off the return stack buffer. On a
    /// prediction miss this behaves as `ReturnToDispatch`; a backend may
    /// implement it that way unconditionally.
    PopRSBHint,

    /// Invoke the interpreter on the instruction at `next`, then return
    /// to the dispatcher.
    Interpret { next: LocationDescriptor },

    /// Jump to the block at `next` if cycle budget remains, else return
    /// to dispatch.
    LinkBlock { next: LocationDescriptor },

    /// Unconditionally jump to the block at `next`.
    LinkBlockFast { next: LocationDescriptor },

    /// Evaluate `cond` against the live flags and pick a sub-terminal.
    If {
        cond: Cond,
        then_: Box<Terminal>,
        else_: Box<Terminal>,
    },
}

impl Terminal {
    pub fn is_invalid(&self) -> bool {
        matches!(self, Terminal::Invalid)
    }

    pub fn interpret(next: LocationDescriptor) -> Self {
        Terminal::Interpret { next }
    }

    pub fn link_block(next: LocationDescriptor) -> Self {
        Terminal::LinkBlock { next }
    }

    pub fn link_block_fast(next: LocationDescriptor) -> Self {
        Terminal::LinkBlockFast { next }
    }

    pub fn if_then_else(cond: Cond, then_: Terminal, else_: Terminal) -> Self {
        Terminal::If {
            cond,
            then_: Box::new(then_),
            else_: Box::new(else_),
        }
    }
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Terminal::Invalid => write!(f, "Invalid"),
            Terminal::ReturnToDispatch => write!(f, "ReturnToDispatch"),
            Terminal::PopRSBHint => write!(f, "PopRSBHint"),
            Terminal::Interpret { next } => write!(f, "Interpret({})", next),
            Terminal::LinkBlock { next } => write!(f, "LinkBlock({})", next),
            Terminal::LinkBlockFast { next } => write!(f, "LinkBlockFast({})", next),
            Terminal::If { cond, then_, else_ } => {
                write!(f, "If({}, {}, {})", cond, then_, else_)
            }
        }
    }
}
