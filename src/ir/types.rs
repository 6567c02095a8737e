use std::fmt;

/// IR value types. Every microinstruction has a static return type;
/// `Void` results cannot be used as operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    Void,
    U32,
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => write!(f, "Void"),
            Type::U32 => write!(f, "U32"),
        }
    }
}
