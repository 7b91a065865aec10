use super::provider::{add, div, mul, sub, BinaryOp};
use std::fmt;

/// The four arithmetic resource kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorKind {
    Add,
    Sub,
    Mul,
    Div,
}

impl OperatorKind {
    pub const ALL: [OperatorKind; 4] = [
        OperatorKind::Add,
        OperatorKind::Sub,
        OperatorKind::Mul,
        OperatorKind::Div,
    ];

    pub fn type_token(self) -> &'static str {
        match self {
            OperatorKind::Add => "fixture:ops:Add",
            OperatorKind::Sub => "fixture:ops:Sub",
            OperatorKind::Mul => "fixture:ops:Mul",
            OperatorKind::Div => "fixture:ops:Div",
        }
    }

    /// Output fields in the order the provider produces them.
    pub fn output_fields(self) -> &'static [&'static str] {
        match self {
            OperatorKind::Add => &["sum"],
            OperatorKind::Sub => &["difference"],
            OperatorKind::Mul => &["product"],
            OperatorKind::Div => &["quotient", "remainder"],
        }
    }

    pub fn op(self) -> BinaryOp {
        match self {
            OperatorKind::Add => add,
            OperatorKind::Sub => sub,
            OperatorKind::Mul => mul,
            OperatorKind::Div => div,
        }
    }
}

impl fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperatorKind::Add => "Add",
            OperatorKind::Sub => "Sub",
            OperatorKind::Mul => "Mul",
            OperatorKind::Div => "Div",
        };
        f.write_str(name)
    }
}
