use std::fmt;

use thiserror::Error;

pub type Result<T, E = Diagnostic> = std::result::Result<T, E>;

/// A fatal problem found while compiling one line. Compilation stops at the
/// first one; the driver prints it and exits with `exit_code()`.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Diagnostic {
    #[error("Error: Line {line}: undefined variable {name}.")]
    UndefinedVariable {
        line: usize,
        name: String,
    },

    #[error("Error: Line {line}: {side} parenthesis is missing.")]
    MissingParenthesis {
        line: usize,
        side: Side,
    },

    #[error("Error: Line {line}: missing variable near {near}.")]
    MissingOperand {
        line: usize,
        near: String,
    },
}

/// Which half of a parenthesis pair could not be found.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Side {
    Left,
    Right,
}

impl Diagnostic {
    pub fn exit_code(&self) -> i32 {
        match self {
            Diagnostic::UndefinedVariable { .. } => 1,
            Diagnostic::MissingParenthesis { .. } => 2,
            Diagnostic::MissingOperand { .. } => 3,
        }
    }

    pub fn line(&self) -> usize {
        match *self {
            Diagnostic::UndefinedVariable { line, .. } |
            Diagnostic::MissingParenthesis { line, .. } |
            Diagnostic::MissingOperand { line, .. } => line,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", match self {
            Side::Left => "left",
            Side::Right => "right",
        })
    }
}

#[test]
fn messages_and_codes() {
    let undefined = Diagnostic::UndefinedVariable { line: 3, name: "q".into() };
    assert_eq!(undefined.to_string(), "Error: Line 3: undefined variable q.");
    assert_eq!(undefined.exit_code(), 1);

    let paren = Diagnostic::MissingParenthesis { line: 1, side: Side::Right };
    assert_eq!(paren.to_string(), "Error: Line 1: right parenthesis is missing.");
    assert_eq!(paren.exit_code(), 2);

    let operand = Diagnostic::MissingOperand { line: 7, near: "+".into() };
    assert_eq!(operand.to_string(), "Error: Line 7: missing variable near +.");
    assert_eq!(operand.exit_code(), 3);
    assert_eq!(operand.line(), 7);
}
