//! IR instructions and their textual rendering.

use std::fmt;
use std::sync::Arc;

use crate::ast::Binop;
use crate::registry::Temp;

/// Format string constant referenced by every print.
const PRINT_STR: &str = "@print.str";

/// A value that can appear directly as an instruction argument.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Operand {
    Int(i32),
    Temp(Temp),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Instr {
    /// Reserve storage for a source variable.
    Alloca {
        slot: Arc<str>,
    },

    Store {
        value: Operand,
        slot: Arc<str>,
    },

    Load {
        dst: Temp,
        slot: Arc<str>,
    },

    Binary {
        dst: Temp,
        op: Binop,
        lhs: Operand,
        rhs: Operand,
    },

    /// Print a value as a signed decimal followed by a newline. The call's
    /// result is unnamed, so it silently takes the next temporary number.
    Print {
        value: Operand,
    },
}

/// Finished output of one compilation: the instruction log wrapped in a
/// `main` function.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Module {
    pub name: String,
    pub body: Vec<Instr>,
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "; ModuleID = '{}'", self.name)?;
        writeln!(f, "declare i32 @printf(i8*, ...)")?;
        writeln!(f, "{PRINT_STR} = constant [4 x i8] c\"%d\\0A\\00\"")?;
        writeln!(f, "define i32 @main() {{")?;

        for instr in self.body.iter() {
            writeln!(f, "{instr}")?;
        }

        writeln!(f, "ret i32 0")?;
        writeln!(f, "}}")
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instr::Alloca { slot } => write!(f, "%{slot} = alloca i32"),

            Instr::Store { value, slot } => write!(f, "store i32 {value}, i32* %{slot}"),

            Instr::Load { dst, slot } => write!(f, "{dst} = load i32* %{slot}"),

            Instr::Binary { dst, op, lhs, rhs } => {
                let op = op.mnemonic();
                write!(f, "{dst} = {op} i32 {lhs}, {rhs}")
            },

            Instr::Print { value } => write!(
                f,
                "call i32 (i8*, ...)* @printf(i8* getelementptr ([4 x i8]* {PRINT_STR}, i32 0, i32 0), i32 {value} )",
            ),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Int(value) => write!(f, "{value}"),
            Operand::Temp(temp) => write!(f, "{temp}"),
        }
    }
}
