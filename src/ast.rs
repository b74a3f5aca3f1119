use std::{fmt, sync::Arc};

use crate::error::{Diagnostic, Result};

use super::token::*;

/// One source line. Either stores a value into a named variable or prints it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Stmt {
    Assign {
        target: Arc<str>,
        value: Expr,
    },

    Print {
        value: Expr,
    },
}

/// A flat infix expression in source order. Grouping and precedence are
/// resolved by the compiler, which reduces it in place.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Expr {
    pub items: Vec<Item>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Item {
    Int {
        value: i32,
    },

    /// Any word that is not an integer literal. Words that aren't valid
    /// identifiers are kept so they can be reported as undefined.
    Local {
        name: Arc<str>,
    },

    Op(Binop),

    Open,

    Close,
}

#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum Binop {
    Add,
    Sub,
    Div,
    Mul,
}

pub(crate) struct Parser<'src> {
    pub(crate) line: usize,
    pub(crate) tokens: Vec<Token<'src>>,
}

impl<'src> Parser<'src> {
    pub(crate) fn parse(self) -> Result<Stmt> {
        let assignments = self.tokens.iter()
        .filter(|t| t.kind == Tok::Assignment)
        .count();

        match (assignments, self.tokens.as_slice()) {
            (0, []) => Err(self.missing_near("end of line")),

            (0, tokens) => {
                let value = self.parse_expr(tokens)?;
                Ok(Stmt::Print { value })
            },

            (1, [target, assign, rest @ ..]) if assign.kind == Tok::Assignment => {
                let Tok::Ident(target) = &target.kind else {
                    return Err(self.missing_near("="));
                };

                if rest.is_empty() {
                    return Err(self.missing_near("="));
                }

                let target = target.as_str().into();
                let value = self.parse_expr(rest)?;

                Ok(Stmt::Assign { target, value })
            },

            // Stray, leading or repeated `=`
            _ => Err(self.missing_near("=")),
        }
    }

    fn parse_expr(&self, tokens: &[Token<'src>]) -> Result<Expr> {
        let items = tokens.iter().map(|tok| Ok(match &tok.kind {
            Tok::LitInt(value) => Item::Int { value: *value },

            Tok::Ident(_) | Tok::Unrecognized(_) => {
                let name = tok.content.into();
                Item::Local { name }
            },

            Tok::Plus => Item::Op(Binop::Add),
            Tok::Minus => Item::Op(Binop::Sub),
            Tok::Splat => Item::Op(Binop::Mul),
            Tok::Slash => Item::Op(Binop::Div),
            Tok::ParenOpen => Item::Open,
            Tok::ParenClose => Item::Close,

            Tok::Assignment => return Err(self.missing_near("=")),
        })).collect::<Result<Vec<_>>>()?;

        Ok(Expr { items })
    }

    fn missing_near(&self, near: &str) -> Diagnostic {
        Diagnostic::MissingOperand {
            line: self.line,
            near: near.into(),
        }
    }
}

impl Binop {
    /// Reduction order. Every operator of one class is folded before the
    /// next class is looked at, so `8/2*4` is `8/(2*4)` and `5+3-2` is
    /// `5+(3-2)`.
    pub const PASSES: [Binop; 4] = [Binop::Mul, Binop::Div, Binop::Sub, Binop::Add];

    pub fn mnemonic(self) -> &'static str {
        match self {
            Binop::Add => "add",
            Binop::Sub => "sub",
            Binop::Mul => "mul",
            Binop::Div => "sdiv",
        }
    }
}

impl fmt::Display for Binop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", match self {
            Binop::Add => "+",
            Binop::Sub => "-",
            Binop::Mul => "*",
            Binop::Div => "/",
        })
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Item::Int { value } => write!(f, "{value}"),
            Item::Local { name } => write!(f, "{name}"),
            Item::Op(op) => write!(f, "{op}"),
            Item::Open => write!(f, "("),
            Item::Close => write!(f, ")"),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for item in self.items.iter() {
            write!(f, "{item}")?;
        }

        Ok(())
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::Assign { target, value } => write!(f, "{target} = {value}"),
            Stmt::Print { value } => write!(f, "print {value}"),
        }
    }
}
