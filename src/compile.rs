use std::fmt;
use std::sync::Arc;

use log::{debug, trace};

use crate::ast::{Binop, Expr, Item, Stmt};
use crate::emit::{Instr, Module, Operand};
use crate::error::{Diagnostic, Result, Side};
use crate::registry::{Name, Registry, Temp};

/// Compilation session. Holds everything that lives for the whole run: the
/// declared names, the instruction log and the temporary counter.
#[derive(Debug, Default)]
pub struct Compiler {
    registry: Registry,

    /// Stores all emitted instructions in program order.
    body: Vec<Instr>,

    /// Last temporary number handed out, explicitly or implicitly.
    last_temp: Temp,

    /// Current source line, for diagnostics.
    line: usize,
}

/// Element of an expression that is being reduced. Starts out as a copy of
/// the parsed items; groups and operations are replaced by their results
/// until a single operand is left.
#[derive(Clone, Debug, Eq, PartialEq)]
enum Piece {
    Value(Operand),
    Local(Arc<str>),
    Op(Binop),
    Open,
    Close,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile one statement. `line` is only used to label diagnostics.
    pub fn compile_line(&mut self, line: usize, stmt: Stmt) -> Result<()> {
        self.line = line;
        debug!("Line {line}: {stmt}");
        self.tr_stmt(stmt)
    }

    #[cfg(test)]
    pub(crate) fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn body(&self) -> &[Instr] {
        &self.body
    }

    pub fn finish(self, name: &str) -> Module {
        Module {
            name: name.into(),
            body: self.body,
        }
    }

    fn emit(&mut self, instr: Instr) {
        trace!("{instr}");
        self.body.push(instr);
    }

    fn alloc_temp(&mut self) -> Temp {
        let temp = self.last_temp.preincrement();
        self.registry.declare(Name::Temp(temp));
        temp
    }

    fn tr_stmt(&mut self, stmt: Stmt) -> Result<()> {
        match stmt {
            Stmt::Assign { target, value } => {
                // Storage exists before the right side is compiled, so a
                // variable may read itself on first assignment.
                if self.registry.declare(Name::Slot(target.clone())) {
                    self.emit(Instr::Alloca { slot: target.clone() });
                }

                let value = self.tr_expr(value)?;
                self.emit(Instr::Store { value, slot: target });
            },

            Stmt::Print { value } => {
                let value = self.tr_expr(value)?;
                self.emit(Instr::Print { value });

                // Skip the number taken by the call's unnamed result
                self.last_temp.preincrement();
            },
        }

        Ok(())
    }

    fn tr_expr(&mut self, expr: Expr) -> Result<Operand> {
        let pieces = expr.items.into_iter().map(Piece::from).collect();
        let result = self.reduce(pieces)?;
        self.resolve(result)
    }

    /// Collapse every parenthesised group, then fold each operator class in
    /// turn. Returns the one piece left standing, which may still be an
    /// unloaded variable.
    fn reduce(&mut self, mut pieces: Vec<Piece>) -> Result<Piece> {
        while pieces.iter().any(Piece::is_paren) {
            // The last `(` has no other `(` after it, so the group it opens
            // is innermost.
            let Some(open) = pieces.iter().rposition(|p| *p == Piece::Open) else {
                return Err(self.missing_paren(Side::Left));
            };

            let Some(len) = pieces[open ..].iter().position(|p| *p == Piece::Close) else {
                return Err(self.missing_paren(Side::Right));
            };

            let close = open + len;
            let inner = pieces[open + 1 .. close].to_vec();

            if inner.is_empty() {
                return Err(self.missing_near("("));
            }

            let value = self.reduce(inner)?;

            pieces.drain(open ..= close);
            pieces.insert(open, value);
        }

        if let Some(pair) = pieces.windows(2).find(|w| w[0].is_operand() && w[1].is_operand()) {
            return Err(self.missing_near(&pair[1].to_string()));
        }

        for op in Binop::PASSES {
            self.fold(&mut pieces, op)?;
        }

        let mut rest = pieces.into_iter();

        match (rest.next(), rest.next()) {
            (Some(piece), None) => Ok(piece),
            (Some(_), Some(extra)) => Err(self.missing_near(&extra.to_string())),
            (None, _) => Err(self.missing_near("end of line")),
        }
    }

    /// Replace every `lhs op rhs` with a fresh temporary, leftmost first.
    fn fold(&mut self, pieces: &mut Vec<Piece>, op: Binop) -> Result<()> {
        while let Some(at) = pieces.iter().position(|p| *p == Piece::Op(op)) {
            let lhs = match at.checked_sub(1).map(|i| &pieces[i]) {
                Some(piece) if piece.is_operand() => piece.clone(),
                _ => return Err(self.missing_near(&op.to_string())),
            };

            let rhs = match pieces.get(at + 1) {
                Some(piece) if piece.is_operand() => piece.clone(),
                _ => return Err(self.missing_near(&op.to_string())),
            };

            let lhs = self.resolve(lhs)?;
            let rhs = self.resolve(rhs)?;

            let dst = self.alloc_temp();
            self.emit(Instr::Binary { dst, op, lhs, rhs });

            pieces.drain(at - 1 ..= at + 1);
            pieces.insert(at - 1, Piece::Value(Operand::Temp(dst)));
        }

        Ok(())
    }

    /// Turn a piece into an instruction argument, loading source variables
    /// into a fresh temporary. Every use gets its own load.
    fn resolve(&mut self, piece: Piece) -> Result<Operand> {
        match piece {
            Piece::Value(operand) => Ok(operand),

            Piece::Local(name) => {
                if !self.registry.contains(&Name::Slot(name.clone())) {
                    return Err(Diagnostic::UndefinedVariable {
                        line: self.line,
                        name: name.to_string(),
                    });
                }

                let dst = self.alloc_temp();
                self.emit(Instr::Load { dst, slot: name });
                Ok(Operand::Temp(dst))
            },

            other => Err(self.missing_near(&other.to_string())),
        }
    }

    fn missing_paren(&self, side: Side) -> Diagnostic {
        Diagnostic::MissingParenthesis { line: self.line, side }
    }

    fn missing_near(&self, near: &str) -> Diagnostic {
        Diagnostic::MissingOperand {
            line: self.line,
            near: near.into(),
        }
    }
}

impl Piece {
    fn is_paren(&self) -> bool {
        matches!(self, Piece::Open | Piece::Close)
    }

    fn is_operand(&self) -> bool {
        matches!(self, Piece::Value(_) | Piece::Local(_))
    }
}

impl From<Item> for Piece {
    fn from(item: Item) -> Self {
        match item {
            Item::Int { value } => Piece::Value(Operand::Int(value)),
            Item::Local { name } => Piece::Local(name),
            Item::Op(op) => Piece::Op(op),
            Item::Open => Piece::Open,
            Item::Close => Piece::Close,
        }
    }
}

impl fmt::Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Piece::Value(operand) => write!(f, "{operand}"),
            Piece::Local(name) => write!(f, "{name}"),
            Piece::Op(op) => write!(f, "{op}"),
            Piece::Open => write!(f, "("),
            Piece::Close => write!(f, ")"),
        }
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use super::*;

    /// Compile `src` line by line and return the rendered instruction log.
    fn instrs(src: &str) -> Result<Vec<String>> {
        let mut compiler = Compiler::new();

        for (index, line) in src.lines().enumerate() {
            let number = index + 1;
            let stmt = crate::parse(number, line)?;
            compiler.compile_line(number, stmt)?;
        }

        Ok(compiler.body().iter().map(|i| i.to_string()).collect())
    }

    fn print(value: &str) -> String {
        format!(
            "call i32 (i8*, ...)* @printf(i8* getelementptr ([4 x i8]* @print.str, i32 0, i32 0), i32 {value} )",
        )
    }

    #[test]
    fn single_operators() {
        for (src, mnemonic) in [("6*7", "mul"), ("6/7", "sdiv"), ("6-7", "sub"), ("6+7", "add")] {
            assert_eq!(instrs(src).unwrap(), [
                format!("%1 = {mnemonic} i32 6, 7"),
                print("%1"),
            ]);
        }

        assert_eq!(instrs("a=3\nb=a*2").unwrap(), [
            "%a = alloca i32",
            "store i32 3, i32* %a",
            "%b = alloca i32",
            "%1 = load i32* %a",
            "%2 = mul i32 %1, 2",
            "store i32 %2, i32* %b",
        ]);
    }

    #[test]
    fn assign_then_print() {
        assert_eq!(instrs("x=2+3*4\nx").unwrap(), [
            "%x = alloca i32".to_string(),
            "%1 = mul i32 3, 4".into(),
            "%2 = add i32 2, %1".into(),
            "store i32 %2, i32* %x".into(),
            "%3 = load i32* %x".into(),
            print("%3"),
        ]);
    }

    #[test]
    fn groups_reduce_rightmost_first() {
        assert_eq!(instrs("y=(1+2)*(3+4)").unwrap(), [
            "%y = alloca i32",
            "%1 = add i32 3, 4",
            "%2 = add i32 1, 2",
            "%3 = mul i32 %2, %1",
            "store i32 %3, i32* %y",
        ]);
    }

    #[test]
    fn nested_groups_reduce_innermost_first() {
        assert_eq!(instrs("k=((1+2)*3)-4").unwrap(), [
            "%k = alloca i32",
            "%1 = add i32 1, 2",
            "%2 = mul i32 %1, 3",
            "%3 = sub i32 %2, 4",
            "store i32 %3, i32* %k",
        ]);
    }

    #[test]
    fn redundant_parens_emit_nothing() {
        let mut compiler = Compiler::new();
        let Ok(Stmt::Print { value }) = crate::parse(1, "(((5)))") else {
            panic!("Expected a print statement");
        };

        let pieces = value.items.into_iter().map(Piece::from).collect();
        let result = compiler.reduce(pieces).unwrap();

        assert_eq!(result, Piece::Value(Operand::Int(5)));
        assert!(compiler.body().is_empty());
    }

    #[test]
    fn precedence_passes() {
        // Multiplication is folded even though addition comes first
        assert_eq!(instrs("2+3*4").unwrap()[0], "%1 = mul i32 3, 4");

        // `*` before `/`, and `-` before `+`, each as a separate pass
        assert_eq!(instrs("8/2*4").unwrap()[.. 2], [
            "%1 = mul i32 2, 4",
            "%2 = sdiv i32 8, %1",
        ]);

        assert_eq!(instrs("5+3-2").unwrap()[.. 2], [
            "%1 = sub i32 3, 2",
            "%2 = add i32 5, %1",
        ]);

        // Same class folds left to right
        assert_eq!(instrs("9-4-1").unwrap()[.. 2], [
            "%1 = sub i32 9, 4",
            "%2 = sub i32 %1, 1",
        ]);
    }

    #[test]
    fn loads_follow_pass_order() {
        // `b` and `c` are loaded by the `*` pass before `a` is touched
        let out = instrs("a=1\nb=2\nc=3\nd=a/b*c").unwrap();

        assert_eq!(out[6 ..], [
            "%d = alloca i32",
            "%1 = load i32* %b",
            "%2 = load i32* %c",
            "%3 = mul i32 %1, %2",
            "%4 = load i32* %a",
            "%5 = sdiv i32 %4, %3",
            "store i32 %5, i32* %d",
        ]);
    }

    #[test]
    fn storage_allocated_once() {
        let out = instrs("x=1\nx=2\nx=x+1").unwrap();
        let allocas = out.iter().filter(|i| i.ends_with("alloca i32")).count();

        assert_eq!(allocas, 1);
        assert_eq!(out.iter().filter(|i| i.starts_with("store")).count(), 3);
    }

    #[test]
    fn self_reference_on_first_assignment() {
        assert_eq!(instrs("x=x+1").unwrap(), [
            "%x = alloca i32",
            "%1 = load i32* %x",
            "%2 = add i32 %1, 1",
            "store i32 %2, i32* %x",
        ]);
    }

    #[test]
    fn every_use_is_loaded() {
        let out = instrs("a=7\nb=a*a").unwrap();
        let loads = out.iter().filter(|i| i.contains("= load")).count();
        assert_eq!(loads, 2);
    }

    #[test]
    fn repeated_groups_are_compiled_separately() {
        let out = instrs("a=1\nb=(a+1)*(a+1)").unwrap();
        let adds = out.iter().filter(|i| i.contains("= add")).count();
        assert_eq!(adds, 2);
    }

    #[test]
    fn bare_values() {
        assert_eq!(instrs("42").unwrap(), [print("42")]);

        assert_eq!(instrs("q=-0+0").unwrap_err(), Diagnostic::MissingOperand {
            line: 1,
            near: "-".into(),
        });

        assert_eq!(instrs("q=(3)").unwrap(), [
            "%q = alloca i32",
            "store i32 3, i32* %q",
        ]);
    }

    #[test]
    fn literals_are_rendered_in_decimal() {
        assert_eq!(instrs("a=007\na+0012").unwrap(), [
            "%a = alloca i32".to_string(),
            "store i32 7, i32* %a".into(),
            "%1 = load i32* %a".into(),
            "%2 = add i32 %1, 12".into(),
            print("%2"),
        ]);
    }

    #[test]
    fn print_reserves_a_temp() {
        assert_eq!(instrs("1\n2+3\n4*5").unwrap(), [
            print("1"),
            "%2 = add i32 2, 3".into(),
            print("%2"),
            "%4 = mul i32 4, 5".into(),
            print("%4"),
        ]);
    }

    #[test]
    fn temps_are_unique() {
        let mut compiler = Compiler::new();
        let src = "a=(1+2)*3\nb=a-a/2\na\nb=b*(a+(b-1))\nb";

        for (index, line) in src.lines().enumerate() {
            compiler.compile_line(index + 1, crate::parse(index + 1, line).unwrap()).unwrap();
        }

        let mut seen = HashSet::new();
        let mut last = Temp(0);

        for instr in compiler.body() {
            let dst = match instr {
                Instr::Load { dst, .. } | Instr::Binary { dst, .. } => *dst,
                _ => continue,
            };

            assert!(seen.insert(dst), "{dst} defined twice");
            assert!(dst > last, "{dst} issued after {last}");
            last = dst;
        }

        let temps = compiler.registry().len() - compiler.registry().slots().count();
        assert_eq!(temps, seen.len());
    }

    #[test]
    fn undefined_variables() {
        assert_eq!(instrs("a=1\nz=undeclared+1").unwrap_err(), Diagnostic::UndefinedVariable {
            line: 2,
            name: "undeclared".into(),
        });

        assert_eq!(instrs("q").unwrap_err().exit_code(), 1);

        assert_eq!(instrs("x=3.5").unwrap_err(), Diagnostic::UndefinedVariable {
            line: 1,
            name: "3.5".into(),
        });

        // Temporaries are not addressable from source
        assert_eq!(instrs("a=1+2\nb=%1").unwrap_err(), Diagnostic::UndefinedVariable {
            line: 2,
            name: "%1".into(),
        });
    }

    #[test]
    fn missing_parens() {
        assert_eq!(instrs("w=(1+2").unwrap_err(), Diagnostic::MissingParenthesis {
            line: 1,
            side: Side::Right,
        });

        assert_eq!(instrs("w=1\nw=1+2)").unwrap_err(), Diagnostic::MissingParenthesis {
            line: 2,
            side: Side::Left,
        });

        assert_eq!(instrs("w=)1(").unwrap_err(), Diagnostic::MissingParenthesis {
            line: 1,
            side: Side::Right,
        });

        assert_eq!(instrs("w=((1)").unwrap_err().exit_code(), 2);
    }

    #[test]
    fn missing_operands() {
        let near = |src: &str| match instrs(src) {
            Err(Diagnostic::MissingOperand { near, .. }) => near,
            other => panic!("Expected a missing operand in {src:?}, got {other:?}"),
        };

        assert_eq!(near("v=+5"), "+");
        assert_eq!(near("v=5*"), "*");
        assert_eq!(near("v=2*-3"), "*");
        assert_eq!(near("v=1+(2-)"), "-");
        assert_eq!(near("v=()"), "(");
        assert_eq!(near("v=2(3)"), "3");
        assert_eq!(near("v=(1)(2)"), "2");
    }

    #[test]
    fn first_error_wins() {
        // The bad operand on line 1 is reported, not the undefined name on line 2
        let err = instrs("a=*1\nb=c").unwrap_err();
        assert_eq!(err.line(), 1);
        assert_eq!(err.exit_code(), 3);
    }
}
