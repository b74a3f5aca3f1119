use std::{iter::Peekable, str::Chars, fmt};

/// Splits a single line into tokens. Whitespace is insignificant in the
/// language, so callers strip it before lexing; any that remains ends up
/// inside a word.
pub(crate) struct Lexer<'a> {
    pub(crate) src: &'a str,
    pub(crate) start: usize,
    pub(crate) input: Peekable<Chars<'a>>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Token<'src> {
    pub content: &'src str,
    pub kind: Tok,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Tok {
    LitInt(i32),
    Ident(String),
    Plus,
    Minus,
    Splat,
    Slash,
    ParenOpen,
    ParenClose,
    Assignment,

    /// A word that is neither an `i32` literal nor a valid identifier, such
    /// as `3.5`, `a$b` or `99999999999`.
    Unrecognized(String),
}

impl<'src> Lexer<'src> {
    pub fn new(src: &'src str) -> Self {
        Self {
            src,
            start: 0,
            input: src.chars().peekable(),
        }
    }

    pub(crate) fn text_at(&self, start: usize) -> &'src str {
        &self.src[.. self.start][start ..]
    }

    pub(crate) fn bump(&mut self) -> Option<char> {
        let ch = self.input.next()?;
        self.start += ch.len_utf8();
        Some(ch)
    }

    pub(crate) fn bump_while(&mut self, f: impl Fn(char) -> bool) {
        while let Some(&c) = self.input.peek() {
            if f(c) {
                self.bump();
            } else {
                break;
            }
        }
    }
}

impl<'src> Iterator for Lexer<'src> {
    type Item = Token<'src>;

    fn next(&mut self) -> Option<Self::Item> {
        let offset = self.start;
        let ch = self.bump()?;

        let kind: Tok = match ch {
            '+' => Tok::Plus,

            '-' => Tok::Minus,

            '*' => Tok::Splat,

            '/' => Tok::Slash,

            '(' => Tok::ParenOpen,

            ')' => Tok::ParenClose,

            '=' => Tok::Assignment,

            _ => {
                self.bump_while(|c| !is_delimiter(c));

                let word = self.text_at(offset);

                if let Ok(int) = word.parse::<i32>() {
                    Tok::LitInt(int)
                } else if is_identifier(word) {
                    Tok::Ident(word.into())
                } else {
                    Tok::Unrecognized(word.into())
                }
            },
        };

        let content = self.text_at(offset);

        Some(Token { kind, content })
    }
}

fn is_delimiter(c: char) -> bool {
    "+-*/()=".contains(c)
}

/// Source identifiers start with a letter or underscore. The `%` sigil used
/// for temporaries can never appear in one.
pub fn is_identifier(word: &str) -> bool {
    let mut chars = word.chars();

    match chars.next() {
        Some(c) if c == '_' || c.is_alphabetic() => (),
        _ => return false,
    }

    chars.all(|c| c == '_' || c.is_alphanumeric())
}

impl fmt::Display for Tok {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tok::LitInt(i) => write!(f, "{}", i),
            Tok::Ident(w) => write!(f, "{}", w),
            Tok::Plus => write!(f, "+"),
            Tok::Minus => write!(f, "-"),
            Tok::Splat => write!(f, "*"),
            Tok::Slash => write!(f, "/"),
            Tok::ParenOpen => write!(f, "("),
            Tok::ParenClose => write!(f, ")"),
            Tok::Assignment => write!(f, "="),
            Tok::Unrecognized(u) => write!(f, "{}", u),
        }
    }
}

#[test]
fn test_tokens() {
    let src = "total=(a_1+27)*b/-3.5";

    let tokens: Vec<_> = Lexer::new(src).map(|t| t.kind).collect();

    assert_eq!(tokens.as_slice(), &[
        Tok::Ident("total".into()),
        Tok::Assignment,
        Tok::ParenOpen,
        Tok::Ident("a_1".into()),
        Tok::Plus,
        Tok::LitInt(27),
        Tok::ParenClose,
        Tok::Splat,
        Tok::Ident("b".into()),
        Tok::Slash,
        Tok::Minus,
        Tok::Unrecognized("3.5".into()),
    ]);
}

#[test]
fn test_words() {
    let kinds = |src| Lexer::new(src).map(|t| t.kind).collect::<Vec<_>>();

    assert_eq!(kinds("007"), [Tok::LitInt(7)]);
    assert_eq!(kinds("2147483647"), [Tok::LitInt(i32::MAX)]);
    assert_eq!(kinds("2147483648"), [Tok::Unrecognized("2147483648".into())]);
    assert_eq!(kinds("%1"), [Tok::Unrecognized("%1".into())]);
    assert_eq!(kinds("1x"), [Tok::Unrecognized("1x".into())]);
    assert_eq!(kinds("_x9"), [Tok::Ident("_x9".into())]);
}

#[test]
fn test_content() {
    let tokens: Vec<_> = Lexer::new("ab+012").collect();

    assert_eq!(tokens, [
        Token { content: "ab", kind: Tok::Ident("ab".into()) },
        Token { content: "+", kind: Tok::Plus },
        Token { content: "012", kind: Tok::LitInt(12) },
    ]);
}
