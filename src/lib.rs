pub mod ast;
pub mod token;
pub mod compile;
pub mod emit;
pub mod error;
pub mod registry;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use log::info;

use compile::Compiler;
use emit::Module;
use error::Diagnostic;

/// Parse one source line. All whitespace is removed first.
pub fn parse(line: usize, input: &str) -> Result<ast::Stmt, Diagnostic> {
    let text: String = input.split_whitespace().collect();

    ast::Parser {
        line,
        tokens: token::Lexer::new(&text).collect(),
    }.parse()
}

/// Compile a whole program, one line at a time. Stops at the first
/// diagnostic.
pub fn compile(name: &str, src: &str) -> Result<Module, Diagnostic> {
    let mut compiler = Compiler::new();

    for (index, input) in src.lines().enumerate() {
        let line = index + 1;
        let stmt = parse(line, input)?;
        compiler.compile_line(line, stmt)?;
    }

    Ok(compiler.finish(name))
}

/// Compile `input` and write the module to `output`, or next to the input
/// with an `.ll` extension. Returns the path written.
pub fn compile_file(input: &Path, output: Option<&Path>) -> Result<PathBuf> {
    let src = fs::read_to_string(input)
    .with_context(|| format!("Failed to read {}", input.display()))?;

    let module = compile(&module_name(input), &src)?;

    let output = match output {
        Some(path) => path.to_owned(),
        None => output_path(input),
    };

    fs::write(&output, module.to_string())
    .with_context(|| format!("Failed to write {}", output.display()))?;

    info!("Wrote {} instructions to {}", module.body.len(), output.display());

    Ok(output)
}

/// Input path with its final extension replaced by `.ll`.
pub fn output_path(input: &Path) -> PathBuf {
    input.with_extension("ll")
}

/// Module identifier for the output header, taken from the file stem.
pub fn module_name(input: &Path) -> String {
    match input.file_stem() {
        Some(stem) => stem.to_string_lossy().into_owned(),
        None => "main".into(),
    }
}

#[test]
fn compile_example() {
    let input = include_str!("../example.stm");

    let module = compile("example", input).unwrap();

    let expected = "\
; ModuleID = 'example'
declare i32 @printf(i8*, ...)
@print.str = constant [4 x i8] c\"%d\\0A\\00\"
define i32 @main() {
%x = alloca i32
%1 = mul i32 3, 4
%2 = add i32 2, %1
store i32 %2, i32* %x
%3 = load i32* %x
call i32 (i8*, ...)* @printf(i8* getelementptr ([4 x i8]* @print.str, i32 0, i32 0), i32 %3 )
%y = alloca i32
%5 = add i32 3, 4
%6 = add i32 1, 2
%7 = mul i32 %6, %5
store i32 %7, i32* %y
%8 = load i32* %y
call i32 (i8*, ...)* @printf(i8* getelementptr ([4 x i8]* @print.str, i32 0, i32 0), i32 %8 )
%z = alloca i32
%10 = load i32* %y
%11 = sdiv i32 %10, 7
%12 = load i32* %x
%13 = sub i32 %12, %11
store i32 %13, i32* %z
%14 = load i32* %z
call i32 (i8*, ...)* @printf(i8* getelementptr ([4 x i8]* @print.str, i32 0, i32 0), i32 %14 )
%16 = load i32* %x
%17 = add i32 %16, 1
%18 = load i32* %z
%19 = mul i32 %18, %17
store i32 %19, i32* %z
%20 = load i32* %z
call i32 (i8*, ...)* @printf(i8* getelementptr ([4 x i8]* @print.str, i32 0, i32 0), i32 %20 )
ret i32 0
}
";

    assert_eq!(module.to_string(), expected);
}

#[test]
fn compile_stops_at_first_error() {
    let err = compile("main", "a=1\nb=(a\nc=d").unwrap_err();

    assert_eq!(err, Diagnostic::MissingParenthesis {
        line: 2,
        side: error::Side::Right,
    });
}

#[test]
fn output_paths() {
    assert_eq!(output_path(Path::new("prog.stm")), Path::new("prog.ll"));
    assert_eq!(output_path(Path::new("dir/a.b.c")), Path::new("dir/a.b.ll"));
    assert_eq!(output_path(Path::new("noext")), Path::new("noext.ll"));

    assert_eq!(module_name(Path::new("dir/prog.stm")), "prog");
    assert_eq!(module_name(Path::new("/")), "main");
}

#[test]
fn compile_file_round_trip() {
    let dir = std::env::temp_dir().join(format!("ircalc-test-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();

    let input = dir.join("square.stm");
    fs::write(&input, "n = 9\nn * n\n").unwrap();

    let written = compile_file(&input, None).unwrap();
    assert_eq!(written, dir.join("square.ll"));

    let text = fs::read_to_string(&written).unwrap();
    assert!(text.starts_with("; ModuleID = 'square'\n"));
    assert!(text.contains("%3 = mul i32 %1, %2\n"));

    let bad = dir.join("bad.stm");
    fs::write(&bad, "x = y\n").unwrap();

    let err = compile_file(&bad, Some(&dir.join("unused.ll"))).unwrap_err();
    let diagnostic = err.downcast_ref::<Diagnostic>().unwrap();
    assert_eq!(diagnostic.exit_code(), 1);
    assert!(!dir.join("unused.ll").exists());

    fs::remove_dir_all(&dir).unwrap();
}
