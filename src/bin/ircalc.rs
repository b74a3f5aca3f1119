use std::fs;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};

use ircalc::error::Diagnostic;

/// Exit code for failures that are not source diagnostics, such as I/O or
/// bad arguments. Codes 1 to 3 belong to `Diagnostic`.
const EXIT_FAILURE: i32 = 4;

/// Compile a file of integer statements into LLVM-style textual IR.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Source file, one assignment or print per line.
    input: PathBuf,

    /// Write the IR here instead of next to the input with an `.ll` extension.
    #[arg(short, long, conflicts_with = "stdout")]
    output: Option<PathBuf>,

    /// Print the IR to stdout instead of writing a file.
    #[arg(long)]
    stdout: bool,

    /// More logging on stderr. Repeat for more detail.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// No logging at all.
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let result = Args::try_parse()
    .map_err(anyhow::Error::from)
    .and_then(|args| run(&args));

    let code = match result {
        Ok(()) => 0,

        Err(err) => {
            report(&err);
            exit_code(&err)
        },
    };

    process::exit(code);
}

fn run(args: &Args) -> Result<()> {
    stderrlog::new()
    .quiet(args.quiet)
    .verbosity(usize::from(args.verbose))
    .init()?;

    if args.stdout {
        let src = fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;

        let name = ircalc::module_name(&args.input);
        let module = ircalc::compile(&name, &src)?;

        print!("{module}");
    } else {
        ircalc::compile_file(&args.input, args.output.as_deref())?;
    }

    Ok(())
}

/// Diagnostics go to stdout. Clap decides where help and usage go.
fn report(err: &anyhow::Error) {
    if let Some(diagnostic) = err.downcast_ref::<Diagnostic>() {
        println!("{diagnostic}");
    } else if let Some(usage) = err.downcast_ref::<clap::Error>() {
        let _ = usage.print();
    } else {
        eprintln!("{err:#}");
    }
}

fn exit_code(err: &anyhow::Error) -> i32 {
    if let Some(diagnostic) = err.downcast_ref::<Diagnostic>() {
        return diagnostic.exit_code();
    }

    match err.downcast_ref::<clap::Error>() {
        // --help and --version
        Some(usage) if !usage.use_stderr() => 0,
        _ => EXIT_FAILURE,
    }
}

#[cfg(test)]
mod test {
    use std::path::Path;

    use super::*;

    fn arg_error(argv: &[&str]) -> anyhow::Error {
        Args::try_parse_from(argv).expect_err("Arguments should be rejected").into()
    }

    #[test]
    fn diagnostics_keep_their_codes() {
        let cases = [
            ("z=undeclared+1", 1),
            ("w=(1+2", 2),
            ("v=+5", 3),
        ];

        for (src, code) in cases {
            let err = anyhow::Error::from(ircalc::compile("main", src).unwrap_err());
            assert_eq!(exit_code(&err), code, "{src}");
        }
    }

    #[test]
    fn io_failures() {
        let err = ircalc::compile_file(Path::new("/nonexistent/ircalc/input.stm"), None).unwrap_err();
        assert_eq!(exit_code(&err), EXIT_FAILURE);
    }

    #[test]
    fn argument_errors_do_not_collide_with_diagnostics() {
        assert_eq!(exit_code(&arg_error(&["ircalc"])), EXIT_FAILURE);
        assert_eq!(exit_code(&arg_error(&["ircalc", "--bogus", "ok.stm"])), EXIT_FAILURE);
        assert_eq!(exit_code(&arg_error(&["ircalc", "a.stm", "-o", "b.ll", "--stdout"])), EXIT_FAILURE);

        assert_eq!(exit_code(&arg_error(&["ircalc", "--help"])), 0);
        assert_eq!(exit_code(&arg_error(&["ircalc", "--version"])), 0);
    }

    #[test]
    fn arguments() {
        let args = Args::try_parse_from(["ircalc", "-vv", "prog.stm", "-o", "out.ll"]).unwrap();

        assert_eq!(args.input, Path::new("prog.stm"));
        assert_eq!(args.output.as_deref(), Some(Path::new("out.ll")));
        assert_eq!(args.verbose, 2);
        assert!(!args.stdout);
        assert!(!args.quiet);
    }
}
