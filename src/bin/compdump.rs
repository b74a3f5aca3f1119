//! Debugging tool. Reads a program from stdin, compiles, and dumps the IR to
//! stdout.

use std::io::stdin;

use anyhow::Result;

fn main() -> Result<()> {
    stderrlog::new()
    .verbosity(4usize)
    .init()?;

    let mut input = String::new();

    for line in stdin().lines() {
        let line = line?;
        input.push_str(&line);
        input.push('\n');
    }

    let compiled = ircalc::compile("main", &input)?;

    print!("{compiled}");

    Ok(())
}
