//! Debugging tool. Reads stdin, parses each line, and dumps to stdout.

use std::io::stdin;

use anyhow::Result;

fn main() -> Result<()> {
    let mut stmts = Vec::new();

    for (index, line) in stdin().lines().enumerate() {
        let line = line?;
        stmts.push(ircalc::parse(index + 1, &line)?);
    }

    println!("{stmts:#?}");

    Ok(())
}
