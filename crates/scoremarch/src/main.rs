mod audio;
mod cli;
mod inspect;
mod paths;
mod run;

use anyhow::Result;

fn main() -> Result<()> {
    let args = cli::parse();
    run::run(args)
}
