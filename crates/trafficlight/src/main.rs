mod cli;
mod control;
mod run;

use anyhow::Result;
use cli::Command;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing(cli.verbose);

    match cli.command {
        Some(Command::Simulate(args)) => run::simulate(args),
        Some(Command::CheckShaders) => run::check_shaders(),
        None => run::run(cli.run),
    }
}
