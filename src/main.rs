use clap::Parser;
use meanrev::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    cli.init_logging();
    run(cli)
}
