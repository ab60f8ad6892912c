use beach_castle::terminal::{app, cli::Cli};
use clap::Parser;

fn main() {
    if let Err(err) = app::run(Cli::parse()) {
        eprintln!("❌ {err}");
        std::process::exit(1);
    }
}
