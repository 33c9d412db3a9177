use clap::Parser;

use attendant::cli::{self, Args};

fn main() {
    // dotenv::dotenv() returns Err if .env doesn't exist, which is fine
    let _ = dotenv::dotenv();
    env_logger::init();

    let args = Args::parse();
    if let Err(message) = cli::run(args) {
        eprintln!("Error: {}", message);
        std::process::exit(1);
    }
}
