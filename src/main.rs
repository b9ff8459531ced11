use clap::Parser;

use qpace::cli::{self, Args};
use qpace::core::logging;

#[tokio::main]
async fn main() {
    let args = Args::parse();
    logging::init(args.verbose);

    if let Err(e) = cli::run(args).await {
        eprintln!("error: {e}");
        std::process::exit(i32::from(e.exit_code()));
    }
}
