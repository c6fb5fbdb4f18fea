use clap::Parser;
use crawl_report::cli;
use tracing::error;

fn main() {
    let args = cli::Args::parse();
    if let Err(err) = cli::dispatch(args) {
        error!("{:#}", err);
        std::process::exit(1);
    }
}
