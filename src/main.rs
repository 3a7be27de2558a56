//! odata4rs CLI: OData v4 services from a YAML definition.

use clap::Parser;
use odata4rs::cli::Cli;

fn main() {
    let cli = Cli::parse();
    let _logger = match odata4rs::cli::init_logging(&cli.log_level) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(2);
        }
    };
    if let Err(e) = odata4rs::cli::dispatch(cli.command) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
