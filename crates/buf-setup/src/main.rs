//! buf-setup CLI entry point

// The CLI reports fatal startup problems before tracing exists
#![allow(clippy::print_stderr)]

use buf_setup::tracing::{TracingConfig, init_tracing};
use buf_setup::{Cli, EXIT_FAILED, EXIT_OK, RunScope, install_panic_hook, render_error};
use clap::Parser;

fn main() {
    install_panic_hook();

    let cli = Cli::parse();
    let format = cli.log_format();
    let config = TracingConfig {
        format: format.clone(),
        level: cli.log_level().into(),
        filter: None,
    };
    if let Err(e) = init_tracing(config) {
        eprintln!("{e:?}");
        std::process::exit(EXIT_FAILED);
    }

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Fatal error: Failed to create tokio runtime: {e}");
            std::process::exit(EXIT_FAILED);
        }
    };

    let inputs = cli.inputs();
    let result = {
        let _scope = RunScope::enter();
        rt.block_on(buf_setup::run(&inputs))
    };
    let exit_code = match result {
        Ok(_) => EXIT_OK,
        Err(err) => {
            render_error(err, &format);
            EXIT_FAILED
        }
    };
    std::process::exit(exit_code);
}
