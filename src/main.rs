use argh::FromArgs;
use dssh::Interpreter;
use dssh::prompt::{Prompt, banner};
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(FromArgs)]
/// DSSH: an interactive command interpreter.
struct Options {
    #[argh(switch)]
    /// do not print the system banner on startup.
    no_banner: bool,

    #[argh(switch)]
    /// print the prompt without ANSI colors.
    no_color: bool,
}

fn main() -> ExitCode {
    // Respects RUST_LOG; quiet unless something goes wrong.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let options: Options = argh::from_env();

    if !options.no_banner {
        match banner() {
            Ok(text) => println!("{text}\n"),
            Err(e) => tracing::warn!(error = %e, "no banner"),
        }
    }

    let prompt = Prompt::new(!options.no_color);
    match Interpreter::default().repl(&prompt) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("dssh: {e}");
            ExitCode::FAILURE
        }
    }
}
