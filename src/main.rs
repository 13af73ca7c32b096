use repograph::{cli, errors, logging, output, router};

fn main() {
    let cli = cli::parse();
    logging::init_tracing(cli.quiet);
    let json = cli.json;

    let code = match router::dispatch(cli) {
        Ok(()) => errors::EXIT_SUCCESS,
        Err(err) => output::format_error(&err, json),
    };
    std::process::exit(code);
}
