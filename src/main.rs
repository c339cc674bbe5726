use beatmenu::cli::CliOverrides;
use beatmenu::run_with_overrides;

fn main() {
    let cli_overrides = match CliOverrides::parse_from_env() {
        Ok(parsed) => parsed,
        Err(err) => {
            eprintln!("[cli] {err}");
            std::process::exit(2);
        }
    };
    if let Err(err) = run_with_overrides(cli_overrides) {
        eprintln!("Application error: {err:?}");
        std::process::exit(1);
    }
}
