fn main() {
    if let Err(err) = fencerun_cli::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
