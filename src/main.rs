fn main() {
    if let Err(e) = dserve_admin::app::run_cli() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
