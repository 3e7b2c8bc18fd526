fn main() {
    if let Err(err) = cellcheck::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
