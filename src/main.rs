fn main() {
    if let Err(err) = archroute::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
