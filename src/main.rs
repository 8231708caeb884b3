fn main() {
    if let Err(err) = ortho_connect::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
