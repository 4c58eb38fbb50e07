fn main() {
    if let Err(err) = admin_reconcile::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
