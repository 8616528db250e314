fn main() {
    if let Err(error) = nodal_cli::run() {
        tracing::error!(%error, "nodal failed");
        std::process::exit(1);
    }
}
