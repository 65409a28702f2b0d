#[tokio::main]
async fn main() {
    if let Err(err) = cartography_lib::run().await {
        log::error!("{err:#}");
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
