#[tokio::main]
async fn main() {
    if let Err(err) = cr_api::run().await {
        tracing::error!(error = %err, "cr-api exited with an error");
        eprintln!("cr-api: {err}");
        std::process::exit(1);
    }
}
