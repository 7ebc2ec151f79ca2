use deadkeys_engine::frameworks::server;

#[tokio::main]
async fn main() {
    if let Err(e) = server::run_with_config().await {
        eprintln!("engine exited with error: {e}");
        std::process::exit(1);
    }
}
