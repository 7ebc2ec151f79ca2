// One-shot engine bootstrap shared by the integration test binaries.

use std::sync::OnceLock;
use std::time::Duration;

static BASE_URL: OnceLock<String> = OnceLock::new();

/// Starts the engine once on an ephemeral port and returns its base URL.
/// Every test in the process talks to the same instance, so tests must use
/// unique match ids.
pub fn ensure_server() -> &'static str {
    BASE_URL.get_or_init(|| {
        let (addr_tx, addr_rx) = std::sync::mpsc::channel();

        // A dedicated OS thread with its own runtime keeps the engine alive
        // across the per-test tokio runtimes.
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("test runtime");
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind ephemeral test port");
                let addr = listener.local_addr().expect("local addr");
                addr_tx.send(addr).expect("publish bound address");
                deadkeys_engine::run(listener).await.expect("engine failed");
            });
        });

        let addr = addr_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("engine published its address");
        await_accepting(&addr.to_string());
        format!("http://{addr}")
    })
}

// The bound port can briefly refuse connections between bind and accept.
fn await_accepting(addr: &str) {
    for _ in 0..100 {
        if std::net::TcpStream::connect(addr).is_ok() {
            return;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    panic!("engine never became ready at {addr}");
}
