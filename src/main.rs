#[tokio::main]
async fn main() {
    if let Err(e) = carelink::run().await {
        eprintln!("carelink: {e}");
        std::process::exit(1);
    }
}
