#[tokio::main]
async fn main() {
    if let Err(e) = clinicnotes::run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
