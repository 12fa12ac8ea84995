#[tokio::main]
async fn main() {
    let code = ddq::app::startup::startup().await;
    std::process::exit(code);
}
