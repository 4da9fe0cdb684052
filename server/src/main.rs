#[tokio::main]
async fn main() {
    pusaka::start_server().await;
}
