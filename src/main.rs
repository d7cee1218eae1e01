#[tokio::main]
async fn main() -> anyhow::Result<()> {
    sign_recorder_lib::run().await
}
