//! Submit a task to a running server and wait for its result.
//!
//! Start the server first: `cargo run --bin taskmill`

use serde_json::json;
use taskmill_client::AsyncClient;
use taskmill_core::TaskKwargs;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let client = AsyncClient::connect("127.0.0.1:5550").await?;

    let task = client
        .run_task("echo", vec![json!("hello world")], TaskKwargs::new())
        .await?;
    println!("submitted task {}", task.id);

    let done = client.wait(task.id).await?;
    println!("result: {:?} (success: {:?})", done.result, done.success);

    Ok(())
}
