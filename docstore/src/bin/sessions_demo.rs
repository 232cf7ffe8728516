//! Sessions demo
//!
//! Five sessions take turns on one database: each waits for the lock,
//! appends `{"uid": i}` to the list and saves. The final document lists the
//! uids in the order the sessions were opened.
//!
//! Usage: `sessions_demo [ROOT]` (default: `$DOCSTORE_ROOT` or `./data`)

use docstore::{Identifier, Registry, StoreConfig};
use serde_json::json;

// One thread, so each spawned session reaches `open()` before the next is spawned
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(root) => StoreConfig::new(root),
        None => StoreConfig::from_env(),
    };
    println!("storage root: {}", config.root().display());

    let registry = std::sync::Arc::new(Registry::new(config));
    let id: Identifier = "demo.sessions".parse()?;

    // Start from an empty list so reruns print the same result
    {
        let mut handle = registry.open(&id, &json!([])).await?;
        handle.set_data(json!([]))?;
        handle.save_and_close().await?;
    }

    let mut tasks = Vec::new();
    for uid in 1..=5 {
        let registry = std::sync::Arc::clone(&registry);
        let id = id.clone();
        tasks.push(tokio::spawn(async move {
            let mut handle = registry.handle(&id, &json!([]));
            handle.open().await?;
            if let Some(list) = handle.data()?.as_array_mut() {
                list.push(json!({ "uid": uid }));
            }
            println!("{} appended uid {uid}", handle.session_id());
            handle.save_and_close().await
        }));
        // Let each session queue up before the next one is spawned
        tokio::task::yield_now().await;
    }
    for task in tasks {
        task.await??;
    }

    let handle = registry.handle(&id, &json!([]));
    println!("{}", serde_json::to_string_pretty(&*handle.read_only_view())?);
    Ok(())
}
