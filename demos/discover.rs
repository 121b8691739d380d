use std::sync::Arc;

use core_endpoint::{CoreClient, HickoryTxtResolver, JsonFileStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let store = Arc::new(JsonFileStore::new("core-endpoint-state.json"));
    let client = CoreClient::from_env(store)?
        .with_resolver(Arc::new(HickoryTxtResolver::from_system_conf()?));

    let endpoint = client.initialize().await?;
    println!("using core endpoint {endpoint}");

    let config = client.core_config().await?;
    println!("{} {:?}", config.status, config.body);

    Ok(())
}
