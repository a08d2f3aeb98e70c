use redis::aio::ConnectionManager;
use tracing::info;

use crate::error::Result;

pub async fn create_connection_manager(url: &str) -> Result<ConnectionManager> {
    let client = redis::Client::open(url)?;
    let manager = client.get_connection_manager().await?;
    info!("Connected to Redis counter store");
    Ok(manager)
}
