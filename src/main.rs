use std::sync::Arc;

use rmcp::ServiceExt;
use rmcp::transport::stdio;

use ferridyn_inventory::server::InventoryServer;
use ferridyn_inventory::suggester_from_env;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let suggester = suggester_from_env()?;

    let server = InventoryServer::new(Arc::new(suggester));
    let service = server.serve(stdio()).await?;
    service.waiting().await?;

    Ok(())
}
