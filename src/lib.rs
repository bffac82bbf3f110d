//! FerridynDB Inventory — category suggestion and product validation,
//! shared by the MCP server and CLI.

pub mod config;
pub mod error;
pub mod llm;
pub mod product;
pub mod server;
pub mod suggest;
pub mod throttle;

use std::sync::Arc;

use tracing::info;

use crate::config::{ProviderConfig, SuggesterConfig};
use crate::llm::{CompletionProvider, OpenAiClient};
use crate::suggest::CategorySuggester;

/// Build a suggester from environment configuration.
///
/// Without `OPENAI_API_KEY` the suggester runs in rotation-only mode.
pub fn suggester_from_env() -> Result<CategorySuggester, Box<dyn std::error::Error>> {
    let config = SuggesterConfig::from_env()?;

    let provider: Option<Arc<dyn CompletionProvider>> = match ProviderConfig::from_env()? {
        Some(provider_config) => {
            info!(
                endpoint = %provider_config.endpoint,
                model = %provider_config.model,
                "category provider configured"
            );
            let client: Arc<dyn CompletionProvider> =
                Arc::new(OpenAiClient::new(provider_config)?);
            Some(client)
        }
        None => {
            info!("OPENAI_API_KEY not set, using fallback rotation only");
            None
        }
    };

    Ok(CategorySuggester::new(config, provider)?)
}
