use std::sync::Arc;

use rmcp::handler::server::{router::tool::ToolRouter, wrapper::Parameters};
use rmcp::model::{CallToolResult, Content, ServerCapabilities, ServerInfo};
use rmcp::{ErrorData, ServerHandler, tool, tool_handler, tool_router};
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::warn;

use crate::error::SuggestError;
use crate::product::ProductInput;
use crate::suggest::{CategorySuggester, SuggestionRequest};

// ---------------------------------------------------------------------------
// Parameter structs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SuggestCategoryParams {
    #[schemars(description = "Product name, e.g. 'USB Cable'. Must not be blank.")]
    pub name: String,
    #[schemars(description = "Optional quantity in stock, passed to the model as context")]
    pub quantity: Option<String>,
    #[schemars(
        description = "Optional unit price. Prices are bucketed in tiers of 10 for caching, e.g. 25 and 29.99 share a suggestion."
    )]
    pub price: Option<String>,
    #[schemars(
        description = "The product's current category, if any. When set, no suggestion is made."
    )]
    pub existing_category: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ValidateProductParams {
    #[schemars(description = "Product name")]
    pub name: String,
    #[schemars(description = "Quantity as entered in the form; must be a positive integer")]
    pub quantity: String,
    #[schemars(description = "Price as entered in the form; must be a positive number")]
    pub price: String,
}

// ---------------------------------------------------------------------------
// MCP Server
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct InventoryServer {
    suggester: Arc<CategorySuggester>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl InventoryServer {
    pub fn new(suggester: Arc<CategorySuggester>) -> Self {
        Self {
            suggester,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        description = "Suggest a one-word category for a product. Returns JSON {label, source} where source is 'cache', 'external_provider' or 'fallback'. Products that already have a category are left alone."
    )]
    async fn suggest_category(
        &self,
        Parameters(p): Parameters<SuggestCategoryParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let request = SuggestionRequest {
            product_name: p.name,
            quantity: p.quantity,
            price: p.price,
            existing_category: p.existing_category,
        };

        match self.suggester.suggest(request).await {
            Ok(result) => {
                let text = serde_json::to_string(&result).map_err(|e| {
                    ErrorData::internal_error(format!("JSON serialization error: {e}"), None)
                })?;
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            Err(SuggestError::InvalidInput(msg)) => Err(ErrorData::invalid_params(msg, None)),
            Err(e) if e.is_informational() => {
                Ok(CallToolResult::success(vec![Content::text(e.to_string())]))
            }
            // Provider problems go back to the agent as a tool error, not a protocol error.
            Err(e) => {
                warn!("suggest_category failed: {e}");
                Ok(CallToolResult::error(vec![Content::text(e.to_string())]))
            }
        }
    }

    #[tool(
        description = "Validate product form fields before saving. Name must be non-blank, quantity a positive integer, price a positive number."
    )]
    async fn validate_product(
        &self,
        Parameters(p): Parameters<ValidateProductParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let input = ProductInput {
            name: p.name,
            quantity: p.quantity,
            price: p.price,
        };

        let product = input.validate().map_err(|e| {
            ErrorData::invalid_params(format!("{e} (invalid {})", e.field.as_str()), None)
        })?;

        let text = serde_json::to_string(&product).map_err(|e| {
            ErrorData::internal_error(format!("JSON serialization error: {e}"), None)
        })?;

        Ok(CallToolResult::success(vec![Content::text(text)]))
    }
}

#[tool_handler]
impl ServerHandler for InventoryServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Inventory assistant. Use 'validate_product' to check product form fields \
                 and 'suggest_category' to get a category label for an uncategorized product."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
