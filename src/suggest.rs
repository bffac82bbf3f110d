//! Category suggestion for inventory products.
//!
//! [`CategorySuggester`] turns a product name (plus optional quantity and
//! price) into a single category label:
//!
//! - **Cache**: labels are remembered per [`CacheKey`] for the life of the instance
//! - **Provider**: on a miss, a throttled single-turn completion is requested
//!   and the answer is sanitized down to one capitalized word
//! - **Fallback**: without a provider, or on provider failure under
//!   [`FailurePolicy::Fallback`], labels come from a fixed [`FallbackRotation`]

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, FailurePolicy, SuggesterConfig};
use crate::error::SuggestError;
use crate::llm::CompletionProvider;
use crate::throttle::MinInterval;

// ============================================================================
// Constants
// ============================================================================

/// Label used when the provider's answer has no usable word in it.
pub const MISC_LABEL: &str = "Misc";

const SUGGEST_SYSTEM_PROMPT: &str = "You categorize products for a small inventory system. \
Reply with exactly one category word for the product, such as Electronics, Kitchen or Stationery. \
No punctuation, no explanation.";

// ============================================================================
// Request / Result
// ============================================================================

/// Input to [`CategorySuggester::suggest`], as extracted from a product form.
#[derive(Debug, Clone, Default)]
pub struct SuggestionRequest {
    pub product_name: String,
    pub quantity: Option<String>,
    pub price: Option<String>,
    pub existing_category: Option<String>,
}

impl SuggestionRequest {
    pub fn new(product_name: impl Into<String>) -> Self {
        Self {
            product_name: product_name.into(),
            ..Default::default()
        }
    }

    pub fn with_quantity(mut self, quantity: impl Into<String>) -> Self {
        self.quantity = Some(quantity.into());
        self
    }

    pub fn with_price(mut self, price: impl Into<String>) -> Self {
        self.price = Some(price.into());
        self
    }

    pub fn with_existing_category(mut self, category: impl Into<String>) -> Self {
        self.existing_category = Some(category.into());
        self
    }
}

/// Where a suggested label came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionSource {
    Cache,
    ExternalProvider,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuggestionResult {
    pub label: String,
    pub source: SuggestionSource,
}

// ============================================================================
// Cache key
// ============================================================================

/// Cache key: lower-cased product name plus a coarse price tier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    name: String,
    tier: i64,
}

impl CacheKey {
    pub fn new(product_name: &str, price: Option<&str>) -> Self {
        Self {
            name: product_name.trim().to_lowercase(),
            tier: price_tier(price),
        }
    }

    pub fn tier(&self) -> i64 {
        self.tier
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.tier)
    }
}

/// `floor(price / 10)`, or 0 when the price is missing, unparsable or negative.
pub fn price_tier(price: Option<&str>) -> i64 {
    price
        .and_then(|p| p.trim().parse::<f64>().ok())
        .filter(|p| p.is_finite() && *p >= 0.0)
        .map(|p| (p / 10.0).floor() as i64)
        .unwrap_or(0)
}

// ============================================================================
// Sanitization
// ============================================================================

/// Reduce a raw completion to one capitalized word.
///
/// Takes the first run of letters, digits and hyphens that starts with a
/// letter or digit, drops trailing hyphens, and capitalizes it. Returns
/// [`MISC_LABEL`] when nothing usable is found.
pub fn sanitize_label(raw: &str) -> String {
    let token: String = raw
        .chars()
        .skip_while(|c| !c.is_alphanumeric())
        .take_while(|c| c.is_alphanumeric() || *c == '-')
        .collect();
    let token = token.trim_end_matches('-');

    let mut chars = token.chars();
    match chars.next() {
        None => MISC_LABEL.to_string(),
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
    }
}

/// Build the user message sent to the provider.
fn build_prompt(request: &SuggestionRequest) -> String {
    let mut prompt = format!("Product: {}", request.product_name.trim());
    if let Some(quantity) = non_blank(request.quantity.as_deref()) {
        prompt.push_str(&format!("\nQuantity: {quantity}"));
    }
    if let Some(price) = non_blank(request.price.as_deref()) {
        prompt.push_str(&format!("\nPrice: {price}"));
    }
    prompt.push_str("\nCategory:");
    prompt
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

// ============================================================================
// Fallback rotation
// ============================================================================

/// Fixed cyclic list of default labels.
#[derive(Debug, Clone)]
pub struct FallbackRotation {
    labels: Vec<String>,
    cursor: usize,
}

impl FallbackRotation {
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyFallback`] if `labels` is empty.
    pub fn new(labels: Vec<String>) -> Result<Self, ConfigError> {
        if labels.is_empty() {
            return Err(ConfigError::EmptyFallback);
        }
        Ok(Self { labels, cursor: 0 })
    }

    /// Return the label at the cursor and advance it.
    pub fn next_label(&mut self) -> String {
        let label = self.labels[self.cursor].clone();
        self.cursor = (self.cursor + 1) % self.labels.len();
        label
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

// ============================================================================
// Suggester
// ============================================================================

struct SuggesterState {
    cache: HashMap<CacheKey, String>,
    rotation: FallbackRotation,
}

/// Resolves category labels for products.
///
/// Safe to share behind an `Arc`. Cache and rotation sit under one lock that
/// is never held across the provider call.
pub struct CategorySuggester {
    provider: Option<Arc<dyn CompletionProvider>>,
    policy: FailurePolicy,
    state: Mutex<SuggesterState>,
    throttle: Mutex<MinInterval>,
}

impl CategorySuggester {
    /// Create a suggester. `provider: None` selects rotation-only mode.
    pub fn new(
        config: SuggesterConfig,
        provider: Option<Arc<dyn CompletionProvider>>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            provider,
            policy: config.failure_policy,
            state: Mutex::new(SuggesterState {
                cache: HashMap::new(),
                rotation: FallbackRotation::new(config.fallback_labels)?,
            }),
            throttle: Mutex::new(MinInterval::new(config.min_interval)),
        })
    }

    /// True when a completion provider is configured.
    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// Suggest a category for the product described by `request`.
    ///
    /// # Errors
    ///
    /// - [`SuggestError::InvalidInput`] if the product name is blank
    /// - [`SuggestError::AlreadyCategorized`] if the product has a category
    /// - [`SuggestError::RateLimited`], [`SuggestError::AuthError`] or
    ///   [`SuggestError::ProviderError`] when the provider fails under
    ///   [`FailurePolicy::Surface`]
    pub async fn suggest(
        &self,
        request: SuggestionRequest,
    ) -> Result<SuggestionResult, SuggestError> {
        let name = request.product_name.trim();
        if name.is_empty() {
            return Err(SuggestError::InvalidInput(
                "product name is required".to_string(),
            ));
        }
        if let Some(category) = non_blank(request.existing_category.as_deref()) {
            return Err(SuggestError::AlreadyCategorized(category.to_string()));
        }

        let Some(provider) = self.provider.as_ref() else {
            return Ok(self.fallback().await);
        };

        let key = CacheKey::new(name, request.price.as_deref());
        if let Some(label) = self.state.lock().await.cache.get(&key) {
            debug!(key = %key, label = %label, "category cache hit");
            return Ok(SuggestionResult {
                label: label.clone(),
                source: SuggestionSource::Cache,
            });
        }

        self.throttle.lock().await.acquire().await;

        let prompt = build_prompt(&request);
        match provider.complete(SUGGEST_SYSTEM_PROMPT, &prompt).await {
            Ok(completion) => {
                let label = sanitize_label(&completion.text);
                info!(key = %key, label = %label, "provider suggested category");
                self.state
                    .lock()
                    .await
                    .cache
                    .insert(key, label.clone());
                Ok(SuggestionResult {
                    label,
                    source: SuggestionSource::ExternalProvider,
                })
            }
            Err(e) => {
                warn!(key = %key, "category provider failed: {e}");
                match self.policy {
                    FailurePolicy::Surface => Err(e.into()),
                    FailurePolicy::Fallback => Ok(self.fallback().await),
                }
            }
        }
    }

    /// Cached label for a key, if any.
    pub async fn cached(&self, key: &CacheKey) -> Option<String> {
        self.state.lock().await.cache.get(key).cloned()
    }

    pub async fn cache_len(&self) -> usize {
        self.state.lock().await.cache.len()
    }

    /// Current rotation cursor.
    pub async fn rotation_cursor(&self) -> usize {
        self.state.lock().await.rotation.cursor()
    }

    async fn fallback(&self) -> SuggestionResult {
        let label = self.state.lock().await.rotation.next_label();
        debug!(label = %label, "using fallback category");
        SuggestionResult {
            label,
            source: SuggestionSource::Fallback,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
