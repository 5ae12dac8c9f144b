use printshop_core::FulfillmentProvider;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const REASON_MISSING_ID: &str = "missing variant id";
pub const REASON_NOT_FOUND: &str = "variant not found";
pub const REASON_DISCONTINUED: &str = "variant discontinued";
pub const REASON_DISABLED: &str = "variant disabled";
pub const REASON_LOOKUP_ERROR: &str = "lookup error";

/// Answer to "can this variant be printed and shipped right now?"
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct VariantCheck {
    pub valid: bool,
    pub reason: Option<String>,
    /// Display name from the catalog, when the lookup succeeded
    pub name: Option<String>,
}

impl VariantCheck {
    fn ok(name: String) -> Self {
        Self { valid: true, reason: None, name: Some(name) }
    }

    fn rejected(reason: &str, name: Option<String>) -> Self {
        Self { valid: false, reason: Some(reason.to_string()), name }
    }
}

/// Confirms fulfillment variants are active before they are used.
///
/// Validation is a query: every call returns a `VariantCheck`, lookup
/// failures included.
#[derive(Clone)]
pub struct VariantValidator {
    catalog: Arc<dyn FulfillmentProvider>,
    timeout: Duration,
}

impl VariantValidator {
    pub fn new(catalog: Arc<dyn FulfillmentProvider>, timeout: Duration) -> Self {
        Self { catalog, timeout }
    }

    pub async fn validate(&self, variant_id: &str) -> VariantCheck {
        let variant_id = variant_id.trim();
        if variant_id.is_empty() {
            return VariantCheck::rejected(REASON_MISSING_ID, None);
        }

        let lookup = tokio::time::timeout(self.timeout, self.catalog.get_variant(variant_id)).await;
        let check = match lookup {
            Ok(Ok(Some(variant))) if variant.discontinued => {
                VariantCheck::rejected(REASON_DISCONTINUED, Some(variant.name))
            }
            Ok(Ok(Some(variant))) if !variant.enabled => {
                VariantCheck::rejected(REASON_DISABLED, Some(variant.name))
            }
            Ok(Ok(Some(variant))) => VariantCheck::ok(variant.name),
            Ok(Ok(None)) => VariantCheck::rejected(REASON_NOT_FOUND, None),
            Ok(Err(e)) => {
                warn!(variant_id, error = %e, "Variant lookup failed");
                VariantCheck::rejected(REASON_LOOKUP_ERROR, None)
            }
            Err(_) => {
                warn!(variant_id, timeout_ms = self.timeout.as_millis() as u64, "Variant lookup timed out");
                VariantCheck::rejected(REASON_LOOKUP_ERROR, None)
            }
        };

        debug!(variant_id, valid = check.valid, reason = ?check.reason, "Variant validated");
        check
    }

    /// Validate every id; one bad id never stops the others from being checked.
    pub async fn validate_many(&self, variant_ids: &[String]) -> HashMap<String, VariantCheck> {
        let mut results = HashMap::with_capacity(variant_ids.len());
        for id in variant_ids {
            if results.contains_key(id) {
                continue;
            }
            let check = self.validate(id).await;
            results.insert(id.clone(), check);
        }
        results
    }

    /// The subset of `variant_ids` that passed, in input order
    pub async fn filter_valid(&self, variant_ids: &[String]) -> Vec<String> {
        let results = self.validate_many(variant_ids).await;
        variant_ids
            .iter()
            .filter(|id| results.get(*id).is_some_and(|check| check.valid))
            .cloned()
            .collect()
    }
}
