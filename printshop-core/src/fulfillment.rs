use async_trait::async_trait;
use printshop_shared::Masked;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ProviderResult;

/// Recipient block, stored on the order and forwarded to the provider as-is.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ShippingAddress {
    pub name: String,
    pub address1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address2: Option<String>,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_code: Option<String>,
    pub zip: String,
    pub country_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<Masked<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<Masked<String>>,
}

/// Catalog metadata for one variant id
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogVariant {
    pub id: String,
    pub name: String,
    pub discontinued: bool,
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PrintFileType {
    Default,
    Back,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrintFile {
    pub url: String,
    #[serde(rename = "type")]
    pub file_type: PrintFileType,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StitchColor {
    White,
    Black,
}

impl StitchColor {
    /// White stitching for white-family garments, black for everything else.
    pub fn for_color(color: &str) -> Self {
        let normalized = color.trim().to_ascii_lowercase();
        let white_hex = matches!(normalized.as_str(), "#fff" | "#ffffff" | "fff" | "ffffff");
        if white_hex || normalized.contains("white") {
            StitchColor::White
        } else {
            StitchColor::Black
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemOptions {
    pub size: String,
    pub color: String,
    pub stitch_color: StitchColor,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmissionItem {
    pub variant_id: String,
    pub quantity: i32,
    pub files: Vec<PrintFile>,
    pub options: ItemOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CostBreakdown {
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub currency: String,
}

/// Everything the provider needs to manufacture and ship one local order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FulfillmentSubmission {
    pub external_id: String,
    pub recipient: ShippingAddress,
    pub items: Vec<SubmissionItem>,
    pub retail_costs: CostBreakdown,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FulfillmentOrder {
    pub id: String,
    pub status: String,
}

impl FulfillmentOrder {
    pub fn is_shipped(&self) -> bool {
        matches!(
            self.status.to_ascii_lowercase().as_str(),
            "shipped" | "fulfilled" | "partial"
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShippingLine {
    pub variant_id: String,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingRateRequest {
    pub recipient: ShippingAddress,
    pub items: Vec<ShippingLine>,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShippingRate {
    pub id: String,
    pub name: String,
    pub rate: Decimal,
    pub currency: String,
    pub min_delivery_days: Option<u32>,
    pub max_delivery_days: Option<u32>,
}

#[async_trait]
pub trait FulfillmentProvider: Send + Sync {
    /// Catalog lookup; `Ok(None)` when the provider does not know the id
    async fn get_variant(&self, variant_id: &str) -> ProviderResult<Option<CatalogVariant>>;

    async fn create_order(&self, submission: &FulfillmentSubmission) -> ProviderResult<FulfillmentOrder>;

    async fn get_order(&self, fulfillment_order_id: &str) -> ProviderResult<FulfillmentOrder>;

    async fn shipping_rates(&self, request: &ShippingRateRequest) -> ProviderResult<Vec<ShippingRate>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_stitch_color_white_family() {
        assert_eq!(StitchColor::for_color("White"), StitchColor::White);
        assert_eq!(StitchColor::for_color("white"), StitchColor::White);
        assert_eq!(StitchColor::for_color("#ffffff"), StitchColor::White);
        assert_eq!(StitchColor::for_color("#FFF"), StitchColor::White);
        assert_eq!(StitchColor::for_color("Heather White"), StitchColor::White);
    }

    #[test]
    fn test_stitch_color_others() {
        assert_eq!(StitchColor::for_color("Black"), StitchColor::Black);
        assert_eq!(StitchColor::for_color("Navy"), StitchColor::Black);
        assert_eq!(StitchColor::for_color("#fefefe"), StitchColor::Black);
        assert_eq!(StitchColor::for_color("Default"), StitchColor::Black);
    }

    #[test]
    fn test_submission_wire_shape() {
        let submission = FulfillmentSubmission {
            external_id: "ORD-100".into(),
            recipient: ShippingAddress {
                name: "Jane Doe".into(),
                address1: "1 Main St".into(),
                city: "Austin".into(),
                state_code: Some("TX".into()),
                zip: "78701".into(),
                country_code: "US".into(),
                email: Some(Masked::from("jane@example.com")),
                ..Default::default()
            },
            items: vec![SubmissionItem {
                variant_id: "4012".into(),
                quantity: 1,
                files: vec![PrintFile {
                    url: "https://cdn.example.com/d/1/front.png".into(),
                    file_type: PrintFileType::Default,
                }],
                options: ItemOptions {
                    size: "M".into(),
                    color: "Black".into(),
                    stitch_color: StitchColor::Black,
                },
            }],
            retail_costs: CostBreakdown {
                subtotal: dec!(25.00),
                shipping: dec!(4.99),
                tax: dec!(2.00),
                total: dec!(31.99),
                currency: "USD".into(),
            },
        };

        let json = serde_json::to_value(&submission).unwrap();
        assert_eq!(json["recipient"]["email"], "jane@example.com");
        assert!(json["recipient"].get("address2").is_none());
        assert_eq!(json["items"][0]["files"][0]["type"], "default");
        assert_eq!(json["items"][0]["options"]["stitch_color"], "black");
        assert_eq!(json["retail_costs"]["total"], "31.99");
    }

    #[test]
    fn test_shipped_statuses() {
        let mut order = FulfillmentOrder { id: "FUL-1".into(), status: "pending".into() };
        assert!(!order.is_shipped());
        order.status = "fulfilled".into();
        assert!(order.is_shipped());
    }
}
