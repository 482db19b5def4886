//! The product/company record that drives a card's text and colors.
//!
//! Records usually come from a generative model asked to answer in JSON.
//! Parsing is forgiving: missing or `null` fields fall back to placeholder
//! text, numbers are accepted where strings are expected, and
//! [`AttributeRecord::from_model_reply`] digs the JSON object out of a reply
//! wrapped in prose or Markdown fences.
//!
//! # Example
//!
//! ```
//! use stockcard::AttributeRecord;
//!
//! let reply = "```json\n{\"product_name\": \"커피\", \"ticker\": \"SBUX\", \"share_count\": 0.05}\n```";
//! let record = AttributeRecord::from_model_reply(reply).unwrap();
//! assert_eq!(record.share_count, "0.05");
//! assert_eq!(record.display_identifier(), "SBUX");
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CardError, CardResult};

pub const FALLBACK_PRODUCT: &str = "이 상품";
pub const FALLBACK_TICKER: &str = "N/A";
pub const FALLBACK_SHARES: &str = "0";
pub const FALLBACK_COMPANY: &str = "이 회사";

/// Display attributes for one card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(from = "RawRecord")]
pub struct AttributeRecord {
    pub product_name: String,
    pub ticker: String,
    /// Pre-formatted share count, displayed verbatim.
    pub share_count: String,
    pub company_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_representation_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_representation_color: Option<String>,
}

impl Default for AttributeRecord {
    fn default() -> Self {
        Self::new(FALLBACK_PRODUCT, FALLBACK_TICKER, FALLBACK_SHARES, FALLBACK_COMPANY)
    }
}

impl AttributeRecord {
    pub fn new(
        product_name: impl Into<String>,
        ticker: impl Into<String>,
        share_count: impl Into<String>,
        company_name: impl Into<String>,
    ) -> Self {
        Self {
            product_name: product_name.into(),
            ticker: ticker.into(),
            share_count: share_count.into(),
            company_name: company_name.into(),
            product_representation_color: None,
            company_representation_color: None,
        }
    }

    /// Sets the product color description.
    pub fn with_product_color(mut self, color: impl Into<String>) -> Self {
        self.product_representation_color = non_empty(color.into());
        self
    }

    /// Sets the company color description.
    pub fn with_company_color(mut self, color: impl Into<String>) -> Self {
        self.company_representation_color = non_empty(color.into());
        self
    }

    /// The name shown next to the share count.
    ///
    /// Markets with numeric tickers (e.g. `005930`) are shown by company
    /// name instead of the code.
    pub fn display_identifier(&self) -> &str {
        let numeric = !self.ticker.is_empty() && self.ticker.chars().all(|c| c.is_ascii_digit());
        if numeric {
            &self.company_name
        } else {
            &self.ticker
        }
    }

    /// Deserializes a record from a JSON object.
    pub fn from_json(json: &str) -> CardResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Extracts and parses the JSON object embedded in a model reply.
    ///
    /// Takes the text from the first `{` to the last `}`.
    pub fn from_model_reply(reply: &str) -> CardResult<Self> {
        let start = reply.find('{').ok_or(CardError::MissingJsonObject)?;
        let end = reply.rfind('}').ok_or(CardError::MissingJsonObject)?;
        if end < start {
            return Err(CardError::MissingJsonObject);
        }
        Self::from_json(&reply[start..=end])
    }

    /// Serializes the record to a JSON string.
    pub fn to_json(&self) -> CardResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}

// ============================================================================
// Lenient wire form
// ============================================================================

#[derive(Deserialize, Default)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(default)]
struct RawRecord {
    product_name: Option<Value>,
    ticker: Option<Value>,
    share_count: Option<Value>,
    company_name: Option<Value>,
    product_representation_color: Option<Value>,
    company_representation_color: Option<Value>,
}

/// Reads a scalar as display text. Objects, arrays and `null` are absent.
fn scalar_text(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

impl From<RawRecord> for AttributeRecord {
    fn from(raw: RawRecord) -> Self {
        let text = |value, fallback: &str| scalar_text(value).unwrap_or_else(|| fallback.to_string());
        Self {
            product_name: text(raw.product_name, FALLBACK_PRODUCT),
            ticker: text(raw.ticker, FALLBACK_TICKER),
            share_count: text(raw.share_count, FALLBACK_SHARES),
            company_name: text(raw.company_name, FALLBACK_COMPANY),
            product_representation_color: scalar_text(raw.product_representation_color)
                .and_then(non_empty),
            company_representation_color: scalar_text(raw.company_representation_color)
                .and_then(non_empty),
        }
    }
}
