use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

const TOKEN_PATH: &str = "/data/action/payload/token";
const TITLE_PATH: &str = "/data/title";
const PRICE_PRIMARY_PATH: &str = "/data/top_description_text";
const PRICE_SECONDARY_PATH: &str = "/data/middle_description_text";
const DISTRICT_PATH: &str = "/data/action/payload/web_info/district_persian";
const CURSOR_PATH: &str = "/data/action_log/server_side_info/info/sort_date";

/// Everything seen as of the last successful cycle, in upstream order.
pub type Snapshot = Vec<Listing>;

/// One classified ad exactly as the search API returned it.
///
/// The raw document is kept untouched so the persisted snapshot stays a
/// verbatim copy of the upstream response; the accessors below are the only
/// fields this crate reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Listing {
    raw: Value,
}

/// A required field was absent from a listing document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("listing has no `{0}` field")]
pub struct MissingField(pub &'static str);

/// The display fields of a listing, extracted once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingSummary {
    pub token: String,
    pub title: String,
    pub district: String,
    pub price_primary: String,
    pub price_secondary: String,
}

impl Listing {
    pub fn new(raw: Value) -> Self {
        Self { raw }
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Stable identifier used as the dedup key.
    pub fn token(&self) -> Option<&str> {
        self.text_at(TOKEN_PATH).filter(|t| !t.is_empty())
    }

    /// Pagination cursor attached to this record. Upstream sends it either
    /// as a string or as a bare number.
    pub fn cursor(&self) -> Option<String> {
        match self.raw.pointer(CURSOR_PATH)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Extract the fields needed for a notification.
    pub fn summary(&self) -> Result<ListingSummary, MissingField> {
        let token = self.token().ok_or(MissingField("token"))?;

        Ok(ListingSummary {
            token: token.to_string(),
            title: self.text_or(TITLE_PATH, "No Title"),
            district: self.text_or(DISTRICT_PATH, "No District"),
            price_primary: self.text_or(PRICE_PRIMARY_PATH, "No Price"),
            price_secondary: self.text_or(PRICE_SECONDARY_PATH, "No Price"),
        })
    }

    fn text_at(&self, path: &str) -> Option<&str> {
        self.raw.pointer(path).and_then(Value::as_str)
    }

    fn text_or(&self, path: &str, fallback: &str) -> String {
        self.text_at(path).unwrap_or(fallback).to_string()
    }
}

/// Build a listing document shaped like a search widget. Test helper.
#[cfg(test)]
pub fn widget(token: &str, title: &str, cursor: Option<&str>) -> Listing {
    let mut raw = serde_json::json!({
        "widget_type": "POST_ROW",
        "data": {
            "title": title,
            "top_description_text": "ودیعه ۱۰۰٬۰۰۰٬۰۰۰ تومان",
            "middle_description_text": "اجاره ۵٬۰۰۰٬۰۰۰ تومان",
            "action": {
                "type": "LOAD_PAGE",
                "payload": {
                    "token": token,
                    "web_info": { "district_persian": "ونک" }
                }
            }
        }
    });
    if let Some(cursor) = cursor {
        raw["data"]["action_log"] =
            serde_json::json!({ "server_side_info": { "info": { "sort_date": cursor } } });
    }
    Listing::new(raw)
}
