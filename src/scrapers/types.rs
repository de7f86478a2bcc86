use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const SERVER_PAYLOAD_TYPE: &str = "type.googleapis.com/widgets.SearchData.ServerPayload";
const PAGINATION_TYPE: &str = "type.googleapis.com/post_list.PaginationData";

/// Search filters sent with every request, fixed at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchFilters {
    /// City identifiers to search in
    pub city_ids: Vec<String>,
    /// Listing category, e.g. `apartment-rent`
    pub category: String,
    /// District identifiers; empty means the whole city
    pub districts: Vec<String>,
    /// Maximum monthly rent
    pub max_rent: Option<u64>,
    /// Maximum deposit
    pub max_credit: Option<u64>,
    /// Sort key, `sort_date` gives most-recent-first
    pub sort: String,
}

impl Default for SearchFilters {
    fn default() -> Self {
        Self {
            city_ids: vec!["1".to_string()],
            category: "apartment-rent".to_string(),
            districts: Vec::new(),
            max_rent: None,
            max_credit: None,
            sort: "sort_date".to_string(),
        }
    }
}

impl SearchFilters {
    /// Build the request body for one page. `page` starts at 1; the cursor
    /// is only attached from the second page onward.
    pub fn payload(&self, cursor: Option<&str>, page: u32) -> Value {
        let mut data = serde_json::Map::new();

        if let Some(max) = self.max_rent {
            data.insert("rent".into(), json!({ "number_range": { "maximum": max } }));
        }
        if let Some(max) = self.max_credit {
            data.insert("credit".into(), json!({ "number_range": { "maximum": max } }));
        }
        if !self.districts.is_empty() {
            data.insert(
                "districts".into(),
                json!({ "repeated_string": { "value": self.districts } }),
            );
        }
        data.insert("category".into(), json!({ "str": { "value": self.category } }));

        let mut payload = json!({
            "city_ids": self.city_ids,
            "source_view": "FILTER",
            "search_data": {
                "form_data": { "data": data },
                "server_payload": {
                    "@type": SERVER_PAYLOAD_TYPE,
                    "additional_form_data": {
                        "data": { "sort": { "str": { "value": self.sort } } }
                    }
                }
            }
        });

        if let Some(cursor) = cursor {
            payload["pagination_data"] = json!({
                "@type": PAGINATION_TYPE,
                "last_post_date": cursor,
                "page": page,
                "layer_page": page,
            });
        }

        payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filters() -> SearchFilters {
        SearchFilters {
            districts: vec!["925".into(), "173".into()],
            max_rent: Some(12_000_000),
            max_credit: Some(200_000_000),
            ..SearchFilters::default()
        }
    }

    #[test]
    fn test_first_page_payload() {
        let payload = filters().payload(None, 1);

        assert_eq!(payload["city_ids"], json!(["1"]));
        let data = &payload["search_data"]["form_data"]["data"];
        assert_eq!(data["rent"]["number_range"]["maximum"], json!(12_000_000));
        assert_eq!(data["credit"]["number_range"]["maximum"], json!(200_000_000));
        assert_eq!(data["districts"]["repeated_string"]["value"], json!(["925", "173"]));
        assert_eq!(data["category"]["str"]["value"], json!("apartment-rent"));
        assert_eq!(
            payload["search_data"]["server_payload"]["additional_form_data"]["data"]["sort"]["str"]
                ["value"],
            json!("sort_date")
        );
        assert!(payload.get("pagination_data").is_none());
    }

    #[test]
    fn test_cursor_payload() {
        let payload = filters().payload(Some("1718000000000000"), 2);

        assert_eq!(
            payload["pagination_data"]["last_post_date"],
            json!("1718000000000000")
        );
        assert_eq!(payload["pagination_data"]["page"], json!(2));
    }

    #[test]
    fn test_optional_filters_omitted() {
        let payload = SearchFilters::default().payload(None, 1);
        let data = &payload["search_data"]["form_data"]["data"];

        assert!(data.get("rent").is_none());
        assert!(data.get("credit").is_none());
        assert!(data.get("districts").is_none());
    }
}
