use serde::{Deserialize, Serialize};

use crate::models::ListingSummary;

/// Defaults aimed at shared-housing posts ("roommate", "shared", ...).
pub fn default_title_keywords() -> Vec<String> {
    ["همخونه", "هم", "هم خانه", "اشتراکی"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Placeholder prices used by spam posts.
pub fn default_price_patterns() -> Vec<String> {
    vec!["۱۱۱".to_string()]
}

/// Why a listing was left out of the notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exclusion {
    TitleKeyword(String),
    SuspiciousPrice(String),
}

/// Substring-based exclusion rules over title and price text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingFilter {
    #[serde(default = "default_title_keywords")]
    pub excluded_title_keywords: Vec<String>,
    #[serde(default = "default_price_patterns")]
    pub suspicious_price_patterns: Vec<String>,
}

impl Default for ListingFilter {
    fn default() -> Self {
        Self {
            excluded_title_keywords: default_title_keywords(),
            suspicious_price_patterns: default_price_patterns(),
        }
    }
}

impl ListingFilter {
    /// The first rule that excludes this listing, if any.
    pub fn exclusion(&self, listing: &ListingSummary) -> Option<Exclusion> {
        if let Some(word) = self
            .excluded_title_keywords
            .iter()
            .find(|w| !w.is_empty() && listing.title.contains(w.as_str()))
        {
            return Some(Exclusion::TitleKeyword(word.clone()));
        }

        self.suspicious_price_patterns
            .iter()
            .find(|p| {
                !p.is_empty()
                    && (listing.price_primary.contains(p.as_str())
                        || listing.price_secondary.contains(p.as_str()))
            })
            .map(|p| Exclusion::SuspiciousPrice(p.clone()))
    }
}

/// Escape text for a Telegram HTML-mode message. Only `&`, `<` and `>`
/// are special there; quotes matter inside attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render the Telegram message (HTML parse mode) for one listing.
/// `base_url` is prefixed to the token to form the deep link.
pub fn format_message(listing: &ListingSummary, base_url: &str) -> String {
    format!(
        "🏠 <b>{title}</b>\n📍 {district}\n💵 {primary}\n💵 {secondary}\n🔗 <a href=\"{link}\">View Post</a>",
        title = escape_html(&listing.title),
        district = escape_html(&listing.district),
        primary = escape_html(&listing.price_primary),
        secondary = escape_html(&listing.price_secondary),
        link = escape_html(&format!("{base_url}{}", listing.token)),
    )
}
