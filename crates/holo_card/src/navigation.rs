//! Card activation
//!
//! A card may carry a page URL. Clicking the card, or pressing Enter or
//! Space while it has focus, resolves that URL into a [`Navigation`] which
//! the host carries out through its [`Navigator`].

use serde::Serialize;

/// Host-side navigation primitives
pub trait Navigator {
    /// Scroll the element with this id into view; `false` if it does not exist
    fn scroll_into_view(&mut self, id: &str) -> bool;

    /// Set the location hash (including the leading `#`)
    fn set_hash(&mut self, hash: &str);

    /// Navigate to a URL
    fn assign(&mut self, url: &str);
}

/// A resolved activation
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum Navigation {
    /// In-page anchor: scroll to the element, falling back to the hash
    Anchor(String),
    /// Bare `#`
    Hash(String),
    /// Any other URL
    Assign(String),
}

impl Navigation {
    /// Resolve a page URL; `None` for an empty URL
    pub fn resolve(page_url: &str) -> Option<Self> {
        if page_url.is_empty() {
            return None;
        }
        match page_url.strip_prefix('#') {
            Some("") => Some(Navigation::Hash(page_url.to_string())),
            Some(id) => Some(Navigation::Anchor(id.to_string())),
            None => Some(Navigation::Assign(page_url.to_string())),
        }
    }

    /// Carry out the navigation
    pub fn perform(&self, navigator: &mut dyn Navigator) {
        match self {
            Navigation::Anchor(id) => {
                if !navigator.scroll_into_view(id) {
                    navigator.set_hash(&format!("#{}", id));
                }
            }
            Navigation::Hash(hash) => navigator.set_hash(hash),
            Navigation::Assign(url) => navigator.assign(url),
        }
    }
}
