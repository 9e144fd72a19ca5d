use crate::error::{Result, ScanError};
use crate::model::{Category, Item, Product};
use scraper::{Html, Selector};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::borrow::Cow;
use tracing::debug;

const ROOT_SELECTOR: &str = "#app";
const PAYLOAD_ATTR: &str = "data-page";
const CSRF_META_SELECTOR: &str = r#"meta[name="csrf-token"]"#;

/// Decoded page payload.
#[derive(Debug, Clone, Deserialize)]
pub struct PageDocument {
    #[serde(default)]
    pub component: Option<String>,
    #[serde(default)]
    pub props: Value,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    version: Option<Value>,
}

impl PageDocument {
    pub fn version(&self) -> Option<String> {
        match self.version.as_ref()? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Products listed in `props.products`; an absent field means no products.
    pub fn products(&self) -> Vec<Product> {
        self.props
            .get("products")
            .map(parse_lenient::<Product>)
            .unwrap_or_default()
    }

    /// Categories under `props.product.categories`, falling back to `props.categories`.
    pub fn categories(&self) -> Vec<Category> {
        self.props
            .get("product")
            .and_then(|p| p.get("categories"))
            .or_else(|| self.props.get("categories"))
            .map(parse_lenient::<Category>)
            .unwrap_or_default()
    }

    pub fn items(&self) -> ItemCollection {
        ItemCollection::resolve(&self.props)
    }
}

/// Where the item list of a subcategory page was found.
#[derive(Debug, Clone)]
pub enum ItemCollection {
    /// `props.subcategory.components`
    Nested(Vec<Item>),
    /// `props.components`
    Direct(Vec<Item>),
    Empty,
}

impl ItemCollection {
    pub fn resolve(props: &Value) -> Self {
        if let Some(list) = props
            .get("subcategory")
            .and_then(|s| s.get("components"))
            .filter(|v| v.is_array())
        {
            return ItemCollection::Nested(parse_lenient(list));
        }
        if let Some(list) = props.get("components").filter(|v| v.is_array()) {
            return ItemCollection::Direct(parse_lenient(list));
        }
        ItemCollection::Empty
    }

    pub fn items(&self) -> &[Item] {
        match self {
            ItemCollection::Nested(items) | ItemCollection::Direct(items) => items,
            ItemCollection::Empty => &[],
        }
    }

    pub fn into_items(self) -> Vec<Item> {
        match self {
            ItemCollection::Nested(items) | ItemCollection::Direct(items) => items,
            ItemCollection::Empty => Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }
}

// Skips entries that do not match the expected shape instead of failing the whole list.
fn parse_lenient<T: DeserializeOwned>(value: &Value) -> Vec<T> {
    let Some(entries) = value.as_array() else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| match serde_json::from_value::<T>(entry.clone()) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                debug!("Skipping malformed payload entry: {}", e);
                None
            }
        })
        .collect()
}

/// Locates the payload attribute and parses it, retrying once after
/// escaping raw control characters. The parser has already decoded
/// entities in the attribute, so they are not decoded again.
pub fn decode_page(markup: &str) -> Result<PageDocument> {
    let raw = extract_payload(markup)
        .ok_or_else(|| ScanError::DecodeError("no #app[data-page] payload found".to_string()))?;
    decode_payload(&raw)
}

pub fn decode_payload(raw: &str) -> Result<PageDocument> {
    match serde_json::from_str::<PageDocument>(raw) {
        Ok(doc) => Ok(doc),
        Err(first) => {
            debug!("Direct payload parse failed ({}), retrying sanitized", first);
            let sanitized = sanitize_control_chars(raw);
            serde_json::from_str::<PageDocument>(&sanitized).map_err(|e| {
                ScanError::DecodeError(format!("payload is not valid JSON: {}", e))
            })
        }
    }
}

pub fn extract_payload(markup: &str) -> Option<String> {
    let document = Html::parse_document(markup);
    let selector = Selector::parse(ROOT_SELECTOR).expect("valid root selector");
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr(PAYLOAD_ATTR))
        .map(str::to_string)
}

/// Reads the CSRF token from `<meta name="csrf-token">`.
pub fn extract_meta_token(markup: &str) -> Option<String> {
    let document = Html::parse_document(markup);
    let selector = Selector::parse(CSRF_META_SELECTOR).expect("valid meta selector");
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Escapes ASCII control characters (0x00-0x1F) that appear inside JSON
/// string literals.
///
/// Input without control characters is returned unchanged. Control
/// characters between tokens are left alone since JSON already allows the
/// whitespace ones there.
pub fn sanitize_control_chars(input: &str) -> Cow<'_, str> {
    if !input.bytes().any(|b| b < 0x20) {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len() + 16);
    let mut in_string = false;
    let mut escaped = false;

    for c in input.chars() {
        if in_string && (c as u32) < 0x20 {
            escaped = false;
            match c {
                '\u{08}' => out.push_str("\\b"),
                '\u{0C}' => out.push_str("\\f"),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                other => out.push_str(&format!("\\u{:04x}", other as u32)),
            }
            continue;
        }

        out.push(c);
        if escaped {
            escaped = false;
        } else if c == '\\' && in_string {
            escaped = true;
        } else if c == '"' {
            in_string = !in_string;
        }
    }

    Cow::Owned(out)
}
