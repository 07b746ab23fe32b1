//! Base metadata from structured data and generic meta tags
//!
//! Storefront detail pages embed schema.org JSON-LD. The first block whose
//! `@type` names an application or game supplies the base fields; a
//! `BreadcrumbList` block supplies the breadcrumb trail for genre inference.
//! Generic `<meta>`/`<title>` tags fill whatever JSON-LD left empty.

use crate::adapters::common::{parse_count, parse_rating, MetaTags};
use crate::adapters::{AppFields, ScrapedReview};
use scraper::{Html, Selector};
use serde_json::Value;

/// schema.org types describing an application listing
const APP_TYPES: &[&str] = &[
    "SoftwareApplication",
    "MobileApplication",
    "VideoGame",
    "WebApplication",
];

/// Everything the base parse takes from one page
#[derive(Debug, Clone, Default)]
pub struct PageMetadata {
    pub fields: AppFields,
    /// Breadcrumb names from the root down to the page
    pub breadcrumbs: Vec<String>,
    /// Primary image (icon) from structured data
    pub image: Option<String>,
    pub screenshots: Vec<String>,
    pub reviews: Vec<ScrapedReview>,
}

fn type_matches(node: &Value, wanted: &[&str]) -> bool {
    match node.get("@type") {
        Some(Value::String(t)) => wanted.contains(&t.as_str()),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .any(|t| wanted.contains(&t)),
        _ => false,
    }
}

/// Flattens top-level arrays and `@graph` containers into a list of nodes
fn collect_nodes<'a>(value: &'a Value, out: &mut Vec<&'a Value>) {
    match value {
        Value::Array(items) => items.iter().for_each(|item| collect_nodes(item, out)),
        Value::Object(map) => {
            out.push(value);
            if let Some(graph) = map.get("@graph") {
                collect_nodes(graph, out);
            }
        }
        _ => {}
    }
}

fn text(value: Option<&Value>) -> Option<String> {
    let s = match value? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => return items.iter().find_map(|v| text(Some(v))),
        Value::Object(map) => return text(map.get("name")),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

/// Image reference given as a string, an `ImageObject` or an array of either
fn image_urls(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        Some(Value::Object(map)) => image_urls(map.get("url").or_else(|| map.get("contentUrl"))),
        Some(Value::Array(items)) => items.iter().flat_map(|v| image_urls(Some(v))).collect(),
        _ => Vec::new(),
    }
}

fn number_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

fn review_from(node: &Value) -> Option<ScrapedReview> {
    let body = text(node.get("reviewBody").or_else(|| node.get("description")))?;
    Some(ScrapedReview {
        author: text(node.get("author")),
        rating: node
            .get("reviewRating")
            .and_then(|r| number_text(r.get("ratingValue")))
            .and_then(|v| parse_rating(&v)),
        title: text(node.get("name")),
        body,
        created_at: text(node.get("datePublished")),
    })
}

fn read_app_node(node: &Value, meta: &mut PageMetadata) {
    let fields = &mut meta.fields;
    fields.title = text(node.get("name"));
    fields.description = text(node.get("description"));

    if let Some(rating) = node.get("aggregateRating") {
        fields.rating = number_text(rating.get("ratingValue")).and_then(|v| parse_rating(&v));
        fields.ratings_count = number_text(rating.get("ratingCount"))
            .or_else(|| number_text(rating.get("reviewCount")))
            .and_then(|v| parse_count(&v));
    }

    fields.released_at = text(node.get("datePublished"));
    fields.updated_at = text(node.get("dateModified"));
    fields.category = text(node.get("applicationCategory").or_else(|| node.get("genre")));
    fields.developer = text(node.get("author").or_else(|| node.get("publisher")));

    if let Some(price) = node.get("offers").and_then(|o| number_text(o.get("price"))) {
        let free = parse_rating(&price).map(|p| p == 0.0).unwrap_or(false);
        fields.monetization = Some(if free { "free" } else { "paid" }.to_string());
    }

    meta.image = image_urls(node.get("image")).into_iter().next();
    meta.screenshots = image_urls(node.get("screenshot"));

    meta.reviews = match node.get("review") {
        Some(Value::Array(items)) => items.iter().filter_map(review_from).collect(),
        Some(single @ Value::Object(_)) => review_from(single).into_iter().collect(),
        _ => Vec::new(),
    };
}

fn breadcrumb_names(node: &Value) -> Vec<String> {
    let mut items: Vec<(i64, String)> = node
        .get("itemListElement")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .enumerate()
                .filter_map(|(i, item)| {
                    let name = text(item.get("name")).or_else(|| text(item.get("item")))?;
                    let position = item
                        .get("position")
                        .and_then(|p| p.as_i64().or_else(|| p.as_str()?.parse().ok()))
                        .unwrap_or(i as i64);
                    Some((position, name))
                })
                .collect()
        })
        .unwrap_or_default();

    items.sort_by_key(|(position, _)| *position);
    items.into_iter().map(|(_, name)| name).collect()
}

/// Parses JSON-LD blocks and meta-tag fallbacks from a detail page
pub fn extract_metadata(document: &Html) -> PageMetadata {
    let mut metadata = PageMetadata::default();

    if let Ok(selector) = Selector::parse(r#"script[type="application/ld+json"]"#) {
        let mut app_found = false;
        let mut crumbs_found = false;

        for script in document.select(&selector) {
            let raw = script.text().collect::<String>();
            let value: Value = match serde_json::from_str(raw.trim()) {
                Ok(value) => value,
                Err(e) => {
                    tracing::debug!("Skipping malformed JSON-LD block: {}", e);
                    continue;
                }
            };

            let mut nodes = Vec::new();
            collect_nodes(&value, &mut nodes);

            for node in nodes {
                if !app_found && type_matches(node, APP_TYPES) {
                    read_app_node(node, &mut metadata);
                    app_found = true;
                } else if !crumbs_found && type_matches(node, &["BreadcrumbList"]) {
                    metadata.breadcrumbs = breadcrumb_names(node);
                    crumbs_found = true;
                }
            }
        }
    }

    let meta = MetaTags::from_document(document);
    let fields = &mut metadata.fields;

    if fields.title.is_none() {
        fields.title = meta.first(&["og:title"]).or_else(|| page_title(document));
    }
    if fields.description.is_none() {
        fields.description = meta.first(&["description", "og:description"]);
    }
    if metadata.image.is_none() {
        metadata.image = meta.first(&["og:image"]).or_else(|| link_image(document));
    }

    metadata
}

fn page_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn link_image(document: &Html) -> Option<String> {
    let selector = Selector::parse(r#"link[rel="image_src"][href]"#).ok()?;
    document
        .select(&selector)
        .filter_map(|el| el.value().attr("href"))
        .map(str::to_string)
        .next()
}
