//! Body extraction for listing and detail pages
//!
//! The portal's markup predates anything structured, so the listing side
//! works on raw text: the page-position marker (`>1/37<` on the page that
//! carries the total) and the row links embedding `rowid` and the escaped
//! display name. Detail pages render every value into `<input>` elements,
//! which is the one place proper HTML parsing pays off.

use crate::state::AgentStub;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::BTreeMap;

/// Total page count from the positional marker; 0 when this body does not
/// carry it
pub fn page_total(body: &str) -> u32 {
    let marker = Regex::new(r">1/(\d+)<").expect("hard-coded pattern is valid");

    marker
        .captures(body)
        .and_then(|captures| captures.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

/// Rows discovered on a listing page, names still markup-escaped
pub fn listing_stubs(body: &str) -> Vec<AgentStub> {
    let row = Regex::new(r"rowid=(.+?)&s.*?acertname=(.+?)&practname")
        .expect("hard-coded pattern is valid");

    row.captures_iter(body)
        .map(|captures| AgentStub {
            uid: captures[1].to_string(),
            name: captures[2].to_string(),
        })
        .collect()
}

/// The name/value attributes of every `<input>` element in a detail body
///
/// Inputs missing either attribute are skipped. An empty map means the page
/// did not render the record, which callers treat as a suspected block.
pub fn input_fields(body: &str) -> BTreeMap<String, String> {
    let document = Html::parse_document(body);

    let Ok(selector) = Selector::parse("input") else {
        return BTreeMap::new();
    };

    document
        .select(&selector)
        .filter_map(|element| {
            let name = element.value().attr("name")?;
            let value = element.value().attr("value")?;
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}

/// Decodes HTML character entities in a display name
pub fn decode_entities(text: &str) -> String {
    Html::parse_fragment(text).root_element().text().collect()
}
