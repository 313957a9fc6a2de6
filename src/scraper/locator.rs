//! Extraction of outlet records from the store-locator page.
//!
//! The page lists every outlet as a `div.fp_listitem` holding an `<h4>` name,
//! a `div.infoboxcontent` with address and hours paragraphs, and a set of
//! navigation buttons, one of which wraps a `fa-waze` icon.

use regex::{Captures, Regex};

use crate::outlets::{Outlet, WAZE_NOT_AVAILABLE};

const UNKNOWN: &str = "Unknown";

/// Compiled patterns for one pass over a locator page.
pub struct LocatorParser {
    item_open: Regex,
    heading: Regex,
    infobox_open: Regex,
    paragraph: Regex,
    anchor: Regex,
    href: Regex,
    latitude: Regex,
    longitude: Regex,
    tag: Regex,
    entity: Regex,
    whitespace: Regex,
}

impl LocatorParser {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            item_open: Regex::new(r#"(?i)<div\b[^>]*\bclass\s*=\s*"[^"]*\bfp_listitem\b[^"]*"[^>]*>"#)?,
            heading: Regex::new(r"(?is)<h4\b[^>]*>(.*?)</h4>")?,
            infobox_open: Regex::new(
                r#"(?i)<div\b[^>]*\bclass\s*=\s*"[^"]*\binfoboxcontent\b[^"]*"[^>]*>"#,
            )?,
            paragraph: Regex::new(r"(?is)<p\b[^>]*>(.*?)</p>")?,
            anchor: Regex::new(r"(?is)<a\b([^>]*)>(.*?)</a>")?,
            href: Regex::new(r#"(?i)\bhref\s*=\s*"([^"]*)""#)?,
            latitude: Regex::new(r#"(?i)\bdata-latitude\s*=\s*"([^"]*)""#)?,
            longitude: Regex::new(r#"(?i)\bdata-longitude\s*=\s*"([^"]*)""#)?,
            tag: Regex::new(r"(?s)<[^>]*>")?,
            entity: Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);")?,
            whitespace: Regex::new(r"\s+")?,
        })
    }

    /// Outlets on the page whose address mentions `area`, in page order.
    pub fn parse(&self, html: &str, area: &str) -> Vec<Outlet> {
        let starts: Vec<_> = self.item_open.find_iter(html).collect();
        let mut outlets = Vec::new();

        for (index, open) in starts.iter().enumerate() {
            let end = starts
                .get(index + 1)
                .map(|next| next.start())
                .unwrap_or(html.len());
            let block = &html[open.end()..end];

            match self.parse_item(open.as_str(), block) {
                Some(outlet) if outlet.address.contains(area) => outlets.push(outlet),
                Some(outlet) => {
                    tracing::debug!(address = %outlet.address, "Skipping outlet outside {}", area)
                }
                None => tracing::debug!("Skipping list item {} without an address", index + 1),
            }
        }

        outlets
    }

    fn parse_item(&self, open_tag: &str, block: &str) -> Option<Outlet> {
        let name = self
            .heading
            .captures(block)
            .map(|caps| self.clean_text(&caps[1]))
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| UNKNOWN.to_string());

        let infobox = self.infobox_open.find(block)?;
        let paragraphs: Vec<String> = self
            .paragraph
            .captures_iter(&block[infobox.end()..])
            .map(|caps| self.clean_text(&caps[1]))
            .collect();

        let address = paragraphs.first().filter(|a| !a.is_empty())?.clone();

        let hours_parts: Vec<&str> = paragraphs
            .iter()
            .skip(2)
            .take(2)
            .map(String::as_str)
            .filter(|part| !part.is_empty())
            .collect();
        let operating_hours = if hours_parts.is_empty() {
            UNKNOWN.to_string()
        } else {
            hours_parts.join(" | ")
        };

        let waze_link = self
            .anchor
            .captures_iter(block)
            .find(|caps| caps[2].contains("fa-waze"))
            .and_then(|caps| self.href.captures(&caps[1]).map(|h| self.decode_entities(&h[1])))
            .filter(|href| !href.trim().is_empty())
            .unwrap_or_else(|| WAZE_NOT_AVAILABLE.to_string());

        let coordinates = self
            .coordinate(&self.latitude, open_tag)
            .zip(self.coordinate(&self.longitude, open_tag));

        Some(Outlet::new(name, address, operating_hours, waze_link).with_coordinates(coordinates))
    }

    fn coordinate(&self, pattern: &Regex, open_tag: &str) -> Option<f64> {
        pattern
            .captures(open_tag)
            .and_then(|caps| caps[1].trim().parse::<f64>().ok())
    }

    fn clean_text(&self, fragment: &str) -> String {
        let stripped = self.tag.replace_all(fragment, " ");
        let decoded = self.decode_entities(&stripped);
        self.whitespace.replace_all(decoded.trim(), " ").into_owned()
    }

    fn decode_entities(&self, text: &str) -> String {
        self.entity
            .replace_all(text, |caps: &Captures| {
                decode_entity(&caps[1]).unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}

fn decode_entity(body: &str) -> Option<String> {
    let decoded = match body {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        "ndash" => '\u{2013}',
        "rsquo" => '\u{2019}',
        _ => {
            let code = if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                body.strip_prefix('#')?.parse::<u32>().ok()?
            };
            char::from_u32(code)?
        }
    };
    Some(decoded.to_string())
}

/// Convenience wrapper compiling a fresh [`LocatorParser`].
pub fn parse_outlets(html: &str, area: &str) -> Result<Vec<Outlet>, regex::Error> {
    Ok(LocatorParser::new()?.parse(html, area))
}
