//! Text extraction from the engine's XML job pages and saved job configs.
//!
//! Only a handful of leaf elements are needed, so these are pulled out with
//! regular expressions rather than a full document model.

use super::types::JobPage;
use regex::{Captures, Regex};
use std::sync::LazyLock;

static SEED_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<property\s+name="textSource"\s*>.*?<value>(.*?)</value>"#)
        .expect("seed pattern")
});

/// Leaf elements only: `<name attrs>text</name>` with no child markup.
static LEAF_ELEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<([A-Za-z_][\w.-]*)(?:\s[^>]*)?>([^<]*)</([A-Za-z_][\w.-]*)\s*>")
        .expect("leaf element pattern")
});

static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(?:#([0-9]+)|#[xX]([0-9A-Fa-f]+)|(lt|gt|quot|apos|amp));").expect("entity pattern")
});

/// Resolves the predefined entities and numeric character references in one
/// pass. Unknown or out-of-range references are left as written.
fn unescape(s: &str) -> String {
    ENTITY
        .replace_all(s, |c: &Captures| {
            let decoded = if let Some(dec) = c.get(1) {
                dec.as_str().parse::<u32>().ok().and_then(char::from_u32)
            } else if let Some(hex) = c.get(2) {
                u32::from_str_radix(hex.as_str(), 16).ok().and_then(char::from_u32)
            } else {
                match c.get(3).map(|m| m.as_str()) {
                    Some("lt") => Some('<'),
                    Some("gt") => Some('>'),
                    Some("quot") => Some('"'),
                    Some("apos") => Some('\''),
                    Some("amp") => Some('&'),
                    _ => None,
                }
            };
            decoded.map_or_else(|| c[0].to_string(), String::from)
        })
        .into_owned()
}

/// Text of the first leaf `<tag>` element, trimmed. Empty elements yield `None`.
pub fn element_text(xml: &str, tag: &str) -> Option<String> {
    let body = LEAF_ELEMENT
        .captures_iter(xml)
        .find(|c| &c[1] == tag && &c[3] == tag)?
        .get(2)?;
    let text = unescape(body.as_str().trim());
    if text.is_empty() { None } else { Some(text) }
}

pub fn parse_job_page(xml: &str) -> JobPage {
    JobPage {
        status: element_text(xml, "statusDescription"),
        controller_state: element_text(xml, "crawlControllerState"),
        downloaded_count: element_text(xml, "downloadedUriCount").and_then(|v| v.parse().ok()),
    }
}

/// Seed URLs from a saved job configuration, in declaration order.
///
/// Comment lines (`#`) and blank lines inside the seed block are skipped.
pub fn parse_crawl_urls(config: &str) -> Vec<String> {
    let Some(block) = SEED_VALUE.captures(config).and_then(|c| c.get(1)) else {
        return Vec::new();
    };
    unescape(block.as_str())
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Status with all internal whitespace removed, e.g. `"Active: RUNNING"` to
/// `"Active:RUNNING"`.
pub fn compact_status(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_whitespace()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<beans>
 <bean id="seeds" class="org.archive.modules.seeds.TextSeedModule">
  <property name="textSource">
   <bean class="org.archive.spring.ConfigString">
    <property name="value">
     <value>
# URLS HERE
http://example.org/

https://example.org/docs?a=1&amp;b=2
     </value>
    </property>
   </bean>
  </property>
 </bean>
 <bean id="other"><property name="x"><value>http://not-a-seed/</value></property></bean>
</beans>"#;

    #[test]
    fn seeds_are_read_in_order_without_comments() {
        assert_eq!(
            parse_crawl_urls(CONFIG),
            vec![
                "http://example.org/".to_string(),
                "https://example.org/docs?a=1&b=2".to_string()
            ]
        );
    }

    #[test]
    fn config_without_seed_block_has_no_urls() {
        assert!(parse_crawl_urls("<beans/>").is_empty());
    }

    #[test]
    fn job_page_fields() {
        let xml = r#"<job>
  <crawlControllerState>RUNNING</crawlControllerState>
  <statusDescription>Active: RUNNING</statusDescription>
  <uriTotalsReport>
    <downloadedUriCount>42</downloadedUriCount>
    <queuedUriCount>7</queuedUriCount>
  </uriTotalsReport>
</job>"#;
        let page = parse_job_page(xml);
        assert_eq!(page.status.as_deref(), Some("Active: RUNNING"));
        assert_eq!(page.controller_state.as_deref(), Some("RUNNING"));
        assert_eq!(page.downloaded_count, Some(42));
    }

    #[test]
    fn attributes_and_empty_elements() {
        assert_eq!(
            element_text(r#"<a id="1"> x &amp; y </a>"#, "a").as_deref(),
            Some("x & y")
        );
        assert_eq!(element_text("<a></a>", "a"), None);
        assert_eq!(element_text("<ab>1</ab>", "a"), None);
    }

    #[test]
    fn numeric_character_references_are_decoded() {
        assert_eq!(
            element_text("<u>http:&#x2F;&#x2F;a&#38;b &amp;lt;</u>", "u").as_deref(),
            Some("http://a&b &lt;")
        );
        assert_eq!(element_text("<u>&#xZZ; &bogus;</u>", "u").as_deref(), Some("&#xZZ; &bogus;"));
    }

    #[test]
    fn job_page_without_count_is_rejected() {
        let page = parse_job_page("<job><statusDescription>Active: RUNNING</statusDescription></job>");
        assert_eq!(page.downloaded_count, None);
        let err = page.require_downloaded_count("J1").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidState);
        assert_eq!(page.require_status("J1").unwrap(), "Active: RUNNING");

        let page = parse_job_page("<job><downloadedUriCount>many</downloadedUriCount></job>");
        assert!(page.require_downloaded_count("J1").is_err());
        assert!(page.require_status("J1").is_err());
    }

    #[test]
    fn controller_state_stands_in_for_missing_status() {
        let page = parse_job_page(
            "<job><crawlControllerState>PAUSED</crawlControllerState><downloadedUriCount>0</downloadedUriCount></job>",
        );
        assert_eq!(page.require_status("J1").unwrap(), "PAUSED");
        assert_eq!(page.require_downloaded_count("J1").unwrap(), 0);
    }

    #[test]
    fn status_whitespace_is_stripped() {
        assert_eq!(compact_status(" Active:\n  RUNNING\t"), "Active:RUNNING");
        assert_eq!(compact_status("RUNNING"), "RUNNING");
    }
}
