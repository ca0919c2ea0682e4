//! HTML to text.
//!
//! `scraper::Html` is not `Send`, so pages are reduced to an owned
//! [`PageContent`] right after the body arrives and the DOM is dropped before
//! any further await point.

use scraper::{ElementRef, Html, Node, Selector};

/// Elements whose text is never part of the visible page.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "head"];

/// Elements that start a new line of text.
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "br", "dd", "div", "dl", "dt", "footer", "h1", "h2", "h3",
    "h4", "h5", "h6", "header", "hr", "li", "main", "nav", "ol", "p", "section", "table",
    "td", "th", "tr", "ul",
];

/// Share of the page, from the end, treated as the footer when no footer markup exists.
const FOOTER_FALLBACK_SHARE: f64 = 0.2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLink {
    pub href: String,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct PageContent {
    /// All visible text, one block element per line.
    pub text: String,
    /// Text of footer markup, or the tail of `text` when the page has none.
    pub footer_text: String,
    pub links: Vec<PageLink>,
}

impl PageContent {
    pub fn from_html(html: &str) -> Self {
        let document = Html::parse_document(html);
        let text = visible_text(document.root_element());
        let footer_text = footer_text(&document).unwrap_or_else(|| tail_lines(&text));
        let links = links(&document);
        Self { text, footer_text, links }
    }
}

fn visible_text(root: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in root.descendants() {
        match node.value() {
            Node::Text(text) => {
                let hidden = node.ancestors().any(|ancestor| {
                    ancestor
                        .value()
                        .as_element()
                        .map_or(false, |el| HIDDEN_ELEMENTS.contains(&el.name()))
                });
                if !hidden {
                    out.push_str(text);
                }
            }
            Node::Element(el) if BLOCK_ELEMENTS.contains(&el.name()) => out.push('\n'),
            _ => {}
        }
    }
    out
}

fn footer_text(document: &Html) -> Option<String> {
    let mut parts = Vec::new();

    if let Ok(selector) = Selector::parse("footer") {
        parts.extend(document.select(&selector).map(visible_text));
    }

    if let Ok(selector) = Selector::parse("div, section") {
        let attr_mentions_footer = |el: &ElementRef<'_>, attr: &str| {
            el.value()
                .attr(attr)
                .map_or(false, |v| v.to_lowercase().contains("footer"))
        };

        let by_class: Vec<String> = document
            .select(&selector)
            .filter(|el| attr_mentions_footer(el, "class"))
            .map(visible_text)
            .collect();

        if by_class.is_empty() {
            parts.extend(
                document
                    .select(&selector)
                    .filter(|el| attr_mentions_footer(el, "id"))
                    .map(visible_text),
            );
        } else {
            parts.extend(by_class);
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n"))
    }
}

fn tail_lines(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let start = (lines.len() as f64 * (1.0 - FOOTER_FALLBACK_SHARE)) as usize;
    lines[start..].join("\n")
}

fn links(document: &Html) -> Vec<PageLink> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    document
        .select(&selector)
        .filter_map(|a| {
            let href = a.value().attr("href")?.trim();
            if href.is_empty() {
                return None;
            }
            let text = a.text().collect::<String>();
            Some(PageLink {
                href: href.to_string(),
                text: text.split_whitespace().collect::<Vec<_>>().join(" "),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visible_text_skips_scripts() {
        let page = PageContent::from_html(
            r#"<html><head><title>T</title><script>var kapwa = 1;</script></head>
            <body><p>Hello</p><style>.a{}</style><p>World</p></body></html>"#,
        );
        assert!(page.text.contains("Hello"));
        assert!(page.text.contains("World"));
        assert!(!page.text.contains("kapwa"));
        assert!(!page.text.contains(".a{}"));
    }

    #[test]
    fn test_block_elements_break_lines() {
        let page = PageContent::from_html("<div>123 Main Street</div><div>Austin, TX 78701</div>");
        let lines: Vec<&str> = page.text.lines().filter(|l| !l.trim().is_empty()).collect();
        assert_eq!(lines, vec!["123 Main Street", "Austin, TX 78701"]);
    }

    #[test]
    fn test_footer_element_preferred() {
        let page = PageContent::from_html(
            "<body><p>Article body</p><footer>Contact: +63 2 1234</footer></body>",
        );
        assert!(page.footer_text.contains("+63 2 1234"));
        assert!(!page.footer_text.contains("Article body"));
    }

    #[test]
    fn test_footer_class_and_id() {
        let by_class = PageContent::from_html(
            r#"<div class="site-Footer">Surrey, BC</div><div id="footer">ignored</div>"#,
        );
        assert!(by_class.footer_text.contains("Surrey, BC"));
        assert!(!by_class.footer_text.contains("ignored"));

        let by_id = PageContent::from_html(r#"<p>body</p><section id="page-footer">Lagos</section>"#);
        assert!(by_id.footer_text.contains("Lagos"));
    }

    #[test]
    fn test_footer_fallback_uses_page_tail() {
        let body: String = (0..10).map(|i| format!("<p>line {}</p>", i)).collect();
        let page = PageContent::from_html(&format!("<body>{}</body>", body));
        assert!(page.footer_text.contains("line 9"));
        assert!(!page.footer_text.contains("line 0"));
    }

    #[test]
    fn test_links_collected_with_text() {
        let page = PageContent::from_html(
            r#"<a href="/contact-us">  Get in
            touch </a><a href="">empty</a><a>no href</a>"#,
        );
        assert_eq!(
            page.links,
            vec![PageLink { href: "/contact-us".to_string(), text: "Get in touch".to_string() }]
        );
    }
}
