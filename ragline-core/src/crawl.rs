//! Bounded breadth-first crawl of same-host documentation pages.

use std::collections::{HashSet, VecDeque};

use reqwest::header;
use scraper::{ElementRef, Html, Node, Selector};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::CrawlConfig;
use crate::error::{RaglineError, Result};

/// Elements whose subtrees carry page chrome rather than content.
const SKIPPED_TAGS: [&str; 7] = ["nav", "header", "footer", "script", "style", "noscript", "head"];

/// Crawls a site breadth-first from a start URL, collecting readable text.
///
/// Only http(s) links on the same host as the start URL are followed, to a
/// configurable depth, and navigation chrome is stripped from each page. The
/// collected pages are joined into a single document for chunking.
pub struct Crawler {
    client: reqwest::Client,
    config: CrawlConfig,
    link_selector: Selector,
}

impl Crawler {
    /// Create a new crawler with the given configuration.
    pub fn new(config: CrawlConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| RaglineError::Config(format!("failed to build HTTP client: {e}")))?;

        let link_selector = Selector::parse("a[href]")
            .map_err(|e| RaglineError::Config(format!("invalid link selector: {e}")))?;

        Ok(Self { client, config, link_selector })
    }

    /// Crawl from `start_url` and return the concatenated text of every
    /// reachable page.
    ///
    /// Failing to fetch the start page is an error. Pages discovered later
    /// that fail to fetch are logged and skipped, as are non-HTML responses.
    pub async fn crawl(&self, start_url: &str) -> Result<String> {
        let mut root = Url::parse(start_url).map_err(|e| RaglineError::Fetch {
            url: start_url.to_string(),
            message: format!("invalid URL: {e}"),
        })?;
        root.set_fragment(None);

        let mut visited = HashSet::new();
        visited.insert(root.to_string());

        let mut queue = VecDeque::new();
        queue.push_back((root.clone(), 0usize));

        let mut pages: Vec<String> = Vec::new();
        let mut fetched = 0usize;

        while let Some((url, depth)) = queue.pop_front() {
            let body = match self.fetch_page(&url).await {
                Ok(Some(body)) => body,
                Ok(None) => continue,
                Err(err) if fetched == 0 => return Err(err),
                Err(err) => {
                    warn!(url = %url, error = %err, "skipping unreachable page");
                    continue;
                }
            };
            fetched += 1;

            let (text, links) = parse_page(&body, &url, &self.link_selector);
            debug!(url = %url, depth, chars = text.len(), links = links.len(), "crawled page");
            if !text.is_empty() {
                pages.push(text);
            }

            if depth < self.config.max_depth {
                for link in links {
                    if self.should_follow(&link, &root) && visited.insert(link.to_string()) {
                        queue.push_back((link, depth + 1));
                    }
                }
            }
        }

        if pages.is_empty() {
            info!(url = %root, "crawl produced no text");
        }

        Ok(pages.join("\n"))
    }

    async fn fetch_page(&self, url: &Url) -> Result<Option<String>> {
        let response =
            self.client.get(url.clone()).send().await.map_err(|e| RaglineError::Fetch {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RaglineError::Fetch {
                url: url.to_string(),
                message: format!("HTTP {status}"),
            });
        }

        let content_type =
            response.headers().get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok());
        let html_like = match content_type {
            Some(ct) => ct.starts_with("text/html") || ct.starts_with("application/xhtml"),
            None => true,
        };
        if !html_like {
            debug!(url = %url, "skipping non-HTML content");
            return Ok(None);
        }

        let body = response.text().await.map_err(|e| RaglineError::Fetch {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        Ok(Some(body))
    }

    /// Whether a discovered link stays within the crawl boundary.
    fn should_follow(&self, candidate: &Url, root: &Url) -> bool {
        if candidate.scheme() != "http" && candidate.scheme() != "https" {
            return false;
        }
        if candidate.host_str() != root.host_str() {
            return false;
        }
        !self
            .config
            .excluded_paths
            .iter()
            .any(|prefix| candidate.path().starts_with(prefix.as_str()))
    }
}

/// Extract readable text and outgoing links from one HTML page.
///
/// Runs entirely synchronously; the parsed DOM never crosses an await point.
fn parse_page(html: &str, base: &Url, link_selector: &Selector) -> (String, Vec<Url>) {
    let document = Html::parse_document(html);

    let mut raw = String::new();
    collect_text(document.root_element(), &mut raw);
    let text = normalize_text(&raw);

    let mut links = Vec::new();
    for element in document.select(link_selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        if let Ok(mut url) = base.join(href) {
            url.set_fragment(None);
            links.push(url);
        }
    }

    (text, links)
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    let value = element.value();
    let tag = value.name();
    if SKIPPED_TAGS.contains(&tag) || value.classes().any(|c| c == "sidebar") {
        return;
    }

    let block = is_block(tag);
    if block {
        out.push('\n');
    }
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            collect_text(child_element, out);
        } else if let Node::Text(text) = child.value() {
            out.push_str(&text.text);
        }
    }
    if block {
        out.push('\n');
    }
}

fn is_block(tag: &str) -> bool {
    matches!(
        tag,
        "p" | "div"
            | "section"
            | "article"
            | "main"
            | "aside"
            | "li"
            | "ul"
            | "ol"
            | "table"
            | "tr"
            | "blockquote"
            | "pre"
            | "br"
            | "hr"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
    )
}

/// Collapse runs of whitespace within lines and runs of blank lines into
/// single paragraph breaks.
fn normalize_text(raw: &str) -> String {
    let mut out = String::new();
    let mut blank_pending = false;
    for line in raw.lines() {
        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            blank_pending = !out.is_empty();
            continue;
        }
        if blank_pending {
            out.push_str("\n\n");
            blank_pending = false;
        } else if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&collapsed);
    }
    out
}
