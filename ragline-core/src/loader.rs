//! Source acquisition: raw text, remote PDFs, and crawled sites.

use tracing::debug;

use crate::config::CrawlConfig;
use crate::crawl::Crawler;
use crate::document::{Source, SourceType};
use crate::error::{RaglineError, Result};

/// Resolves a [`Source`] to the full text that will be chunked and indexed.
///
/// Text sources carry their content inline. PDF and URL sources carry a URL
/// in `content`, fetched over HTTP at load time.
pub struct SourceLoader {
    client: reqwest::Client,
    crawler: Crawler,
}

impl SourceLoader {
    /// Create a new loader. URL sources crawl with the given configuration.
    pub fn new(crawl_config: CrawlConfig) -> Result<Self> {
        Ok(Self { client: reqwest::Client::new(), crawler: Crawler::new(crawl_config)? })
    }

    /// Resolve a source to its full text content.
    pub async fn load(&self, source: &Source) -> Result<String> {
        match source.source_type {
            SourceType::Text => Ok(source.content.clone()),
            SourceType::Pdf => self.load_pdf(&source.content).await,
            SourceType::Url => self.crawler.crawl(&source.content).await,
        }
    }

    async fn load_pdf(&self, url: &str) -> Result<String> {
        debug!(url, "fetching PDF");

        let response = self.client.get(url).send().await.map_err(|e| RaglineError::Fetch {
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

        let bytes = response.bytes().await.map_err(|e| RaglineError::Fetch {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        pdf_extract::extract_text_from_mem(&bytes).map_err(|e| RaglineError::Extract {
            kind: "pdf".to_string(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn text_sources_pass_content_through() {
        let loader = SourceLoader::new(CrawlConfig::default()).unwrap();
        let source = Source {
            id: "src-1".into(),
            source_type: SourceType::Text,
            content: "plain body".into(),
            name: "notes".into(),
            created_at: Utc::now(),
            is_indexed: false,
        };

        assert_eq!(loader.load(&source).await.unwrap(), "plain body");
    }
}
