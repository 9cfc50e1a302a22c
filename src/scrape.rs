//! Website fetching and paragraph extraction.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::time::Duration;

use support_harness_core::normalize::truncate_chars;

use crate::config::WebsiteConfig;

/// Source of the website's visible text.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch the page and return its extracted text.
    async fn fetch(&self) -> Result<String>;
}

/// Fetches the configured URL over HTTP and extracts paragraph text.
pub struct HttpPageFetcher {
    url: String,
    max_paragraphs: usize,
    max_chars: usize,
    client: reqwest::Client,
}

impl HttpPageFetcher {
    pub fn new(config: &WebsiteConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            url: config.url.clone(),
            max_paragraphs: config.max_paragraphs,
            max_chars: config.max_chars,
            client,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self) -> Result<String> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", self.url))?;
        let status = response.status();
        if !status.is_success() {
            bail!("{} returned {}", self.url, status);
        }
        let html = response.text().await?;
        Ok(extract_page_text(&html, self.max_paragraphs, self.max_chars))
    }
}

/// Text of the first `max_paragraphs` `<p>` elements joined by newlines,
/// falling back to the whole document text when no paragraph has any.
/// The result is cut to `max_chars` characters.
pub fn extract_page_text(html: &str, max_paragraphs: usize, max_chars: usize) -> String {
    let document = Html::parse_document(html);

    let mut text = match Selector::parse("p") {
        Ok(selector) => document
            .select(&selector)
            .take(max_paragraphs)
            .map(|p| p.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        Err(_) => String::new(),
    };

    if text.trim().is_empty() {
        text = fallback_text(&document);
    }

    truncate_chars(text.trim(), max_chars).to_string()
}

fn fallback_text(document: &Html) -> String {
    let root = match Selector::parse("body") {
        Ok(selector) => document.select(&selector).next(),
        Err(_) => None,
    };
    let pieces: Vec<&str> = match root {
        Some(body) => body.text().collect(),
        None => document.root_element().text().collect(),
    };
    pieces
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
