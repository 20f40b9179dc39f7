// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! SPA index document.
//!
//! In production the file is read once and kept for the process lifetime;
//! in development it is re-read on every request so front-end rebuilds show
//! up without a restart. Every response stamps the bundle references with a
//! `?v=YYYYMMDDhhmmss` query so browsers fetch fresh assets.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;

#[derive(Debug, thiserror::Error)]
#[error("index page {path} could not be read: {source}")]
pub struct IndexPageError {
    path: PathBuf,
    #[source]
    source: std::io::Error,
}

impl IndexPageError {
    /// The index file does not exist, as opposed to existing but being unreadable.
    pub fn is_not_found(&self) -> bool {
        self.source.kind() == std::io::ErrorKind::NotFound
    }
}

pub struct IndexPage {
    path: PathBuf,
    enclave_prefix: String,
    cache: Option<OnceCell<String>>,
}

impl IndexPage {
    /// `cached` keeps the first successful read for the process lifetime.
    pub fn new(path: impl Into<PathBuf>, enclave_prefix: impl Into<String>, cached: bool) -> Self {
        Self {
            path: path.into(),
            enclave_prefix: enclave_prefix.into(),
            cache: cached.then(OnceCell::new),
        }
    }

    /// Load the document and apply cache busting for the current time.
    pub async fn render(&self) -> Result<String, IndexPageError> {
        let raw = match &self.cache {
            Some(cell) => cell.get_or_try_init(|| self.read()).await?.clone(),
            None => self.read().await?,
        };
        Ok(self.bust_caches(&raw, Utc::now()))
    }

    async fn read(&self) -> Result<String, IndexPageError> {
        tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| IndexPageError {
                path: self.path.clone(),
                source,
            })
    }

    fn bust_caches(&self, page: &str, now: DateTime<Utc>) -> String {
        let version = now.format("%Y%m%d%H%M%S").to_string();
        let prefix = &self.enclave_prefix;
        let script = format!("{prefix}/resources/dist/js/bundle.src.min.js");
        let style = format!("{prefix}/resources/dist/css/bundle.css");

        [
            (
                format!(r#"<link rel="preload" as="script" href="{script}">"#),
                format!(r#"<link rel="preload" as="script" href="{script}?v={version}">"#),
            ),
            (
                format!(r#"<script src="{script}"></script>"#),
                format!(r#"<script src="{script}?v={version}"></script>"#),
            ),
            (
                format!(r#"<link rel="stylesheet" href="{style}">"#),
                format!(r#"<link rel="stylesheet" href="{style}?v={version}">"#),
            ),
        ]
        .iter()
        .fold(page.to_string(), |page, (from, to)| page.replace(from, to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;

    const PAGE: &str = r#"<html><head>
<link rel="preload" as="script" href="/enclave/acme/resources/dist/js/bundle.src.min.js">
<link rel="stylesheet" href="/enclave/acme/resources/dist/css/bundle.css">
</head><body><script src="/enclave/acme/resources/dist/js/bundle.src.min.js"></script>
<script src="/other.js"></script></body></html>"#;

    fn write_page(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn stamps_all_three_bundle_references() {
        let page = IndexPage::new("unused", "/enclave/acme", false);
        let now = Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();
        let out = page.bust_caches(PAGE, now);

        assert_eq!(out.matches("?v=20260304050607").count(), 3);
        assert!(out.contains(r#"<script src="/other.js"></script>"#));
    }

    #[test]
    fn leaves_other_enclaves_alone() {
        let page = IndexPage::new("unused", "/enclave/other", false);
        let out = page.bust_caches(PAGE, Utc::now());
        assert_eq!(out, PAGE);
    }

    #[tokio::test]
    async fn development_rereads_the_file() {
        let file = write_page("<p>first</p>");
        let page = IndexPage::new(file.path(), "/enclave/acme", false);
        assert_eq!(page.render().await.unwrap(), "<p>first</p>");

        std::fs::write(file.path(), "<p>second</p>").unwrap();
        assert_eq!(page.render().await.unwrap(), "<p>second</p>");
    }

    #[tokio::test]
    async fn production_keeps_the_first_read() {
        let file = write_page("<p>first</p>");
        let page = IndexPage::new(file.path(), "/enclave/acme", true);
        assert_eq!(page.render().await.unwrap(), "<p>first</p>");

        std::fs::write(file.path(), "<p>second</p>").unwrap();
        assert_eq!(page.render().await.unwrap(), "<p>first</p>");
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let page = IndexPage::new(dir.path().join("index.html"), "/enclave/acme", true);
        let err = page.render().await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn undecodable_file_is_not_reported_as_missing() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), [0xff, 0xfe, 0xfd]).unwrap();
        let page = IndexPage::new(file.path(), "/enclave/acme", false);

        let err = page.render().await.unwrap_err();
        assert!(!err.is_not_found());
    }
}
