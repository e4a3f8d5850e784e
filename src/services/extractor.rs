// src/services/extractor.rs

//! Module extractor.
//!
//! Reads the listing page, then follows every entry to its detail page.
//! Records are produced lazily as the returned stream is polled; the first
//! error ends the stream.

use futures::stream::{self, BoxStream, StreamExt};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Config, RawModule, SiteSelectors};
use crate::utils::http::{create_async_client, fetch_text};
use crate::utils::{normalize_whitespace, resolve_url};

/// Lazy, finite sequence of raw records.
pub type RawStream<'a> = BoxStream<'a, Result<RawModule>>;

/// Source of raw module records.
pub trait Extractor: Send + Sync {
    /// Start a new pass over the source.
    fn extract(&self) -> RawStream<'_>;
}

/// Listing-page fields of one module, before its detail page is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub name: String,
    pub date: String,
    pub tags: Vec<String>,
    pub detail_url: String,
}

/// Extractor for the HTML listing site.
pub struct HtmlExtractor {
    client: Client,
    base_url: Url,
    selectors: SiteSelectors,
    max_concurrent: usize,
}

impl HtmlExtractor {
    /// Build an extractor, rejecting unparseable selectors up front.
    pub fn new(config: &Config, client: Client) -> Result<Self> {
        for (_, selector) in config.selectors.entries() {
            parse_selector(selector)?;
        }
        Ok(Self {
            client,
            base_url: Url::parse(&config.source.base_url)?,
            selectors: config.selectors.clone(),
            max_concurrent: config.crawler.max_concurrent.max(1),
        })
    }

    /// Build an extractor with its own HTTP client.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = create_async_client(&config.crawler)?;
        Self::new(config, client)
    }

    async fn fetch_listing(&self) -> Result<Vec<ListingEntry>> {
        log::debug!("Fetching listing {}", self.base_url);
        let html = fetch_text(&self.client, self.base_url.as_str())
            .await
            .map_err(|e| AppError::extraction(self.base_url.as_str(), e))?;
        parse_listing(&html, &self.selectors, &self.base_url)
    }

    async fn fetch_detail(&self, entry: ListingEntry) -> Result<RawModule> {
        log::debug!("Fetching detail for {} at {}", entry.name, entry.detail_url);
        let html = fetch_text(&self.client, &entry.detail_url)
            .await
            .map_err(|e| AppError::extraction(&entry.detail_url, e))?;
        let (description, gif) = parse_detail(&html, &self.selectors)?;

        Ok(RawModule {
            name: entry.name,
            date: entry.date,
            tags: entry.tags,
            description,
            gif,
        })
    }
}

impl Extractor for HtmlExtractor {
    fn extract(&self) -> RawStream<'_> {
        let listing = async move {
            let entries: Vec<Result<ListingEntry>> = match self.fetch_listing().await {
                Ok(entries) => entries.into_iter().map(Ok).collect(),
                Err(error) => vec![Err(error)],
            };
            stream::iter(entries)
        };

        stream::once(listing)
            .flatten()
            .map(move |entry| async move {
                match entry {
                    Ok(entry) => self.fetch_detail(entry).await,
                    Err(error) => Err(error),
                }
            })
            .buffered(self.max_concurrent)
            .boxed()
    }
}

/// Parse listing entries from the listing page.
pub fn parse_listing(
    html: &str,
    selectors: &SiteSelectors,
    base_url: &Url,
) -> Result<Vec<ListingEntry>> {
    let document = Html::parse_document(html);
    let article_sel = parse_selector(&selectors.article_selector)?;
    let name_sel = parse_selector(&selectors.name_selector)?;
    let date_sel = parse_selector(&selectors.date_selector)?;
    let tag_sel = parse_selector(&selectors.tag_selector)?;

    let mut entries = Vec::new();
    for (index, article) in document.select(&article_sel).enumerate() {
        let context = format!("listing entry #{index}");

        let name_elem = article
            .select(&name_sel)
            .next()
            .ok_or_else(|| AppError::extraction(&context, "missing name"))?;
        let name = element_text(&name_elem);
        if name.is_empty() {
            return Err(AppError::extraction(&context, "empty name"));
        }

        let href = name_elem
            .value()
            .attr(&selectors.link_attr)
            .ok_or_else(|| AppError::extraction(&name, "missing detail link"))?;

        let date = article
            .select(&date_sel)
            .next()
            .map(|el| el.text().collect::<String>())
            .ok_or_else(|| AppError::extraction(&name, "missing date"))?;

        let tags = article
            .select(&tag_sel)
            .map(|el| el.text().collect::<String>())
            .collect();

        entries.push(ListingEntry {
            detail_url: resolve_url(base_url, href),
            name,
            date,
            tags,
        });
    }

    if entries.is_empty() {
        return Err(AppError::extraction(
            base_url.as_str(),
            format!("no entries match '{}'", selectors.article_selector),
        ));
    }
    Ok(entries)
}

/// Parse `(description, gif)` from a detail page. Both may be empty.
pub fn parse_detail(html: &str, selectors: &SiteSelectors) -> Result<(String, String)> {
    let document = Html::parse_document(html);
    let description_sel = parse_selector(&selectors.description_selector)?;
    let gif_sel = parse_selector(&selectors.gif_selector)?;

    let description = document
        .select(&description_sel)
        .next()
        .map(|el| element_text(&el))
        .unwrap_or_default();
    let gif = document
        .select(&gif_sel)
        .find_map(|el| el.value().attr(&selectors.image_attr))
        .unwrap_or_default()
        .to_string();

    Ok((description, gif))
}

fn element_text(element: &ElementRef) -> String {
    normalize_whitespace(&element.text().collect::<String>())
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

#[cfg(test)]
mod tests {
    use axum::{Router, routing::get};
    use futures::TryStreamExt;

    use super::*;

    const LISTING: &str = r#"
        <html><body>
          <article>
            <h3><a href="/bar/">bar</a></h3>
            <span class="date">2018 Jan 12</span>
            <a class="category">http</a>
          </article>
          <article>
            <h3><a href="foo/">foo</a></h3>
            <span class="date">2018 Jan 5</span>
            <a class="category">CLI </a>
            <a class="category">Fs</a>
          </article>
        </body></html>
    "#;

    const DETAIL: &str = r#"
        <html><body>
          <blockquote>
            A tiny
            helper.
          </blockquote>
          <img src="/images/logo.png">
          <img src="/images/demo.gif">
        </body></html>
    "#;

    fn base() -> Url {
        Url::parse("https://example.com/").unwrap()
    }

    #[test]
    fn test_parse_listing_entries() {
        let entries = parse_listing(LISTING, &SiteSelectors::default(), &base()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[0],
            ListingEntry {
                name: "bar".to_string(),
                date: "2018 Jan 12".to_string(),
                tags: vec!["http".to_string()],
                detail_url: "https://example.com/bar/".to_string(),
            }
        );
        assert_eq!(entries[1].tags, vec!["CLI ", "Fs"]);
        assert_eq!(entries[1].detail_url, "https://example.com/foo/");
    }

    #[test]
    fn test_parse_listing_missing_date_is_error() {
        let html = r#"<article><h3><a href="/x/">x</a></h3></article>"#;
        let result = parse_listing(html, &SiteSelectors::default(), &base());
        assert!(matches!(result, Err(AppError::Extraction { .. })));
    }

    #[test]
    fn test_parse_listing_without_articles_is_error() {
        let result = parse_listing("<p>maintenance</p>", &SiteSelectors::default(), &base());
        assert!(matches!(result, Err(AppError::Extraction { .. })));
    }

    #[test]
    fn test_parse_detail() {
        let (description, gif) = parse_detail(DETAIL, &SiteSelectors::default()).unwrap();
        assert_eq!(description, "A tiny helper.");
        assert_eq!(gif, "/images/demo.gif");
    }

    #[test]
    fn test_parse_detail_allows_missing_parts() {
        let (description, gif) = parse_detail("<p></p>", &SiteSelectors::default()).unwrap();
        assert!(description.is_empty());
        assert!(gif.is_empty());
    }

    #[test]
    fn test_new_rejects_bad_selector() {
        let mut config = Config::default();
        config.selectors.date_selector = "[[invalid".to_string();
        let result = HtmlExtractor::new(&config, Client::new());
        assert!(matches!(result, Err(AppError::Selector { .. })));
    }

    async fn serve_site(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/")
    }

    #[tokio::test]
    async fn test_extract_follows_detail_pages() {
        let router = Router::new()
            .route("/", get(|| async { LISTING }))
            .route("/bar/", get(|| async { DETAIL }))
            .route("/foo/", get(|| async { "<blockquote>Foo</blockquote>" }));
        let mut config = Config::default();
        config.source.base_url = serve_site(router).await;

        let extractor = HtmlExtractor::from_config(&config).unwrap();
        let raws: Vec<RawModule> = extractor.extract().try_collect().await.unwrap();

        assert_eq!(raws.len(), 2);
        assert_eq!(raws[0].name, "bar");
        assert_eq!(raws[0].description, "A tiny helper.");
        assert_eq!(raws[0].gif, "/images/demo.gif");
        assert_eq!(raws[1].name, "foo");
        assert_eq!(raws[1].description, "Foo");
    }

    #[tokio::test]
    async fn test_extract_fails_on_missing_detail() {
        let router = Router::new()
            .route("/", get(|| async { LISTING }))
            .route("/bar/", get(|| async { DETAIL }));
        let mut config = Config::default();
        config.source.base_url = serve_site(router).await;

        let extractor = HtmlExtractor::from_config(&config).unwrap();
        let result: Result<Vec<RawModule>> = extractor.extract().try_collect().await;
        assert!(matches!(result, Err(AppError::Extraction { .. })));
    }
}
