//! Bibliographic metadata sources and the transport they run on.
//!
//! This crate provides:
//! - [`RequestExecutor`] / [`HttpExecutor`]: the injected outbound HTTP seam
//! - [`TextCompletion`] / [`ChatCompletionClient`]: the generative text seam
//! - [`adapters`]: one adapter per source, each mapping its wire format into a
//!   canonical [`Record`]
//! - [`Provider`]: the closed set of adapters the resolver iterates over

pub mod adapters;
pub mod completion;
pub mod normalize;
pub mod transport;

use std::sync::Arc;

use bibresolve_shared::{BibError, EndpointsConfig, Record, Result};

pub use adapters::{
    ArticleFetcher, Bnb, Crossref, GoogleBooks, LibraryOfCongress, OclcClassify, OpenBd,
    OpenLibrary, VideoOembed,
};
pub use completion::{ChatCompletionClient, TextCompletion};
pub use normalize::{default_summary, has_default_summary};
pub use transport::{HttpExecutor, HttpRequest, HttpResponse, Method, RequestExecutor};

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// Every metadata source the resolver knows about.
///
/// Variants that lack a lookup capability answer it with
/// [`BibError::Unsupported`].
pub enum Provider {
    OpenLibrary(OpenLibrary),
    GoogleBooks(GoogleBooks),
    Crossref(Crossref),
    OclcClassify(OclcClassify),
    Bnb(Bnb),
    OpenBd(OpenBd),
    LibraryOfCongress(LibraryOfCongress),
    Video(VideoOembed),
    Article(ArticleFetcher),
}

impl Provider {
    /// Stable short name, recorded in attempt traces.
    pub fn name(&self) -> &'static str {
        match self {
            Self::OpenLibrary(_) => "openlibrary",
            Self::GoogleBooks(_) => "googlebooks",
            Self::Crossref(_) => "crossref",
            Self::OclcClassify(_) => "oclc",
            Self::Bnb(_) => "bnb",
            Self::OpenBd(_) => "openbd",
            Self::LibraryOfCongress(_) => "loc",
            Self::Video(_) => "video",
            Self::Article(_) => "article",
        }
    }

    pub async fn lookup_isbn(&self, isbn: &str) -> Result<Record> {
        match self {
            Self::OpenLibrary(p) => p.lookup_isbn(isbn).await,
            Self::GoogleBooks(p) => p.lookup_isbn(isbn).await,
            Self::Crossref(p) => p.lookup_isbn(isbn).await,
            Self::OclcClassify(p) => p.lookup_isbn(isbn).await,
            Self::Bnb(p) => p.lookup_isbn(isbn).await,
            Self::OpenBd(p) => p.lookup_isbn(isbn).await,
            Self::LibraryOfCongress(p) => p.lookup_isbn(isbn).await,
            Self::Video(_) | Self::Article(_) => Err(self.unsupported("ISBN")),
        }
    }

    pub async fn lookup_title_author(&self, title: &str, author: &str) -> Result<Record> {
        match self {
            Self::OpenLibrary(p) => p.lookup_title_author(title, author).await,
            Self::GoogleBooks(p) => p.lookup_title_author(title, author).await,
            Self::Crossref(p) => p.lookup_title_author(title, author).await,
            _ => Err(self.unsupported("title/author")),
        }
    }

    pub async fn lookup_url(&self, url: &str) -> Result<Record> {
        match self {
            Self::Video(p) => p.lookup_url(url).await,
            Self::Article(p) => p.lookup_url(url).await,
            _ => Err(self.unsupported("URL")),
        }
    }

    fn unsupported(&self, capability: &'static str) -> BibError {
        BibError::Unsupported {
            provider: self.name().to_string(),
            capability,
        }
    }
}

// ---------------------------------------------------------------------------
// Default orders
// ---------------------------------------------------------------------------

/// ISBN providers in fallback order.
pub fn isbn_providers(
    executor: &Arc<dyn RequestExecutor>,
    endpoints: &EndpointsConfig,
) -> Vec<Provider> {
    vec![
        Provider::OpenLibrary(OpenLibrary::new(executor.clone(), &endpoints.open_library)),
        Provider::GoogleBooks(GoogleBooks::new(executor.clone(), &endpoints.google_books)),
        Provider::Crossref(Crossref::new(executor.clone(), &endpoints.crossref)),
        Provider::OclcClassify(OclcClassify::new(executor.clone(), &endpoints.oclc_classify)),
        Provider::Bnb(Bnb::new(executor.clone(), &endpoints.bnb_sparql)),
        Provider::OpenBd(OpenBd::new(executor.clone(), &endpoints.openbd)),
        Provider::LibraryOfCongress(LibraryOfCongress::new(
            executor.clone(),
            &endpoints.library_of_congress,
        )),
    ]
}

/// Title/author providers in fallback order.
pub fn title_providers(
    executor: &Arc<dyn RequestExecutor>,
    endpoints: &EndpointsConfig,
) -> Vec<Provider> {
    vec![
        Provider::OpenLibrary(OpenLibrary::new(executor.clone(), &endpoints.open_library)),
        Provider::GoogleBooks(GoogleBooks::new(executor.clone(), &endpoints.google_books)),
        Provider::Crossref(Crossref::new(executor.clone(), &endpoints.crossref)),
    ]
}

/// URL providers in fallback order: video hosts first, then any page.
pub fn url_providers(
    executor: &Arc<dyn RequestExecutor>,
    endpoints: &EndpointsConfig,
) -> Vec<Provider> {
    vec![
        Provider::Video(VideoOembed::new(
            executor.clone(),
            &endpoints.youtube_oembed,
            &endpoints.vimeo_oembed,
        )),
        Provider::Article(ArticleFetcher::new(executor.clone())),
    ]
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use bibresolve_shared::HttpConfig;

    pub(crate) fn test_executor() -> Arc<dyn RequestExecutor> {
        Arc::new(HttpExecutor::new(&HttpConfig::default()).unwrap())
    }

    #[test]
    fn default_orders_and_names() {
        let executor = test_executor();
        let endpoints = EndpointsConfig::default();

        let names: Vec<&str> = isbn_providers(&executor, &endpoints)
            .iter()
            .map(Provider::name)
            .collect();
        assert_eq!(
            names,
            vec!["openlibrary", "googlebooks", "crossref", "oclc", "bnb", "openbd", "loc"]
        );

        let names: Vec<&str> = title_providers(&executor, &endpoints)
            .iter()
            .map(Provider::name)
            .collect();
        assert_eq!(names, vec!["openlibrary", "googlebooks", "crossref"]);

        let names: Vec<&str> = url_providers(&executor, &endpoints)
            .iter()
            .map(Provider::name)
            .collect();
        assert_eq!(names, vec!["video", "article"]);
    }

    #[tokio::test]
    async fn missing_capabilities_are_unsupported() {
        let executor = test_executor();
        let oclc =
            Provider::OclcClassify(OclcClassify::new(executor.clone(), "http://127.0.0.1:9"));
        let err = oclc.lookup_title_author("Dune", "").await.unwrap_err();
        assert_eq!(err.to_string(), "oclc does not support title/author lookups");

        let article = Provider::Article(ArticleFetcher::new(executor));
        let err = article.lookup_isbn("111").await.unwrap_err();
        assert!(matches!(err, BibError::Unsupported { capability: "ISBN", .. }));
    }
}
