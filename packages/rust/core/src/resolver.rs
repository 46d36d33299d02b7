//! Provider-fallback resolution.
//!
//! A [`Resolver`] holds one ordered provider list per lookup kind. Each call
//! walks its list strictly in order, one provider at a time, and stops at the
//! first record. Every provider that was tried leaves an [`Attempt`] in the
//! trace returned alongside the outcome.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::{info, instrument, warn};

use bibresolve_providers::{
    Provider, RequestExecutor, isbn_providers, title_providers, url_providers,
};
use bibresolve_shared::{AppConfig, Attempt, AttemptTrace, BibError, Record, isbn};

use crate::cancel::CancellationToken;

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// A successful resolution: the record, who produced it, and what was tried.
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub provider: String,
    pub record: Record,
    pub attempts: Vec<Attempt>,
}

/// A failed resolution. `error` is [`BibError::NoProviderData`] or
/// [`BibError::Cancelled`]; `attempts` is the trace up to the failure.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct ResolveFailure {
    pub error: BibError,
    pub attempts: Vec<Attempt>,
}

// ---------------------------------------------------------------------------
// Lookup keys
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum Lookup<'a> {
    Isbn(&'a str),
    TitleAuthor { title: &'a str, author: &'a str },
    Url(&'a str),
}

impl Lookup<'_> {
    /// Reject keys no provider could use, before any request is made.
    fn validate(&self) -> Result<(), BibError> {
        match self {
            Self::Isbn(raw) if isbn::normalize(raw).is_empty() => {
                Err(BibError::invalid_key("ISBN is empty"))
            }
            Self::TitleAuthor { title, .. } if title.trim().is_empty() => {
                Err(BibError::invalid_key("title is empty"))
            }
            Self::Url(url) if url.trim().is_empty() => Err(BibError::invalid_key("URL is empty")),
            _ => Ok(()),
        }
    }

    async fn run(&self, provider: &Provider) -> Result<Record, BibError> {
        match *self {
            Self::Isbn(isbn) => provider.lookup_isbn(isbn).await,
            Self::TitleAuthor { title, author } => {
                provider.lookup_title_author(title, author).await
            }
            Self::Url(url) => provider.lookup_url(url).await,
        }
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

pub struct Resolver {
    isbn: Vec<Provider>,
    title: Vec<Provider>,
    url: Vec<Provider>,
    deadline: Option<Duration>,
}

/// Builds a [`Resolver`]; providers are tried in the order they are added.
#[derive(Default)]
pub struct ResolverBuilder {
    isbn: Vec<Provider>,
    title: Vec<Provider>,
    url: Vec<Provider>,
    deadline: Option<Duration>,
}

impl ResolverBuilder {
    pub fn isbn_provider(mut self, provider: Provider) -> Self {
        self.isbn.push(provider);
        self
    }

    pub fn title_provider(mut self, provider: Provider) -> Self {
        self.title.push(provider);
        self
    }

    pub fn url_provider(mut self, provider: Provider) -> Self {
        self.url.push(provider);
        self
    }

    /// Overall budget for one resolution call; elapsing counts as cancellation.
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn build(self) -> Resolver {
        Resolver {
            isbn: self.isbn,
            title: self.title,
            url: self.url,
            deadline: self.deadline,
        }
    }
}

impl Resolver {
    pub fn builder() -> ResolverBuilder {
        ResolverBuilder::default()
    }

    /// The default provider order, pointed at the configured endpoints.
    pub fn standard(executor: Arc<dyn RequestExecutor>, config: &AppConfig) -> Self {
        let endpoints = &config.endpoints;
        Self {
            isbn: isbn_providers(&executor, endpoints),
            title: title_providers(&executor, endpoints),
            url: url_providers(&executor, endpoints),
            deadline: config.resolver.deadline_secs.map(Duration::from_secs),
        }
    }

    pub async fn resolve_isbn(&self, isbn: &str) -> Result<Resolution, ResolveFailure> {
        self.resolve_isbn_with(isbn, &CancellationToken::new()).await
    }

    pub async fn resolve_title_author(
        &self,
        title: &str,
        author: &str,
    ) -> Result<Resolution, ResolveFailure> {
        self.resolve_title_author_with(title, author, &CancellationToken::new())
            .await
    }

    pub async fn resolve_url(&self, url: &str) -> Result<Resolution, ResolveFailure> {
        self.resolve_url_with(url, &CancellationToken::new()).await
    }

    #[instrument(skip(self, cancel), fields(kind = "isbn"))]
    pub async fn resolve_isbn_with(
        &self,
        isbn: &str,
        cancel: &CancellationToken,
    ) -> Result<Resolution, ResolveFailure> {
        self.resolve(&self.isbn, Lookup::Isbn(isbn), cancel).await
    }

    #[instrument(skip(self, cancel), fields(kind = "title"))]
    pub async fn resolve_title_author_with(
        &self,
        title: &str,
        author: &str,
        cancel: &CancellationToken,
    ) -> Result<Resolution, ResolveFailure> {
        self.resolve(&self.title, Lookup::TitleAuthor { title, author }, cancel)
            .await
    }

    #[instrument(skip(self, cancel), fields(kind = "url"))]
    pub async fn resolve_url_with(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<Resolution, ResolveFailure> {
        self.resolve(&self.url, Lookup::Url(url), cancel).await
    }

    async fn resolve(
        &self,
        providers: &[Provider],
        lookup: Lookup<'_>,
        cancel: &CancellationToken,
    ) -> Result<Resolution, ResolveFailure> {
        let mut trace = AttemptTrace::new();

        if let Err(e) = lookup.validate() {
            for provider in providers {
                trace.failed(provider.name(), &e);
            }
            warn!(error = %e, tried = providers.len(), "lookup key rejected");
            return Err(exhausted(providers.len(), trace));
        }

        let deadline = self.deadline.map(|d| Instant::now() + d);

        for provider in providers {
            let name = provider.name();

            let expired = deadline.is_some_and(|d| Instant::now() >= d);
            let outcome = if cancel.is_cancelled() || expired {
                None
            } else {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    _ = deadline_elapsed(deadline) => None,
                    result = lookup.run(provider) => Some(result),
                }
            };

            match outcome {
                Some(Ok(record)) => {
                    trace.succeeded(name);
                    let attempts = trace.into_vec();
                    info!(provider = name, id = %record.id, attempts = attempts.len(), "resolved");
                    return Ok(Resolution {
                        provider: name.to_string(),
                        record,
                        attempts,
                    });
                }
                Some(Err(e)) => {
                    warn!(provider = name, error = %e, "provider failed");
                    trace.failed(name, &e);
                }
                None => {
                    trace.failed(name, "cancelled");
                    let attempts = trace.into_vec();
                    warn!(provider = name, attempts = attempts.len(), "resolution cancelled");
                    return Err(ResolveFailure {
                        error: BibError::Cancelled,
                        attempts,
                    });
                }
            }
        }

        warn!(tried = providers.len(), "no provider returned data");
        Err(exhausted(providers.len(), trace))
    }
}

fn exhausted(tried: usize, trace: AttemptTrace) -> ResolveFailure {
    ResolveFailure {
        error: BibError::NoProviderData { tried },
        attempts: trace.into_vec(),
    }
}

async fn deadline_elapsed(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
