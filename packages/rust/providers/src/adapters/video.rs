//! oEmbed lookups for video hosting sites.

use std::sync::Arc;

use serde::Deserialize;
use tracing::instrument;
use url::Url;

use bibresolve_shared::{Author, BibError, Record, RecordType, Result};

use super::endpoint;
use crate::normalize::finalize;
use crate::transport::{HttpRequest, RequestExecutor};

const YOUTUBE_HOSTS: &[&str] = &[
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
    "youtu.be",
];
const VIMEO_HOSTS: &[&str] = &["vimeo.com", "www.vimeo.com", "player.vimeo.com"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Host {
    YouTube,
    Vimeo,
}

impl Host {
    fn detect(url: &Url) -> Option<Self> {
        let host = url.host_str()?.to_ascii_lowercase();
        if YOUTUBE_HOSTS.contains(&host.as_str()) {
            Some(Self::YouTube)
        } else if VIMEO_HOSTS.contains(&host.as_str()) {
            Some(Self::Vimeo)
        } else {
            None
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::YouTube => "YouTube",
            Self::Vimeo => "Vimeo",
        }
    }
}

pub struct VideoOembed {
    executor: Arc<dyn RequestExecutor>,
    youtube_endpoint: String,
    vimeo_endpoint: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Oembed {
    title: String,
    author_name: Option<String>,
    provider_name: Option<String>,
    upload_date: Option<String>,
    description: Option<String>,
}

impl VideoOembed {
    pub fn new(
        executor: Arc<dyn RequestExecutor>,
        youtube_endpoint: impl Into<String>,
        vimeo_endpoint: impl Into<String>,
    ) -> Self {
        Self {
            executor,
            youtube_endpoint: youtube_endpoint.into(),
            vimeo_endpoint: vimeo_endpoint.into(),
        }
    }

    #[instrument(skip(self), fields(provider = "video"))]
    pub async fn lookup_url(&self, page: &str) -> Result<Record> {
        let page = page.trim();
        let parsed = Url::parse(page)
            .map_err(|e| BibError::invalid_key(format!("invalid URL {page:?}: {e}")))?;
        let host = Host::detect(&parsed).ok_or_else(|| BibError::Unsupported {
            provider: "video".into(),
            capability: "non-video URL",
        })?;

        let base = match host {
            Host::YouTube => &self.youtube_endpoint,
            Host::Vimeo => &self.vimeo_endpoint,
        };
        let url = endpoint(base, "", &[("format", "json"), ("url", page)])?;
        let response = self
            .executor
            .execute(HttpRequest::get(url))
            .await?
            .error_for_status()?;

        let embed: Oembed = response.json()?;
        let source = embed
            .provider_name
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(host.label())
            .to_string();

        let mut record = Record::new(RecordType::Video, embed.title);
        record.authors = embed
            .author_name
            .as_deref()
            .and_then(Author::parse)
            .into_iter()
            .collect();
        record.publisher = source.clone();
        record.date = embed.upload_date.unwrap_or_default();
        record.annotation.summary = embed.description.unwrap_or_default();
        record.set_url(page, "");

        finalize(record, &source)
    }
}
