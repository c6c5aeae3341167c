use std::time::Duration;

use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{info, warn};

use crate::ingest::{collapse_whitespace, truncate_chars, DocumentContext, IngestError};
use crate::record::merge::UpdatePayload;
use crate::record::Field;

const FETCH_TIMEOUT_SECS: u64 = 10;
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript"];

/// Either a profile URL or text the user pasted from it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileInput {
    Url(String),
    Text(String),
}

/// Profile Text Adapter. Page fetching is best-effort and off by default;
/// when off, the agent is told it cannot open the link.
#[derive(Clone)]
pub struct ProfileFetcher {
    client: Option<Client>,
    max_chars: usize,
}

impl ProfileFetcher {
    pub fn new(fetch_enabled: bool, max_chars: usize) -> Result<Self, IngestError> {
        let client = if fetch_enabled {
            Some(
                Client::builder()
                    .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
                    .build()
                    .map_err(|e| IngestError::ExtractionFailure(e.to_string()))?,
            )
        } else {
            None
        };
        Ok(Self { client, max_chars })
    }

    pub async fn ingest(&self, input: ProfileInput) -> Result<DocumentContext, IngestError> {
        match input {
            ProfileInput::Url(raw) => self.ingest_url(raw.trim()).await,
            ProfileInput::Text(text) => {
                let text = collapse_whitespace(&text);
                if text.is_empty() {
                    return Err(IngestError::EmptyInput);
                }
                Ok(DocumentContext {
                    notice: "Profile text received. The assistant will consider it.".to_string(),
                    context: format!(
                        "(System note: the user pasted text from their professional profile:\n\n{})",
                        truncate_chars(&text, self.max_chars)
                    ),
                    payload: UpdatePayload::new(),
                })
            }
        }
    }

    async fn ingest_url(&self, raw: &str) -> Result<DocumentContext, IngestError> {
        let url = parse_profile_url(raw)?;
        let payload = UpdatePayload::new().with(Field::LinkedinUrl, url.as_str());

        let fetched = match &self.client {
            Some(client) => match fetch_page_text(client, &url).await {
                Ok(text) => Some(text),
                Err(e) => {
                    warn!("Profile fetch failed for {url}: {e}");
                    None
                }
            },
            None => None,
        };

        let context = match fetched {
            Some(text) => {
                info!("Fetched {} chars of profile text from {url}", text.len());
                format!(
                    "(System note: the user provided the profile URL {}. Page text:\n\n{})",
                    url,
                    truncate_chars(&text, self.max_chars)
                )
            }
            None => format!(
                "(System note: the user provided the profile URL {url}. You cannot open external \
                 links; acknowledge it and ask the user to highlight anything relevant from it.)"
            ),
        };

        Ok(DocumentContext {
            notice: format!("Profile URL received: {url}"),
            context,
            payload,
        })
    }
}

fn parse_profile_url(raw: &str) -> Result<Url, IngestError> {
    if raw.is_empty() {
        return Err(IngestError::EmptyInput);
    }
    let url = Url::parse(raw).map_err(|e| IngestError::InvalidUrl(format!("{raw}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(IngestError::InvalidUrl(format!(
            "unsupported scheme '{other}'"
        ))),
    }
}

async fn fetch_page_text(client: &Client, url: &Url) -> Result<String, IngestError> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| IngestError::ExtractionFailure(e.to_string()))?;
    let html = response
        .text()
        .await
        .map_err(|e| IngestError::ExtractionFailure(e.to_string()))?;
    let text = html_to_text(&html);
    if text.is_empty() {
        return Err(IngestError::NoExtractableText);
    }
    Ok(text)
}

/// Drops markup and the contents of script/style elements, decodes the
/// common entities, and collapses whitespace.
pub fn html_to_text(html: &str) -> String {
    let mut out = String::with_capacity(html.len() / 2);
    let mut rest = html;
    let mut skipping: Option<&str> = None;

    while let Some(lt) = rest.find('<') {
        if skipping.is_none() {
            out.push_str(&rest[..lt]);
        }
        let after = &rest[lt + 1..];
        let Some(gt) = after.find('>') else {
            rest = "";
            break;
        };
        let tag = after[..gt].trim().to_ascii_lowercase();
        let name: String = tag
            .trim_start_matches('/')
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect();

        match skipping {
            Some(open) if tag.starts_with('/') && name == open => skipping = None,
            Some(_) => {}
            None => {
                if !tag.starts_with('/') && !tag.ends_with('/') {
                    skipping = SKIPPED_ELEMENTS.iter().copied().find(|s| *s == name);
                }
                out.push(' ');
            }
        }
        rest = &after[gt + 1..];
    }
    if skipping.is_none() {
        out.push_str(rest);
    }

    let decoded = out
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    collapse_whitespace(&decoded)
}
