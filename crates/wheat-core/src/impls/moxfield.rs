//! MoxfieldClient - `CardLookup` over the Moxfield HTTP API.
//!
//! One `reqwest::Client` is built per job and reused for every request; the
//! headers Moxfield insists on are installed as its default headers.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use reqwest::{Client, Url};
use serde_json::Value;

use crate::domain::{DeckSearch, Format, RemoteCard, select_card};
use crate::ports::CardLookup;

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/127.0.0.0 Safari/537.36";
const REFERRER_POLICY: &str = "strict-origin-when-cross-origin";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const CARD_SEARCH_PATH: &str = "v2/cards/search";
const DECK_SEARCH_PATH: &str = "v2/decks/search-sfw";

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid API base URL '{url}': {reason}")]
    BaseUrl { url: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Why a successful response could not be used.
#[derive(Debug, thiserror::Error)]
pub(crate) enum PayloadError {
    #[error("response has no '{0}' field")]
    MissingField(&'static str),

    #[error("malformed response: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Moxfield API client bound to one target format.
#[derive(Debug, Clone)]
pub struct MoxfieldClient {
    http: Client,
    base_url: Url,
    format: Format,
}

impl MoxfieldClient {
    pub fn new(base_url: &str, format: Format) -> Result<Self, ClientError> {
        let base_url = parse_base_url(base_url)?;
        let http = Client::builder()
            .default_headers(default_headers())
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url,
            format,
        })
    }

    pub fn format(&self) -> Format {
        self.format
    }

    /// `v2/cards/search?q=(<name>) include:extras`
    pub fn card_search_url(&self, name: &str) -> Url {
        let mut url = self.endpoint(CARD_SEARCH_PATH);
        url.query_pairs_mut()
            .append_pair("q", &format!("({name}) include:extras"));
        url
    }

    /// `v2/decks/search-sfw?cardID=<id>&fmt=<format>&board=mainboard`
    pub fn deck_search_url(&self, card_id: &str) -> Url {
        let mut url = self.endpoint(DECK_SEARCH_PATH);
        url.query_pairs_mut()
            .append_pair("cardID", card_id)
            .append_pair("fmt", self.format.as_str())
            .append_pair("board", "mainboard");
        url
    }

    fn endpoint(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        // cannot-be-a-base URLs are rejected in `new`
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(path.split('/'));
        }
        url
    }

    /// GET `url` and decode the JSON body. Failures are logged and reported
    /// as `None`.
    async fn get_json(&self, url: Url) -> Option<Value> {
        let response = match self.http.get(url.clone()).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Request failed");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(url = %url, status = status.as_u16(), "Bad response status");
            return None;
        }

        match response.json::<Value>().await {
            Ok(body) => Some(body),
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Response body is not JSON");
                None
            }
        }
    }
}

#[async_trait]
impl CardLookup for MoxfieldClient {
    async fn resolve_card(&self, name: &str) -> Option<RemoteCard> {
        tracing::debug!(card = name, "Fetching card");
        let url = self.card_search_url(name);
        let body = self.get_json(url.clone()).await?;

        let cards = match parse_card_search(body) {
            Ok(cards) => cards,
            Err(e) => {
                tracing::warn!(card = name, url = %url, error = %e, "Could not fetch card");
                return None;
            }
        };
        if cards.is_empty() {
            tracing::warn!(card = name, url = %url, "No cards match name");
            return None;
        }

        let card = select_card(cards, self.format)?;
        tracing::info!(card = name, remote_id = %card.id, "Retrieved card");
        Some(card)
    }

    async fn count_decks(&self, card_id: &str) -> Option<DeckSearch> {
        tracing::debug!(remote_id = card_id, "Finding decks");
        let url = self.deck_search_url(card_id);
        let body = self.get_json(url.clone()).await?;

        match parse_deck_search(body) {
            Ok(decks) => {
                tracing::info!(remote_id = card_id, decks = decks.total_results, "Found decks");
                Some(decks)
            }
            Err(e) => {
                tracing::warn!(remote_id = card_id, url = %url, error = %e, "Could not find decks");
                None
            }
        }
    }
}

/// Headers required by Moxfield's access policy.
pub fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(
        HeaderName::from_static("referrer-policy"),
        HeaderValue::from_static(REFERRER_POLICY),
    );
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    headers
}

fn parse_base_url(raw: &str) -> Result<Url, ClientError> {
    let url = Url::parse(raw).map_err(|e| ClientError::BaseUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(ClientError::BaseUrl {
            url: raw.to_string(),
            reason: "not a base URL".to_string(),
        });
    }
    Ok(url)
}

/// Decode the `data` array. Cards that do not decode are skipped with a
/// warning so one odd printing does not hide the others.
pub(crate) fn parse_card_search(body: Value) -> Result<Vec<RemoteCard>, PayloadError> {
    let Value::Object(mut body) = body else {
        return Err(PayloadError::MissingField("data"));
    };
    let data = body.remove("data").ok_or(PayloadError::MissingField("data"))?;
    let entries: Vec<Value> = serde_json::from_value(data)?;

    let cards = entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value::<RemoteCard>(entry) {
            Ok(card) => Some(card),
            Err(e) => {
                tracing::warn!(index, error = %e, "Skipping undecodable card in search results");
                None
            }
        })
        .collect();
    Ok(cards)
}

pub(crate) fn parse_deck_search(body: Value) -> Result<DeckSearch, PayloadError> {
    let total_results = body
        .get("totalResults")
        .and_then(Value::as_u64)
        .ok_or(PayloadError::MissingField("totalResults"))?;
    Ok(DeckSearch {
        total_results,
        raw: body,
    })
}
