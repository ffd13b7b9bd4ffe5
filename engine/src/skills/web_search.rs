//! Web Search Skill
//!
//! Site-aware search. YouTube-style queries (an explicit "youtube", or
//! "play" phrasing) are routed straight to a YouTube results URL in the
//! browser instead of hitting the search API; "open/go to/visit <site>"
//! requests open the site directly. Everything else goes to the search
//! backend: Serper.dev when an API key is configured, the DuckDuckGo
//! instant-answer API otherwise.

use async_trait::async_trait;
use reqwest::{Client, Url};
use sdk::errors::EngineError;
use sdk::skill::{SearchHit, Skill, SkillOutput, SkillParams};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::Config;
use crate::skills::open_url::spawn_browser;

/// Words stripped from a query before building a YouTube search URL
const YOUTUBE_STOP_WORDS: &[&str] = &[
    "play", "youtube", "search", "on", "in", "the", "a", "an", "for", "me", "this", "song",
    "music", "video",
];

/// Sites that can be opened directly by name
const KNOWN_SITES: &[(&str, &str)] = &[
    ("youtube", "https://www.youtube.com"),
    ("google", "https://www.google.com"),
    ("facebook", "https://www.facebook.com"),
    ("twitter", "https://www.twitter.com"),
    ("instagram", "https://www.instagram.com"),
    ("github", "https://www.github.com"),
    ("stackoverflow", "https://www.stackoverflow.com"),
    ("reddit", "https://www.reddit.com"),
];

pub struct WebSearchSkill {
    client: Client,
    serper_api_key: Option<String>,
    max_results: usize,
}

impl WebSearchSkill {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(15))
                .build()
                .unwrap_or_default(),
            serper_api_key: Some(config.search.serper_api_key.clone())
                .filter(|k| !k.is_empty()),
            max_results: config.search.max_results,
        }
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, EngineError> {
        match &self.serper_api_key {
            Some(key) => self.search_serper(query, max_results, key).await,
            None => self.search_duckduckgo(query, max_results).await,
        }
    }

    /// Serper.dev (Google Search) API
    async fn search_serper(
        &self,
        query: &str,
        max_results: usize,
        api_key: &str,
    ) -> Result<Vec<SearchHit>, EngineError> {
        let response = self
            .client
            .post("https://google.serper.dev/search")
            .header("X-API-KEY", api_key)
            .json(&json!({ "q": query, "num": max_results }))
            .send()
            .await
            .map_err(|e| EngineError::Skill(format!("Serper.dev search failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(EngineError::Skill(format!(
                "Serper.dev search failed: status {}",
                response.status()
            )));
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| EngineError::Skill(format!("Serper.dev search failed: {}", e)))?;

        let mut hits = Vec::new();
        if let Some(organic) = value["organic"].as_array() {
            for item in organic.iter().take(max_results) {
                hits.push(SearchHit {
                    title: str_field(item, "title"),
                    url: str_field(item, "link"),
                    snippet: str_field(item, "snippet"),
                });
            }
        }

        // Fall back to the answer box or knowledge graph when there are no
        // organic results
        if hits.is_empty() {
            if value["answerBox"].is_object() {
                let answer = &value["answerBox"];
                let snippet = if answer["answer"].is_string() {
                    str_field(answer, "answer")
                } else {
                    str_field(answer, "snippet")
                };
                hits.push(SearchHit {
                    title: non_empty_or(str_field(answer, "title"), query),
                    url: str_field(answer, "link"),
                    snippet,
                });
            } else if value["knowledgeGraph"].is_object() {
                let kg = &value["knowledgeGraph"];
                hits.push(SearchHit {
                    title: non_empty_or(str_field(kg, "title"), query),
                    url: str_field(kg, "website"),
                    snippet: str_field(kg, "description"),
                });
            }
        }

        if hits.is_empty() {
            return Err(EngineError::Skill("No search results found".into()));
        }
        Ok(hits)
    }

    /// DuckDuckGo instant-answer API fallback
    async fn search_duckduckgo(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchHit>, EngineError> {
        let url = Url::parse_with_params(
            "https://api.duckduckgo.com/",
            &[
                ("q", query),
                ("format", "json"),
                ("no_redirect", "1"),
                ("skip_disambig", "1"),
            ],
        )
        .map_err(|e| EngineError::Skill(format!("DuckDuckGo search failed: {}", e)))?;

        let value: Value = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| EngineError::Skill(format!("DuckDuckGo search failed: {}", e)))?
            .json()
            .await
            .map_err(|e| EngineError::Skill(format!("DuckDuckGo search failed: {}", e)))?;

        let mut hits = Vec::new();
        let abstract_text = str_field(&value, "AbstractText");
        if !abstract_text.is_empty() {
            hits.push(SearchHit {
                title: non_empty_or(str_field(&value, "Heading"), query),
                url: str_field(&value, "AbstractURL"),
                snippet: abstract_text,
            });
        }

        if let Some(topics) = value["RelatedTopics"].as_array() {
            for topic in topics {
                if hits.len() >= max_results {
                    break;
                }
                let text = str_field(topic, "Text");
                if text.is_empty() {
                    continue;
                }
                hits.push(SearchHit {
                    title: text.clone(),
                    url: str_field(topic, "FirstURL"),
                    snippet: text,
                });
            }
        }

        if hits.is_empty() {
            return Err(EngineError::Skill("No search results found".into()));
        }
        hits.truncate(max_results);
        Ok(hits)
    }
}

fn str_field(value: &Value, key: &str) -> String {
    value[key].as_str().unwrap_or("").to_string()
}

fn non_empty_or(s: String, fallback: &str) -> String {
    if s.is_empty() {
        fallback.to_string()
    } else {
        s
    }
}

/// True when the query should route to YouTube
fn is_youtube_query(lower: &str) -> bool {
    if lower.contains("youtube") {
        return true;
    }
    lower.contains("play")
        && (lower.contains("song") || lower.contains("music") || lower.contains("video"))
        || lower.split_whitespace().any(|w| w == "play")
}

/// Strip routing stop words, keeping only the subject of the search
fn strip_stop_words(lower: &str) -> String {
    lower
        .split_whitespace()
        .filter(|word| !YOUTUBE_STOP_WORDS.contains(word))
        .collect::<Vec<_>>()
        .join(" ")
}

/// YouTube results URL for a query; the sp parameter prioritizes videos
fn youtube_results_url(query: &str) -> Result<String, EngineError> {
    Url::parse_with_params(
        "https://www.youtube.com/results",
        &[("search_query", query), ("sp", "EgIQAQ%3D%3D")],
    )
    .map(|u| u.to_string())
    .map_err(|e| EngineError::Skill(format!("Invalid search query: {}", e)))
}

/// Detect "open/go to/visit <known site>" requests
fn site_route(lower: &str) -> Option<&'static str> {
    let wants_open =
        lower.contains("open") || lower.contains("go to") || lower.contains("visit");
    if !wants_open {
        return None;
    }
    KNOWN_SITES
        .iter()
        .find(|(name, _)| lower.contains(name))
        .map(|(_, url)| *url)
}

/// Render hits as a numbered, human-readable block
fn format_hits(hits: &[SearchHit]) -> String {
    let mut lines = Vec::new();
    for (i, hit) in hits.iter().enumerate() {
        lines.push(format!("{}. {}", i + 1, hit.title));
        lines.push(format!("   URL: {}", hit.url));
        lines.push(format!("   {}", hit.snippet));
        lines.push(String::new());
    }
    lines.join("\n")
}

#[async_trait]
impl Skill for WebSearchSkill {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Searches the web for information or opens websites"
    }

    async fn run(&self, params: &SkillParams) -> Result<SkillOutput, EngineError> {
        let query = params.str("query")?;
        let lower = query.to_lowercase();

        if is_youtube_query(&lower) {
            let subject = strip_stop_words(&lower);
            let (url, message) = if subject.is_empty() {
                (
                    "https://www.youtube.com".to_string(),
                    "Opened YouTube".to_string(),
                )
            } else {
                (
                    youtube_results_url(&subject)?,
                    format!("Playing {} on YouTube", subject),
                )
            };
            info!("Routing query to YouTube: {}", url);
            spawn_browser(&url)?;
            return Ok(SkillOutput::UrlOpened { message });
        }

        if let Some(url) = site_route(&lower) {
            info!("Routing query to site: {}", url);
            spawn_browser(url)?;
            return Ok(SkillOutput::UrlOpened {
                message: format!("Opened {} in browser", url),
            });
        }

        let max_results = params
            .i64_opt("max_results")
            .map(|n| n.max(1) as usize)
            .unwrap_or(self.max_results);
        debug!("Searching web for '{}' (max {})", query, max_results);
        let hits = self.search(query, max_results).await?;
        let formatted = format_hits(&hits);
        Ok(SkillOutput::SearchResults { formatted, hits })
    }
}
