//! Browser search tool: intent detection, query refinement, a fixed
//! trusted-domain scoring table, dedupe-by-host ranking, and a confidence
//! rollup (spec.md §4.4 "Browser search scoring"). The scoring pipeline is
//! pure and takes `year` as a parameter so it is deterministic under test;
//! [`SearchTool::call`] supplies the wall-clock year at the call site.

use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};

use crate::context::ToolContext;
use crate::error::ToolError;
use crate::schema::{ArgSpec, ArgType};
use crate::tool::{Tool, ToolCategory};

const DEFAULT_SEARCH_ENDPOINT: &str = "https://lite.duckduckgo.com/lite/";
const MAX_NUM_RESULTS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    News,
    Official,
    Documentation,
    Price,
    Academic,
    HowTo,
    General,
}

/// Ordered rule families: first match wins. News is checked before
/// official/documentation/price/academic/how-to; anything left falls
/// through to General.
pub fn detect_intent(query: &str) -> Intent {
    let q = query.to_ascii_lowercase();
    let any = |words: &[&str]| words.iter().any(|w| q.contains(w));

    if any(&["news", "breaking", "latest", "today"]) {
        Intent::News
    } else if any(&["official", "gov", "government"]) {
        Intent::Official
    } else if any(&["docs", "documentation", "api reference", "reference manual"]) {
        Intent::Documentation
    } else if any(&["price", "cost", "cheap", "buy"]) {
        Intent::Price
    } else if any(&["research", "paper", "study", "academic", "journal"]) {
        Intent::Academic
    } else if any(&["how to", "tutorial", "guide"]) {
        Intent::HowTo
    } else {
        Intent::General
    }
}

/// Append the intent-specific refinement described in spec.md §4.4 step 2.
pub fn refine_query(query: &str, intent: Intent, year: u32) -> String {
    match intent {
        Intent::News | Intent::Price => {
            let mut refined = format!("{query} {year}");
            if intent == Intent::Price {
                refined.push_str(" pt br");
            }
            refined
        }
        Intent::Academic => format!(
            "{query} site:scholar.google.com OR site:arxiv.org OR site:researchgate.net"
        ),
        Intent::Documentation => {
            if query.to_ascii_lowercase().contains("documentation") {
                query.to_string()
            } else {
                format!("{query} documentation")
            }
        }
        Intent::Official | Intent::HowTo | Intent::General => query.to_string(),
    }
}

/// Fixed trusted-domain table. Each entry's score is the "known trusted
/// domain family" bonus applied when a candidate's host ends with the
/// listed suffix.
const TRUSTED_DOMAINS: &[(&str, f64)] = &[
    (".gov", 9.0),
    ("wikipedia.org", 8.0),
    ("arxiv.org", 8.0),
    ("github.com", 7.0),
    ("stackoverflow.com", 7.0),
    ("docs.rs", 7.0),
    ("developer.mozilla.org", 7.0),
    ("reuters.com", 6.0),
    ("bbc.com", 6.0),
    ("nytimes.com", 6.0),
    ("apnews.com", 6.0),
    ("scholar.google.com", 6.0),
    ("researchgate.net", 6.0),
];

const NEWS_HOSTS: &[&str] = &[
    "reuters.com",
    "bbc.com",
    "nytimes.com",
    "apnews.com",
    "theguardian.com",
];

const DOC_HOSTS: &[&str] = &["github.com", "docs.rs", "developer.mozilla.org"];

const PENALIZED_PATTERNS: &[&str] = &[
    "login", "signin", "subscribe", "paywall", "buy", "cart", "pinterest", "facebook", "instagram",
];

#[derive(Debug, Clone)]
pub struct Candidate {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

fn host_of(url: &str) -> String {
    url.trim_start_matches("https://")
        .trim_start_matches("http://")
        .split('/')
        .next()
        .unwrap_or("")
        .to_ascii_lowercase()
}

fn trusted_domain_bonus(host: &str) -> f64 {
    TRUSTED_DOMAINS
        .iter()
        .filter(|(suffix, _)| host.ends_with(*suffix))
        .map(|(_, score)| *score)
        .fold(0.0, f64::max)
}

fn intent_bonus(intent: Intent, candidate: &Candidate, host: &str, year: u32) -> f64 {
    match intent {
        Intent::Documentation => {
            if DOC_HOSTS.iter().any(|h| host.ends_with(h)) {
                4.0
            } else {
                0.0
            }
        }
        Intent::News => {
            let mut bonus = 0.0;
            if NEWS_HOSTS.iter().any(|h| host.ends_with(h)) {
                bonus += 4.0;
            }
            if candidate.snippet.contains(&year.to_string()) {
                bonus += 2.0;
            }
            bonus
        }
        Intent::Official => {
            if host.ends_with(".gov") || host.contains(".gov.") {
                5.0
            } else {
                0.0
            }
        }
        Intent::Academic => {
            let lower = host.to_ascii_lowercase();
            if lower.contains("arxiv") || lower.contains("scholar") || lower.contains("research") {
                5.0
            } else {
                0.0
            }
        }
        Intent::HowTo => {
            let title = candidate.title.to_ascii_lowercase();
            if title.contains("tutorial") || title.contains("guide") || title.contains("how") {
                3.0
            } else {
                0.0
            }
        }
        Intent::Price | Intent::General => 0.0,
    }
}

fn query_word_bonus(query: &str, title: &str) -> f64 {
    let title_lower = title.to_ascii_lowercase();
    let bonus: f64 = query
        .split_whitespace()
        .filter(|w| w.len() > 2)
        .filter(|w| title_lower.contains(&w.to_ascii_lowercase()))
        .count() as f64
        * 1.5;
    bonus.min(5.0)
}

fn length_bonus(snippet: &str) -> f64 {
    let mut bonus = 0.0;
    if snippet.len() >= 100 {
        bonus += 1.0;
    }
    if snippet.len() >= 200 {
        bonus += 1.0;
    }
    bonus
}

fn penalty(candidate: &Candidate) -> f64 {
    let haystack = format!("{} {}", candidate.url, candidate.snippet).to_ascii_lowercase();
    if PENALIZED_PATTERNS.iter().any(|p| haystack.contains(p)) {
        4.0
    } else {
        0.0
    }
}

/// Score a single candidate against `query`/`intent`/`year`, floored at 0.
pub fn score_candidate(candidate: &Candidate, query: &str, intent: Intent, year: u32) -> f64 {
    let host = host_of(&candidate.url);
    let score = trusted_domain_bonus(&host)
        + intent_bonus(intent, candidate, &host, year)
        + query_word_bonus(query, &candidate.title)
        + length_bonus(&candidate.snippet)
        - penalty(candidate);
    score.max(0.0)
}

#[derive(Debug, Clone)]
pub struct RankedResult {
    pub candidate: Candidate,
    pub score: f64,
}

/// Dedupe by host, sort descending, trim to `num_results` (capped at 20).
pub fn rank_and_dedupe(
    candidates: Vec<Candidate>,
    query: &str,
    intent: Intent,
    year: u32,
    num_results: usize,
) -> Vec<RankedResult> {
    let mut scored: Vec<RankedResult> = candidates
        .into_iter()
        .map(|c| {
            let score = score_candidate(&c, query, intent, year);
            RankedResult { candidate: c, score }
        })
        .collect();
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());

    let mut seen_hosts = std::collections::HashSet::new();
    let mut out = Vec::new();
    for result in scored {
        let host = host_of(&result.candidate.url);
        if seen_hosts.insert(host) {
            out.push(result);
        }
        if out.len() >= num_results.min(MAX_NUM_RESULTS) {
            break;
        }
    }
    out
}

pub fn confidence_for(results: &[RankedResult]) -> &'static str {
    if results.is_empty() {
        return "low";
    }
    let avg = results.iter().map(|r| r.score).sum::<f64>() / results.len() as f64;
    if avg >= 6.0 {
        "high"
    } else if avg >= 3.0 {
        "medium"
    } else {
        "low"
    }
}

/// Parse `<a href="...">title</a>` anchors followed by a snippet paragraph
/// out of a lite search results page. Regex-based, not a full HTML parser
/// (matches the spec's "parses results with regex" contract). The snippet
/// for each candidate is the stripped, whitespace-collapsed text running
/// from the end of its anchor up to the start of the next one (or end of
/// document), capped so a long trailing page fragment isn't pulled in.
fn parse_results_html(html: &str) -> Vec<Candidate> {
    const SNIPPET_WINDOW: usize = 1000;

    let anchor_re = Regex::new(r#"(?is)<a[^>]+href="(https?://[^"]+)"[^>]*>(.*?)</a>"#).unwrap();
    let tag_re = Regex::new(r"(?is)<[^>]+>").unwrap();
    let whitespace_re = Regex::new(r"\s+").unwrap();

    let anchors: Vec<_> = anchor_re.captures_iter(html).collect();
    let mut out = Vec::new();
    for (i, cap) in anchors.iter().enumerate() {
        let full = cap.get(0).unwrap();
        let url = cap[1].to_string();
        let title = tag_re.replace_all(&cap[2], "").trim().to_string();
        if title.is_empty() {
            continue;
        }

        let window_end = anchors
            .get(i + 1)
            .map(|next| next.get(0).unwrap().start())
            .unwrap_or(html.len())
            .min(full.end() + SNIPPET_WINDOW);
        let stripped = tag_re.replace_all(&html[full.end()..window_end], " ");
        let snippet = whitespace_re.replace_all(stripped.trim(), " ").trim().to_string();

        out.push(Candidate { title, url, snippet });
    }
    out
}

pub struct SearchTool {
    client: reqwest::Client,
    endpoint: String,
}

impl Default for SearchTool {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchTool {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("smith-agent-search/0.1")
                .build()
                .expect("failed to build search HTTP client"),
            endpoint: std::env::var("SMITH_SEARCH_ENDPOINT")
                .unwrap_or_else(|_| DEFAULT_SEARCH_ENDPOINT.to_string()),
        }
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &'static str {
        "search"
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Browser
    }
    fn args_schema(&self) -> &'static [ArgSpec] {
        &[
            ArgSpec::required("query", ArgType::String),
            ArgSpec::optional("num_results", ArgType::Integer),
        ]
    }
    async fn call(&self, args: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
        let query = args["query"].as_str().unwrap();
        let num_results = args
            .get("num_results")
            .and_then(Value::as_u64)
            .map(|v| v as usize)
            .unwrap_or(10)
            .min(MAX_NUM_RESULTS);

        let intent = detect_intent(query);
        let year = current_year();
        let refined = refine_query(query, intent, year);

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", refined.as_str())])
            .send()
            .await
            .map_err(|e| ToolError::ToolFailure(format!("search request failed: {e}")))?;
        let html = response
            .text()
            .await
            .map_err(|e| ToolError::ToolFailure(format!("search request failed: {e}")))?;

        let candidates = parse_results_html(&html);
        let ranked = rank_and_dedupe(candidates, query, intent, year, num_results);
        let confidence = confidence_for(&ranked);

        let results: Vec<Value> = ranked
            .iter()
            .map(|r| {
                json!({
                    "title": r.candidate.title,
                    "url": r.candidate.url,
                    "snippet": r.candidate.snippet,
                    "score": r.score,
                })
            })
            .collect();

        Ok(json!({ "results": results, "confidence": confidence }))
    }
}

fn current_year() -> u32 {
    let secs = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    1970 + (secs / (365 * 24 * 3600)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_news_before_documentation() {
        assert_eq!(detect_intent("latest rust release notes docs"), Intent::News);
    }

    #[test]
    fn detects_documentation_intent() {
        assert_eq!(detect_intent("tokio docs"), Intent::Documentation);
    }

    #[test]
    fn detects_how_to_intent() {
        assert_eq!(detect_intent("how to bake bread"), Intent::HowTo);
    }

    #[test]
    fn falls_back_to_general() {
        assert_eq!(detect_intent("rust ownership rules"), Intent::General);
    }

    #[test]
    fn refine_appends_year_for_news() {
        let refined = refine_query("election results", Intent::News, 2026);
        assert_eq!(refined, "election results 2026");
    }

    #[test]
    fn refine_appends_locale_for_price() {
        let refined = refine_query("gpu price", Intent::Price, 2026);
        assert_eq!(refined, "gpu price 2026 pt br");
    }

    #[test]
    fn refine_academic_appends_site_filters() {
        let refined = refine_query("transformer attention", Intent::Academic, 2026);
        assert!(refined.contains("site:arxiv.org"));
    }

    #[test]
    fn refine_documentation_skips_duplicate_word() {
        let refined = refine_query("tokio documentation", Intent::Documentation, 2026);
        assert_eq!(refined, "tokio documentation");
    }

    #[test]
    fn trusted_domain_scores_higher_than_unknown() {
        let known = Candidate {
            title: "Tokio".into(),
            url: "https://docs.rs/tokio".into(),
            snippet: "x".repeat(250),
        };
        let unknown = Candidate {
            title: "Tokio".into(),
            url: "https://randomblog.example/tokio".into(),
            snippet: "x".repeat(250),
        };
        let known_score = score_candidate(&known, "tokio", Intent::General, 2026);
        let unknown_score = score_candidate(&unknown, "tokio", Intent::General, 2026);
        assert!(known_score > unknown_score);
    }

    #[test]
    fn penalized_patterns_reduce_score_but_floor_at_zero() {
        let candidate = Candidate {
            title: "x".into(),
            url: "https://facebook.com/login".into(),
            snippet: "please subscribe to view".into(),
        };
        let score = score_candidate(&candidate, "x", Intent::General, 2026);
        assert_eq!(score, 0.0);
    }

    #[test]
    fn dedupe_keeps_first_occurrence_per_host() {
        let candidates = vec![
            Candidate {
                title: "A".into(),
                url: "https://github.com/a".into(),
                snippet: "x".repeat(200),
            },
            Candidate {
                title: "B".into(),
                url: "https://github.com/b".into(),
                snippet: "short".into(),
            },
        ];
        let ranked = rank_and_dedupe(candidates, "a", Intent::General, 2026, 10);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].candidate.title, "A");
    }

    #[test]
    fn confidence_rollup_thresholds() {
        let high = vec![RankedResult {
            candidate: Candidate {
                title: "x".into(),
                url: "https://x.gov".into(),
                snippet: "x".into(),
            },
            score: 9.0,
        }];
        assert_eq!(confidence_for(&high), "high");

        let medium = vec![RankedResult {
            candidate: Candidate {
                title: "x".into(),
                url: "https://x.example".into(),
                snippet: "x".into(),
            },
            score: 3.0,
        }];
        assert_eq!(confidence_for(&medium), "medium");

        assert_eq!(confidence_for(&[]), "low");
    }

    #[test]
    fn parses_anchors_from_html() {
        let html = r#"<a href="https://example.com/a">Example Title</a>"#;
        let parsed = parse_results_html(html);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].title, "Example Title");
        assert_eq!(parsed[0].url, "https://example.com/a");
    }

    #[test]
    fn parses_snippet_between_consecutive_anchors() {
        let html = r#"
            <tr>
                <td><a href="https://example.com/a">Example Title</a></td>
                <td class="result-snippet">A short   <b>description</b> of the page.</td>
            </tr>
            <tr>
                <td><a href="https://other.com/b">Other Title</a></td>
                <td class="result-snippet">Second result's own snippet text.</td>
            </tr>
        "#;
        let parsed = parse_results_html(html);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].snippet, "A short description of the page.");
        assert_eq!(parsed[1].snippet, "Second result's own snippet text.");
    }

    #[test]
    fn real_snippet_feeds_length_and_news_year_bonus() {
        let html = format!(
            r#"<a href="https://apnews.com/x">Breaking story</a><td>{} happened today, a very long report with plenty of detail to push this past the length-bonus thresholds used by the scoring formula for a meaty excerpt.</td>"#,
            current_year()
        );
        let candidates = parse_results_html(&html);
        assert_eq!(candidates.len(), 1);
        assert!(!candidates[0].snippet.is_empty());
        let score = score_candidate(&candidates[0], "breaking story", Intent::News, current_year());
        // trusted domain (apnews.com) + news host + snippet-year bonus +
        // length bonus all require a non-empty, real snippet to fire.
        assert!(score > trusted_domain_bonus("apnews.com"));
    }
}
