// src/scanner.rs
//! Multi-team keyword scanner: compile team subscriptions once per run,
//! scan every story with the same compiled state.

use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};
use std::collections::{BTreeMap, BTreeSet};

use crate::hn::Story;

/// Compiled scanner. One case-insensitive alternation per team; a team with
/// no usable keywords is dropped at compile time and can never match.
pub struct TeamScanner {
    patterns: Vec<(String, Regex)>,
}

impl TeamScanner {
    pub fn compile(subscriptions: &BTreeMap<String, Vec<String>>) -> Result<Self> {
        let mut patterns = Vec::with_capacity(subscriptions.len());
        for (team_id, keywords) in subscriptions {
            let alternation: Vec<String> = keywords
                .iter()
                .map(|kw| kw.trim())
                .filter(|kw| !kw.is_empty())
                .map(regex::escape)
                .collect();
            if alternation.is_empty() {
                continue;
            }
            let re = RegexBuilder::new(&alternation.join("|"))
                .case_insensitive(true)
                .build()
                .with_context(|| format!("compiling keyword pattern for team {team_id}"))?;
            patterns.push((team_id.clone(), re));
        }
        Ok(Self { patterns })
    }

    /// Teams whose keywords occur anywhere in the story title. Raw substring
    /// containment, no word boundaries ("go" matches inside "good").
    pub fn match_teams(&self, story: &Story) -> BTreeSet<String> {
        let text = story
            .title
            .as_deref()
            .map(normalize_title)
            .unwrap_or_default();
        if text.is_empty() {
            return BTreeSet::new();
        }

        self.patterns
            .iter()
            .filter(|(_, re)| re.is_match(&text))
            .map(|(team_id, _)| team_id.clone())
            .collect()
    }

    pub fn team_count(&self) -> usize {
        self.patterns.len()
    }
}

/// Normalize a title before scanning: decode HTML entities (HN serves
/// `&amp;`, `&#x27;`, ...) and collapse whitespace.
pub fn normalize_title(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s).to_string();

    static RE_WS: once_cell::sync::OnceCell<Regex> = once_cell::sync::OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    re_ws.replace_all(&decoded, " ").trim().to_string()
}
