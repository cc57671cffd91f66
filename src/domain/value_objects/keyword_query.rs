use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::domain::entities::CatalogItem;

static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{L}\p{N}]+").expect("token pattern is valid"));

/// Clause that produced a keyword match, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchRank {
    TitleExact,
    TitlePrefix,
    TitleSubstring,
    Body,
    CategoryOrTag,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeywordQuery {
    tokens: Vec<String>,
}

impl KeywordQuery {
    /// Tokenizes and drops stop-words, keeping the untouched tokens when nothing else is left.
    pub fn parse(text: &str, stop_words: &HashSet<String>) -> Self {
        let all_tokens: Vec<String> = TOKEN_PATTERN
            .find_iter(&text.to_lowercase())
            .map(|m| m.as_str().to_string())
            .collect();

        let mut seen = HashSet::new();
        let significant: Vec<String> = all_tokens
            .iter()
            .filter(|token| !stop_words.contains(token.as_str()))
            .filter(|token| seen.insert(token.to_string()))
            .cloned()
            .collect();

        let tokens = if significant.is_empty() {
            let mut seen = HashSet::new();
            all_tokens
                .into_iter()
                .filter(|token| seen.insert(token.clone()))
                .collect()
        } else {
            significant
        };

        Self { tokens }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// SQL `ILIKE` substring patterns, one per token.
    pub fn like_patterns(&self) -> Vec<String> {
        self.tokens
            .iter()
            .map(|token| format!("%{}%", escape_like(token)))
            .collect()
    }

    /// Best clause matched by any token together with how many tokens matched at all.
    pub fn rank(&self, item: &CatalogItem) -> Option<(MatchRank, usize)> {
        let title = item.title().to_lowercase();
        let body = item.body().to_lowercase();
        let category = item.category().unwrap_or_default().to_lowercase();
        let tags: Vec<String> = item.tags().iter().map(|t| t.to_lowercase()).collect();

        let mut best: Option<MatchRank> = None;
        let mut matched_tokens = 0;

        for token in &self.tokens {
            let rank = if title == *token {
                Some(MatchRank::TitleExact)
            } else if title.starts_with(token.as_str()) {
                Some(MatchRank::TitlePrefix)
            } else if title.contains(token.as_str()) {
                Some(MatchRank::TitleSubstring)
            } else if body.contains(token.as_str()) {
                Some(MatchRank::Body)
            } else if category.contains(token.as_str())
                || tags.iter().any(|tag| tag.contains(token.as_str()))
            {
                Some(MatchRank::CategoryOrTag)
            } else {
                None
            };

            if let Some(rank) = rank {
                matched_tokens += 1;
                best = Some(best.map_or(rank, |current| current.min(rank)));
            }
        }

        best.map(|rank| (rank, matched_tokens))
    }

    /// Keeps matching items, ordered by clause then by matched-token count; input order breaks ties.
    pub fn filter_and_rank(&self, items: Vec<CatalogItem>) -> Vec<CatalogItem> {
        let mut seen = HashSet::new();
        let mut ranked: Vec<((MatchRank, usize), CatalogItem)> = items
            .into_iter()
            .filter(|item| seen.insert(item.id()))
            .filter_map(|item| self.rank(&item).map(|rank| (rank, item)))
            .collect();

        ranked.sort_by(|(a, _), (b, _)| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));
        ranked.into_iter().map(|(_, item)| item).collect()
    }
}

fn escape_like(token: &str) -> String {
    token
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

pub fn default_stop_words() -> HashSet<String> {
    [
        "a", "an", "and", "any", "are", "as", "at", "be", "by", "can", "do", "does", "for",
        "from", "have", "how", "i", "in", "is", "it", "me", "my", "of", "on", "or", "our",
        "show", "that", "the", "there", "this", "to", "we", "what", "which", "with", "you",
        "your",
    ]
    .iter()
    .map(|word| word.to_string())
    .collect()
}
