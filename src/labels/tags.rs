//! Human account tags and tag-based label suggestion.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Whether the analyst placed the account in or out of the tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    In,
    NotIn,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountTag {
    pub tag: String,
    pub polarity: Polarity,
}

impl AccountTag {
    pub fn new(tag: impl Into<String>, polarity: Polarity) -> Self {
        Self {
            tag: tag.into(),
            polarity,
        }
    }
}

/// Tags keyed by dendrogram leaf, for one ego.
pub type LeafTags = HashMap<usize, Vec<AccountTag>>;

/// Per-tag tally over a member set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagCount {
    pub tag: String,
    pub in_count: usize,
    pub not_in_count: usize,
    pub score: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagSummary {
    pub cluster_id: String,
    pub tag_counts: Vec<TagCount>,
    pub suggested_label: Option<String>,
}

/// Tally tags in first-seen order.
pub fn count_tags<'t, I>(member_tags: I) -> Vec<TagCount>
where
    I: IntoIterator<Item = &'t [AccountTag]>,
{
    let mut slot: hashbrown::HashMap<&'t str, usize> = hashbrown::HashMap::new();
    let mut counts: Vec<TagCount> = Vec::new();
    for tags in member_tags {
        for t in tags {
            let i = *slot.entry(t.tag.as_str()).or_insert_with(|| {
                counts.push(TagCount {
                    tag: t.tag.clone(),
                    in_count: 0,
                    not_in_count: 0,
                    score: 0,
                });
                counts.len() - 1
            });
            let c = &mut counts[i];
            match t.polarity {
                Polarity::In => c.in_count += 1,
                Polarity::NotIn => c.not_in_count += 1,
            }
            c.score = c.in_count as i64 - c.not_in_count as i64;
        }
    }
    counts
}

/// Highest positive score; the earliest-seen tag wins ties.
pub fn suggest(counts: &[TagCount]) -> Option<&TagCount> {
    let mut best: Option<&TagCount> = None;
    for c in counts.iter().filter(|c| c.score > 0) {
        if best.is_none_or(|b| c.score > b.score) {
            best = Some(c);
        }
    }
    best
}

/// Build a summary for one cluster's members.
pub fn summarize<'t, I>(cluster_id: &str, member_tags: I) -> TagSummary
where
    I: IntoIterator<Item = &'t [AccountTag]>,
{
    let tag_counts = count_tags(member_tags);
    let suggested_label = suggest(&tag_counts).map(|c| c.tag.clone());
    TagSummary {
        cluster_id: cluster_id.to_string(),
        tag_counts,
        suggested_label,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(tag: &str, p: Polarity) -> AccountTag {
        AccountTag::new(tag, p)
    }

    #[test]
    fn counts_in_first_seen_order() {
        let a = vec![t("press", Polarity::In), t("bots", Polarity::NotIn)];
        let b = vec![t("bots", Polarity::In), t("press", Polarity::In)];
        let counts = count_tags([a.as_slice(), b.as_slice()]);
        assert_eq!(counts[0].tag, "press");
        assert_eq!(counts[0].score, 2);
        assert_eq!(counts[1].tag, "bots");
        assert_eq!((counts[1].in_count, counts[1].not_in_count), (1, 1));
        assert_eq!(counts[1].score, 0);
    }

    #[test]
    fn suggestion_prefers_earliest_on_tie() {
        let a = vec![t("x", Polarity::In), t("y", Polarity::In)];
        let s = summarize("d_1", [a.as_slice()]);
        assert_eq!(s.suggested_label.as_deref(), Some("x"));
    }

    #[test]
    fn no_suggestion_without_positive_score() {
        let a = vec![t("x", Polarity::NotIn)];
        let b = vec![t("x", Polarity::In)];
        let s = summarize("d_1", [a.as_slice(), b.as_slice()]);
        assert_eq!(s.suggested_label, None);
        assert!(summarize("d_2", std::iter::empty()).tag_counts.is_empty());
    }

    #[test]
    fn summary_serializes_camel_case() {
        let a = vec![t("x", Polarity::In)];
        let json = serde_json::to_value(summarize("d_1", [a.as_slice()])).unwrap();
        assert_eq!(json["suggestedLabel"], "x");
        assert_eq!(json["tagCounts"][0]["inCount"], 1);
    }
}
