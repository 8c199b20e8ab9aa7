//! Fuzzy event search
//!
//! Scores every reference title against a (normalized) query by Levenshtein
//! similarity. Results are always ordered by descending score with ties kept
//! in dataset order.

use std::sync::Arc;

use serde::Serialize;

use super::normalize::normalize_for_comparison;
use super::owner::{EventCategory, EventOwner};
use super::record::EventRecord;

/// Above `TOP_K_SORT_FACTOR * k` candidates, top-K avoids a full sort.
const TOP_K_SORT_FACTOR: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub event: EventRecord,
    pub score: f32,
}

/// Levenshtein similarity `1 - d / max(len)`, computed over chars.
pub fn similarity(a: &str, b: &str) -> f32 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - strsim::levenshtein(a, b) as f32 / longest as f32
}

/// Search over a shared, ordered list of events.
#[derive(Debug, Clone)]
pub struct EventSearch {
    events: Arc<[EventRecord]>,
}

impl EventSearch {
    pub fn new(events: Arc<[EventRecord]>) -> Self {
        Self { events }
    }

    pub fn events(&self) -> &[EventRecord] {
        &self.events
    }

    /// Records scoring strictly above `threshold`, best first.
    ///
    /// With a category, only records whose owner belongs to it are scored.
    pub fn search_by_threshold(
        &self,
        query: &str,
        threshold: f32,
        category: Option<EventCategory>,
    ) -> Vec<SearchResult> {
        let query = normalize_for_comparison(query);
        if query.is_empty() {
            return Vec::new();
        }

        let mut results: Vec<SearchResult> = self
            .events
            .iter()
            .filter(|event| category.map_or(true, |c| event.owner().is_compatible(c)))
            .filter_map(|event| {
                let score = similarity(&query, event.normalized_title());
                (score > threshold).then(|| SearchResult {
                    event: event.clone(),
                    score,
                })
            })
            .collect();

        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results
    }

    /// The `k` best records regardless of score, best first.
    pub fn search_top_k(&self, query: &str, k: usize) -> Vec<SearchResult> {
        let query = normalize_for_comparison(query);
        if query.is_empty() || k == 0 {
            return Vec::new();
        }

        let scores: Vec<f32> = self
            .events
            .iter()
            .map(|event| similarity(&query, event.normalized_title()))
            .collect();
        let k = k.min(scores.len());

        let order = if scores.len() > TOP_K_SORT_FACTOR * k {
            select_best(&scores, k)
        } else {
            let mut order: Vec<usize> = (0..scores.len()).collect();
            order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
            order.truncate(k);
            order
        };

        order
            .into_iter()
            .map(|idx| SearchResult {
                event: self.events[idx].clone(),
                score: scores[idx],
            })
            .collect()
    }
}

/// Repeated max extraction; the earliest index wins a tie.
fn select_best(scores: &[f32], k: usize) -> Vec<usize> {
    let mut taken = vec![false; scores.len()];
    let mut order = Vec::with_capacity(k);
    for _ in 0..k {
        let mut best: Option<usize> = None;
        for (idx, score) in scores.iter().enumerate() {
            if taken[idx] {
                continue;
            }
            if best.map_or(true, |b| *score > scores[b]) {
                best = Some(idx);
            }
        }
        match best {
            Some(idx) => {
                taken[idx] = true;
                order.push(idx);
            }
            None => break,
        }
    }
    order
}

/// Leading results that share the best score.
pub fn top_candidates(results: &[SearchResult]) -> &[SearchResult] {
    match results.first() {
        Some(best) => {
            let len = results
                .iter()
                .take_while(|r| r.score == best.score)
                .count();
            &results[..len]
        }
        None => results,
    }
}

/// Pick one event among equally scored candidates.
///
/// The first candidate whose owner matches `owner` wins; without a match the
/// first candidate is used.
pub fn select_event<'a>(
    candidates: &'a [SearchResult],
    owner: Option<&EventOwner>,
) -> Option<&'a SearchResult> {
    let first = candidates.first()?;
    let matched = owner.and_then(|owner| {
        candidates
            .iter()
            .find(|candidate| candidate.event.owner().matches(owner))
    });
    Some(matched.unwrap_or(first))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chara(id: u32, name: &str) -> EventOwner {
        EventOwner::Chara {
            id,
            name: name.to_string(),
        }
    }

    fn scenario() -> EventOwner {
        EventOwner::Scenario {
            name: "URA".to_string(),
        }
    }

    fn record(title: &str, owner: EventOwner) -> EventRecord {
        EventRecord::new(title, owner, "", Vec::new())
    }

    fn search(records: Vec<EventRecord>) -> EventSearch {
        EventSearch::new(records.into())
    }

    #[test]
    fn test_similarity() {
        assert_eq!(similarity("", ""), 1.0);
        assert_eq!(similarity("abc", ""), 0.0);
        assert_eq!(similarity("abc", "abc"), 1.0);
        assert_eq!(similarity("kitten", "sitting"), 1.0 - 3.0 / 7.0);
        // chars, not bytes
        assert_eq!(similarity("夏合宿", "夏合宮"), 1.0 - 1.0 / 3.0);
    }

    #[test]
    fn test_owner_hint_resolves_shared_title() {
        let s = search(vec![
            record("Title A", chara(1, "X")),
            record("Title A", chara(2, "Y")),
            record("Title B", chara(2, "Y")),
        ]);

        let results = s.search_by_threshold("Title A", 0.5, Some(EventCategory::Chara));
        let top = top_candidates(&results);
        assert_eq!(top.len(), 2);

        let picked = select_event(top, Some(&chara(2, "Y"))).unwrap();
        assert_eq!(picked.event.owner(), &chara(2, "Y"));
        assert_eq!(picked.event.title(), "Title A");

        let fallback = select_event(top, None).unwrap();
        assert_eq!(fallback.event.owner(), &chara(1, "X"));

        let unknown = select_event(top, Some(&chara(3, "Z"))).unwrap();
        assert_eq!(unknown.event.owner(), &chara(1, "X"));
    }

    #[test]
    fn test_threshold_is_strict_floor() {
        let s = search(vec![
            record("abcd", scenario()),
            record("abcx", scenario()),
            record("wxyz", scenario()),
        ]);

        let results = s.search_by_threshold("abcd", 0.75, None);
        assert_eq!(results.len(), 1);
        assert!(results.iter().all(|r| r.score > 0.75));

        let results = s.search_by_threshold("abcd", 0.5, None);
        assert_eq!(results.len(), 2);
        assert!(results[0].score >= results[1].score);

        assert!(s.search_by_threshold("qqqq", 0.5, None).is_empty());
    }

    #[test]
    fn test_threshold_search_filters_category() {
        let s = search(vec![
            record("お大事に", chara(1, "X")),
            record("お大事に", scenario()),
        ]);
        let results = s.search_by_threshold("お大事に", 0.5, Some(EventCategory::Scenario));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].event.owner(), &scenario());
    }

    #[test]
    fn test_full_width_digits_match() {
        let s = search(vec![record("夏合宿(2年目)にて", scenario())]);
        let results = s.search_by_threshold("夏合宿（２年目）にて", 0.9, None);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].score, 1.0);

        let s = search(vec![record("ダンスレッスン3", scenario())]);
        let results = s.search_by_threshold("ダンスレッスン③", 0.9, None);
        assert_eq!(results[0].score, 1.0);
    }

    #[test]
    fn test_race_suffix_ignored() {
        let s = search(vec![record("レース勝利！(1着)", scenario())]);
        let results = s.search_by_threshold("レース勝利!", 0.9, None);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].score, 1.0);
    }

    #[test]
    fn test_empty_query_returns_nothing() {
        let s = search(vec![record("abc", scenario())]);
        assert!(s.search_by_threshold("", 0.0, None).is_empty());
        assert!(s.search_by_threshold(" ！？ ", 0.0, None).is_empty());
        assert!(s.search_top_k("", 3).is_empty());
    }

    fn pool(count: usize) -> EventSearch {
        let records = (0..count)
            .map(|i| record(&format!("event{}", i % 37), chara(i as u32, "X")))
            .collect();
        search(records)
    }

    #[test]
    fn test_top_k_size_and_order() {
        let s = pool(100);
        for k in [1, 3, 10, 100, 250] {
            let results = s.search_top_k("event12", k);
            assert_eq!(results.len(), k.min(100));
            assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
        }
    }

    #[test]
    fn test_top_k_selection_equals_full_sort() {
        let s = pool(200);
        let query = normalize_for_comparison("event21");

        let mut full: Vec<(usize, f32)> = s
            .events()
            .iter()
            .enumerate()
            .map(|(i, e)| (i, similarity(&query, e.normalized_title())))
            .collect();
        full.sort_by(|a, b| b.1.total_cmp(&a.1));

        // 200 > 5 * k, so these take the selection path
        for k in [1, 4, 20, 39] {
            let results = s.search_top_k("event21", k);
            let expected: Vec<_> = full[..k]
                .iter()
                .map(|&(i, score)| (s.events()[i].clone(), score))
                .collect();
            let actual: Vec<_> = results.into_iter().map(|r| (r.event, r.score)).collect();
            assert_eq!(actual, expected, "k = {k}");
        }
    }
}
