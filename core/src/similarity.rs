use crate::error::{QueryError, Result};
use crate::vectorizer::DocumentVector;
use crate::DocId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Caller-owned flag checked between scoring and ranking.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self { Self::default() }
    pub fn cancel(&self) { self.0.store(true, Ordering::Release); }
    pub fn is_cancelled(&self) -> bool { self.0.load(Ordering::Acquire) }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub doc_id: DocId,
    pub score: f32,
}

#[derive(Debug, Clone)]
struct Posting {
    doc_id: DocId,
    weight: f32,
}

/// Document vectors in catalog order plus a term -> postings map for scoring.
#[derive(Debug, Clone, Default)]
pub struct SimilarityIndex {
    vectors: Vec<DocumentVector>,
    titles: Vec<String>,
    postings: Vec<Vec<Posting>>,
}

impl SimilarityIndex {
    /// `titles` must be parallel to `vectors`; they key the duplicate-title filter.
    pub fn new(vectors: Vec<DocumentVector>, titles: Vec<String>, num_terms: usize) -> Self {
        debug_assert_eq!(vectors.len(), titles.len());
        let mut postings: Vec<Vec<Posting>> = vec![Vec::new(); num_terms];
        for (doc_id, v) in vectors.iter().enumerate() {
            for &(tid, weight) in &v.entries {
                let tid = tid as usize;
                if tid >= postings.len() {
                    postings.resize_with(tid + 1, Vec::new);
                }
                postings[tid].push(Posting { doc_id: doc_id as DocId, weight });
            }
        }
        Self { vectors, titles, postings }
    }

    pub fn len(&self) -> usize { self.vectors.len() }

    pub fn is_empty(&self) -> bool { self.vectors.is_empty() }

    pub fn vector(&self, doc: usize) -> Option<&DocumentVector> { self.vectors.get(doc) }

    pub fn vectors(&self) -> &[DocumentVector] { &self.vectors }

    fn check(&self, doc: usize) -> Result<()> {
        if doc >= self.vectors.len() {
            return Err(QueryError::IndexOutOfRange { index: doc, len: self.vectors.len() });
        }
        Ok(())
    }

    /// Cosine similarity of two documents. A non-zero document scores exactly
    /// 1 against itself.
    pub fn score(&self, a: usize, b: usize) -> Result<f32> {
        self.check(a)?;
        self.check(b)?;
        let va = &self.vectors[a];
        if a == b {
            return Ok(if va.is_zero() { 0.0 } else { 1.0 });
        }
        Ok(va.dot(&self.vectors[b]).clamp(0.0, 1.0))
    }

    /// Up to `k` nearest documents to `query`, best first, ties by ascending
    /// index. The query itself, untitled rows and repeats of an already
    /// emitted title (including the query's own title) are skipped.
    pub fn top_k(&self, query: usize, k: usize, cancel: Option<&CancelToken>) -> Result<Vec<Neighbor>> {
        self.check(query)?;
        let mut scores = vec![0.0f32; self.vectors.len()];
        for &(tid, q_w) in &self.vectors[query].entries {
            if let Some(plist) = self.postings.get(tid as usize) {
                for p in plist {
                    scores[p.doc_id as usize] += p.weight * q_w;
                }
            }
        }

        if cancel.is_some_and(CancelToken::is_cancelled) {
            tracing::debug!(query, "top_k cancelled before ranking");
            return Err(QueryError::Cancelled);
        }

        let mut ranked: Vec<(usize, f32)> = scores
            .into_iter()
            .enumerate()
            .filter(|&(j, _)| j != query && !self.titles[j].is_empty())
            .map(|(j, s)| (j, s.clamp(0.0, 1.0)))
            .collect();
        if k == 0 || ranked.is_empty() {
            return Ok(Vec::new());
        }
        let order = |a: &(usize, f32), b: &(usize, f32)| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0));

        // Only the best `window` candidates are sorted; the window doubles when
        // duplicate titles eat into it before `k` distinct hits are found.
        let mut window = k.saturating_mul(2);
        loop {
            let take = window.min(ranked.len());
            if take < ranked.len() {
                ranked.select_nth_unstable_by(take, order);
            }
            let mut head = ranked[..take].to_vec();
            head.sort_unstable_by(order);

            let mut emitted: HashSet<&str> = HashSet::new();
            emitted.insert(self.titles[query].as_str());
            let mut out = Vec::with_capacity(k.min(take));
            for (j, score) in head {
                if out.len() == k {
                    break;
                }
                if emitted.insert(self.titles[j].as_str()) {
                    out.push(Neighbor { doc_id: j as DocId, score });
                }
            }
            if out.len() == k || take == ranked.len() {
                return Ok(out);
            }
            window = window.saturating_mul(2);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vectorizer::Vectorizer;

    fn index_of(docs: &[(&str, Vec<u32>)]) -> SimilarityIndex {
        let v = Vectorizer::from_idf(vec![1.0; 4], docs.len());
        let vectors = docs.iter().map(|(_, ids)| v.vectorize(ids)).collect();
        let titles = docs.iter().map(|(t, _)| t.to_string()).collect();
        SimilarityIndex::new(vectors, titles, 4)
    }

    #[test]
    fn out_of_range_query() {
        let idx = index_of(&[("a", vec![0])]);
        assert_eq!(
            idx.top_k(3, 5, None),
            Err(QueryError::IndexOutOfRange { index: 3, len: 1 })
        );
    }

    #[test]
    fn ties_break_by_index_and_self_excluded() {
        let idx = index_of(&[("a", vec![0]), ("b", vec![1]), ("c", vec![0]), ("d", vec![0])]);
        let hits = idx.top_k(0, 10, None).unwrap();
        let ids: Vec<_> = hits.iter().map(|n| n.doc_id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
        assert_eq!(hits[2].score, 0.0);
    }

    #[test]
    fn duplicate_titles_are_skipped_and_backfilled() {
        let idx = index_of(&[("a", vec![0]), ("b", vec![0]), ("b", vec![0]), ("a", vec![0]), ("c", vec![1])]);
        let hits = idx.top_k(0, 2, None).unwrap();
        let ids: Vec<_> = hits.iter().map(|n| n.doc_id).collect();
        assert_eq!(ids, vec![1, 4]);
    }

    #[test]
    fn untitled_rows_never_rank() {
        let idx = index_of(&[("heat", vec![0]), ("", vec![0]), ("alien", vec![1])]);
        let hits = idx.top_k(0, 5, None).unwrap();
        let ids: Vec<_> = hits.iter().map(|n| n.doc_id).collect();
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn backfill_widens_past_many_duplicates() {
        let mut docs = vec![("q", vec![0])];
        docs.extend((0..10).map(|_| ("dup", vec![0])));
        docs.extend([("x", vec![1]), ("y", vec![2])]);
        let idx = index_of(&docs);
        let hits = idx.top_k(0, 3, None).unwrap();
        let ids: Vec<_> = hits.iter().map(|n| n.doc_id).collect();
        assert_eq!(ids, vec![1, 11, 12]);
        assert!(idx.top_k(0, 0, None).unwrap().is_empty());
    }

    #[test]
    fn self_score_is_exactly_one() {
        let idx = index_of(&[("a", vec![0, 1, 1, 2]), ("b", vec![])]);
        assert_eq!(idx.score(0, 0).unwrap(), 1.0);
        assert_eq!(idx.score(1, 1).unwrap(), 0.0);
        assert_eq!(idx.score(0, 1).unwrap(), 0.0);
    }

    #[test]
    fn cancelled_token_aborts() {
        let idx = index_of(&[("a", vec![0]), ("b", vec![0])]);
        let token = CancelToken::new();
        token.cancel();
        assert_eq!(idx.top_k(0, 1, Some(&token)), Err(QueryError::Cancelled));
    }
}
