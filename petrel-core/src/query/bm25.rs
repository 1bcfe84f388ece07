//! BM25 scoring constants and utilities
//!
//! All scoring arithmetic is IEEE-754 double; same inputs in the same
//! evaluation order yield bit-identical scores.

use crate::Score;

/// BM25 k1 parameter - term frequency saturation
pub const BM25_K1: Score = 1.2;

/// BM25 b parameter - document length normalization strength
pub const BM25_B: Score = 0.75;

/// Corpus size contract for idf. Fixed, not measured.
pub const CORPUS_SIZE: Score = 1_000_000.0;

/// Robertson/Sparck-Jones idf: `ln((N - df + 0.5) / (df + 0.5))`.
///
/// Goes negative once a term appears in more than half the corpus;
/// that is tolerated downstream.
#[inline]
pub fn idf(doc_freq: u32) -> Score {
    let df = Score::from(doc_freq);
    ((CORPUS_SIZE - df + 0.5) / (df + 0.5)).ln()
}

/// BM25 contribution of one posting.
///
/// `K = k1 * ((1 - b) + b * docLen / avgDocLen)`, then
/// `idf * (k1 + 1) * freq / (K + freq)`.
#[inline]
pub fn score(freq: u32, doc_freq: u32, doc_length: u32, avg_doc_length: f64) -> Score {
    let tf = Score::from(freq);
    let k = BM25_K1 * ((1.0 - BM25_B) + BM25_B * (Score::from(doc_length) / avg_doc_length));
    idf(doc_freq) * (BM25_K1 + 1.0) * tf / (k + tf)
}

/// Upper bound on any posting's contribution from this list, for
/// MaxScore pruning: frequency at its theoretical ceiling (the list
/// length) against the average document length as the reference, so the
/// normalized length ratio is 1 and `K = k1`.
#[inline]
pub fn upper_bound(list_length: u32) -> Score {
    let tf = Score::from(list_length);
    idf(list_length) * (BM25_K1 + 1.0) * tf / (BM25_K1 + tf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idf_values() {
        // df = 10: ln((10^6 - 10 + 0.5) / 10.5) ~ 11.51
        assert!((idf(10) - 11.51).abs() < 0.01);
        // df = 100000: ln((10^6 - 10^5 + 0.5) / (10^5 + 0.5)) ~ 2.20
        assert!((idf(100_000) - 2.197).abs() < 0.01);
    }

    #[test]
    fn test_idf_negative_for_dominant_terms() {
        assert!(idf(900_000) < 0.0);
    }

    #[test]
    fn test_score_at_average_length() {
        // docLength == avgDocLength makes K = k1 = 1.2
        let avg = 50.0;
        let score_x = score(1, 10, 50, avg);
        assert!((score_x - idf(10) * 2.2 / 2.2).abs() < 1e-9);

        let score_y = score(2, 100_000, 50, avg);
        assert!((score_y - idf(100_000) * (2.2 * 2.0) / 3.2).abs() < 1e-9);

        // Combined two-term document score from the same scenario
        assert!((score_x + score_y - 14.54).abs() < 0.02);
    }

    #[test]
    fn test_upper_bound_dominates_scores() {
        let avg = 50.0;
        for list_length in [1u32, 5, 100, 10_000] {
            let bound = upper_bound(list_length);
            for freq in 1..=list_length.min(50) {
                // Any real doc at least as long as average cannot beat the bound
                for doc_len in [50u32, 80, 500] {
                    assert!(score(freq, list_length, doc_len, avg) <= bound + 1e-12);
                }
            }
        }
    }
}
