use crate::config::AlignerThresholds;
use crate::text::normalize_text;
use crate::transcript::TranscriptIndex;

/// Where a script line was found on the source timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alignment {
    pub start_frame: i64,
    pub end_frame: i64,
    /// Index of the first matched word.
    pub start_index: usize,
    /// Tokens that matched exactly along the walk.
    pub score: usize,
}

pub trait LineAligner {
    /// Locate `line` in the transcript, or `None` when it is not there.
    fn align(&self, line: &str, index: &TranscriptIndex) -> Option<Alignment>;
}

/// Longest-common-substring gate, then a token walk from every place the
/// line's first word was spoken. When that word never occurs the walk
/// starts from the second token instead.
#[derive(Debug, Clone, Default)]
pub struct FuzzyAligner {
    thresholds: AlignerThresholds,
}

impl FuzzyAligner {
    pub fn new(thresholds: AlignerThresholds) -> Self {
        Self { thresholds }
    }
}

impl LineAligner for FuzzyAligner {
    fn align(&self, line: &str, index: &TranscriptIndex) -> Option<Alignment> {
        let target = normalize_text(line);
        if target.is_empty() || index.is_empty() {
            return None;
        }

        let target_chars: Vec<char> = target.chars().collect();
        let longest = longest_common_substring(index.master_chars(), &target_chars);
        if (longest as f64) < target_chars.len() as f64 * self.thresholds.min_substring_ratio {
            return None;
        }

        let tokens: Vec<&str> = target.split(' ').collect();
        let (tokens, candidates) = start_candidates(&tokens, index);

        let (start_index, score) =
            best_walk(&tokens, &candidates, index, self.thresholds.abort_slope)?;

        if score as f64 / tokens.len() as f64 <= self.thresholds.min_score_ratio {
            return None;
        }

        let words = index.words();
        let last = (start_index + score).min(words.len() - 1);
        Some(Alignment {
            start_frame: words[start_index].start_frame,
            end_frame: words[last].end_frame,
            start_index,
            score,
        })
    }
}

/// Word indices where the walk may start, and the tokens it compares.
fn start_candidates<'t>(
    tokens: &[&'t str],
    index: &TranscriptIndex,
) -> (Vec<&'t str>, Vec<usize>) {
    let positions = |token: &str| -> Vec<usize> {
        index
            .words()
            .iter()
            .enumerate()
            .filter(|(_, w)| w.normalized == token)
            .map(|(i, _)| i)
            .collect()
    };

    let first = positions(tokens[0]);
    if first.is_empty() && tokens.len() > 1 {
        let second = positions(tokens[1]);
        if !second.is_empty() {
            return (tokens[1..].to_vec(), second);
        }
    }
    (tokens.to_vec(), first)
}

/// Highest-scoring walk as `(start_index, score)`; ties keep the earliest.
fn best_walk(
    tokens: &[&str],
    candidates: &[usize],
    index: &TranscriptIndex,
    abort_slope: f64,
) -> Option<(usize, usize)> {
    let words = index.words();
    let mut best: Option<(usize, usize)> = None;

    for &start in candidates {
        let span = tokens.len().min(words.len() - start);
        let mut score = 0usize;
        for k in 0..span {
            if words[start + k].normalized == tokens[k] {
                score += 1;
            } else if (score as f64) < k as f64 * abort_slope {
                break;
            }
        }
        if score > best.map(|(_, s)| s).unwrap_or(0) {
            best = Some((start, score));
        }
    }

    best
}

/// Length of the longest run shared by `a` and `b`.
fn longest_common_substring(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    let mut longest = 0;

    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb { prev[j] + 1 } else { 0 };
            longest = longest.max(curr[j + 1]);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    longest
}
