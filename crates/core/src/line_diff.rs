//! Line-level text diff used for revision records.
//!
//! Standard longest-common-subsequence diff over lines. Consecutive lines of
//! the same kind are grouped into spans. Line terminators are kept in the
//! span values, so concatenating every non-removed span reproduces the new
//! text exactly and every non-added span reproduces the old text.

use serde::{Deserialize, Serialize};

/// Largest LCS table (in cells) built for the changed middle of two texts.
///
/// Beyond this the middle is reported as one removed run followed by one
/// added run, which keeps memory at `O(MAX_LCS_CELLS)` regardless of input
/// size. Both texts still rebuild exactly from the spans.
pub const MAX_LCS_CELLS: usize = 4_000_000;

/// The type of a span in a diff result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    Added,
    Removed,
    Unchanged,
}

/// A run of consecutive lines sharing one [`LineKind`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSpan {
    pub kind: LineKind,
    pub value: String,
    pub count: usize,
}

/// Line totals of a text diff.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineStats {
    pub added: usize,
    pub removed: usize,
    pub unchanged: usize,
}

impl LineStats {
    pub fn from_spans(spans: &[LineSpan]) -> Self {
        spans.iter().fold(Self::default(), |mut acc, span| {
            match span.kind {
                LineKind::Added => acc.added += span.count,
                LineKind::Removed => acc.removed += span.count,
                LineKind::Unchanged => acc.unchanged += span.count,
            }
            acc
        })
    }
}

fn split_lines(text: &str) -> Vec<&str> {
    text.split_inclusive('\n').collect()
}

/// Compute a line diff between two texts.
///
/// Identical inputs produce exactly one `unchanged` span (with `count == 0`
/// when both are empty). Changed regions too large for [`MAX_LCS_CELLS`]
/// are not minimised.
pub fn text_diff(old: &str, new: &str) -> Vec<LineSpan> {
    if old == new {
        return vec![LineSpan {
            kind: LineKind::Unchanged,
            value: old.to_string(),
            count: split_lines(old).len(),
        }];
    }

    let old_lines = split_lines(old);
    let new_lines = split_lines(new);

    // Common prefix and suffix never take part in the LCS table.
    let prefix = old_lines
        .iter()
        .zip(&new_lines)
        .take_while(|(a, b)| a == b)
        .count();
    let suffix = old_lines[prefix..]
        .iter()
        .rev()
        .zip(new_lines[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    let old_mid = &old_lines[prefix..old_lines.len() - suffix];
    let new_mid = &new_lines[prefix..new_lines.len() - suffix];

    let mut ops: Vec<(LineKind, &str)> = Vec::with_capacity(old_lines.len() + new_lines.len());
    ops.extend(old_lines[..prefix].iter().map(|l| (LineKind::Unchanged, *l)));
    ops.extend(lcs_ops(old_mid, new_mid));
    ops.extend(
        old_lines[old_lines.len() - suffix..]
            .iter()
            .map(|l| (LineKind::Unchanged, *l)),
    );

    group_spans(ops)
}

fn lcs_ops<'a>(old: &[&'a str], new: &[&'a str]) -> Vec<(LineKind, &'a str)> {
    let m = old.len();
    let n = new.len();

    let cells = (m + 1).saturating_mul(n + 1);
    if cells > MAX_LCS_CELLS {
        return old
            .iter()
            .map(|l| (LineKind::Removed, *l))
            .chain(new.iter().map(|l| (LineKind::Added, *l)))
            .collect();
    }

    // Row-major LCS table; `at(i, j)` is the LCS length of old[..i], new[..j].
    let width = n + 1;
    let at = |i: usize, j: usize| i * width + j;
    let mut lcs = vec![0u32; cells];
    for i in 1..=m {
        for j in 1..=n {
            lcs[at(i, j)] = if old[i - 1] == new[j - 1] {
                lcs[at(i - 1, j - 1)] + 1
            } else {
                lcs[at(i - 1, j)].max(lcs[at(i, j - 1)])
            };
        }
    }

    // Backtrack from the end; removals end up ahead of additions once reversed.
    let mut result = Vec::with_capacity(m + n);
    let mut i = m;
    let mut j = n;
    while i > 0 || j > 0 {
        if i > 0 && j > 0 && old[i - 1] == new[j - 1] {
            result.push((LineKind::Unchanged, old[i - 1]));
            i -= 1;
            j -= 1;
        } else if j > 0 && (i == 0 || lcs[at(i, j - 1)] >= lcs[at(i - 1, j)]) {
            result.push((LineKind::Added, new[j - 1]));
            j -= 1;
        } else {
            result.push((LineKind::Removed, old[i - 1]));
            i -= 1;
        }
    }

    result.reverse();
    result
}

fn group_spans(ops: Vec<(LineKind, &str)>) -> Vec<LineSpan> {
    let mut spans: Vec<LineSpan> = Vec::new();
    for (kind, line) in ops {
        match spans.last_mut() {
            Some(last) if last.kind == kind => {
                last.value.push_str(line);
                last.count += 1;
            }
            _ => spans.push(LineSpan {
                kind,
                value: line.to_string(),
                count: 1,
            }),
        }
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rebuild(spans: &[LineSpan], skip: LineKind) -> String {
        spans
            .iter()
            .filter(|s| s.kind != skip)
            .map(|s| s.value.as_str())
            .collect()
    }

    #[test]
    fn identical_texts_single_unchanged_span() {
        let spans = text_diff("line1\nline2\n", "line1\nline2\n");
        assert_eq!(
            spans,
            vec![LineSpan {
                kind: LineKind::Unchanged,
                value: "line1\nline2\n".to_string(),
                count: 2,
            }]
        );
    }

    #[test]
    fn empty_texts_single_empty_span() {
        let spans = text_diff("", "");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].kind, LineKind::Unchanged);
        assert_eq!(spans[0].count, 0);
    }

    #[test]
    fn added_line() {
        let spans = text_diff("line1\n", "line1\nline2\n");
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].kind, LineKind::Unchanged);
        assert_eq!(spans[1].kind, LineKind::Added);
        assert_eq!(spans[1].value, "line2\n");
        assert_eq!(spans[1].count, 1);
    }

    #[test]
    fn removed_line() {
        let spans = text_diff("line1\nline2\n", "line1\n");
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[1].kind, LineKind::Removed);
        assert_eq!(spans[1].value, "line2\n");
    }

    #[test]
    fn changed_line_is_removed_then_added() {
        let spans = text_diff("hello", "world");
        let kinds: Vec<_> = spans.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec![LineKind::Removed, LineKind::Added]);
    }

    #[test]
    fn consecutive_lines_grouped() {
        let spans = text_diff("a\nb\n", "a\nx\ny\nz\nb\n");
        assert_eq!(spans.len(), 3);
        assert_eq!(spans[1].kind, LineKind::Added);
        assert_eq!(spans[1].count, 3);
        assert_eq!(spans[1].value, "x\ny\nz\n");
    }

    #[test]
    fn spans_reconstruct_both_sides() {
        let old = "intro\nkeep\nold middle\nkeep too\nend";
        let new = "intro\nkeep\nnew middle\nextra\nkeep too\nfinale";
        let spans = text_diff(old, new);

        assert_eq!(rebuild(&spans, LineKind::Added), old);
        assert_eq!(rebuild(&spans, LineKind::Removed), new);
    }

    #[test]
    fn stats_count_lines_not_spans() {
        let spans = text_diff("a\nb\nc\n", "a\nB\nC\nc\nd\n");
        let stats = LineStats::from_spans(&spans);
        assert_eq!(stats.removed, 1);
        assert_eq!(stats.added, 3);
        assert_eq!(stats.unchanged, 2);
    }

    #[test]
    fn oversized_change_falls_back_to_replace() {
        let old: String = (0..2_100).map(|i| format!("old {i}\n")).collect();
        let new: String = (0..2_100).map(|i| format!("new {i}\n")).collect();
        let old = format!("head\n{old}tail\n");
        let new = format!("head\n{new}tail\n");

        let spans = text_diff(&old, &new);
        let kinds: Vec<LineKind> = spans.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                LineKind::Unchanged,
                LineKind::Removed,
                LineKind::Added,
                LineKind::Unchanged,
            ]
        );
        assert_eq!(spans[1].count, 2_100);
        assert_eq!(rebuild(&spans, LineKind::Added), old);
        assert_eq!(rebuild(&spans, LineKind::Removed), new);
    }
}
