use crate::alias::AliasTable;
use crate::classify::compare;
use crate::error::ReconError;
use crate::model::{BatchSummary, Comparison, IngredientId};

impl BatchSummary {
    pub fn add(&mut self, c: &Comparison) {
        self.documents += 1;
        if c.is_ok() {
            self.all_ok += 1;
        }
        if !c.missing.is_empty() {
            self.with_missing += 1;
        }
        if !c.extra.is_empty() {
            self.with_extra += 1;
        }
        for e in &c.missing {
            *self.missing_by_group.entry(e.group).or_insert(0) += 1;
            *self.missing_by_id.entry(e.id).or_insert(0) += 1;
        }
        for e in &c.extra {
            *self.extra_by_group.entry(e.group).or_insert(0) += 1;
            *self.extra_by_id.entry(e.id).or_insert(0) += 1;
        }
    }
}

/// Compute summary statistics from per-document comparisons.
pub fn compute_summary<'a>(comparisons: impl IntoIterator<Item = &'a Comparison>) -> BatchSummary {
    let mut summary = BatchSummary::default();
    for c in comparisons {
        summary.add(c);
    }
    summary
}

// ---------------------------------------------------------------------------
// Run log replay
// ---------------------------------------------------------------------------

/// A document line of a run log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportLine {
    /// `... all ok.`
    Ok,
    /// The lists after `expected: ` and `got: `.
    Diff {
        expected: Vec<IngredientId>,
        found: Vec<IngredientId>,
    },
}

impl ReportLine {
    /// `None` for lines that are not a document report (headers, timings,
    /// or lists that do not hold identifiers). Names may contain brackets,
    /// so the lists are located by their labels.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim_end();
        if line.ends_with("all ok.") {
            return Some(Self::Ok);
        }

        Some(Self::Diff {
            expected: list_after(line, "expected: ")?,
            found: list_after(line, "got: ")?,
        })
    }
}

/// The `[..]` list right after the last occurrence of `label`.
fn list_after(line: &str, label: &str) -> Option<Vec<IngredientId>> {
    let rest = &line[line.rfind(label)? + label.len()..];
    let inner = rest.strip_prefix('[')?;
    inner[..inner.find(']')?]
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse().ok())
        .collect()
}

/// Rebuild a batch summary from the text of a previous run log. Lines
/// starting with `#` are header comments.
pub fn summarize_log(log: &str, table: &AliasTable) -> Result<BatchSummary, ReconError> {
    let mut summary = BatchSummary::default();
    for line in log.lines().filter(|l| !l.starts_with('#')) {
        match ReportLine::parse(line) {
            Some(ReportLine::Ok) => {
                summary.documents += 1;
                summary.all_ok += 1;
            }
            Some(ReportLine::Diff { expected, found }) => {
                summary.add(&compare(expected, found, table)?);
            }
            None => {}
        }
    }
    Ok(summary)
}
