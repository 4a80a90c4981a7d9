//! Choosing which functions go into a single `firebase deploy` run.
//!
//! Two modes:
//! - search: keep names matching a prefix and/or suffix
//! - batch: split the list into `B` contiguous slices of `ceil(N / B)`
//!   names and keep slice `I`
//!
//! Both keep the manifest order.

use crate::error::DeployError;
use crate::manifest::FunctionList;

/// Upper bound on `--batches`
pub const MAX_BATCHES: usize = 25;

/// Prefix the Firebase CLI expects in front of each name passed to `--only`
pub const FUNCTIONS_PREFIX: &str = "functions:";

/// Validated batch request: `1 <= index <= total <= MAX_BATCHES`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSpec {
    total: usize,
    index: usize,
}

impl BatchSpec {
    /// Validate a batch count and 1-based batch index
    pub fn new(total: i64, index: i64) -> Result<Self, DeployError> {
        let total = usize::try_from(total)
            .ok()
            .filter(|t| (1..=MAX_BATCHES).contains(t))
            .ok_or(DeployError::InvalidBatchCount {
                count: total,
                max: MAX_BATCHES,
            })?;
        let index = usize::try_from(index)
            .ok()
            .filter(|i| (1..=total).contains(i))
            .ok_or(DeployError::InvalidBatchIndex { index, total })?;

        Ok(Self { total, index })
    }

    #[inline]
    pub fn total(&self) -> usize {
        self.total
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of names per batch for a list of `len` names
    #[inline]
    pub fn batch_size(&self, len: usize) -> usize {
        len.div_ceil(self.total)
    }

    /// Half-open index range of this batch, clamped to `len`
    pub fn range(&self, len: usize) -> std::ops::Range<usize> {
        let size = self.batch_size(len);
        let start = (size * (self.index - 1)).min(len);
        let end = (start + size).min(len);
        start..end
    }
}

/// How the subset is chosen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionMode {
    Search {
        starts_with: Option<String>,
        ends_with: Option<String>,
    },
    Batch(BatchSpec),
}

impl SelectionMode {
    /// Search mode; empty strings count as absent
    pub fn search(starts_with: Option<String>, ends_with: Option<String>) -> Self {
        SelectionMode::Search {
            starts_with: starts_with.filter(|s| !s.is_empty()),
            ends_with: ends_with.filter(|s| !s.is_empty()),
        }
    }
}

/// Select function names from `list` according to `mode`
pub fn select<'a>(list: &'a FunctionList, mode: &SelectionMode) -> Result<Vec<&'a str>, DeployError> {
    match mode {
        SelectionMode::Search {
            starts_with,
            ends_with,
        } => search(list, starts_with.as_deref(), ends_with.as_deref()),
        SelectionMode::Batch(spec) => Ok(batch(list, spec)),
    }
}

/// Case-sensitive prefix/suffix filter. At least one criterion is required.
pub fn search<'a>(
    list: &'a FunctionList,
    starts_with: Option<&str>,
    ends_with: Option<&str>,
) -> Result<Vec<&'a str>, DeployError> {
    let starts_with = starts_with.filter(|s| !s.is_empty());
    let ends_with = ends_with.filter(|s| !s.is_empty());
    if starts_with.is_none() && ends_with.is_none() {
        return Err(DeployError::NoSelectionCriteria);
    }

    Ok(list
        .iter()
        .filter(|name| starts_with.map_or(true, |s| name.starts_with(s)))
        .filter(|name| ends_with.map_or(true, |e| name.ends_with(e)))
        .collect())
}

/// Contiguous slice for one batch. Empty when the batch lies past the end.
pub fn batch<'a>(list: &'a FunctionList, spec: &BatchSpec) -> Vec<&'a str> {
    list.names()[spec.range(list.len())]
        .iter()
        .map(String::as_str)
        .collect()
}

/// Build the `--only` argument: `functions:a,functions:b`.
/// An empty selection yields an empty string.
pub fn only_argument<S: AsRef<str>>(names: &[S]) -> String {
    names
        .iter()
        .map(|name| format!("{FUNCTIONS_PREFIX}{}", name.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}
