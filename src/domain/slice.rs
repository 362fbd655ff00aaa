// Slicer - trailing windows over a normalized series
use super::series::{Field, NormalizedSeries, Point};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Window sizes offered when the series is longer than them.
pub const THRESHOLDS: [usize; 5] = [2, 10, 20, 50, 100];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SliceSelection {
    All,
    Last(usize),
}

impl fmt::Display for SliceSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SliceSelection::All => f.write_str("all"),
            SliceSelection::Last(n) => write!(f, "{n}"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid slice selection '{0}', expected \"all\" or a positive count")]
pub struct ParseSliceError(String);

impl FromStr for SliceSelection {
    type Err = ParseSliceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("all") {
            return Ok(SliceSelection::All);
        }
        match trimmed.parse::<usize>() {
            Ok(n) if n > 0 => Ok(SliceSelection::Last(n)),
            _ => Err(ParseSliceError(s.to_string())),
        }
    }
}

impl Serialize for SliceSelection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Accepts `"all"`, `"20"` or `20`.
impl<'de> Deserialize<'de> for SliceSelection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Count(usize),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Count(0) => Err(D::Error::custom("slice count must be positive")),
            Repr::Count(n) => Ok(SliceSelection::Last(n)),
            Repr::Text(s) => s.parse().map_err(D::Error::custom),
        }
    }
}

/// Borrowed trailing window of a series. The series itself is never modified.
#[derive(Debug, Clone, Copy)]
pub struct SlicedView<'a> {
    pub series: &'a NormalizedSeries,
    pub labels: &'a [String],
    pub points: &'a [Point],
}

impl<'a> SlicedView<'a> {
    pub fn fields(&self) -> &'a [Field] {
        &self.series.fields
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

pub fn slice(series: &NormalizedSeries, selection: SliceSelection) -> SlicedView<'_> {
    let len = series.points.len().min(series.labels.len());
    let start = match selection {
        SliceSelection::All => 0,
        SliceSelection::Last(n) => len - n.min(len),
    };

    SlicedView {
        series,
        labels: &series.labels[start..len],
        points: &series.points[start..len],
    }
}

/// Options for a series of `len` points: every threshold below `len`, then `All`.
pub fn slicer_options(len: usize) -> Vec<SliceSelection> {
    THRESHOLDS
        .into_iter()
        .filter(|&t| len > t)
        .map(SliceSelection::Last)
        .chain(std::iter::once(SliceSelection::All))
        .collect()
}

/// Resolve a configured default against the options offered for this series.
pub fn effective_selection(preferred: SliceSelection, options: &[SliceSelection]) -> SliceSelection {
    if options.contains(&preferred) {
        preferred
    } else {
        SliceSelection::All
    }
}
