//! Named reductions over numeric samples.
//!
//! The table is fixed at compile time and never mutated.

/// A named reduction over a slice of values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    Count,
    Mean,
    Sum,
    Min,
    Max,
}

/// All reductions, keyed by name.
pub const REDUCTIONS: [(&str, Reduction); 5] = [
    ("count", Reduction::Count),
    ("mean", Reduction::Mean),
    ("sum", Reduction::Sum),
    ("min", Reduction::Min),
    ("max", Reduction::Max),
];

impl Reduction {
    /// Look up a reduction by name.
    pub fn by_name(name: &str) -> Option<Self> {
        REDUCTIONS
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, reduction)| *reduction)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Reduction::Count => "count",
            Reduction::Mean => "mean",
            Reduction::Sum => "sum",
            Reduction::Min => "min",
            Reduction::Max => "max",
        }
    }

    /// Apply the reduction.
    ///
    /// `mean` of nothing is 0; `min`/`max` of nothing is `None`.
    pub fn apply(&self, values: &[f64]) -> Option<f64> {
        match self {
            Reduction::Count => Some(values.len() as f64),
            Reduction::Sum => Some(values.iter().sum()),
            Reduction::Mean => Some(mean(values)),
            Reduction::Min => values.iter().copied().reduce(f64::min),
            Reduction::Max => values.iter().copied().reduce(f64::max),
        }
    }
}

/// Arithmetic mean, 0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
