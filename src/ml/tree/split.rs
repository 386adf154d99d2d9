use ndarray::ArrayView2;

use super::grow::TreeParams;

/// Best split found for one leaf.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitCandidate {
    pub feature: usize,
    pub threshold: f32,
    pub gain: f64,
}

/// Strategy for locating the highest-gain split among a leaf's rows.
pub trait SplitSearch {
    fn best_split(
        &self,
        x: ArrayView2<'_, f32>,
        rows: &[usize],
        grad: &[f64],
        hess: &[f64],
        params: &TreeParams,
    ) -> Option<SplitCandidate>;
}

/// Running gradient/hessian totals for one side of a split.
#[derive(Debug, Clone, Copy, Default)]
struct GradStats {
    grad: f64,
    hess: f64,
    count: usize,
}

impl GradStats {
    fn push(&mut self, grad: f64, hess: f64, count: usize) {
        self.grad += grad;
        self.hess += hess;
        self.count += count;
    }

    fn minus(&self, other: &GradStats) -> GradStats {
        GradStats {
            grad: self.grad - other.grad,
            hess: self.hess - other.hess,
            count: self.count - other.count,
        }
    }

    fn admissible(&self, params: &TreeParams) -> bool {
        self.count >= params.min_examples_per_leaf && self.hess >= params.min_sum_hessian
    }

    fn score(&self, l2: f64) -> f64 {
        let denom = self.hess + l2;
        if denom <= 0.0 {
            0.0
        } else {
            self.grad * self.grad / denom
        }
    }
}

fn totals(rows: &[usize], grad: &[f64], hess: &[f64]) -> GradStats {
    let mut stats = GradStats::default();
    for &row in rows {
        stats.push(grad[row], hess[row], 1);
    }
    stats
}

fn split_gain(left: &GradStats, right: &GradStats, parent: &GradStats, l2: f64) -> f64 {
    left.score(l2) + right.score(l2) - parent.score(l2)
}

/// Scans every distinct value of every feature. Thresholds sit halfway
/// between neighbouring distinct values.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactSplitSearch;

impl SplitSearch for ExactSplitSearch {
    fn best_split(
        &self,
        x: ArrayView2<'_, f32>,
        rows: &[usize],
        grad: &[f64],
        hess: &[f64],
        params: &TreeParams,
    ) -> Option<SplitCandidate> {
        let parent = totals(rows, grad, hess);
        let mut best: Option<SplitCandidate> = None;
        let mut sorted: Vec<(f32, usize)> = Vec::with_capacity(rows.len());
        for feature in 0..x.ncols() {
            sorted.clear();
            sorted.extend(rows.iter().map(|&row| (x[[row, feature]], row)));
            sorted.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

            let mut left = GradStats::default();
            for pos in 0..sorted.len().saturating_sub(1) {
                let (value, row) = sorted[pos];
                left.push(grad[row], hess[row], 1);
                let next = sorted[pos + 1].0;
                if next == value {
                    continue;
                }
                let right = parent.minus(&left);
                if !left.admissible(params) || !right.admissible(params) {
                    continue;
                }
                let gain = split_gain(&left, &right, &parent, params.l2);
                if best.is_none_or(|b| gain > b.gain) {
                    best = Some(SplitCandidate {
                        feature,
                        threshold: midpoint(value, next),
                        gain,
                    });
                }
            }
        }
        best
    }
}

/// Halfway point that still sends `lo` left and `hi` right.
fn midpoint(lo: f32, hi: f32) -> f32 {
    let mid = lo + (hi - lo) / 2.0;
    if mid >= hi { lo } else { mid }
}

/// Per-feature bin upper bounds learned from the training matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct BinMapper {
    /// `upper_bounds[feature][bin]`; the last bound of each feature is `+inf`.
    pub upper_bounds: Vec<Vec<f32>>,
}

impl BinMapper {
    /// Build at most `max_bins` bins per feature from its distinct values.
    pub fn fit(x: ArrayView2<'_, f32>, max_bins: usize) -> Self {
        let max_bins = max_bins.max(2);
        let upper_bounds = x
            .columns()
            .into_iter()
            .map(|column| {
                let mut distinct: Vec<f32> = column.iter().copied().collect();
                distinct.sort_by(f32::total_cmp);
                distinct.dedup();
                feature_bounds(&distinct, max_bins)
            })
            .collect();
        Self { upper_bounds }
    }

    /// Bin index of `value` for `feature`: the first bin whose bound is `>= value`.
    pub fn bin(&self, feature: usize, value: f32) -> usize {
        let bounds = &self.upper_bounds[feature];
        bounds
            .partition_point(|&bound| bound < value)
            .min(bounds.len() - 1)
    }

    pub fn n_bins(&self, feature: usize) -> usize {
        self.upper_bounds[feature].len()
    }
}

fn feature_bounds(distinct: &[f32], max_bins: usize) -> Vec<f32> {
    let mut bounds = Vec::new();
    if distinct.len() <= max_bins {
        for pair in distinct.windows(2) {
            bounds.push(midpoint(pair[0], pair[1]));
        }
    } else {
        // Equal-count bins over distinct values.
        let per_bin = distinct.len().div_ceil(max_bins);
        let mut end = per_bin;
        while end < distinct.len() {
            bounds.push(midpoint(distinct[end - 1], distinct[end]));
            end += per_bin;
        }
    }
    bounds.push(f32::INFINITY);
    bounds
}

/// Histogram split search over rows pre-binned with a [`BinMapper`].
#[derive(Debug, Clone)]
pub struct HistogramSplitSearch {
    mapper: BinMapper,
    /// `binned[feature][row]`.
    binned: Vec<Vec<u16>>,
}

impl HistogramSplitSearch {
    pub fn new(x: ArrayView2<'_, f32>, max_bins: usize) -> Self {
        let max_bins = max_bins.clamp(2, u16::MAX as usize);
        let mapper = BinMapper::fit(x, max_bins);
        let binned = (0..x.ncols())
            .map(|feature| {
                x.column(feature)
                    .iter()
                    .map(|&value| mapper.bin(feature, value) as u16)
                    .collect()
            })
            .collect();
        Self { mapper, binned }
    }
}

impl SplitSearch for HistogramSplitSearch {
    fn best_split(
        &self,
        _x: ArrayView2<'_, f32>,
        rows: &[usize],
        grad: &[f64],
        hess: &[f64],
        params: &TreeParams,
    ) -> Option<SplitCandidate> {
        let parent = totals(rows, grad, hess);
        let mut best: Option<SplitCandidate> = None;
        for (feature, bins) in self.binned.iter().enumerate() {
            let n_bins = self.mapper.n_bins(feature);
            if n_bins < 2 {
                continue;
            }
            let mut histogram = vec![GradStats::default(); n_bins];
            for &row in rows {
                histogram[bins[row] as usize].push(grad[row], hess[row], 1);
            }
            let mut left = GradStats::default();
            for (bin, stats) in histogram.iter().enumerate().take(n_bins - 1) {
                left.push(stats.grad, stats.hess, stats.count);
                if stats.count == 0 {
                    continue;
                }
                let right = parent.minus(&left);
                if !left.admissible(params) || !right.admissible(params) {
                    continue;
                }
                let gain = split_gain(&left, &right, &parent, params.l2);
                if best.is_none_or(|b| gain > b.gain) {
                    best = Some(SplitCandidate {
                        feature,
                        threshold: self.mapper.upper_bounds[feature][bin],
                        gain,
                    });
                }
            }
        }
        best
    }
}
