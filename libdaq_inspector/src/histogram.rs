use ndarray::Array2;

/// (min, max) of the finite values. A degenerate range (all values equal) is widened by half
/// a unit on either side.
pub fn value_range(values: &[f64]) -> Option<(f64, f64)> {
    let mut finite = values.iter().copied().filter(|v| v.is_finite());
    let first = finite.next()?;
    let (min, max) = finite.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if min == max {
        Some((min - 0.5, max + 0.5))
    } else {
        Some((min, max))
    }
}

/// Uniform binning of a closed range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Binning {
    pub min: f64,
    pub max: f64,
    pub n_bins: usize,
}

impl Binning {
    /// Span the range of the values. Returns None for no values or zero bins.
    pub fn from_values(values: &[f64], n_bins: usize) -> Option<Self> {
        if n_bins == 0 {
            return None;
        }
        let (min, max) = value_range(values)?;
        Some(Self { min, max, n_bins })
    }

    pub fn width(&self) -> f64 {
        (self.max - self.min) / self.n_bins as f64
    }

    /// Bin index of a value; the upper edge falls into the last bin
    pub fn index(&self, value: f64) -> Option<usize> {
        if !value.is_finite() || value < self.min || value > self.max {
            return None;
        }
        let idx = ((value - self.min) / self.width()) as usize;
        Some(idx.min(self.n_bins - 1))
    }

    pub fn lower_edge(&self, idx: usize) -> f64 {
        self.min + idx as f64 * self.width()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Histogram1D {
    pub binning: Binning,
    pub counts: Vec<u64>,
}

impl Histogram1D {
    pub fn from_values(values: &[f64], n_bins: usize) -> Option<Self> {
        let binning = Binning::from_values(values, n_bins)?;
        let mut counts = vec![0; n_bins];
        for idx in values.iter().filter_map(|v| binning.index(*v)) {
            counts[idx] += 1;
        }
        Some(Self { binning, counts })
    }

    pub fn max_count(&self) -> u64 {
        self.counts.iter().copied().max().unwrap_or(0)
    }

    /// (lower edge, count) of every bin
    pub fn bins(&self) -> impl Iterator<Item = (f64, u64)> + '_ {
        self.counts
            .iter()
            .enumerate()
            .map(|(idx, count)| (self.binning.lower_edge(idx), *count))
    }
}

/// Counts indexed as [x bin, y bin]
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram2D {
    pub x: Binning,
    pub y: Binning,
    pub counts: Array2<u64>,
}

impl Histogram2D {
    pub fn new(x: Binning, y: Binning) -> Self {
        Self {
            x,
            y,
            counts: Array2::zeros((x.n_bins, y.n_bins)),
        }
    }

    pub fn fill(&mut self, x: f64, y: f64) {
        if let (Some(ix), Some(iy)) = (self.x.index(x), self.y.index(y)) {
            self.counts[[ix, iy]] += 1;
        }
    }

    pub fn from_values(xs: &[f64], ys: &[f64], x_bins: usize, y_bins: usize) -> Option<Self> {
        let mut hist = Self::new(
            Binning::from_values(xs, x_bins)?,
            Binning::from_values(ys, y_bins)?,
        );
        for (x, y) in xs.iter().zip(ys.iter()) {
            hist.fill(*x, *y);
        }
        Some(hist)
    }

    pub fn max_count(&self) -> u64 {
        self.counts.iter().copied().max().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.sum()
    }
}
