//! Local-maximum detection over a 1-D signal.
//!
//! Plateaus are reported once, at their (lower) middle sample. Candidates
//! are filtered by height, then threshold, then distance, then prominence.

/// Filters applied to candidate maxima. `None` disables a filter.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PeakOptions {
    /// Minimum peak value.
    pub min_height: Option<f64>,
    /// Minimum vertical step to both direct neighbours.
    pub min_threshold: Option<f64>,
    /// Minimum index spacing; lower peaks inside the window are dropped.
    pub min_distance: Option<usize>,
    /// Minimum topographic prominence.
    pub min_prominence: Option<f64>,
}

impl Default for PeakOptions {
    /// Maxima must be non-negative and at least as high as their neighbours.
    fn default() -> Self {
        Self {
            min_height: Some(0.0),
            min_threshold: Some(0.0),
            min_distance: None,
            min_prominence: None,
        }
    }
}

impl PeakOptions {
    /// Every strict interior maximum, no filtering.
    pub fn unconstrained() -> Self {
        Self {
            min_height: None,
            min_threshold: None,
            min_distance: None,
            min_prominence: None,
        }
    }
}

/// Interior maxima, plateau midpoints included, in ascending index order.
fn local_maxima(x: &[f64]) -> Vec<usize> {
    let mut peaks = Vec::new();
    if x.len() < 3 {
        return peaks;
    }
    let last = x.len() - 1;
    let mut i = 1;
    while i < last {
        if x[i - 1] < x[i] {
            let mut ahead = i + 1;
            while ahead < last && x[ahead] == x[i] {
                ahead += 1;
            }
            if x[ahead] < x[i] {
                peaks.push((i + ahead - 1) / 2);
                i = ahead;
                continue;
            }
        }
        i += 1;
    }
    peaks
}

/// Keep the highest peaks, dropping any lower peak closer than `distance`.
fn select_by_distance(x: &[f64], peaks: &[usize], distance: usize) -> Vec<usize> {
    let mut keep = vec![true; peaks.len()];
    let mut order: Vec<usize> = (0..peaks.len()).collect();
    order.sort_by(|&a, &b| x[peaks[a]].total_cmp(&x[peaks[b]]));

    for &j in order.iter().rev() {
        if !keep[j] {
            continue;
        }
        let mut k = j;
        while k > 0 && peaks[j] - peaks[k - 1] < distance {
            k -= 1;
            keep[k] = false;
        }
        let mut k = j + 1;
        while k < peaks.len() && peaks[k] - peaks[j] < distance {
            keep[k] = false;
            k += 1;
        }
    }
    peaks
        .iter()
        .zip(keep)
        .filter_map(|(&p, k)| k.then_some(p))
        .collect()
}

/// Height of a peak above the higher of its two surrounding bases.
pub fn prominence(x: &[f64], peak: usize) -> f64 {
    let top = x[peak];

    let mut left_min = top;
    for &v in x[..=peak].iter().rev() {
        if v > top {
            break;
        }
        left_min = left_min.min(v);
    }

    let mut right_min = top;
    for &v in &x[peak..] {
        if v > top {
            break;
        }
        right_min = right_min.min(v);
    }

    top - left_min.max(right_min)
}

/// Indices of local maxima of `x` passing `options`, ascending.
pub fn find_local_maxima(x: &[f64], options: &PeakOptions) -> Vec<usize> {
    let mut peaks = local_maxima(x);

    if let Some(h) = options.min_height {
        peaks.retain(|&p| x[p] >= h);
    }
    if let Some(t) = options.min_threshold {
        peaks.retain(|&p| (x[p] - x[p - 1]).min(x[p] - x[p + 1]) >= t);
    }
    if let Some(d) = options.min_distance {
        if d > 1 && peaks.len() > 1 {
            peaks = select_by_distance(x, &peaks, d);
        }
    }
    if let Some(p) = options.min_prominence {
        peaks.retain(|&i| prominence(x, i) >= p);
    }
    peaks
}
