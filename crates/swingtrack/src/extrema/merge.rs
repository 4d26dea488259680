//! Collapsing clusters of raw extrema into single representative peaks.
//!
//! Near a turning point the angular velocity is close to zero, so tracking
//! noise often produces several raw maxima a few frames apart. Consecutive
//! raw peaks whose gap to the previous peak of the run is below the merge
//! threshold form one cluster.

/// A raw local extremum of the series.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RawPeak {
    pub time: f64,
    pub angle: f64,
}

/// One merged extremum.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Peak {
    pub time: f64,
    pub angle: f64,
    /// Standard error of the clustered times; zero for a lone peak.
    pub time_uncertainty: f64,
    /// Raw peaks collapsed into this one.
    pub n_merged: usize,
}

/// How a cluster's representative position is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Mean time, mean angle.
    #[default]
    Mean,
    /// Median time, largest angle.
    MaxAngleMedianTime,
}

fn mean(v: &[f64]) -> f64 {
    v.iter().sum::<f64>() / v.len() as f64
}

/// Population standard deviation over `sqrt(n)`.
fn standard_error(v: &[f64]) -> f64 {
    let n = v.len() as f64;
    let m = mean(v);
    let var = v.iter().map(|t| (t - m) * (t - m)).sum::<f64>() / n;
    var.sqrt() / n.sqrt()
}

/// Median of values already in ascending order.
fn median_sorted(v: &[f64]) -> f64 {
    let n = v.len();
    if n % 2 == 1 {
        v[n / 2]
    } else {
        0.5 * (v[n / 2 - 1] + v[n / 2])
    }
}

fn representative(cluster: &[RawPeak], policy: MergePolicy) -> Peak {
    let times: Vec<f64> = cluster.iter().map(|p| p.time).collect();
    let (time, angle) = match policy {
        MergePolicy::Mean => {
            let angles: Vec<f64> = cluster.iter().map(|p| p.angle).collect();
            (mean(&times), mean(&angles))
        }
        MergePolicy::MaxAngleMedianTime => {
            let angle = cluster
                .iter()
                .map(|p| p.angle)
                .fold(f64::NEG_INFINITY, f64::max);
            (median_sorted(&times), angle)
        }
    };
    let time_uncertainty = if cluster.len() > 1 {
        standard_error(&times)
    } else {
        0.0
    };
    Peak {
        time,
        angle,
        time_uncertainty,
        n_merged: cluster.len(),
    }
}

/// Merge time-ordered raw peaks closer than `threshold` seconds.
pub fn merge_peaks(raw: &[RawPeak], threshold: f64, policy: MergePolicy) -> Vec<Peak> {
    let mut out = Vec::new();
    let mut start = 0;
    while start < raw.len() {
        let mut end = start + 1;
        while end < raw.len() && raw[end].time - raw[end - 1].time < threshold {
            end += 1;
        }
        out.push(representative(&raw[start..end], policy));
        start = end;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn raw(points: &[(f64, f64)]) -> Vec<RawPeak> {
        points
            .iter()
            .map(|&(time, angle)| RawPeak { time, angle })
            .collect()
    }

    #[test]
    fn close_peaks_merge_at_mean_time() {
        let peaks = raw(&[(1.0, 0.4), (1.2, 0.5)]);
        let merged = merge_peaks(&peaks, 0.5, MergePolicy::Mean);
        assert_eq!(merged.len(), 1);
        assert_abs_diff_eq!(merged[0].time, 1.1, epsilon = 1e-12);
        assert_abs_diff_eq!(merged[0].angle, 0.45, epsilon = 1e-12);
        assert_abs_diff_eq!(
            merged[0].time_uncertainty,
            0.1 / 2f64.sqrt(),
            epsilon = 1e-12
        );
        assert_eq!(merged[0].n_merged, 2);
    }

    #[test]
    fn small_threshold_keeps_peaks_apart() {
        let peaks = raw(&[(1.0, 0.4), (1.2, 0.5)]);
        let merged = merge_peaks(&peaks, 0.1, MergePolicy::Mean);
        assert_eq!(merged.len(), 2);
        assert!(merged.iter().all(|p| p.time_uncertainty == 0.0));
    }

    #[test]
    fn chain_gaps_are_measured_to_previous_peak() {
        // 1.0 -> 1.2 -> 1.4 -> 1.6 each step < 0.3, total span > 0.3.
        let peaks = raw(&[(1.0, 0.1), (1.2, 0.1), (1.4, 0.1), (1.6, 0.1), (3.0, 0.1)]);
        let merged = merge_peaks(&peaks, 0.3, MergePolicy::Mean);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].n_merged, 4);
        assert_abs_diff_eq!(merged[0].time, 1.3, epsilon = 1e-12);
    }

    #[test]
    fn gap_equal_to_threshold_splits() {
        let peaks = raw(&[(0.0, 1.0), (0.25, 1.0)]);
        assert_eq!(merge_peaks(&peaks, 0.25, MergePolicy::Mean).len(), 2);
    }

    #[test]
    fn max_angle_median_time_policy() {
        let peaks = raw(&[(2.0, 0.30), (2.1, 0.35), (2.3, 0.32)]);
        let merged = merge_peaks(&peaks, 0.5, MergePolicy::MaxAngleMedianTime);
        assert_eq!(merged.len(), 1);
        assert_abs_diff_eq!(merged[0].time, 2.1);
        assert_abs_diff_eq!(merged[0].angle, 0.35);
    }

    #[test]
    fn empty_input_gives_no_peaks() {
        assert!(merge_peaks(&[], 0.25, MergePolicy::Mean).is_empty());
    }
}
