pub struct StatsHelper;

impl StatsHelper {
    pub fn l2_norm(samples: &[f64]) -> f64 {
        samples.iter().map(|&v| v * v).sum::<f64>().sqrt()
    }

    pub fn mean(samples: &[f64]) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        samples.iter().sum::<f64>() / samples.len() as f64
    }

    /// Median with the midpoint convention for even lengths; NaN for an empty slice.
    pub fn median(samples: &[f64]) -> f64 {
        if samples.is_empty() {
            return f64::NAN;
        }
        let mut sorted = samples.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 0 {
            0.5 * (sorted[mid - 1] + sorted[mid])
        } else {
            sorted[mid]
        }
    }

    /// Median absolute deviation about `centre`.
    pub fn mad(samples: &[f64], centre: f64) -> f64 {
        let deviations: Vec<f64> = samples.iter().map(|&v| (v - centre).abs()).collect();
        Self::median(&deviations)
    }
}
