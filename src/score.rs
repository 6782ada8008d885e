//! Vocal Scorer
//!
//! Reduces the energy-sample series captured for one track to a bounded
//! 0-100 score. The metric measures singing activity and steadiness of
//! the captured signal only; it never compares against the backing
//! track's audio.

/// Fewer samples than this means the microphone never really ran.
const MIN_SAMPLES: usize = 10;

/// Normalized-energy level above which a sample counts as "active".
const ACTIVITY_THRESHOLD: f32 = 0.1;

/// Qualitative tier for presentation, derived from the numeric score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreTier {
    /// 90 and above.
    Outstanding,
    /// 75 to 89.
    Great,
    /// 50 to 74.
    Good,
    /// Below 50.
    KeepPracticing,
}

impl ScoreTier {
    fn from_points(points: u32) -> Self {
        match points {
            90..=100 => ScoreTier::Outstanding,
            75..=89 => ScoreTier::Great,
            50..=74 => ScoreTier::Good,
            _ => ScoreTier::KeepPracticing,
        }
    }
}

/// Outcome of scoring one track's energy series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreResult {
    /// Final score in [0, 100].
    pub points: u32,
    /// False when too few samples were captured to judge the take.
    pub scored: bool,
    /// Presentation tier for the numeric score.
    pub tier: ScoreTier,
}

impl ScoreResult {
    fn unscored() -> Self {
        ScoreResult {
            points: 0,
            scored: false,
            tier: ScoreTier::KeepPracticing,
        }
    }
}

/// Score an energy-sample series.
///
/// Series shorter than ten samples come back unscored with zero points
/// (a silent or absent microphone is not a failure). Otherwise the
/// series is min-max normalized to [0, 1] and three components are
/// blended:
///
/// - consistency: `1 - stddev(normalized)`, weight 0.4
/// - mean energy: `mean(normalized)`, weight 0.3
/// - activity: fraction of samples above 0.1, weight 0.3
///
/// The blend is scaled to 100 and clamped into [0, 100].
pub fn score_series(series: &[f32]) -> ScoreResult {
    if series.len() < MIN_SAMPLES {
        return ScoreResult::unscored();
    }

    let min = series.iter().copied().fold(f32::INFINITY, f32::min);
    let max = series.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let span = max - min;

    // A perfectly flat series normalizes to all zeros rather than NaN.
    let normalized: Vec<f32> = if span > 0.0 {
        series.iter().map(|&s| (s - min) / span).collect()
    } else {
        vec![0.0; series.len()]
    };

    let n = normalized.len() as f32;
    let mean = normalized.iter().sum::<f32>() / n;
    let variance = normalized.iter().map(|&s| (s - mean) * (s - mean)).sum::<f32>() / n;
    let consistency = 1.0 - variance.sqrt();
    let activity = normalized
        .iter()
        .filter(|&&s| s > ACTIVITY_THRESHOLD)
        .count() as f32
        / n;

    let raw = 100.0 * (0.4 * consistency + 0.3 * mean + 0.3 * activity);
    let points = raw.clamp(0.0, 100.0).round() as u32;

    ScoreResult {
        points,
        scored: true,
        tier: ScoreTier::from_points(points),
    }
}
