//! Pitch-shift filter chain construction.
//!
//! A semitone shift maps to a resample that raises or lowers pitch and
//! tempo together, followed by one or more `atempo` stages that restore
//! the original tempo. The `atempo` primitive is only stable within a
//! half/double span per stage, so shifts whose tempo correction falls
//! outside [0.5, 2.0] are composed from multiple pinned stages.

use std::fmt;

/// Nominal audio sample rate the filter graph resamples around.
pub const NOMINAL_SAMPLE_RATE: u32 = 44_100;

/// Stable range of a single `atempo` stage.
const TEMPO_STAGE_MIN: f64 = 0.5;
const TEMPO_STAGE_MAX: f64 = 2.0;

/// Frequency ratio for a semitone shift: `2^(n/12)`.
pub fn pitch_ratio(semitones: i32) -> f64 {
    2.0_f64.powf(f64::from(semitones) / 12.0)
}

/// Tempo correction needed after resampling: `1 / pitch_ratio(n)`.
pub fn tempo_factor(semitones: i32) -> f64 {
    1.0 / pitch_ratio(semitones)
}

/// One stage of the audio filter graph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterStage {
    /// Reinterpret the sample rate by `ratio` (shifts pitch and tempo together).
    SetRate {
        /// Frequency ratio applied to the nominal rate.
        ratio: f64,
    },
    /// Resample back to the nominal rate.
    Resample,
    /// One tempo-correction stage, `factor` within [0.5, 2.0].
    Tempo {
        /// Tempo multiplier for this stage.
        factor: f64,
    },
}

impl fmt::Display for FilterStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterStage::SetRate { ratio } => {
                write!(f, "asetrate={}*{}", NOMINAL_SAMPLE_RATE, ratio)
            }
            FilterStage::Resample => write!(f, "aresample={}", NOMINAL_SAMPLE_RATE),
            FilterStage::Tempo { factor } => write!(f, "atempo={}", factor),
        }
    }
}

/// Ordered filter stages for one semitone shift.
#[derive(Debug, Clone)]
pub struct FilterChain {
    semitones: i32,
    stages: Vec<FilterStage>,
}

impl FilterChain {
    /// The shift this chain was built for.
    pub fn semitones(&self) -> i32 {
        self.semitones
    }

    /// Stage descriptors in application order.
    pub fn stages(&self) -> &[FilterStage] {
        &self.stages
    }

    /// True when the chain changes nothing (shift of zero).
    pub fn is_noop(&self) -> bool {
        self.stages.is_empty()
    }

    /// Net tempo change of all tempo stages composed together.
    pub fn net_tempo(&self) -> f64 {
        self.stages
            .iter()
            .filter_map(|stage| match stage {
                FilterStage::Tempo { factor } => Some(factor),
                _ => None,
            })
            .product()
    }

    /// Render the chain as an ffmpeg audio filter expression.
    pub fn render(&self) -> String {
        self.stages
            .iter()
            .map(|stage| stage.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Build the filter chain for a semitone shift.
///
/// A shift of zero produces an empty chain; callers skip the transcode
/// entirely and keep playing the source file. For any other shift the
/// chain is `asetrate` + `aresample` followed by however many `atempo`
/// stages are needed so that their composition equals `tempo_factor(n)`
/// exactly, each stage staying within its stable [0.5, 2.0] range.
pub fn filter_chain(semitones: i32) -> FilterChain {
    if semitones == 0 {
        return FilterChain {
            semitones,
            stages: Vec::new(),
        };
    }

    let ratio = pitch_ratio(semitones);
    let mut stages = vec![FilterStage::SetRate { ratio }, FilterStage::Resample];

    let mut remaining = tempo_factor(semitones);
    while remaining > TEMPO_STAGE_MAX {
        stages.push(FilterStage::Tempo {
            factor: TEMPO_STAGE_MAX,
        });
        remaining /= TEMPO_STAGE_MAX;
    }
    while remaining < TEMPO_STAGE_MIN {
        stages.push(FilterStage::Tempo {
            factor: TEMPO_STAGE_MIN,
        });
        remaining /= TEMPO_STAGE_MIN;
    }
    stages.push(FilterStage::Tempo {
        factor: remaining.clamp(TEMPO_STAGE_MIN, TEMPO_STAGE_MAX),
    });

    FilterChain { semitones, stages }
}
