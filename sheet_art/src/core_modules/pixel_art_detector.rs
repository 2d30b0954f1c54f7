// THEORY:
// The `pixel_art_detector` decides whether an image was authored as low-resolution
// pixel art and, if so, at what native grid size. Everything downstream (the
// resize pipeline, the sheet writer) only consumes its `Detection`.
//
// Pixel art is an image that was drawn on a small grid and enlarged by plain
// replication, so it survives a nearest-neighbor downscale-then-upscale cycle at
// its native size with zero change. The detector searches for that size:
//
// 1.  **Preprocessing**: inputs larger than `max_test_dimension` on either side are
//     smoothed down to that long side first. The scale is kept so that measured
//     differences can be inflated by `1 + scale` to make up for the lost detail.
// 2.  **Quick rejection**: a small smoothed sample is doubled with nearest and
//     smoothed back. Continuous-tone images drift far enough to be rejected right
//     away with a fallback size.
// 3.  **Original-size test**: a small enough image is checked for an exact 2x
//     nearest round trip at its own size.
// 4.  **Candidate sweep**: each candidate size up to half of both original
//     dimensions is tested on the largest sub-rectangle that is a multiple of the
//     candidate. Three bad candidates in a row abort the sweep.
// 5.  **Selection**: the collected evidence is handed to `selection`.
//
// The detector keeps no state between images. `SizeProbe` lives for exactly one
// call to `detect` and borrows the image it inspects.

use crate::core_modules::resample::resample::{mean_absolute_difference, round_trip, smooth};
use crate::core_modules::selection::SweepOutcome;
use crate::core_modules::selection::selection::select_resolution;
use image::imageops::FilterType;
use image::RgbImage;
use log::{debug, info};
use std::borrow::Cow;
use std::fmt;

/// Heuristic constants of the detector.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorConfig {
    /// Highest mean absolute difference (0-255 scale) still counted as a good match.
    pub tolerance: f64,
    /// Candidate native sizes, tested in ascending order.
    pub candidates: Vec<u32>,
    /// The quick check rejects when its difference exceeds `tolerance` times this.
    pub quick_reject_multiplier: f64,
    /// Relative difference window that groups good matches with the best one.
    pub similarity_threshold: f64,
    /// Long-side cap of the image the sweep runs on. Also the size above which
    /// the large fallback applies.
    pub max_test_dimension: u32,
    /// Side of the square sample used by the quick check.
    pub quick_sample_size: u32,
    /// Consecutive bad candidates that abort the sweep.
    pub max_consecutive_misses: u32,
    /// Fallback downscale target for images within `max_test_dimension`.
    pub fallback_size: u32,
    /// Fallback downscale target for larger images.
    pub large_fallback_size: u32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            tolerance: 45.0,
            candidates: vec![8, 16, 24, 28, 32, 48, 64, 96, 128],
            quick_reject_multiplier: 1.5,
            similarity_threshold: 0.05,
            max_test_dimension: 1000,
            quick_sample_size: 100,
            max_consecutive_misses: 3,
            fallback_size: 96,
            large_fallback_size: 128,
        }
    }
}

impl DetectorConfig {
    /// The fallback downscale target for an image of the given dimensions.
    pub fn fallback_for(&self, width: u32, height: u32) -> u32 {
        if width > self.max_test_dimension || height > self.max_test_dimension {
            self.large_fallback_size
        } else {
            self.fallback_size
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn square(size: u32) -> Self {
        Self { width: size, height: size }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Why the detector gave up on finding a native resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// The quick check already showed continuous-tone content.
    QuickReject,
    /// Too many consecutive candidates were bad.
    ConsecutiveMisses,
    /// The sweep finished without a perfect or good match.
    NoMatch,
}

/// The outcome of size detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Detection {
    /// The image is pixel art with this native resolution.
    Native(Resolution),
    /// Not pixel art; downscale so the long side becomes `size`.
    Fallback { size: u32, reason: FallbackReason },
}

impl Detection {
    pub fn is_native(&self) -> bool {
        matches!(self, Detection::Native(_))
    }
}

impl fmt::Display for Detection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Detection::Native(resolution) => write!(f, "native {}", resolution),
            Detection::Fallback { size, reason } => write!(f, "fallback {}x{} ({:?})", size, size, reason),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchVerdict {
    /// Exact round trip.
    Perfect,
    /// Within tolerance.
    Good,
    Bad,
}

/// One tested candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRecord {
    pub size: u32,
    /// The multiple-of-size sub-rectangle the candidate was tested on.
    pub target: Resolution,
    /// Mean absolute difference, compensated for preprocessing.
    pub difference: f64,
    pub verdict: MatchVerdict,
}

/// Everything one detection run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionReport {
    pub detection: Detection,
    /// Difference measured by the quick check.
    pub quick_difference: f64,
    /// Whether the original size round-tripped exactly. `false` when the test was skipped.
    pub original_is_perfect: bool,
    /// Every candidate actually tested, in test order.
    pub tested: Vec<MatchRecord>,
}

/// Detects the native pixel-art resolution of `image`, or picks a fallback size.
pub fn detect(image: &RgbImage, config: &DetectorConfig) -> DetectionReport {
    let report = SizeProbe::new(image, config).run();
    info!("Detected {} for {}x{} image", report.detection, image.width(), image.height());
    report
}

/// Short-lived working state for one detection.
struct SizeProbe<'a> {
    original: &'a RgbImage,
    config: &'a DetectorConfig,
    /// The image the quick check and the sweep run on.
    test_image: Cow<'a, RgbImage>,
    /// Preprocessing scale, when the original had to be shrunk.
    scale: Option<f64>,
}

impl<'a> SizeProbe<'a> {
    fn new(original: &'a RgbImage, config: &'a DetectorConfig) -> Self {
        let (width, height) = original.dimensions();
        let limit = config.max_test_dimension;

        if width > limit || height > limit {
            let scale = limit as f64 / width.max(height) as f64;
            let test_width = ((width as f64 * scale) as u32).max(1);
            let test_height = ((height as f64 * scale) as u32).max(1);
            debug!("Preprocessing {}x{} down to {}x{}", width, height, test_width, test_height);
            Self {
                original,
                config,
                test_image: Cow::Owned(smooth(original, test_width, test_height)),
                scale: Some(scale),
            }
        } else {
            Self { original, config, test_image: Cow::Borrowed(original), scale: None }
        }
    }

    fn run(self) -> DetectionReport {
        let (width, height) = self.original.dimensions();
        let fallback = self.config.fallback_for(width, height);

        let quick_difference = self.quick_check();
        let quick_limit = self.config.tolerance * self.config.quick_reject_multiplier;
        if quick_difference > quick_limit {
            debug!("Quick check difference {:.2} exceeds {:.2}", quick_difference, quick_limit);
            return DetectionReport {
                detection: Detection::Fallback { size: fallback, reason: FallbackReason::QuickReject },
                quick_difference,
                original_is_perfect: false,
                tested: Vec::new(),
            };
        }

        let original_is_perfect = self.original_round_trips();
        let mut outcome = SweepOutcome {
            original: original_is_perfect.then_some(Resolution { width, height }),
            ..Default::default()
        };
        let mut tested = Vec::new();
        let mut consecutive_misses = 0;

        for &size in &self.config.candidates {
            if size == 0 || size > width / 2 || size > height / 2 {
                continue;
            }
            let Some(record) = self.test_candidate(size) else {
                continue;
            };

            match record.verdict {
                MatchVerdict::Perfect => outcome.perfect.push(size),
                MatchVerdict::Good => outcome.good.push((size, record.difference)),
                MatchVerdict::Bad => {}
            }

            let missed = record.verdict == MatchVerdict::Bad;
            tested.push(record);

            if missed {
                consecutive_misses += 1;
                if consecutive_misses >= self.config.max_consecutive_misses {
                    debug!("{} consecutive bad candidates, giving up", consecutive_misses);
                    return DetectionReport {
                        detection: Detection::Fallback { size: fallback, reason: FallbackReason::ConsecutiveMisses },
                        quick_difference,
                        original_is_perfect,
                        tested,
                    };
                }
            } else {
                consecutive_misses = 0;
            }
        }

        DetectionReport {
            detection: select_resolution(&outcome, self.config.similarity_threshold, fallback),
            quick_difference,
            original_is_perfect,
            tested,
        }
    }

    /// Doubles a small smoothed sample with nearest, smooths it back, and measures the drift.
    fn quick_check(&self) -> f64 {
        let (test_width, test_height) = self.test_image.dimensions();
        let side = self.config.quick_sample_size.min(test_width).min(test_height).max(1);
        let sample = smooth(&self.test_image, side, side);
        let restored = round_trip(&sample, side * 2, side * 2, FilterType::Nearest, FilterType::Lanczos3);
        mean_absolute_difference(&sample, &restored)
    }

    fn original_round_trips(&self) -> bool {
        let (width, height) = self.original.dimensions();
        if width > self.config.max_test_dimension || height > self.config.max_test_dimension {
            return false;
        }

        let restored = round_trip(self.original, width * 2, height * 2, FilterType::Nearest, FilterType::Nearest);
        let difference = mean_absolute_difference(self.original, &restored);
        debug!("Original size {}x{}: difference {:.2}", width, height, difference);
        difference == 0.0
    }

    fn test_candidate(&self, size: u32) -> Option<MatchRecord> {
        let (test_width, test_height) = self.test_image.dimensions();
        let target = Resolution {
            width: (test_width / size) * size,
            height: (test_height / size) * size,
        };
        if target.width == 0 || target.height == 0 {
            return None;
        }

        let reference: Cow<'_, RgbImage> = if (target.width, target.height) == (test_width, test_height) {
            Cow::Borrowed(&*self.test_image)
        } else {
            Cow::Owned(smooth(&self.test_image, target.width, target.height))
        };

        let restored = round_trip(&reference, size, size, FilterType::Nearest, FilterType::Nearest);
        let mut difference = mean_absolute_difference(&reference, &restored);
        if let Some(scale) = self.scale {
            difference *= 1.0 + scale;
        }

        let verdict = if difference == 0.0 {
            MatchVerdict::Perfect
        } else if difference <= self.config.tolerance {
            MatchVerdict::Good
        } else {
            MatchVerdict::Bad
        };

        debug!(
            "Candidate {}x{}: target {}, factor {}, difference {:.2}, tolerance {:.2}, {:?}",
            size,
            size,
            target,
            target.width / size,
            difference,
            self.config.tolerance,
            verdict
        );

        Some(MatchRecord { size, target, difference, verdict })
    }
}
