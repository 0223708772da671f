//! # Adjustment Parameters
//!
//! The ten normalized adjustment values and the store that shares them between
//! the consumer context (which writes) and the render worker (which reads).
//!
//! ## Snapshot Discipline
//!
//! The render worker never reads fields one at a time from shared mutable
//! state. [`ParameterStore`] keeps the current vector behind an `Arc` and every
//! write builds a new vector and swaps the pointer under one short lock. Readers
//! clone the `Arc`, so a snapshot is immutable and can never be torn across
//! fields.
//!
//! | Adjustment | Range | Default |
//! |---|---|---|
//! | brightness, contrast, hue, saturation, highlight, shadows | [-1, 1] | 0 |
//! | exposure | [-2, 2] | 0 |
//! | grain, sharpness, vignette | [0, 1] | 0 |

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::error::CraftError;

/// One named field of the [`AdjustmentVector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Adjustment {
    Brightness,
    Contrast,
    Exposure,
    Hue,
    Saturation,
    Highlight,
    Shadows,
    Grain,
    Sharpness,
    Vignette,
}

impl Adjustment {
    /// Every adjustment, in display order.
    pub const ALL: [Adjustment; 10] = [
        Adjustment::Brightness,
        Adjustment::Contrast,
        Adjustment::Exposure,
        Adjustment::Hue,
        Adjustment::Saturation,
        Adjustment::Highlight,
        Adjustment::Shadows,
        Adjustment::Grain,
        Adjustment::Sharpness,
        Adjustment::Vignette,
    ];

    /// The inclusive range values are clamped into at write time.
    pub fn range(self) -> RangeInclusive<f32> {
        match self {
            Adjustment::Exposure => -2.0..=2.0,
            Adjustment::Grain | Adjustment::Sharpness | Adjustment::Vignette => 0.0..=1.0,
            _ => -1.0..=1.0,
        }
    }

    /// Documented default; every adjustment is neutral at zero.
    pub fn default_value(self) -> f32 {
        0.0
    }

    /// Clamp a raw value into this adjustment's range.
    ///
    /// NaN carries no intent and maps to the default.
    pub fn clamp(self, value: f32) -> f32 {
        if value.is_nan() {
            return self.default_value();
        }
        let range = self.range();
        value.clamp(*range.start(), *range.end())
    }

    pub fn name(self) -> &'static str {
        match self {
            Adjustment::Brightness => "brightness",
            Adjustment::Contrast => "contrast",
            Adjustment::Exposure => "exposure",
            Adjustment::Hue => "hue",
            Adjustment::Saturation => "saturation",
            Adjustment::Highlight => "highlight",
            Adjustment::Shadows => "shadows",
            Adjustment::Grain => "grain",
            Adjustment::Sharpness => "sharpness",
            Adjustment::Vignette => "vignette",
        }
    }
}

impl fmt::Display for Adjustment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Adjustment {
    type Err = CraftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Adjustment::ALL
            .into_iter()
            .find(|adjustment| adjustment.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                CraftError::validation("adjustment", "one of the ten adjustment names", s)
            })
    }
}

/// The ten adjustment values, each already clamped into its range.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjustmentVector {
    pub brightness: f32,
    pub contrast: f32,
    pub exposure: f32,
    pub hue: f32,
    pub saturation: f32,
    pub highlight: f32,
    pub shadows: f32,
    pub grain: f32,
    pub sharpness: f32,
    pub vignette: f32,
}

impl AdjustmentVector {
    pub fn get(&self, adjustment: Adjustment) -> f32 {
        match adjustment {
            Adjustment::Brightness => self.brightness,
            Adjustment::Contrast => self.contrast,
            Adjustment::Exposure => self.exposure,
            Adjustment::Hue => self.hue,
            Adjustment::Saturation => self.saturation,
            Adjustment::Highlight => self.highlight,
            Adjustment::Shadows => self.shadows,
            Adjustment::Grain => self.grain,
            Adjustment::Sharpness => self.sharpness,
            Adjustment::Vignette => self.vignette,
        }
    }

    /// Replace one field, clamping the value. Returns the stored value.
    pub fn set(&mut self, adjustment: Adjustment, value: f32) -> f32 {
        let value = adjustment.clamp(value);
        let slot = match adjustment {
            Adjustment::Brightness => &mut self.brightness,
            Adjustment::Contrast => &mut self.contrast,
            Adjustment::Exposure => &mut self.exposure,
            Adjustment::Hue => &mut self.hue,
            Adjustment::Saturation => &mut self.saturation,
            Adjustment::Highlight => &mut self.highlight,
            Adjustment::Shadows => &mut self.shadows,
            Adjustment::Grain => &mut self.grain,
            Adjustment::Sharpness => &mut self.sharpness,
            Adjustment::Vignette => &mut self.vignette,
        };
        *slot = value;
        value
    }

    /// Re-clamp every field. Used for vectors that came from outside, e.g. a
    /// deserialized preset.
    pub fn clamped(mut self) -> Self {
        for adjustment in Adjustment::ALL {
            let value = self.get(adjustment);
            self.set(adjustment, value);
        }
        self
    }

    /// True when every field is at its default.
    pub fn is_neutral(&self) -> bool {
        *self == Self::default()
    }
}

/// Holds the current [`AdjustmentVector`] and hands out immutable snapshots.
#[derive(Debug, Default)]
pub struct ParameterStore {
    current: Mutex<Arc<AdjustmentVector>>,
}

impl ParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically captured, immutable copy of the current values.
    pub fn snapshot(&self) -> Arc<AdjustmentVector> {
        Arc::clone(&*self.current.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Replace one field. Returns the clamped value that was stored.
    pub fn set(&self, adjustment: Adjustment, value: f32) -> f32 {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = **current;
        let stored = next.set(adjustment, value);
        *current = Arc::new(next);
        stored
    }

    /// Replace the whole vector (clamped) in one exchange.
    pub fn replace(&self, vector: AdjustmentVector) {
        let next = Arc::new(vector.clamped());
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = next;
    }

    /// Restore every field to its documented default.
    pub fn reset(&self) {
        self.replace(AdjustmentVector::default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_per_documented_ranges() {
        let mut vector = AdjustmentVector::default();
        assert_eq!(vector.set(Adjustment::Brightness, 3.0), 1.0);
        assert_eq!(vector.set(Adjustment::Exposure, -5.0), -2.0);
        assert_eq!(vector.set(Adjustment::Exposure, 1.5), 1.5);
        assert_eq!(vector.set(Adjustment::Grain, -0.5), 0.0);
        assert_eq!(vector.set(Adjustment::Vignette, f32::INFINITY), 1.0);
        assert_eq!(vector.set(Adjustment::Hue, f32::NAN), 0.0);
    }

    #[test]
    fn names_round_trip_through_from_str() {
        for adjustment in Adjustment::ALL {
            assert_eq!(adjustment.name().parse::<Adjustment>().unwrap(), adjustment);
        }
        assert_eq!(" Exposure ".parse::<Adjustment>().unwrap(), Adjustment::Exposure);
        assert!("gamma".parse::<Adjustment>().is_err());
    }

    #[test]
    fn snapshots_are_immutable() {
        let store = ParameterStore::new();
        let before = store.snapshot();
        store.set(Adjustment::Contrast, 0.25);
        let after = store.snapshot();

        assert_eq!(before.contrast, 0.0);
        assert_eq!(after.contrast, 0.25);
        assert!(!Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn reset_restores_defaults() {
        let store = ParameterStore::new();
        for adjustment in Adjustment::ALL {
            store.set(adjustment, 0.75);
        }
        assert!(!store.snapshot().is_neutral());

        store.reset();
        let snapshot = store.snapshot();
        assert!(snapshot.is_neutral());
        for adjustment in Adjustment::ALL {
            assert_eq!(snapshot.get(adjustment), adjustment.default_value());
        }
    }

    #[test]
    fn replace_clamps_incoming_vectors() {
        let store = ParameterStore::new();
        store.replace(AdjustmentVector {
            exposure: 9.0,
            sharpness: -1.0,
            ..Default::default()
        });
        let snapshot = store.snapshot();
        assert_eq!(snapshot.exposure, 2.0);
        assert_eq!(snapshot.sharpness, 0.0);
    }

    #[test]
    fn concurrent_writers_never_tear_snapshots() {
        let store = Arc::new(ParameterStore::new());
        let writers: Vec<_> = (0..4)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    let value = if i % 2 == 0 { 0.5 } else { -0.5 };
                    for _ in 0..500 {
                        store.replace(AdjustmentVector {
                            brightness: value,
                            contrast: value,
                            ..Default::default()
                        });
                    }
                })
            })
            .collect();

        for _ in 0..2000 {
            let snapshot = store.snapshot();
            assert_eq!(snapshot.brightness, snapshot.contrast);
        }
        for writer in writers {
            writer.join().unwrap();
        }
    }
}
