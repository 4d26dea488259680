//! Color thresholds in HSV space.
//!
//! Hue is circular (0 and 180 are neighbours), so a range whose low hue is
//! above its high hue wraps through the origin and is split into two
//! axis-aligned boxes.

mod hsv;

pub use hsv::{rgb_pixel_to_hsv, rgb_to_hsv, HsvImage};

/// Upper end of the 8-bit hue axis.
pub const HUE_MAX: i32 = 180;

/// One inclusive HSV bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct HsvBound {
    pub h: i32,
    pub s: i32,
    pub v: i32,
}

impl HsvBound {
    pub const fn new(h: i32, s: i32, v: i32) -> Self {
        Self { h, s, v }
    }
}

/// Inclusive HSV range; wraps through hue 0 when `low.h > high.h`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct HsvRange {
    pub low: HsvBound,
    pub high: HsvBound,
}

impl HsvRange {
    pub const fn new(low: HsvBound, high: HsvBound) -> Self {
        Self { low, high }
    }

    /// Returns `true` when the hue interval crosses the origin.
    pub fn wraps(&self) -> bool {
        self.low.h > self.high.h
    }
}

/// Axis-aligned box in HSV space, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct HsvBox {
    pub low: HsvBound,
    pub high: HsvBound,
}

impl HsvBox {
    /// The placeholder box `((0,0,0),(0,0,0))` used when no wrap occurs.
    pub const EMPTY: HsvBox = HsvBox {
        low: HsvBound::new(0, 0, 0),
        high: HsvBound::new(0, 0, 0),
    };

    #[inline]
    pub fn contains(&self, h: u8, s: u8, v: u8) -> bool {
        let (h, s, v) = (h as i32, s as i32, v as i32);
        (self.low.h..=self.high.h).contains(&h)
            && (self.low.s..=self.high.s).contains(&s)
            && (self.low.v..=self.high.v).contains(&v)
    }
}

/// One or two HSV boxes whose union is the intended (possibly wrapped) range.
///
/// The second box is [`HsvBox::EMPTY`] whenever the range does not wrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Threshold {
    boxes: [HsvBox; 2],
    wrapping: bool,
}

impl Threshold {
    /// Build the threshold for an inclusive HSV range.
    ///
    /// No validation is performed; channel ranges are the caller's concern.
    pub fn from_range(range: &HsvRange) -> Self {
        let HsvRange { low, high } = *range;
        if low.h <= high.h {
            return Self {
                boxes: [HsvBox { low, high }, HsvBox::EMPTY],
                wrapping: false,
            };
        }
        let upper = HsvBox {
            low,
            high: HsvBound::new(HUE_MAX, high.s, high.v),
        };
        let lower = HsvBox {
            low: HsvBound::new(0, low.s, low.v),
            high,
        };
        Self {
            boxes: [upper, lower],
            wrapping: true,
        }
    }

    pub fn is_wrapping(&self) -> bool {
        self.wrapping
    }

    pub fn primary(&self) -> &HsvBox {
        &self.boxes[0]
    }

    pub fn secondary(&self) -> &HsvBox {
        &self.boxes[1]
    }

    /// Boxes that take part in the mask; the empty placeholder is skipped so
    /// black pixels never match a non-wrapping threshold.
    pub fn active_boxes(&self) -> &[HsvBox] {
        if self.wrapping {
            &self.boxes
        } else {
            &self.boxes[..1]
        }
    }

    /// Inclusive membership test: logical OR over the active boxes.
    #[inline]
    pub fn contains(&self, h: u8, s: u8, v: u8) -> bool {
        self.active_boxes().iter().any(|b| b.contains(h, s, v))
    }
}

impl From<HsvRange> for Threshold {
    fn from(range: HsvRange) -> Self {
        Self::from_range(&range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(low: (i32, i32, i32), high: (i32, i32, i32)) -> HsvRange {
        HsvRange::new(
            HsvBound::new(low.0, low.1, low.2),
            HsvBound::new(high.0, high.1, high.2),
        )
    }

    #[test]
    fn non_wrapping_range_has_empty_second_box() {
        for (lo, hi) in [(0, 0), (10, 20), (60, 80), (0, 180), (179, 180)] {
            let t = Threshold::from_range(&range((lo, 63, 150), (hi, 255, 255)));
            assert!(!t.is_wrapping());
            assert_eq!(*t.secondary(), HsvBox::EMPTY);
            assert_eq!(t.primary().low.h, lo);
            assert_eq!(t.primary().high.h, hi);
            assert_eq!(t.active_boxes().len(), 1);
        }
    }

    #[test]
    fn wrapping_range_splits_at_hue_origin() {
        let t = Threshold::from_range(&range((174, 153, 100), (15, 255, 255)));
        assert!(t.is_wrapping());
        assert_eq!(
            *t.primary(),
            HsvBox {
                low: HsvBound::new(174, 153, 100),
                high: HsvBound::new(180, 255, 255),
            }
        );
        assert_eq!(
            *t.secondary(),
            HsvBox {
                low: HsvBound::new(0, 153, 100),
                high: HsvBound::new(15, 255, 255),
            }
        );
    }

    #[test]
    fn wrapped_hue_union_matches_intended_interval() {
        for (lo, hi) in [(174, 15), (100, 0), (180, 179), (90, 89)] {
            let t = Threshold::from_range(&range((lo, 0, 0), (hi, 255, 255)));
            for h in 0..=180u8 {
                let expected = (h as i32) <= hi || (h as i32) >= lo;
                assert_eq!(t.contains(h, 128, 128), expected, "lo={lo} hi={hi} h={h}");
            }
        }
    }

    #[test]
    fn black_pixels_do_not_match_non_wrapping_threshold() {
        let t = Threshold::from_range(&range((60, 63, 150), (80, 255, 255)));
        assert!(!t.contains(0, 0, 0));
        assert!(t.contains(70, 200, 200));
        assert!(!t.contains(70, 200, 149));
    }
}
