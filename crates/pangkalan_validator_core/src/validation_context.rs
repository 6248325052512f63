use std::cell::Cell;

use pangkalan_model::BoundingBox;

pub const DEFAULT_FEATURE_COUNT_WARNING_THRESHOLD: usize = 1000;

thread_local! {
    static REGION_BOUNDS: Cell<Option<BoundingBox>> = const { Cell::new(Some(BoundingBox::INDONESIA)) };
    static FEATURE_COUNT_WARNING_THRESHOLD: Cell<usize> =
        const { Cell::new(DEFAULT_FEATURE_COUNT_WARNING_THRESHOLD) };
}

pub struct RegionBoundsGuard {
    previous: Option<BoundingBox>,
}

impl Drop for RegionBoundsGuard {
    fn drop(&mut self) {
        REGION_BOUNDS.with(|cell| cell.set(self.previous));
    }
}

/// Overrides the service region for the current thread. `None` turns the
/// region check off; the previous value is restored when the guard drops.
pub fn set_region_bounds(bounds: Option<BoundingBox>) -> RegionBoundsGuard {
    let previous = REGION_BOUNDS.with(|cell| cell.replace(bounds));
    RegionBoundsGuard { previous }
}

pub fn region_bounds() -> Option<BoundingBox> {
    REGION_BOUNDS.with(|cell| cell.get())
}

pub struct FeatureCountThresholdGuard {
    previous: usize,
}

impl Drop for FeatureCountThresholdGuard {
    fn drop(&mut self) {
        FEATURE_COUNT_WARNING_THRESHOLD.with(|cell| cell.set(self.previous));
    }
}

pub fn set_feature_count_warning_threshold(threshold: usize) -> FeatureCountThresholdGuard {
    let previous = FEATURE_COUNT_WARNING_THRESHOLD.with(|cell| cell.replace(threshold));
    FeatureCountThresholdGuard { previous }
}

pub fn feature_count_warning_threshold() -> usize {
    FEATURE_COUNT_WARNING_THRESHOLD.with(|cell| cell.get())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guards_restore_previous_values() {
        assert_eq!(region_bounds(), Some(BoundingBox::INDONESIA));
        {
            let _guard = set_region_bounds(None);
            assert_eq!(region_bounds(), None);
            {
                let _inner = set_feature_count_warning_threshold(5);
                assert_eq!(feature_count_warning_threshold(), 5);
            }
            assert_eq!(
                feature_count_warning_threshold(),
                DEFAULT_FEATURE_COUNT_WARNING_THRESHOLD
            );
        }
        assert_eq!(region_bounds(), Some(BoundingBox::INDONESIA));
    }
}
