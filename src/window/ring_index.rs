/// Position inside a ring of `width` slots. All arithmetic wraps modulo `width`,
/// so stepping back from slot 0 lands on slot `width - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingIndex {
    index: usize,
    width: usize,
}

impl RingIndex {
    /// Slot holding the unix second `second` in a ring of `width` slots.
    pub fn of_second(second: u64, width: usize) -> Self {
        assert!(width > 0, "ring width must be positive");
        Self { index: (second % width as u64) as usize, width }
    }

    pub fn new(index: usize, width: usize) -> Self {
        assert!(width > 0, "ring width must be positive");
        Self { index: index % width, width }
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn back(self, steps: usize) -> Self {
        let steps = steps % self.width;
        Self { index: (self.index + self.width - steps) % self.width, width: self.width }
    }

    /// Visits `steps` slots starting at `self` and moving backward: `self`,
    /// `self - 1`, ... wrapping at 0. Never yields more than `width` slots.
    pub fn walk_back(self, steps: usize) -> impl Iterator<Item = RingIndex> {
        let steps = steps.min(self.width);
        (0..steps).map(move |i| self.back(i))
    }
}
