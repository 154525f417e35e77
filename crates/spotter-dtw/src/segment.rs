//! Two-level segmentation of a feature sequence.
//!
//! Frames are merged bottom-up into basic segments, and runs of basic segments
//! into super-segments. Both levels use the same greedy rule: repeatedly merge
//! the adjacent pair with the smallest Ward cost
//! `(n_a * n_b / (n_a + n_b)) * ||mean_a - mean_b||^2` (ties go to the lower
//! start) until the target count is reached or every remaining merge would
//! exceed the level's frame cap.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::ops::Range;

use tracing::{debug, instrument};

use crate::config::SegmentConfig;
use crate::error::DtwError;
use crate::sequence::{FeatureView, TimeSpan};

/// A contiguous run of frames represented by its mean vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    span: TimeSpan,
    mean: Vec<f64>,
}

impl Segment {
    /// Absolute frames covered by the segment.
    #[must_use]
    pub fn span(&self) -> TimeSpan {
        self.span
    }

    /// Mean of the member frames.
    #[must_use]
    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    /// Number of member frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.span.len()
    }

    /// Always `false`; segments hold at least one frame.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.span.is_empty()
    }
}

/// A run of consecutive basic segments.
#[derive(Debug, Clone, PartialEq)]
pub struct SuperSegment {
    segment: Segment,
    members: Range<usize>,
}

impl SuperSegment {
    /// Absolute frames covered by the super-segment.
    #[must_use]
    pub fn span(&self) -> TimeSpan {
        self.segment.span
    }

    /// Mean of all member frames.
    #[must_use]
    pub fn mean(&self) -> &[f64] {
        &self.segment.mean
    }

    /// Indices of the member basic segments.
    #[must_use]
    pub fn members(&self) -> Range<usize> {
        self.members.clone()
    }
}

/// Basic segments and super-segments of one feature window. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Segmentation {
    span: TimeSpan,
    dim: usize,
    basic: Vec<Segment>,
    supers: Vec<SuperSegment>,
    // closing[j] = super-segment whose last member is basic segment j, if it has
    // more than one member.
    closing: Vec<Option<usize>>,
}

impl Segmentation {
    /// Segment the frames of `view`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DtwError::InvalidParameter`] | `config` is out of range |
    /// | [`DtwError::EmptySequence`] | `view` has no frames |
    #[instrument(skip(view, config), fields(frames = view.len(), offset = view.offset()))]
    pub fn build(view: FeatureView<'_>, config: &SegmentConfig) -> Result<Self, DtwError> {
        config.validate()?;
        if view.is_empty() {
            return Err(DtwError::EmptySequence { role: "segmented" });
        }

        let n_frames = view.len();
        let frame_units = view.frames().map(|f| (1, f.to_vec())).collect();
        let basic_target = ratio_target(n_frames as f64 * config.bseg_ratio);
        let basic_ranges = merge_adjacent(frame_units, basic_target, config.width);

        let basic: Vec<Segment> = basic_ranges
            .iter()
            .map(|r| mean_segment(view, r.clone()))
            .collect();

        let basic_units = basic
            .iter()
            .map(|s| {
                let n = s.len() as f64;
                (s.len(), s.mean.iter().map(|m| m * n).collect())
            })
            .collect();
        let super_target = ratio_target(basic.len() as f64 / config.superseg_ratio);
        let super_cap = config.gran.saturating_mul(config.width);
        let super_ranges = merge_adjacent(basic_units, super_target, super_cap);

        let offset = view.offset();
        let supers: Vec<SuperSegment> = super_ranges
            .into_iter()
            .map(|members| {
                let first = basic[members.start].span.start() - offset;
                let last = basic[members.end - 1].span.end() - offset;
                SuperSegment {
                    segment: mean_segment(view, first..last),
                    members,
                }
            })
            .collect();

        let mut closing = vec![None; basic.len()];
        for (k, s) in supers.iter().enumerate() {
            if s.members.len() > 1 {
                closing[s.members.end - 1] = Some(k);
            }
        }

        debug!(
            basic = basic.len(),
            supers = supers.len(),
            "segmentation built"
        );

        Ok(Self {
            span: view.span(),
            dim: view.dim(),
            basic,
            supers,
            closing,
        })
    }

    /// Absolute frames covered by the segmentation.
    #[must_use]
    pub fn span(&self) -> TimeSpan {
        self.span
    }

    /// Feature dimension of the segment means.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Basic segments in frame order.
    #[must_use]
    pub fn basic(&self) -> &[Segment] {
        &self.basic
    }

    /// Super-segments in frame order.
    #[must_use]
    pub fn supers(&self) -> &[SuperSegment] {
        &self.supers
    }

    /// Number of basic segments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.basic.len()
    }

    /// Always `false`; a segmentation holds at least one segment.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.basic.is_empty()
    }

    /// The multi-member super-segment that ends with basic segment `index`, if any.
    #[must_use]
    pub fn closing_super(&self, index: usize) -> Option<&SuperSegment> {
        self.closing[index].map(|k| &self.supers[k])
    }
}

fn ratio_target(raw: f64) -> usize {
    (raw.ceil() as usize).max(1)
}

fn mean_segment(view: FeatureView<'_>, frames: Range<usize>) -> Segment {
    let mut mean = vec![0.0; view.dim()];
    for i in frames.clone() {
        for (m, v) in mean.iter_mut().zip(view.frame(i)) {
            *m += v;
        }
    }
    let n = frames.len() as f64;
    for m in &mut mean {
        *m /= n;
    }
    Segment {
        span: TimeSpan::new_unchecked(view.offset() + frames.start, view.offset() + frames.end),
        mean,
    }
}

struct Group {
    first: usize,
    last: usize,
    frames: usize,
    sum: Vec<f64>,
    prev: Option<usize>,
    next: Option<usize>,
    version: u32,
    alive: bool,
}

#[derive(Debug, PartialEq)]
struct MergeCandidate {
    cost: f64,
    left: usize,
    right: usize,
    left_version: u32,
    right_version: u32,
}

impl Eq for MergeCandidate {}

impl Ord for MergeCandidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cost
            .total_cmp(&other.cost)
            .then(self.left.cmp(&other.left))
    }
}

impl PartialOrd for MergeCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn ward_cost(a: &Group, b: &Group) -> f64 {
    let na = a.frames as f64;
    let nb = b.frames as f64;
    let dist_sq: f64 = a
        .sum
        .iter()
        .zip(&b.sum)
        .map(|(sa, sb)| (sa / na - sb / nb).powi(2))
        .sum();
    na * nb / (na + nb) * dist_sq
}

fn push_candidate(
    groups: &[Group],
    left: usize,
    right: usize,
    max_frames: usize,
    heap: &mut BinaryHeap<Reverse<MergeCandidate>>,
) {
    let (l, r) = (&groups[left], &groups[right]);
    if l.frames + r.frames > max_frames {
        return;
    }
    heap.push(Reverse(MergeCandidate {
        cost: ward_cost(l, r),
        left,
        right,
        left_version: l.version,
        right_version: r.version,
    }));
}

/// Greedily merge adjacent units `(frame_count, frame_sum)` down to `target`
/// groups, never letting a group exceed `max_frames` frames. Returns the
/// unit-index range of every group, in order.
fn merge_adjacent(units: Vec<(usize, Vec<f64>)>, target: usize, max_frames: usize) -> Vec<Range<usize>> {
    let n = units.len();
    let mut groups: Vec<Group> = units
        .into_iter()
        .enumerate()
        .map(|(i, (frames, sum))| Group {
            first: i,
            last: i,
            frames,
            sum,
            prev: i.checked_sub(1),
            next: (i + 1 < n).then_some(i + 1),
            version: 0,
            alive: true,
        })
        .collect();

    let mut heap = BinaryHeap::new();
    for i in 1..n {
        push_candidate(&groups, i - 1, i, max_frames, &mut heap);
    }

    let mut alive = n;
    while alive > target {
        let Some(Reverse(c)) = heap.pop() else {
            break;
        };
        let (l, r) = (c.left, c.right);
        if !groups[l].alive
            || !groups[r].alive
            || groups[l].version != c.left_version
            || groups[r].version != c.right_version
        {
            continue;
        }

        let absorbed = std::mem::take(&mut groups[r].sum);
        let (r_frames, r_last, r_next) = (groups[r].frames, groups[r].last, groups[r].next);
        groups[r].alive = false;

        let left = &mut groups[l];
        left.frames += r_frames;
        left.last = r_last;
        left.next = r_next;
        left.version += 1;
        for (s, v) in left.sum.iter_mut().zip(&absorbed) {
            *s += v;
        }
        alive -= 1;

        if let Some(next) = r_next {
            groups[next].prev = Some(l);
            push_candidate(&groups, l, next, max_frames, &mut heap);
        }
        if let Some(prev) = groups[l].prev {
            push_candidate(&groups, prev, l, max_frames, &mut heap);
        }
    }

    let mut ranges = Vec::with_capacity(alive);
    let mut cursor = (n > 0).then_some(0);
    while let Some(g) = cursor {
        ranges.push(groups[g].first..groups[g].last + 1);
        cursor = groups[g].next;
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::FeatureSequence;

    fn scalar_seq(values: &[f64]) -> FeatureSequence {
        FeatureSequence::from_flat(values.to_vec(), 1).unwrap()
    }

    fn spans(segs: &[Segment]) -> Vec<(usize, usize)> {
        segs.iter().map(|s| (s.span().start(), s.span().end())).collect()
    }

    #[test]
    fn step_signal_splits_at_the_step() {
        let s = scalar_seq(&[0.0, 0.0, 0.0, 5.0, 5.0, 5.0]);
        let config = SegmentConfig::new(0.3, 4.0).unwrap();
        let seg = Segmentation::build(s.as_view(), &config).unwrap();
        assert_eq!(spans(seg.basic()), vec![(0, 3), (3, 6)]);
        assert_eq!(seg.basic()[0].mean(), &[0.0]);
        assert_eq!(seg.basic()[1].mean(), &[5.0]);
    }

    #[test]
    fn width_caps_basic_segments() {
        let values: Vec<f64> = (0..50).map(|i| (i / 10) as f64).collect();
        let s = scalar_seq(&values);
        let config = SegmentConfig::new(0.1, 4.0).unwrap().with_width(4);
        let seg = Segmentation::build(s.as_view(), &config).unwrap();
        assert!(seg.basic().iter().all(|b| b.len() <= 4));
        // Target of 5 is unreachable under a 4-frame cap.
        assert!(seg.len() >= 13);
    }

    #[test]
    fn segments_tile_the_window() {
        let values: Vec<f64> = (0..37).map(|i| ((i * 7) % 11) as f64).collect();
        let s = scalar_seq(&values);
        let span = TimeSpan::new(4, 33).unwrap();
        let seg = Segmentation::build(s.view(Some(span)).unwrap(), &SegmentConfig::default()).unwrap();

        let mut expected_start = 4;
        for b in seg.basic() {
            assert_eq!(b.span().start(), expected_start);
            expected_start = b.span().end();
        }
        assert_eq!(expected_start, 33);

        let mut expected_member = 0;
        for sup in seg.supers() {
            assert_eq!(sup.members().start, expected_member);
            expected_member = sup.members().end;
        }
        assert_eq!(expected_member, seg.len());
        assert_eq!(seg.span(), span);
    }

    #[test]
    fn super_segments_group_constant_regions() {
        let mut values = vec![0.0; 6];
        values.extend([9.0; 6]);
        let s = scalar_seq(&values);
        let config = SegmentConfig::new(0.5, 3.0).unwrap().with_width(2).with_gran(3);
        let seg = Segmentation::build(s.as_view(), &config).unwrap();

        assert_eq!(
            spans(seg.basic()),
            vec![(0, 2), (2, 4), (4, 6), (6, 8), (8, 10), (10, 12)]
        );
        assert_eq!(seg.supers().len(), 2);
        assert_eq!(seg.supers()[0].members(), 0..3);
        assert_eq!(seg.supers()[1].members(), 3..6);
        assert_eq!(seg.supers()[1].mean(), &[9.0]);
        assert!(seg.closing_super(1).is_none());
        assert_eq!(seg.closing_super(2).map(|s| s.span()), Some(TimeSpan::new(0, 6).unwrap()));
        assert_eq!(seg.closing_super(5).map(|s| s.span()), Some(TimeSpan::new(6, 12).unwrap()));
    }

    #[test]
    fn single_frame_window() {
        let s = scalar_seq(&[3.0]);
        let seg = Segmentation::build(s.as_view(), &SegmentConfig::default()).unwrap();
        assert_eq!(seg.len(), 1);
        assert_eq!(seg.supers().len(), 1);
        assert!(seg.closing_super(0).is_none());
    }

    #[test]
    fn empty_window_rejected() {
        let s = scalar_seq(&[1.0, 2.0]);
        let view = s.view(Some(TimeSpan::new(1, 1).unwrap())).unwrap();
        let result = Segmentation::build(view, &SegmentConfig::default());
        assert!(matches!(result, Err(DtwError::EmptySequence { .. })));
    }

    #[test]
    fn deterministic() {
        let values: Vec<f64> = (0..200).map(|i| (i as f64 * 0.37).sin()).collect();
        let s = scalar_seq(&values);
        let config = SegmentConfig::default();
        let a = Segmentation::build(s.as_view(), &config).unwrap();
        let b = Segmentation::build(s.as_view(), &config).unwrap();
        assert_eq!(a, b);
    }
}
