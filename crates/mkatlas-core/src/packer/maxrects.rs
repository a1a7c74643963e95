use tracing::{debug, instrument, trace, warn};

use super::{Placement, RequestId};
use crate::config::PackerConfig;
use crate::error::{AtlasError, Result};
use crate::model::Rect;

/// Leftover area first, then the shorter leftover side. Lower is better.
type FitScore = (u64, u32);

#[derive(Debug, Clone)]
struct Bin {
    full: bool,
    free: Vec<Rect>,
}

impl Bin {
    fn empty(cfg: &PackerConfig) -> Self {
        Self {
            full: false,
            free: vec![Rect::new(0, 0, cfg.bin_width, cfg.bin_height)],
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    bin: usize,
    free: usize,
    pending: usize,
    flipped: bool,
}

/// Multi-bin MaxRects packer (best area fit).
///
/// Every step scores all `(free rect, pending request, orientation)` triples
/// across all open bins and places the best one, so the input order only
/// matters for breaking ties. When nothing fits, all current bins are closed
/// and a new one is opened, up to `max_bins`.
pub struct MaxRectsPacker {
    config: PackerConfig,
    requests: Vec<Placement>,
    pending: Vec<usize>,
    bins: Vec<Bin>,
}

impl MaxRectsPacker {
    pub fn new(config: PackerConfig) -> Self {
        Self {
            config,
            requests: Vec::new(),
            pending: Vec::new(),
            bins: Vec::new(),
        }
    }

    /// Replaces the configuration and drops all bins and requests.
    pub fn configure(&mut self, config: PackerConfig) {
        self.config = config;
        self.clear();
    }

    pub fn config(&self) -> &PackerConfig {
        &self.config
    }

    /// Drops all bins and requests. Previously returned `RequestId`s become invalid.
    pub fn clear(&mut self) {
        self.requests.clear();
        self.pending.clear();
        self.bins.clear();
    }

    /// Submits a `w`x`h` rectangle.
    ///
    /// Fails with [`AtlasError::Oversize`] if it cannot fit an empty bin in any
    /// allowed orientation. Zero-area rectangles are accepted but never placed.
    pub fn add(&mut self, w: u32, h: u32) -> Result<RequestId> {
        if !self.config.fits(w, h) {
            return Err(AtlasError::Oversize {
                width: w,
                height: h,
                bin_width: self.config.bin_width,
                bin_height: self.config.bin_height,
            });
        }
        let id = self.requests.len();
        self.requests.push(Placement::unplaced(w, h));
        if w != 0 && h != 0 {
            self.pending.push(id);
        }
        Ok(RequestId(id))
    }

    /// Places every pending rectangle, starting from a single empty bin.
    ///
    /// On [`AtlasError::PackingExhausted`] the rectangles placed so far keep
    /// their results and the rest stay unassigned.
    #[instrument(skip_all, fields(pending = self.pending.len()))]
    pub fn pack(&mut self) -> Result<()> {
        self.bins.clear();
        self.bins.push(Bin::empty(&self.config));
        let total = self.pending.len();

        while !self.pending.is_empty() {
            let Some(best) = self.find_best() else {
                if self.config.max_bins > 0 && self.bins.len() >= self.config.max_bins as usize {
                    for &idx in &self.pending {
                        self.requests[idx].bin = None;
                    }
                    let placed = total - self.pending.len();
                    warn!(placed, total, bins = self.bins.len(), "texture limit reached");
                    return Err(AtlasError::PackingExhausted { placed, total });
                }
                // Close every bin so the search never revisits them.
                for bin in &mut self.bins {
                    bin.full = true;
                }
                self.bins.push(Bin::empty(&self.config));
                debug!(bins = self.bins.len(), "opened bin");
                continue;
            };

            let origin = self.bins[best.bin].free[best.free];
            let idx = self.pending.remove(best.pending);
            let placement = &mut self.requests[idx];
            placement.x = origin.x;
            placement.y = origin.y;
            placement.flipped = best.flipped;
            placement.bin = Some(best.bin);
            let node = placement.footprint();
            trace!(?node, bin = best.bin, flipped = best.flipped, "placed");

            self.split_free_rects(best.bin, &node);
        }

        debug!(bins = self.bins.len(), placed = total, "packing finished");
        Ok(())
    }

    pub fn placement(&self, id: RequestId) -> &Placement {
        &self.requests[id.0]
    }

    /// Placements of all requests, indexed by `RequestId::index`.
    pub fn placements(&self) -> &[Placement] {
        &self.requests
    }

    pub fn bin_count(&self) -> usize {
        self.bins.len()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Free rectangles currently tracked for `bin`.
    pub fn free_rects(&self, bin: usize) -> &[Rect] {
        &self.bins[bin].free
    }

    fn score(fr: &Rect, w: u32, h: u32) -> FitScore {
        let area_fit = fr.area() - (w as u64 * h as u64);
        let short_fit = (fr.w - w).min(fr.h - h);
        (area_fit, short_fit)
    }

    fn find_best(&self) -> Option<Candidate> {
        let mut best: Option<(FitScore, Candidate)> = None;

        for (bin_idx, bin) in self.bins.iter().enumerate() {
            if bin.full {
                continue;
            }
            for (free_idx, fr) in bin.free.iter().enumerate() {
                for (pending_idx, &req_idx) in self.pending.iter().enumerate() {
                    let req = &self.requests[req_idx];
                    let mut consider = |w: u32, h: u32, flipped: bool| {
                        if w > fr.w || h > fr.h {
                            return;
                        }
                        let score = Self::score(fr, w, h);
                        if best.is_none_or(|(s, _)| score < s) {
                            best = Some((
                                score,
                                Candidate {
                                    bin: bin_idx,
                                    free: free_idx,
                                    pending: pending_idx,
                                    flipped,
                                },
                            ));
                        }
                    };
                    consider(req.width, req.height, false);
                    if self.config.allow_rotation {
                        consider(req.height, req.width, true);
                    }
                    // Nothing beats a perfect fit and ties keep the earliest.
                    if matches!(best, Some(((0, 0), _))) {
                        return best.map(|(_, c)| c);
                    }
                }
            }
        }

        best.map(|(_, c)| c)
    }

    /// Replaces every free rect overlapping `node` by its uncovered slivers and
    /// drops the ones that are no longer maximal.
    fn split_free_rects(&mut self, bin: usize, node: &Rect) {
        let bin = &mut self.bins[bin];
        let mut kept: Vec<Rect> = Vec::with_capacity(bin.free.len());
        let mut split: Vec<Rect> = Vec::new();
        for fr in &bin.free {
            if fr.intersects(node) {
                split_free_rect(fr, node, &mut split);
            } else {
                kept.push(*fr);
            }
        }

        split.retain(|nr| !kept.iter().any(|k| k.contains(nr)));
        let split = prune_contained(split);
        kept.retain(|k| !split.iter().any(|nr| nr.contains(k)));
        kept.extend(split);
        bin.free = kept;
    }
}

/// Pushes the parts of `fr` above, below, left and right of `node`.
/// Each part spans the whole of `fr` along the other axis.
fn split_free_rect(fr: &Rect, node: &Rect, out: &mut Vec<Rect>) {
    // above
    if node.y > fr.y {
        out.push(Rect::new(fr.x, fr.y, fr.w, node.y - fr.y));
    }
    // below
    if node.bottom() < fr.bottom() {
        out.push(Rect::new(fr.x, node.bottom(), fr.w, fr.bottom() - node.bottom()));
    }
    // left
    if node.x > fr.x {
        out.push(Rect::new(fr.x, fr.y, node.x - fr.x, fr.h));
    }
    // right
    if node.right() < fr.right() {
        out.push(Rect::new(node.right(), fr.y, fr.right() - node.right(), fr.h));
    }
}

/// Removes rects contained in another one of the list; of equal rects the first stays.
fn prune_contained(rects: Vec<Rect>) -> Vec<Rect> {
    rects
        .iter()
        .enumerate()
        .filter(|&(i, r)| {
            !rects
                .iter()
                .enumerate()
                .any(|(j, o)| i != j && o.contains(r) && (o != r || j < i))
        })
        .map(|(_, r)| *r)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_maximal(p: &MaxRectsPacker) {
        for bin in 0..p.bin_count() {
            let free = p.free_rects(bin);
            for (i, a) in free.iter().enumerate() {
                for (j, b) in free.iter().enumerate() {
                    assert!(i == j || !b.contains(a), "free rect {a:?} inside {b:?}");
                }
            }
        }
    }

    #[test]
    fn split_produces_four_slivers_around_inner_node() {
        let mut out = Vec::new();
        split_free_rect(&Rect::new(0, 0, 10, 10), &Rect::new(2, 3, 4, 5), &mut out);
        assert_eq!(
            out,
            vec![
                Rect::new(0, 0, 10, 3),
                Rect::new(0, 8, 10, 2),
                Rect::new(0, 0, 2, 10),
                Rect::new(6, 0, 4, 10),
            ]
        );
    }

    #[test]
    fn prune_keeps_first_duplicate() {
        let rects = vec![
            Rect::new(0, 0, 4, 4),
            Rect::new(1, 1, 2, 2),
            Rect::new(0, 0, 4, 4),
            Rect::new(5, 5, 1, 1),
        ];
        assert_eq!(
            prune_contained(rects),
            vec![Rect::new(0, 0, 4, 4), Rect::new(5, 5, 1, 1)]
        );
    }

    #[test]
    fn first_placement_goes_to_origin() {
        let mut p = MaxRectsPacker::new(PackerConfig::new(64, 64, 0, false));
        let id = p.add(16, 8).unwrap();
        p.pack().unwrap();
        let pl = p.placement(id);
        assert_eq!((pl.x, pl.y, pl.bin), (0, 0, Some(0)));
        assert_eq!(
            p.free_rects(0),
            &[Rect::new(0, 8, 64, 56), Rect::new(16, 0, 48, 64)]
        );
    }

    #[test]
    fn free_rects_stay_maximal() {
        let mut p = MaxRectsPacker::new(PackerConfig::new(100, 100, 0, true));
        for (w, h) in [(30, 20), (20, 30), (50, 50), (10, 70), (25, 25), (40, 10)] {
            p.add(w, h).unwrap();
        }
        p.pack().unwrap();
        assert_maximal(&p);
    }

    #[test]
    fn perfect_fit_fills_bin_exactly() {
        let mut p = MaxRectsPacker::new(PackerConfig::new(32, 32, 1, false));
        let ids: Vec<_> = (0..4).map(|_| p.add(16, 16).unwrap()).collect();
        p.pack().unwrap();
        for id in ids {
            assert_eq!(p.placement(id).bin, Some(0));
        }
        assert!(p.free_rects(0).is_empty());
    }

    #[test]
    fn zero_area_is_accepted_but_not_placed() {
        let mut p = MaxRectsPacker::new(PackerConfig::new(8, 8, 0, false));
        let empty = p.add(0, 5).unwrap();
        let full = p.add(8, 8).unwrap();
        assert_eq!(p.pending_len(), 1);
        p.pack().unwrap();
        assert_eq!(p.placement(empty).bin, None);
        assert_eq!(p.placement(full).bin, Some(0));
        assert_eq!(p.bin_count(), 1);
    }

    #[test]
    fn configure_resets_state() {
        let mut p = MaxRectsPacker::new(PackerConfig::new(8, 8, 0, false));
        p.add(4, 4).unwrap();
        p.pack().unwrap();
        p.configure(PackerConfig::new(16, 16, 0, true));
        assert_eq!(p.bin_count(), 0);
        assert_eq!(p.pending_len(), 0);
        assert!(p.placements().is_empty());
        assert_eq!(p.config().bin_width, 16);
    }
}
