/// Simplified ByteTrack multi-object tracker.
///
/// Two-stage association strategy: high-confidence detections are matched
/// first, then low-confidence detections fill remaining unmatched confirmed
/// tracks. New tracks start tentative and are only reported once they have
/// been matched `n_init` times in a row.
use std::collections::HashSet;

use crate::config::app_config::TrackerConfig;
use crate::detection::domain::object_tracker::{ObjectTracker, TrackedObject};
use crate::shared::bbox::{BoxXywh, BoxXyxy};
use crate::shared::frame::Frame;

#[derive(Clone, Debug)]
struct TrackState {
    id: u32,
    bbox: BoxXyxy,
    frames_lost: usize,
    hits: usize,
    confirmed: bool,
    matched: bool,
}

pub struct ByteTracker {
    tracks: Vec<TrackState>,
    next_id: u32,
    config: TrackerConfig,
}

impl ByteTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            tracks: Vec::new(),
            next_id: 1,
            config,
        }
    }

    fn iou_threshold(&self) -> f64 {
        1.0 - self.config.max_iou_distance
    }

    fn associate(&mut self, detections: &[(BoxXyxy, f64)]) -> Vec<TrackedObject> {
        let (high, low) = self.split_by_confidence(detections);

        self.reset_match_flags();
        let num_existing = self.tracks.len();
        let matched_high = self.match_high_confidence(&high);
        self.match_low_confidence(&low);
        self.create_new_tracks(&high, &matched_high);
        self.age_unmatched_tracks(num_existing);

        self.confirmed_tracks()
    }

    fn split_by_confidence(&self, detections: &[(BoxXyxy, f64)]) -> (IndexedBoxes, IndexedBoxes) {
        let mut high = Vec::new();
        let mut low = Vec::new();
        for (i, &(bbox, score)) in detections.iter().enumerate() {
            if score >= self.config.high_confidence {
                high.push((i, bbox));
            } else if score >= self.config.min_confidence {
                low.push((i, bbox));
            }
        }
        (high, low)
    }

    fn reset_match_flags(&mut self) {
        for track in &mut self.tracks {
            track.matched = false;
        }
    }

    fn match_high_confidence(&mut self, high: &[(usize, BoxXyxy)]) -> HashSet<usize> {
        let track_refs: Vec<(usize, BoxXyxy)> = self
            .tracks
            .iter()
            .enumerate()
            .map(|(i, t)| (i, t.bbox))
            .collect();

        let mut matched_det_indices = HashSet::new();
        for (ti, di) in greedy_match(&track_refs, high, self.iou_threshold()) {
            self.apply_match(ti, &high[di].1);
            matched_det_indices.insert(high[di].0);
        }
        matched_det_indices
    }

    /// Low-confidence boxes only keep already-confirmed tracks alive.
    fn match_low_confidence(&mut self, low: &[(usize, BoxXyxy)]) {
        let unmatched_refs: Vec<(usize, BoxXyxy)> = self
            .tracks
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.matched && t.confirmed)
            .map(|(i, t)| (i, t.bbox))
            .collect();

        for (ti, di) in greedy_match(&unmatched_refs, low, self.iou_threshold()) {
            self.apply_match(ti, &low[di].1);
        }
    }

    fn apply_match(&mut self, track_idx: usize, bbox: &BoxXyxy) {
        let n_init = self.config.n_init;
        let track = &mut self.tracks[track_idx];
        track.bbox = *bbox;
        track.frames_lost = 0;
        track.matched = true;
        track.hits += 1;
        if track.hits >= n_init {
            track.confirmed = true;
        }
    }

    fn create_new_tracks(&mut self, high: &[(usize, BoxXyxy)], matched: &HashSet<usize>) {
        for (di, bbox) in high {
            if !matched.contains(di) {
                self.tracks.push(TrackState {
                    id: self.next_id,
                    bbox: *bbox,
                    frames_lost: 0,
                    hits: 1,
                    confirmed: self.config.n_init <= 1,
                    matched: true,
                });
                self.next_id += 1;
            }
        }
    }

    /// A tentative track that misses a single update is dropped; confirmed
    /// tracks survive up to `max_age` missed updates.
    fn age_unmatched_tracks(&mut self, num_existing: usize) {
        for track in self.tracks.iter_mut().take(num_existing) {
            if !track.matched {
                track.frames_lost += 1;
            }
        }
        let max_age = self.config.max_age;
        self.tracks.retain(|t| {
            if t.confirmed {
                t.frames_lost <= max_age
            } else {
                t.frames_lost == 0
            }
        });
    }

    fn confirmed_tracks(&self) -> Vec<TrackedObject> {
        self.tracks
            .iter()
            .filter(|t| t.matched && t.confirmed)
            .map(|t| TrackedObject {
                bbox: t.bbox,
                identity: t.id,
            })
            .collect()
    }
}

impl ObjectTracker for ByteTracker {
    fn update(
        &mut self,
        boxes: &[BoxXywh],
        confidences: &[f64],
        frame: &Frame,
    ) -> Result<Vec<TrackedObject>, Box<dyn std::error::Error>> {
        if boxes.len() != confidences.len() {
            return Err(format!(
                "ByteTracker: {} boxes but {} confidences",
                boxes.len(),
                confidences.len()
            )
            .into());
        }

        let detections: Vec<(BoxXyxy, f64)> = boxes
            .iter()
            .zip(confidences)
            .map(|(b, &c)| (b.to_xyxy(), c))
            .collect();

        let (fw, fh) = (frame.width(), frame.height());
        Ok(self
            .associate(&detections)
            .into_iter()
            .map(|t| TrackedObject {
                bbox: t.bbox.clipped(fw, fh),
                ..t
            })
            .collect())
    }
}

type IndexedBoxes = Vec<(usize, BoxXyxy)>;

/// Greedy IoU matching: pairs sorted by descending IoU, each track/detection
/// used at most once. Returns `(track index, position in dets)`.
fn greedy_match(
    tracks: &[(usize, BoxXyxy)],
    dets: &[(usize, BoxXyxy)],
    thresh: f64,
) -> Vec<(usize, usize)> {
    let mut pairs: Vec<(usize, usize, f64)> = Vec::new();
    for (ti, track_box) in tracks {
        for (pos, (_, det_box)) in dets.iter().enumerate() {
            let score = track_box.iou(det_box);
            if score >= thresh {
                pairs.push((*ti, pos, score));
            }
        }
    }
    pairs.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));

    let mut used_tracks = HashSet::new();
    let mut used_dets = HashSet::new();
    let mut matches = Vec::new();

    for (ti, pos, _) in &pairs {
        if !used_tracks.contains(ti) && !used_dets.contains(pos) {
            used_tracks.insert(*ti);
            used_dets.insert(*pos);
            matches.push((*ti, *pos));
        }
    }
    matches
}
