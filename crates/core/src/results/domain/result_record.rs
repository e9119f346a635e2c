use crate::detection::domain::object_tracker::TrackedObject;
use crate::shared::bbox::BoxTlwh;

/// One tracked object as written to the result file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Observation {
    pub bbox: BoxTlwh,
    pub identity: u32,
}

/// Tracking output for one processed frame.
///
/// `frame_index` is the 1-based ordinal of the frame among all frames pulled
/// from the source. Observations keep the tracker's output order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResultRecord {
    pub frame_index: usize,
    pub observations: Vec<Observation>,
}

impl ResultRecord {
    /// Builds a record from tracker output, truncating boxes to whole pixels.
    pub fn from_tracks(frame_index: usize, tracks: &[TrackedObject]) -> Self {
        Self {
            frame_index,
            observations: tracks
                .iter()
                .map(|t| Observation {
                    bbox: t.bbox.to_tlwh(),
                    identity: t.identity,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::bbox::BoxXyxy;

    #[test]
    fn test_from_tracks_truncates_and_keeps_order() {
        let tracks = [
            TrackedObject {
                bbox: BoxXyxy::new(10.7, 20.2, 50.9, 80.5),
                identity: 9,
            },
            TrackedObject {
                bbox: BoxXyxy::new(0.0, 0.0, 5.0, 5.0),
                identity: 2,
            },
        ];
        let record = ResultRecord::from_tracks(3, &tracks);

        assert_eq!(record.frame_index, 3);
        assert_eq!(
            record.observations,
            vec![
                Observation {
                    bbox: BoxTlwh::new(10, 20, 40, 60),
                    identity: 9,
                },
                Observation {
                    bbox: BoxTlwh::new(0, 0, 5, 5),
                    identity: 2,
                },
            ]
        );
    }
}
