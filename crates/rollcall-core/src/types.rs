use serde::{Deserialize, Serialize};

use crate::registry::KnownFace;

/// One row of the known-faces roster, as read from the spreadsheet.
///
/// Metadata columns are optional and carried through unmodified; only
/// `name` and `image_link` participate in registry construction.
#[derive(Debug, Clone, Default)]
pub struct RosterRow {
    pub name: String,
    pub image_link: String,
    pub gender: Option<String>,
    pub college: Option<String>,
    pub studying: Option<String>,
    pub branch: Option<String>,
}

/// Bounding box for a detected face, in source-image pixel coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
}

impl FaceBox {
    /// Rescale coordinates by a uniform factor (detection ran on a
    /// downscaled frame, boxes must map back to the original).
    pub fn scaled(&self, factor: f32) -> FaceBox {
        FaceBox {
            x: self.x * factor,
            y: self.y * factor,
            width: self.width * factor,
            height: self.height * factor,
            confidence: self.confidence,
        }
    }
}

/// Face embedding vector (512-dimensional for w600k_r50).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    /// Compute Euclidean distance between two embeddings. Lower = more alike.
    pub fn euclidean_distance(&self, other: &Embedding) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }
}

/// Result of matching a probe embedding against the registry.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub matched: bool,
    /// Name of the accepted registry entry (if any).
    pub name: Option<String>,
    /// Distance to the accepted entry (if any).
    pub distance: Option<f32>,
}

impl MatchResult {
    pub fn unknown() -> Self {
        MatchResult {
            matched: false,
            name: None,
            distance: None,
        }
    }

    /// Display label for rendering: the matched name, or "Unknown".
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("Unknown")
    }
}

/// Strategy for comparing a probe embedding against the known faces.
pub trait Matcher {
    fn find_match(&self, probe: &Embedding, known: &[KnownFace], tolerance: f32) -> MatchResult;
}

/// Distance matcher with first-acceptable-match semantics.
///
/// Walks the registry in insertion order and accepts the FIRST entry whose
/// Euclidean distance is within tolerance — not the globally closest one.
/// A later entry with a strictly smaller distance does not win. Changing
/// this to closest-match would change outcomes on ambiguous frames, so the
/// policy is part of the contract.
pub struct FirstAcceptableMatcher;

impl Matcher for FirstAcceptableMatcher {
    fn find_match(&self, probe: &Embedding, known: &[KnownFace], tolerance: f32) -> MatchResult {
        for entry in known {
            let distance = probe.euclidean_distance(&entry.embedding);
            if distance <= tolerance {
                return MatchResult {
                    matched: true,
                    name: Some(entry.name.clone()),
                    distance: Some(distance),
                };
            }
        }
        MatchResult::unknown()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedding(values: &[f32]) -> Embedding {
        Embedding {
            values: values.to_vec(),
        }
    }

    fn known(name: &str, values: &[f32]) -> KnownFace {
        KnownFace {
            name: name.into(),
            embedding: embedding(values),
        }
    }

    #[test]
    fn test_euclidean_distance_identical() {
        let a = embedding(&[1.0, 2.0, 3.0]);
        assert!(a.euclidean_distance(&a).abs() < 1e-6);
    }

    #[test]
    fn test_euclidean_distance_unit_apart() {
        let a = embedding(&[0.0, 0.0]);
        let b = embedding(&[3.0, 4.0]);
        assert!((a.euclidean_distance(&b) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_matcher_unknown_when_all_exceed_tolerance() {
        let probe = embedding(&[0.0, 0.0]);
        let gallery = vec![known("a", &[1.0, 0.0]), known("b", &[0.0, 1.0])];
        let result = FirstAcceptableMatcher.find_match(&probe, &gallery, 0.5);
        assert!(!result.matched);
        assert_eq!(result.label(), "Unknown");
        assert!(result.distance.is_none());
    }

    #[test]
    fn test_matcher_first_acceptable_beats_closer_later_entry() {
        // Probe is 0.50 from Alice and 0.40 from Bob; both within 0.55.
        // First-acceptable policy returns Alice even though Bob is closer.
        let probe = embedding(&[0.0, 0.0]);
        let gallery = vec![known("Alice", &[0.50, 0.0]), known("Bob", &[0.40, 0.0])];
        let result = FirstAcceptableMatcher.find_match(&probe, &gallery, 0.55);
        assert!(result.matched);
        assert_eq!(result.name.as_deref(), Some("Alice"));
        assert!((result.distance.unwrap() - 0.50).abs() < 1e-6);
    }

    #[test]
    fn test_matcher_skips_entries_beyond_tolerance() {
        let probe = embedding(&[0.0, 0.0]);
        let gallery = vec![known("far", &[2.0, 0.0]), known("near", &[0.3, 0.0])];
        let result = FirstAcceptableMatcher.find_match(&probe, &gallery, 0.55);
        assert_eq!(result.name.as_deref(), Some("near"));
    }

    #[test]
    fn test_matcher_empty_registry() {
        let probe = embedding(&[1.0]);
        let result = FirstAcceptableMatcher.find_match(&probe, &[], 0.55);
        assert!(!result.matched);
        assert_eq!(result.label(), "Unknown");
    }

    #[test]
    fn test_matcher_boundary_distance_is_a_match() {
        let probe = embedding(&[0.0]);
        let gallery = vec![known("edge", &[0.55])];
        let result = FirstAcceptableMatcher.find_match(&probe, &gallery, 0.55);
        assert!(result.matched);
    }

    #[test]
    fn test_face_box_scaled() {
        let face = FaceBox {
            x: 10.0,
            y: 20.0,
            width: 30.0,
            height: 40.0,
            confidence: 0.9,
        };
        let scaled = face.scaled(4.0);
        assert_eq!(scaled.x, 40.0);
        assert_eq!(scaled.y, 80.0);
        assert_eq!(scaled.width, 120.0);
        assert_eq!(scaled.height, 160.0);
        assert_eq!(scaled.confidence, 0.9);
    }
}
