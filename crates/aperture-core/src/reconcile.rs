//! Reconciliation of batch results with local metadata.
//!
//! Results come back keyed only by correlation id. This module parses the
//! model's critique JSON out of each successful result and joins it with
//! the metadata recorded at submission time. Items that errored or produced
//! unparseable output are logged and dropped; one bad critique never sinks
//! the rest of the batch.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::batch::{ItemOutcome, RawResult};
use crate::types::{Critique, ImageMetadata, MergedResult};

/// Parse a critique from model response text.
///
/// Models often wrap JSON in a markdown code fence despite instructions,
/// so a leading ```` ```json ```` or ```` ``` ```` and a trailing fence are
/// stripped before parsing. Returns `None` if the remainder is not a
/// complete critique.
pub fn parse_critique(text: &str) -> Option<Critique> {
    let mut cleaned = text.trim();
    if let Some(rest) = cleaned.strip_prefix("```json") {
        cleaned = rest;
    } else if let Some(rest) = cleaned.strip_prefix("```") {
        cleaned = rest;
    }
    if let Some(rest) = cleaned.strip_suffix("```") {
        cleaned = rest;
    }

    match serde_json::from_str(cleaned.trim()) {
        Ok(critique) => Some(critique),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to parse critique JSON");
            None
        }
    }
}

/// Join raw batch results with the metadata recorded at submission.
///
/// Errored items and unparseable critiques are skipped with a warning.
/// A result whose correlation id has no metadata entry is kept with
/// placeholder metadata rather than dropped; the critique itself is
/// still useful.
pub fn merge_results(raw: &[RawResult], metadata: &[ImageMetadata]) -> Vec<MergedResult> {
    let by_id: HashMap<&str, &ImageMetadata> = metadata
        .iter()
        .map(|m| (m.correlation_id.as_str(), m))
        .collect();

    let mut merged = Vec::new();

    for result in raw {
        let text = match &result.outcome {
            ItemOutcome::Succeeded { text } => text,
            ItemOutcome::Errored { detail } => {
                tracing::warn!(
                    correlation_id = %result.correlation_id,
                    detail = %detail,
                    "Request did not succeed, skipping"
                );
                continue;
            }
        };

        let critique = match parse_critique(text) {
            Some(critique) => critique,
            None => {
                tracing::warn!(
                    correlation_id = %result.correlation_id,
                    "Skipping result with unparseable critique"
                );
                continue;
            }
        };

        let record = match by_id.get(result.correlation_id.as_str()) {
            Some(meta) => MergedResult {
                correlation_id: result.correlation_id.clone(),
                filename: meta.filename.clone(),
                path: meta.path.clone(),
                original_dimensions: meta.original_dimensions,
                critique,
            },
            None => {
                tracing::warn!(
                    correlation_id = %result.correlation_id,
                    "No local metadata for result"
                );
                MergedResult {
                    correlation_id: result.correlation_id.clone(),
                    filename: "unknown".to_string(),
                    path: PathBuf::from("unknown"),
                    original_dimensions: (0, 0),
                    critique,
                }
            }
        };

        merged.push(record);
    }

    tracing::info!(
        merged = merged.len(),
        received = raw.len(),
        "Reconciled batch results with local metadata"
    );

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn critique_json(overall: f64) -> String {
        format!(
            r#"{{
                "composition_score": 8.0,
                "composition_notes": "Strong thirds placement",
                "lighting_score": 7.5,
                "lighting_notes": "Soft window light",
                "subject_score": 8.5,
                "subject_notes": "Engaging subject",
                "technical_score": 8.0,
                "technical_notes": "Tack sharp",
                "overall_score": {overall},
                "summary": "A solid frame",
                "strengths": ["Composition", "Sharpness"],
                "improvements": ["Try a lower angle"]
            }}"#
        )
    }

    fn metadata(correlation_id: &str, filename: &str) -> ImageMetadata {
        ImageMetadata {
            correlation_id: correlation_id.to_string(),
            path: PathBuf::from(format!("/photos/{filename}")),
            filename: filename.to_string(),
            original_dimensions: (4032, 3024),
        }
    }

    #[test]
    fn test_parse_critique_plain_json() {
        let critique = parse_critique(&critique_json(8.0)).unwrap();
        assert_eq!(critique.overall_score, 8.0);
        assert_eq!(critique.strengths.len(), 2);
    }

    #[test]
    fn test_parse_critique_strips_json_fence() {
        let fenced = format!("```json\n{}\n```", critique_json(7.25));
        let critique = parse_critique(&fenced).unwrap();
        assert_eq!(critique.overall_score, 7.25);
    }

    #[test]
    fn test_parse_critique_strips_bare_fence() {
        let fenced = format!("```\n{}\n```", critique_json(6.0));
        let critique = parse_critique(&fenced).unwrap();
        assert_eq!(critique.overall_score, 6.0);
    }

    #[test]
    fn test_parse_critique_rejects_prose() {
        assert!(parse_critique("This photo is quite nice overall.").is_none());
    }

    #[test]
    fn test_parse_critique_rejects_incomplete_json() {
        // Valid JSON but missing required critique fields
        assert!(parse_critique(r#"{"overall_score": 8.0}"#).is_none());
    }

    #[test]
    fn test_merge_skips_errored_and_unparseable() {
        let raw = vec![
            RawResult {
                correlation_id: "img_0000_beach".to_string(),
                outcome: ItemOutcome::Succeeded {
                    text: critique_json(9.0),
                },
            },
            RawResult {
                correlation_id: "img_0001_dune".to_string(),
                outcome: ItemOutcome::Errored {
                    detail: "image too large".to_string(),
                },
            },
            RawResult {
                correlation_id: "img_0002_pier".to_string(),
                outcome: ItemOutcome::Succeeded {
                    text: "Sorry, I cannot critique this image.".to_string(),
                },
            },
        ];
        let metadata = vec![
            metadata("img_0000_beach", "beach.jpg"),
            metadata("img_0001_dune", "dune.jpg"),
            metadata("img_0002_pier", "pier.jpg"),
        ];

        let merged = merge_results(&raw, &metadata);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].correlation_id, "img_0000_beach");
        assert_eq!(merged[0].filename, "beach.jpg");
        assert_eq!(merged[0].critique.overall_score, 9.0);
    }

    #[test]
    fn test_merge_keeps_results_without_metadata() {
        let raw = vec![RawResult {
            correlation_id: "img_0042_orphan".to_string(),
            outcome: ItemOutcome::Succeeded {
                text: critique_json(7.0),
            },
        }];

        let merged = merge_results(&raw, &[]);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].filename, "unknown");
        assert_eq!(merged[0].path, PathBuf::from("unknown"));
        assert_eq!(merged[0].original_dimensions, (0, 0));
        assert_eq!(merged[0].critique.overall_score, 7.0);
    }

    #[test]
    fn test_merge_joins_by_correlation_id_not_order() {
        let raw = vec![
            RawResult {
                correlation_id: "img_0001_dune".to_string(),
                outcome: ItemOutcome::Succeeded {
                    text: critique_json(6.5),
                },
            },
            RawResult {
                correlation_id: "img_0000_beach".to_string(),
                outcome: ItemOutcome::Succeeded {
                    text: critique_json(9.0),
                },
            },
        ];
        let metadata = vec![
            metadata("img_0000_beach", "beach.jpg"),
            metadata("img_0001_dune", "dune.jpg"),
        ];

        let merged = merge_results(&raw, &metadata);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].filename, "dune.jpg");
        assert_eq!(merged[1].filename, "beach.jpg");
    }
}
