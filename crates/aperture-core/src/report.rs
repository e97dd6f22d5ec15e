//! Report generation over reconciled critique results.
//!
//! Pure aggregation and formatting: filter by minimum score, sort by
//! overall score descending, compute summary statistics, and render to
//! JSON and Markdown. Callers pick the destination; nothing here decides
//! paths except the extension swap in [`generate_report`].

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::batch::RawResult;
use crate::error::Result;
use crate::reconcile::merge_results;
use crate::types::{ImageMetadata, MergedResult};

/// Report output options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// Structured JSON document
    Json,
    /// Human-readable Markdown document
    Markdown,
    /// Both files side by side
    Both,
}

impl ReportFormat {
    /// Parse format from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "markdown" | "md" => Some(Self::Markdown),
            "both" => Some(Self::Both),
            _ => None,
        }
    }

    fn wants_json(self) -> bool {
        matches!(self, Self::Json | Self::Both)
    }

    fn wants_markdown(self) -> bool {
        matches!(self, Self::Markdown | Self::Both)
    }
}

struct Tier {
    label: &'static str,
    heading: &'static str,
    contains: fn(f64) -> bool,
}

/// Score tiers shared by the histogram and the detailed-results grouping.
/// The extreme tiers are open-ended so out-of-range scores still land in
/// exactly one bucket.
const TIERS: &[Tier] = &[
    Tier {
        label: "excellent (9-10)",
        heading: "Excellent (9-10)",
        contains: |s| s >= 9.0,
    },
    Tier {
        label: "great (8-9)",
        heading: "Great (8-9)",
        contains: |s| (8.0..9.0).contains(&s),
    },
    Tier {
        label: "good (7-8)",
        heading: "Good (7-8)",
        contains: |s| (7.0..8.0).contains(&s),
    },
    Tier {
        label: "average (6-7)",
        heading: "Average (6-7)",
        contains: |s| (6.0..7.0).contains(&s),
    },
    Tier {
        label: "below_average (5-6)",
        heading: "Below Average (5-6)",
        contains: |s| (5.0..6.0).contains(&s),
    },
    Tier {
        label: "poor (0-5)",
        heading: "Poor (0-5)",
        contains: |s| s < 5.0,
    },
];

/// Counts of results per score tier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreDistribution {
    #[serde(rename = "excellent (9-10)")]
    pub excellent: usize,
    #[serde(rename = "great (8-9)")]
    pub great: usize,
    #[serde(rename = "good (7-8)")]
    pub good: usize,
    #[serde(rename = "average (6-7)")]
    pub average: usize,
    #[serde(rename = "below_average (5-6)")]
    pub below_average: usize,
    #[serde(rename = "poor (0-5)")]
    pub poor: usize,
}

impl ScoreDistribution {
    fn tally(scores: impl Iterator<Item = f64>) -> Self {
        let mut counts = [0usize; 6];
        for score in scores {
            for (slot, tier) in counts.iter_mut().zip(TIERS) {
                if (tier.contains)(score) {
                    *slot += 1;
                    break;
                }
            }
        }
        Self {
            excellent: counts[0],
            great: counts[1],
            good: counts[2],
            average: counts[3],
            below_average: counts[4],
            poor: counts[5],
        }
    }

    /// Counts in tier order, pairing with [`TIERS`] for display.
    fn counts(&self) -> [usize; 6] {
        [
            self.excellent,
            self.great,
            self.good,
            self.average,
            self.below_average,
            self.poor,
        ]
    }

    /// Total results across all tiers.
    pub fn total(&self) -> usize {
        self.counts().iter().sum()
    }
}

/// Summary statistics over the merged results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportStatistics {
    pub total_images: usize,
    pub mean_overall_score: f64,
    pub mean_composition_score: f64,
    pub mean_lighting_score: f64,
    pub mean_subject_score: f64,
    pub mean_technical_score: f64,
    pub score_distribution: ScoreDistribution,
}

/// A complete report: statistics plus results sorted by score descending.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub generated_at: DateTime<Local>,
    pub statistics: ReportStatistics,
    pub results: Vec<MergedResult>,
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Compute summary statistics. Means are rounded to two decimal places.
pub fn calculate_statistics(results: &[MergedResult]) -> ReportStatistics {
    if results.is_empty() {
        return ReportStatistics {
            total_images: 0,
            mean_overall_score: 0.0,
            mean_composition_score: 0.0,
            mean_lighting_score: 0.0,
            mean_subject_score: 0.0,
            mean_technical_score: 0.0,
            score_distribution: ScoreDistribution::default(),
        };
    }

    let n = results.len() as f64;
    let mean = |pick: fn(&MergedResult) -> f64| {
        round2(results.iter().map(pick).sum::<f64>() / n)
    };

    ReportStatistics {
        total_images: results.len(),
        mean_overall_score: mean(|r| r.critique.overall_score),
        mean_composition_score: mean(|r| r.critique.composition_score),
        mean_lighting_score: mean(|r| r.critique.lighting_score),
        mean_subject_score: mean(|r| r.critique.subject_score),
        mean_technical_score: mean(|r| r.critique.technical_score),
        score_distribution: ScoreDistribution::tally(
            results.iter().map(|r| r.critique.overall_score),
        ),
    }
}

/// Keep results whose overall score meets the threshold.
pub fn filter_by_score(results: Vec<MergedResult>, min_score: f64) -> Vec<MergedResult> {
    let before = results.len();
    let filtered: Vec<MergedResult> = results
        .into_iter()
        .filter(|r| r.critique.overall_score >= min_score)
        .collect();

    tracing::info!(
        kept = filtered.len(),
        before,
        min_score,
        "Filtered results by minimum score"
    );

    filtered
}

/// Assemble a report: sort descending by overall score, compute statistics,
/// stamp the generation time.
pub fn build_report(mut results: Vec<MergedResult>) -> Report {
    results.sort_by(|a, b| {
        b.critique
            .overall_score
            .total_cmp(&a.critique.overall_score)
    });
    let statistics = calculate_statistics(&results);

    Report {
        generated_at: Local::now(),
        statistics,
        results,
    }
}

/// Write the report as pretty-printed JSON.
pub fn write_json_report<W: Write>(writer: W, report: &Report) -> io::Result<()> {
    serde_json::to_writer_pretty(writer, report).map_err(io::Error::other)
}

/// Write the report as Markdown, grouping detailed results by score tier.
pub fn write_markdown_report<W: Write>(mut w: W, report: &Report) -> io::Result<()> {
    let stats = &report.statistics;

    writeln!(w, "# Photo Critique Report")?;
    writeln!(w)?;
    writeln!(
        w,
        "**Generated:** {}",
        report.generated_at.format("%Y-%m-%d %H:%M:%S")
    )?;
    writeln!(w)?;
    writeln!(w, "## Statistics")?;
    writeln!(w)?;
    writeln!(w, "- **Total Images:** {}", stats.total_images)?;
    writeln!(w, "- **Mean Overall Score:** {}/10", stats.mean_overall_score)?;
    writeln!(
        w,
        "- **Mean Composition Score:** {}/10",
        stats.mean_composition_score
    )?;
    writeln!(
        w,
        "- **Mean Lighting Score:** {}/10",
        stats.mean_lighting_score
    )?;
    writeln!(
        w,
        "- **Mean Subject Score:** {}/10",
        stats.mean_subject_score
    )?;
    writeln!(
        w,
        "- **Mean Technical Score:** {}/10",
        stats.mean_technical_score
    )?;
    writeln!(w)?;
    writeln!(w, "### Score Distribution")?;
    writeln!(w)?;
    for (tier, count) in TIERS.iter().zip(stats.score_distribution.counts()) {
        writeln!(w, "- **{}:** {}", tier.label, count)?;
    }
    writeln!(w)?;
    writeln!(w, "---")?;
    writeln!(w)?;
    writeln!(w, "## Detailed Results")?;

    for tier in TIERS {
        let tier_results: Vec<&MergedResult> = report
            .results
            .iter()
            .filter(|r| (tier.contains)(r.critique.overall_score))
            .collect();

        if tier_results.is_empty() {
            continue;
        }

        writeln!(w)?;
        writeln!(w, "### {}", tier.heading)?;
        writeln!(w)?;

        for result in tier_results {
            let c = &result.critique;

            writeln!(w, "#### {} - **{}/10**", result.filename, c.overall_score)?;
            writeln!(w)?;
            writeln!(w, "**Path:** `{}`", result.path.display())?;
            writeln!(w)?;
            writeln!(w, "**Summary:** {}", c.summary)?;
            writeln!(w)?;
            writeln!(w, "**Scores:**")?;
            writeln!(
                w,
                "- Composition: {}/10 - {}",
                c.composition_score, c.composition_notes
            )?;
            writeln!(w, "- Lighting: {}/10 - {}", c.lighting_score, c.lighting_notes)?;
            writeln!(w, "- Subject: {}/10 - {}", c.subject_score, c.subject_notes)?;
            writeln!(
                w,
                "- Technical: {}/10 - {}",
                c.technical_score, c.technical_notes
            )?;
            writeln!(w)?;
            writeln!(w, "**Strengths:**")?;
            for strength in &c.strengths {
                writeln!(w, "- {strength}")?;
            }
            writeln!(w)?;
            writeln!(w, "**Improvements:**")?;
            for improvement in &c.improvements {
                writeln!(w, "- {improvement}")?;
            }
            writeln!(w)?;
        }
    }

    Ok(())
}

/// Merge, filter, and write the final report files.
///
/// `output_path` is used with its extension swapped per format, so
/// `./critique-report` becomes `./critique-report.json` and friends.
/// An empty result set after filtering writes nothing and returns an
/// empty list; it is not an error. Returns the paths written.
pub fn generate_report(
    raw_results: &[RawResult],
    metadata: &[ImageMetadata],
    output_path: &Path,
    format: ReportFormat,
    min_score: f64,
) -> Result<Vec<PathBuf>> {
    let mut results = merge_results(raw_results, metadata);

    if min_score > 0.0 {
        results = filter_by_score(results, min_score);
    }

    if results.is_empty() {
        tracing::warn!("No results to write");
        return Ok(Vec::new());
    }

    let report = build_report(results);
    let mut written = Vec::new();

    if format.wants_json() {
        let path = output_path.with_extension("json");
        let file = File::create(&path)?;
        write_json_report(BufWriter::new(file), &report)?;
        tracing::info!(path = %path.display(), "JSON report written");
        written.push(path);
    }

    if format.wants_markdown() {
        let path = output_path.with_extension("md");
        let file = File::create(&path)?;
        write_markdown_report(BufWriter::new(file), &report)?;
        tracing::info!(path = %path.display(), "Markdown report written");
        written.push(path);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::ItemOutcome;
    use crate::types::Critique;

    fn critique(overall: f64) -> Critique {
        Critique {
            composition_score: 8.1,
            composition_notes: "Balanced frame".to_string(),
            lighting_score: 7.0,
            lighting_notes: "Even light".to_string(),
            subject_score: 8.0,
            subject_notes: "Clear subject".to_string(),
            technical_score: 8.2,
            technical_notes: "Sharp".to_string(),
            overall_score: overall,
            summary: "A keeper".to_string(),
            strengths: vec!["Framing".to_string()],
            improvements: vec!["Wait for better light".to_string()],
        }
    }

    fn merged(filename: &str, overall: f64) -> MergedResult {
        MergedResult {
            correlation_id: format!("img_0000_{filename}"),
            filename: filename.to_string(),
            path: std::path::PathBuf::from(format!("/photos/{filename}")),
            original_dimensions: (4000, 3000),
            critique: critique(overall),
        }
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(ReportFormat::parse("json"), Some(ReportFormat::Json));
        assert_eq!(ReportFormat::parse("Markdown"), Some(ReportFormat::Markdown));
        assert_eq!(ReportFormat::parse("md"), Some(ReportFormat::Markdown));
        assert_eq!(ReportFormat::parse("both"), Some(ReportFormat::Both));
        assert_eq!(ReportFormat::parse("yaml"), None);
    }

    #[test]
    fn test_filter_keeps_boundary_score() {
        let results = vec![merged("a.jpg", 8.0), merged("b.jpg", 7.99)];
        let filtered = filter_by_score(results, 8.0);

        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].filename, "a.jpg");
    }

    #[test]
    fn test_filter_threshold_monotonic() {
        let build = || {
            vec![
                merged("a.jpg", 9.1),
                merged("b.jpg", 7.0),
                merged("c.jpg", 5.2),
                merged("d.jpg", 0.0),
            ]
        };
        let strict = filter_by_score(build(), 7.0);
        let loose = filter_by_score(build(), 0.0);

        assert_eq!(loose.len(), 4);
        assert!(strict
            .iter()
            .all(|s| loose.iter().any(|l| l.correlation_id == s.correlation_id)));
    }

    #[test]
    fn test_histogram_partitions_all_scores() {
        let scores = [9.5, 10.0, 8.0, 7.5, 6.0, 5.5, 3.0, 11.0, -1.0];
        let dist = ScoreDistribution::tally(scores.iter().copied());

        assert_eq!(dist.excellent, 3); // 9.5, 10.0, and the 11.0 outlier
        assert_eq!(dist.great, 1);
        assert_eq!(dist.good, 1);
        assert_eq!(dist.average, 1);
        assert_eq!(dist.below_average, 1);
        assert_eq!(dist.poor, 2); // 3.0 and the -1.0 outlier
        assert_eq!(dist.total(), scores.len());
    }

    #[test]
    fn test_tier_boundaries_are_half_open() {
        let dist = ScoreDistribution::tally([9.0, 8.0, 7.0, 6.0, 5.0, 4.999].into_iter());

        assert_eq!(dist.excellent, 1);
        assert_eq!(dist.great, 1);
        assert_eq!(dist.good, 1);
        assert_eq!(dist.average, 1);
        assert_eq!(dist.below_average, 1);
        assert_eq!(dist.poor, 1);
    }

    #[test]
    fn test_statistics_means_rounded() {
        let results = vec![merged("a.jpg", 9.0), merged("b.jpg", 6.5)];
        let stats = calculate_statistics(&results);

        assert_eq!(stats.total_images, 2);
        assert_eq!(stats.mean_overall_score, 7.75);
        // (8.1 + 8.1) / 2 exactly, after rounding to two decimals
        assert_eq!(stats.mean_composition_score, 8.1);
        assert_eq!(stats.score_distribution.excellent, 1);
        assert_eq!(stats.score_distribution.average, 1);
    }

    #[test]
    fn test_statistics_empty_is_zeroed() {
        let stats = calculate_statistics(&[]);

        assert_eq!(stats.total_images, 0);
        assert_eq!(stats.mean_overall_score, 0.0);
        assert_eq!(stats.score_distribution, ScoreDistribution::default());
    }

    #[test]
    fn test_report_sorted_descending() {
        let report = build_report(vec![
            merged("mid.jpg", 7.0),
            merged("top.jpg", 9.5),
            merged("low.jpg", 4.0),
        ]);

        let order: Vec<&str> = report.results.iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(order, ["top.jpg", "mid.jpg", "low.jpg"]);
    }

    #[test]
    fn test_json_report_roundtrip() {
        let report = build_report(vec![merged("a.jpg", 9.0), merged("b.jpg", 6.5)]);

        let mut buf = Vec::new();
        write_json_report(&mut buf, &report).unwrap();
        let parsed: Report = serde_json::from_slice(&buf).unwrap();

        assert_eq!(parsed.statistics.total_images, 2);
        assert_eq!(parsed.results.len(), 2);
        assert!(
            parsed.results[0].critique.overall_score
                >= parsed.results[1].critique.overall_score
        );
    }

    #[test]
    fn test_markdown_report_content() {
        let report = build_report(vec![merged("beach.jpg", 9.5), merged("dune.jpg", 6.5)]);

        let mut buf = Vec::new();
        write_markdown_report(&mut buf, &report).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.contains("# Photo Critique Report"));
        assert!(text.contains("- **Total Images:** 2"));
        assert!(text.contains("- **Mean Overall Score:** 8/10"));
        assert!(text.contains("- **excellent (9-10):** 1"));
        assert!(text.contains("- **average (6-7):** 1"));
        assert!(text.contains("### Excellent (9-10)"));
        assert!(text.contains("#### beach.jpg - **9.5/10**"));
        assert!(text.contains("**Path:** `/photos/beach.jpg`"));
        assert!(text.contains("- Composition: 8.1/10 - Balanced frame"));
        assert!(text.contains("**Strengths:**"));
        // Empty tiers are omitted from the detailed section
        assert!(!text.contains("### Poor (0-5)"));
    }

    #[test]
    fn test_generate_report_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("critique-report");

        let raw = vec![
            RawResult {
                correlation_id: "img_0000_beach".to_string(),
                outcome: ItemOutcome::Succeeded {
                    text: serde_json::to_string(&critique(9.0)).unwrap(),
                },
            },
            RawResult {
                correlation_id: "img_0001_dune".to_string(),
                outcome: ItemOutcome::Succeeded {
                    text: serde_json::to_string(&critique(6.5)).unwrap(),
                },
            },
            RawResult {
                correlation_id: "img_0002_pier".to_string(),
                outcome: ItemOutcome::Errored {
                    detail: "image too large".to_string(),
                },
            },
        ];
        let metadata = vec![
            ImageMetadata {
                correlation_id: "img_0000_beach".to_string(),
                path: "/photos/beach.jpg".into(),
                filename: "beach.jpg".to_string(),
                original_dimensions: (4032, 3024),
            },
            ImageMetadata {
                correlation_id: "img_0001_dune".to_string(),
                path: "/photos/dune.jpg".into(),
                filename: "dune.jpg".to_string(),
                original_dimensions: (4032, 3024),
            },
            ImageMetadata {
                correlation_id: "img_0002_pier".to_string(),
                path: "/photos/pier.jpg".into(),
                filename: "pier.jpg".to_string(),
                original_dimensions: (4032, 3024),
            },
        ];

        let written =
            generate_report(&raw, &metadata, &output, ReportFormat::Both, 0.0).unwrap();

        assert_eq!(written.len(), 2);
        assert!(output.with_extension("json").exists());
        assert!(output.with_extension("md").exists());

        let json = std::fs::read_to_string(output.with_extension("json")).unwrap();
        let report: Report = serde_json::from_str(&json).unwrap();

        assert_eq!(report.statistics.total_images, 2);
        assert_eq!(report.statistics.mean_overall_score, 7.75);
        assert_eq!(report.statistics.score_distribution.excellent, 1);
        assert_eq!(report.statistics.score_distribution.average, 1);
        assert_eq!(report.results[0].filename, "beach.jpg");
    }

    #[test]
    fn test_generate_report_empty_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("critique-report");

        let raw = vec![RawResult {
            correlation_id: "img_0000_x".to_string(),
            outcome: ItemOutcome::Errored {
                detail: "boom".to_string(),
            },
        }];

        let written = generate_report(&raw, &[], &output, ReportFormat::Both, 0.0).unwrap();

        assert!(written.is_empty());
        assert!(!output.with_extension("json").exists());
        assert!(!output.with_extension("md").exists());
    }

    #[test]
    fn test_generate_report_filter_can_empty_result() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("critique-report");

        let raw = vec![RawResult {
            correlation_id: "img_0000_a".to_string(),
            outcome: ItemOutcome::Succeeded {
                text: serde_json::to_string(&critique(5.0)).unwrap(),
            },
        }];

        let written = generate_report(&raw, &[], &output, ReportFormat::Json, 9.0).unwrap();

        assert!(written.is_empty());
        assert!(!output.with_extension("json").exists());
    }
}
