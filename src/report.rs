use std::fmt::Write;

use crate::models::{CohortStats, LearnerAverage};

pub fn build_report(
    threshold: f64,
    stats: &CohortStats,
    averages: &[LearnerAverage],
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Gradebook Cohort Report");
    let _ = writeln!(output);
    let _ = writeln!(output, "## Pass Rate (weighted average > {threshold})");

    if stats.total_learners == 0 {
        let _ = writeln!(output, "No learners recorded.");
    } else {
        let _ = writeln!(output, "- Learners known: {}", stats.total_learners);
        let _ = writeln!(
            output,
            "- Above threshold: {}",
            stats.learners_above_threshold
        );
        let _ = writeln!(output, "- Percentage: {:.2}%", stats.percentage);
    }

    let mut ranked = averages.to_vec();
    ranked.sort_by(|a, b| {
        b.average
            .partial_cmp(&a.average)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let _ = writeln!(output);
    let _ = writeln!(output, "## Learner Averages");

    if ranked.is_empty() {
        let _ = writeln!(output, "No scores recorded.");
    } else {
        for learner in ranked.iter() {
            match learner.average {
                Some(avg) => {
                    let _ = writeln!(
                        output,
                        "- learner {}: {:.2} across {} scores",
                        learner.learner_id, avg, learner.score_count
                    );
                }
                None => {
                    let _ = writeln!(
                        output,
                        "- learner {}: undefined ({} scores, missing a category)",
                        learner.learner_id, learner.score_count
                    );
                }
            }
        }
    }

    output
}
