//! Text and TSV renderings of search results.

use crate::beam::{SearchResult, Subgroup};
use std::fmt::Write as _;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use thiserror::Error;

/// Decimals printed for scores in the console report.
pub const DEFAULT_DECIMALS: usize = 15;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to write report '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Console report with one block per level:
///
/// ```text
/// Level-1:
///     (eval: 0.125000000000000):     a == 1
/// ```
pub fn render_levels(result: &SearchResult, decimals: usize) -> String {
    let mut out = String::new();
    for (level, groups) in result.levels.iter().enumerate() {
        out.push_str(&format!("Level-{}:\n", level + 1));
        for group in groups {
            out.push_str(&format!(
                "\t (eval: {:.*}): \t{}\n",
                decimals,
                group.score(),
                group
            ));
        }
    }
    out
}

/// Banner printed above a heuristic's levels.
pub fn render_banner(heuristic: &str, formula: &str) -> String {
    let mut banner = format!("Running with heuristic: {heuristic}\n");
    if !formula.is_empty() {
        let _ = writeln!(banner, "Formula: {formula}");
    }
    banner
}

const TSV_HEADER: &str = "heuristic\tlevel\trank\tscore\tp\tn\tP\tN\tunknown\tdescription";

/// Writes one TSV row per reported subgroup of every result, after a header.
pub fn write_tsv_to<'a, W: Write>(
    writer: &mut W,
    results: impl IntoIterator<Item = &'a SearchResult>,
) -> io::Result<()> {
    writeln!(writer, "{TSV_HEADER}")?;
    let mut line = String::with_capacity(128);
    let mut score_buffer = ryu::Buffer::new();
    for result in results {
        for (level, groups) in result.levels.iter().enumerate() {
            for (rank, group) in groups.iter().enumerate() {
                line.clear();
                push_row(&mut line, &result.heuristic, level + 1, rank + 1, group, &mut score_buffer);
                writer.write_all(line.as_bytes())?;
            }
        }
    }
    writer.flush()
}

fn push_row(
    line: &mut String,
    heuristic: &str,
    level: usize,
    rank: usize,
    group: &Subgroup,
    score_buffer: &mut ryu::Buffer,
) {
    let counts = group.counts();
    line.push_str(heuristic);
    for field in [level, rank] {
        line.push('\t');
        line.push_str(&field.to_string());
    }
    line.push('\t');
    line.push_str(score_buffer.format(group.score()));
    for count in [
        counts.covered_positive,
        counts.covered_negative,
        counts.positive_total,
        counts.negative_total,
        counts.unknown(),
    ] {
        line.push('\t');
        line.push_str(&count.to_string());
    }
    line.push('\t');
    line.push_str(&group.to_string());
    line.push('\n');
}

pub fn write_tsv<'a>(
    results: impl IntoIterator<Item = &'a SearchResult>,
    path: impl AsRef<Path>,
) -> Result<(), ReportError> {
    let path = path.as_ref();
    let wrap = |source: io::Error| ReportError::Io {
        path: path.display().to_string(),
        source,
    };
    let file = File::create(path).map_err(wrap)?;
    let mut writer = BufWriter::new(file);
    write_tsv_to(&mut writer, results).map_err(wrap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beam::Condition;
    use crate::confusion::{ConfusionMatrix, EvaluationResult};
    use crate::heuristic::SENTINEL_SCORE;
    use crate::metric::Metric;

    fn result() -> SearchResult {
        let group = |conditions: Vec<(&str, Metric, &str)>, score: f64, p: usize| Subgroup {
            conditions: conditions
                .into_iter()
                .enumerate()
                .map(|(id, (name, metric, value))| Condition {
                    attribute: name.to_string(),
                    attribute_id: id,
                    metric,
                    value: value.to_string(),
                })
                .collect(),
            result: EvaluationResult {
                counts: ConfusionMatrix {
                    covered_positive: p,
                    covered_negative: 1,
                    positive_total: 4,
                    negative_total: 4,
                    unknown_positive: 0,
                    unknown_negative: 0,
                },
                score,
            },
        };
        SearchResult {
            heuristic: "Sensitivity quality measure".to_string(),
            width: 2,
            depth: 2,
            levels: vec![
                vec![
                    group(vec![("a", Metric::Eq, "1")], 0.75, 3),
                    group(vec![("x", Metric::LtEq, "2.5")], 0.5, 2),
                ],
                vec![group(vec![("a", Metric::Eq, "1"), ("b", Metric::Eq, "0")], SENTINEL_SCORE, 0)],
            ],
        }
    }

    #[test]
    fn console_report_lists_levels_in_order() {
        let text = render_levels(&result(), 3);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Level-1:",
                "\t (eval: 0.750): \ta == 1",
                "\t (eval: 0.500): \tx <= 2.5",
                "Level-2:",
                "\t (eval: -inf): \ta == 1 AND b == 0",
            ]
        );
    }

    #[test]
    fn default_precision_prints_fifteen_decimals() {
        let text = render_levels(&result(), DEFAULT_DECIMALS);
        assert!(text.contains("(eval: 0.750000000000000)"));
    }

    #[test]
    fn tsv_has_one_row_per_subgroup() {
        let mut buffer = Vec::new();
        write_tsv_to(&mut buffer, [&result()]).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], TSV_HEADER);
        assert_eq!(lines[1], "Sensitivity quality measure\t1\t1\t0.75\t3\t1\t4\t4\t0\ta == 1");
        assert_eq!(lines[3].split('\t').nth(3), Some("-inf"));
    }

    #[test]
    fn banner_omits_missing_formula() {
        assert_eq!(render_banner("lift", ""), "Running with heuristic: lift\n");
        assert!(render_banner("Chi-squared", "x").ends_with("Formula: x\n"));
    }
}
