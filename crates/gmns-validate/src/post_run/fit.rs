//! Goodness-of-fit between assigned link volumes and observed or reference counts.

use std::collections::HashMap;

use gmns_ingest::Table;
use gmns_model::ValidationResult;
use serde_json::json;

use crate::error::Result;
use crate::export::{Exporter, PROBLEM_OBS_VOLUME_LINKS, PROBLEM_VOLUME_LINKS};
use crate::util::{MAX_EXAMPLES, id_key, label_text, mean, pearson, percent, row_labels, sum};

const GOOD_R_SQUARED: f64 = 0.75;
const MODERATE_R_SQUARED: f64 = 0.5;
const GOOD_MAPE: f64 = 15.0;
const MODERATE_MAPE: f64 = 25.0;
const MAX_VOLUME_GAP: f64 = 10.0;
const GEH_THRESHOLD: f64 = 5.0;

/// Which counts assigned volumes are compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeSource {
    Observed,
    Reference,
}

impl VolumeSource {
    /// Column holding the counts in link_performance.csv.
    pub fn column(self) -> &'static str {
        match self {
            Self::Observed => "obs_volume",
            Self::Reference => "ref_volume",
        }
    }

    pub(crate) fn field(self) -> &'static str {
        match self {
            Self::Observed => "obs_volume",
            Self::Reference => "reference_volume",
        }
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            Self::Observed => "observed",
            Self::Reference => "reference",
        }
    }

    fn title(self) -> &'static str {
        match self {
            Self::Observed => "Observed",
            Self::Reference => "Reference",
        }
    }

    fn export_file(self) -> &'static str {
        match self {
            Self::Observed => PROBLEM_OBS_VOLUME_LINKS,
            Self::Reference => PROBLEM_VOLUME_LINKS,
        }
    }
}

/// GEH statistic for one pair of volumes; zero when the sum is not positive.
///
/// ```
/// use gmns_validate::geh;
///
/// assert_eq!(geh(120.0, 120.0), 0.0);
/// assert!((geh(150.0, 100.0) - 4.472).abs() < 1e-3);
/// ```
pub fn geh(assigned: f64, reference: f64) -> f64 {
    let total = assigned + reference;
    if total > 0.0 {
        (2.0 * (assigned - reference).powi(2) / total).sqrt()
    } else {
        0.0
    }
}

/// Coefficient of determination of `predicted` against `truth`.
pub fn coefficient_of_determination(truth: &[f64], predicted: &[f64]) -> f64 {
    let Some(truth_mean) = mean(truth) else {
        return 0.0;
    };
    let ss_tot: f64 = truth.iter().map(|t| (t - truth_mean).powi(2)).sum();
    let ss_res: f64 = truth
        .iter()
        .zip(predicted)
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    if ss_tot == 0.0 {
        if ss_res == 0.0 { 1.0 } else { 0.0 }
    } else {
        1.0 - ss_res / ss_tot
    }
}

/// Fit statistics over paired volumes with positive comparison counts.
#[derive(Debug, Clone, PartialEq)]
pub struct FitMetrics {
    pub n_points: usize,
    pub correlation: f64,
    pub r_squared: f64,
    pub rmse: f64,
    pub mape: f64,
    pub geh_under_5_percent: f64,
    pub volume_gap: f64,
    pub total_assigned: f64,
    pub total_reference: f64,
}

impl FitMetrics {
    /// `None` when there are no pairs.
    pub fn compute(assigned: &[f64], reference: &[f64]) -> Option<Self> {
        let n_points = assigned.len().min(reference.len());
        if n_points == 0 {
            return None;
        }
        let pairs = || assigned.iter().zip(reference);
        let n = n_points as f64;

        let correlation = pearson(assigned, reference);
        let rmse = (pairs().map(|(a, r)| (a - r).powi(2)).sum::<f64>() / n).sqrt();
        let mape = 100.0 * pairs().map(|(a, r)| (a - r).abs() / r).sum::<f64>() / n;
        let geh_under = pairs().filter(|(a, r)| geh(**a, **r) < GEH_THRESHOLD).count();
        let total_assigned = sum(assigned);
        let total_reference = sum(reference);

        Some(Self {
            n_points,
            correlation,
            r_squared: correlation.powi(2),
            rmse,
            mape,
            geh_under_5_percent: percent(geh_under, n_points),
            volume_gap: 100.0 * (total_assigned - total_reference).abs() / total_reference,
            total_assigned,
            total_reference,
        })
    }
}

/// Compare link_performance volume against obs_volume or ref_volume.
pub fn compare_volumes(
    perf: &Table,
    source: VolumeSource,
    exporter: &Exporter,
) -> Result<Vec<ValidationResult>> {
    let field = source.field();
    let label = source.label();
    let assigned_column = perf.require_floats("volume")?;
    let reference_column = perf.require_floats(source.column())?;

    let rows: Vec<(usize, f64, f64)> = assigned_column
        .iter()
        .zip(&reference_column)
        .enumerate()
        .filter_map(|(row, (assigned, reference))| match (assigned, reference) {
            (Some(a), Some(r)) if *r > 0.0 => Some((row, *a, *r)),
            _ => None,
        })
        .collect();

    let assigned: Vec<f64> = rows.iter().map(|(_, a, _)| *a).collect();
    let reference: Vec<f64> = rows.iter().map(|(_, _, r)| *r).collect();
    let Some(metrics) = FitMetrics::compute(&assigned, &reference) else {
        return Ok(vec![
            ValidationResult::info(format!("No links with valid {label} volumes found for comparison."))
                .with_field(field),
        ]);
    };

    let mut results = vec![
        ValidationResult::info(format!(
            "{} volume comparison: R² = {:.3}, RMSE = {:.1}, MAPE = {:.1}%, {:.1}% of links with GEH < 5",
            source.title(),
            metrics.r_squared,
            metrics.rmse,
            metrics.mape,
            metrics.geh_under_5_percent
        ))
        .with_field(field)
        .with_details(json!({
            "r_squared": metrics.r_squared,
            "correlation": metrics.correlation,
            "rmse": metrics.rmse,
            "mape": metrics.mape,
            "geh_under_5_percent": metrics.geh_under_5_percent,
            "volume_gap": metrics.volume_gap,
            "n_points": metrics.n_points,
            "total_assigned": metrics.total_assigned,
            "total_reference": metrics.total_reference,
        })),
    ];

    let r_squared = metrics.r_squared;
    let tier = if r_squared < MODERATE_R_SQUARED {
        ValidationResult::error(format!(
            "Poor correlation between assigned and {label} volumes (R² = {r_squared:.3})"
        ))
    } else if r_squared < GOOD_R_SQUARED {
        ValidationResult::warning(format!(
            "Moderate correlation between assigned and {label} volumes (R² = {r_squared:.3})"
        ))
    } else {
        ValidationResult::success(format!(
            "Good correlation between assigned and {label} volumes (R² = {r_squared:.3})"
        ))
    };
    results.push(tier.with_field(field).with_details(json!({ "r_squared": r_squared })));

    let mape = metrics.mape;
    let tier = if mape > MODERATE_MAPE {
        ValidationResult::error(format!(
            "High percentage error between assigned and {label} volumes (MAPE = {mape:.1}%)"
        ))
    } else if mape > GOOD_MAPE {
        ValidationResult::warning(format!(
            "Moderate percentage error between assigned and {label} volumes (MAPE = {mape:.1}%)"
        ))
    } else {
        ValidationResult::success(format!(
            "Low percentage error between assigned and {label} volumes (MAPE = {mape:.1}%)"
        ))
    };
    results.push(tier.with_field(field).with_details(json!({ "mape": mape })));

    if metrics.volume_gap > MAX_VOLUME_GAP {
        results.push(
            ValidationResult::error(format!(
                "Large gap between total assigned and {label} volumes ({:.1}%)",
                metrics.volume_gap
            ))
            .with_field(field)
            .with_details(json!({ "volume_gap": metrics.volume_gap })),
        );
    }

    let mut large: Vec<(usize, f64, f64, f64)> = rows
        .iter()
        .map(|(row, a, r)| (*row, *a, *r, 100.0 * (a - r).abs() / r))
        .filter(|(_, _, _, diff_pct)| *diff_pct > 100.0)
        .collect();
    if !large.is_empty() {
        large.sort_by(|x, y| y.3.total_cmp(&x.3));
        let labels = row_labels(perf, "link_id");
        let examples: Vec<_> = large
            .iter()
            .take(MAX_EXAMPLES)
            .map(|(row, a, r, diff)| json!([labels[*row], a, r, diff]))
            .collect();
        results.push(
            ValidationResult::warning(format!(
                "Found {} links ({:.1}%) with volume differences >100% from {label}",
                large.len(),
                percent(large.len(), metrics.n_points)
            ))
            .with_field(field)
            .with_details(json!({
                "large_diff_count": large.len(),
                "large_diff_percent": percent(large.len(), metrics.n_points),
                "example_links": examples,
            })),
        );

        let count = large.len();
        let export_rows = large.iter().map(|(row, a, r, diff)| {
            vec![
                label_text(&labels[*row]),
                a.to_string(),
                r.to_string(),
                diff.to_string(),
            ]
        });
        results.extend(exporter.report(
            source.export_file(),
            &["link_id", "volume", source.column(), "diff_pct"],
            export_rows,
            field,
            |path| {
                format!(
                    "Exported {count} links with large volume differences to {}",
                    path.display()
                )
            },
        ));
    }
    Ok(results)
}

/// R² of link_performance volume against link.csv ref_volume, joined on link_id.
pub fn check_reference_r2(link: &Table, perf: Option<&Table>) -> Vec<ValidationResult> {
    let reference = paired_by_link(link, "ref_volume");
    let Some(reference) = reference.filter(|values| !values.is_empty()) else {
        return vec![
            ValidationResult::warning(
                "Column 'ref_volume' not found or empty in link.csv. Cannot perform ref_volume and volume comparison.",
            )
            .with_field("ref_volume"),
        ];
    };
    let mut results =
        vec![ValidationResult::success("ref_volume imported successfully").with_field("ref_volume")];

    let Some(perf) = perf else {
        results.push(
            ValidationResult::warning(
                "link_performance.csv not found. Cannot perform ref_volume and volume comparison.",
            )
            .with_field("link_performance"),
        );
        return results;
    };
    let Some(assigned) = paired_by_link(perf, "volume").filter(|values| !values.is_empty()) else {
        results.push(
            ValidationResult::warning(
                "Column 'volume' not found or empty in link_performance.csv. Cannot perform ref_volume and volume comparison.",
            )
            .with_field("volume"),
        );
        return results;
    };

    let assigned_by_link: HashMap<&str, f64> =
        assigned.iter().map(|(key, value)| (key.as_str(), *value)).collect();
    let (truth, predicted): (Vec<f64>, Vec<f64>) = reference
        .iter()
        .filter_map(|(key, r)| assigned_by_link.get(key.as_str()).map(|a| (*r, *a)))
        .unzip();
    if truth.is_empty() {
        results.push(
            ValidationResult::warning(
                "No link_id values shared by link.csv and link_performance.csv. Cannot perform ref_volume and volume comparison.",
            )
            .with_field("r2_score"),
        );
        return results;
    }

    let r2 = coefficient_of_determination(&truth, &predicted);
    results.push(
        ValidationResult::success(format!("R^2 value computed: {r2:.4}. Comparison successful."))
            .with_field("r2_score")
            .with_details(json!({ "r2": r2, "n_links": truth.len() })),
    );
    results
}

/// `(link_id key, value)` for rows where both are present.
fn paired_by_link(table: &Table, column: &str) -> Option<Vec<(String, f64)>> {
    let values = table.floats(column)?;
    let ids = table.text("link_id")?;
    Some(
        ids.iter()
            .zip(values)
            .filter_map(|(id, value)| Some((id_key(id.as_deref()?), value?)))
            .collect(),
    )
}
