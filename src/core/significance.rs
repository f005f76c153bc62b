//! Univariate significance screens and top-N feature selection.
//!
//! Both screens are descriptive: the AUC screen refits a single-feature
//! classifier per column and scores it in-sample (no held-out split), and the
//! t-test screen runs a pooled-variance two-sample Student's t-test per
//! column. Scores come back keyed by composite feature key, one entry per
//! index column, in column order.

use std::cmp::Ordering;

use indexmap::IndexMap;
use ndarray::{Array1, Array2, Axis};
use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::core::classifier::ProbabilisticClassifier;
use crate::core::cohort::FeatureIndex;
use crate::core::errors::{Result, ScreenError};

/// Composite feature key → score, covering every index column exactly once.
pub type SignificanceResult = IndexMap<String, f64>;

fn check_cohort_shape(
    features: &Array2<f64>,
    labels: &Array1<f64>,
    index: &FeatureIndex,
) -> Result<()> {
    if features.nrows() != labels.len() {
        return Err(ScreenError::validation(format!(
            "feature matrix has {} rows but {} labels were given",
            features.nrows(),
            labels.len()
        )));
    }
    if features.ncols() != index.len() {
        return Err(ScreenError::validation(format!(
            "feature matrix has {} columns but the index maps {}",
            features.ncols(),
            index.len()
        )));
    }
    if let Some(bad) = labels.iter().find(|&&l| l != 0.0 && l != 1.0) {
        return Err(ScreenError::validation(format!(
            "labels must be binary 0/1, found {bad}"
        )));
    }
    Ok(())
}

/// Area under the ROC curve of `scores` against binary `labels`, computed
/// rank-wise with midranks for tied scores.
pub fn roc_auc(labels: &Array1<f64>, scores: &Array1<f64>) -> Result<f64> {
    let n = labels.len();
    let n_pos = labels.iter().filter(|&&l| l == 1.0).count();
    let n_neg = n - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return Err(ScreenError::validation(
            "AUC needs both classes present in the labels",
        ));
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| scores[a].partial_cmp(&scores[b]).unwrap_or(Ordering::Equal));

    // midranks: tied scores share the average of their positions
    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        let midrank = (i + j + 2) as f64 / 2.0;
        for &sample in &order[i..=j] {
            ranks[sample] = midrank;
        }
        i = j + 1;
    }

    let positive_rank_sum: f64 = (0..n).filter(|&s| labels[s] == 1.0).map(|s| ranks[s]).sum();
    let u = positive_rank_sum - (n_pos * (n_pos + 1)) as f64 / 2.0;
    Ok(u / (n_pos * n_neg) as f64)
}

/// Per-feature AUC: one classifier refit per column, scored in-sample.
///
/// The classifier is refitted from scratch for every column, with that single
/// column as its only input. O(columns) independent fits.
pub fn feature_auc(
    features: &Array2<f64>,
    labels: &Array1<f64>,
    index: &FeatureIndex,
    classifier: &mut dyn ProbabilisticClassifier,
) -> Result<SignificanceResult> {
    check_cohort_shape(features, labels, index)?;

    let mut result = SignificanceResult::with_capacity(index.len());

    for (id, composite_key) in index.keys().enumerate() {
        let column: Array2<f64> = features
            .column(id)
            .to_owned()
            .insert_axis(Axis(1));

        classifier.fit(column.view(), labels.view())?;
        let probabilities = classifier.predict_proba(column.view())?;
        let positive_scores = probabilities.column(1).to_owned();

        let auc = roc_auc(labels, &positive_scores)?;
        result.insert(composite_key.to_string(), auc);
    }

    Ok(result)
}

/// Per-feature two-sample Student's t-test p-values.
///
/// Pooled variance (equal variances assumed), df = n0 + n1 − 2, two-tailed —
/// the classical `ttest_ind` default. A label group with fewer than two
/// samples, or a zero pooled variance, is a validation error rather than a
/// NaN score.
pub fn feature_t_test(
    features: &Array2<f64>,
    labels: &Array1<f64>,
    index: &FeatureIndex,
) -> Result<SignificanceResult> {
    check_cohort_shape(features, labels, index)?;

    let group_0: Vec<usize> = (0..labels.len()).filter(|&i| labels[i] == 0.0).collect();
    let group_1: Vec<usize> = (0..labels.len()).filter(|&i| labels[i] == 1.0).collect();

    let n0 = group_0.len() as f64;
    let n1 = group_1.len() as f64;
    if group_0.len() < 2 || group_1.len() < 2 {
        return Err(ScreenError::validation(format!(
            "t-test needs at least two samples per class, got {} and {}",
            group_0.len(),
            group_1.len()
        )));
    }

    let df = n0 + n1 - 2.0;
    let t_dist = StudentsT::new(0.0, 1.0, df)
        .map_err(|err| ScreenError::validation(format!("invalid t distribution: {err}")))?;

    let mut result = SignificanceResult::with_capacity(index.len());

    for (id, composite_key) in index.keys().enumerate() {
        let column = features.column(id);

        let mean_0: f64 = group_0.iter().map(|&i| column[i]).sum::<f64>() / n0;
        let mean_1: f64 = group_1.iter().map(|&i| column[i]).sum::<f64>() / n1;

        let ss_0: f64 = group_0.iter().map(|&i| (column[i] - mean_0).powi(2)).sum();
        let ss_1: f64 = group_1.iter().map(|&i| (column[i] - mean_1).powi(2)).sum();

        let pooled_variance = (ss_0 + ss_1) / df;
        if pooled_variance <= 0.0 {
            return Err(ScreenError::validation_for(
                "zero pooled variance, t-test undefined",
                composite_key.to_string(),
            ));
        }

        let t_stat = (mean_0 - mean_1) / (pooled_variance * (1.0 / n0 + 1.0 / n1)).sqrt();
        let p_value = 2.0 * (1.0 - t_dist.cdf(t_stat.abs()));

        result.insert(composite_key.to_string(), p_value);
    }

    Ok(result)
}

/// Stably sort a score mapping by value. Entries with equal scores keep the
/// mapping's original insertion order.
pub fn rank_features(scores: &SignificanceResult, descending: bool) -> SignificanceResult {
    let mut entries: Vec<(&String, f64)> = scores.iter().map(|(k, &v)| (k, v)).collect();
    entries.sort_by(|a, b| {
        let ordering = a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal);
        if descending {
            ordering.reverse()
        } else {
            ordering
        }
    });

    entries
        .into_iter()
        .map(|(k, v)| (k.clone(), v))
        .collect()
}

/// Column indices of the `n` best-ranked features.
///
/// An `n` larger than the score mapping returns every column in ranked
/// order.
pub fn select_top_n(
    scores: &SignificanceResult,
    n: usize,
    index: &FeatureIndex,
    descending: bool,
) -> Result<Vec<usize>> {
    rank_features(scores, descending)
        .keys()
        .take(n)
        .map(|key| {
            index.id_for(key).ok_or_else(|| {
                ScreenError::validation(format!("score key '{key}' is not in the feature index"))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    use crate::core::classifier::LogisticRegression;
    use crate::core::cohort::{ExamRecord, FeatureSchema, FeatureSet, MetadataRow, Modality};
    use chrono::NaiveDate;
    use indexmap::IndexMap;

    fn index_with_keys(keys: &[&str]) -> FeatureIndex {
        let set: FeatureSet = keys.iter().map(|k| (k.to_string(), 0.0)).collect();
        let mut features = IndexMap::new();
        features.insert(Modality::Gado, set);
        let record = ExamRecord {
            meta: MetadataRow {
                exam_id: "seed".to_string(),
                sex: 0.0,
                age: 0.0,
                tesla: 0.0,
                multiclass_label: 0.0,
                binary_label: 0.0,
            },
            exam_date: NaiveDate::from_ymd_opt(2004, 1, 1).unwrap(),
            features,
            feature_keys: keys.iter().map(|k| k.to_string()).collect(),
        };
        FeatureIndex::from_schema(&FeatureSchema::from_record(&record), &[Modality::Gado])
    }

    #[test]
    fn test_roc_auc_perfect_and_reversed() {
        let labels = array![0.0, 0.0, 1.0, 1.0];
        assert_abs_diff_eq!(
            roc_auc(&labels, &array![0.1, 0.2, 0.8, 0.9]).unwrap(),
            1.0
        );
        assert_abs_diff_eq!(
            roc_auc(&labels, &array![0.9, 0.8, 0.2, 0.1]).unwrap(),
            0.0
        );
    }

    #[test]
    fn test_roc_auc_ties_use_midranks() {
        let labels = array![0.0, 0.0, 1.0, 1.0];
        let constant = array![0.5, 0.5, 0.5, 0.5];
        assert_abs_diff_eq!(roc_auc(&labels, &constant).unwrap(), 0.5);
    }

    #[test]
    fn test_roc_auc_needs_both_classes() {
        let labels = array![1.0, 1.0, 1.0];
        assert!(roc_auc(&labels, &array![0.1, 0.2, 0.3]).is_err());
    }

    #[test]
    fn test_feature_auc_ranks_separable_column_highest() {
        let index = index_with_keys(&["separable", "noise"]);
        // column 0 separates the classes perfectly, column 1 is anti-ordered
        // for half the samples
        let features = array![
            [1.0, 5.0],
            [2.0, 1.0],
            [3.0, 4.0],
            [10.0, 2.0],
            [11.0, 3.0],
            [12.0, 0.0],
        ];
        let labels = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let mut classifier = LogisticRegression::default();
        let aucs = feature_auc(&features, &labels, &index, &mut classifier).unwrap();

        assert_eq!(aucs.len(), 2);
        assert_abs_diff_eq!(aucs["gado_separable"], 1.0);
        assert!(aucs["gado_separable"] > aucs["gado_noise"]);
    }

    #[test]
    fn test_feature_t_test_against_hand_computed_values() {
        let index = index_with_keys(&["shifted"]);
        // group 0: 1,2,3  group 1: 7,8,9 — pooled variance 1, t = -6/sqrt(2/3)
        let features = array![[1.0], [2.0], [3.0], [7.0], [8.0], [9.0]];
        let labels = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let p_values = feature_t_test(&features, &labels, &index).unwrap();
        let p = p_values["gado_shifted"];

        // |t| = 7.348, df = 4 → p ≈ 0.0018
        assert!(p > 0.001 && p < 0.003, "p = {p}");
    }

    #[test]
    fn test_feature_t_test_identical_groups_give_p_one() {
        let index = index_with_keys(&["flat"]);
        let features = array![[1.0], [2.0], [1.0], [2.0]];
        let labels = array![0.0, 0.0, 1.0, 1.0];

        let p_values = feature_t_test(&features, &labels, &index).unwrap();
        assert_abs_diff_eq!(p_values["gado_flat"], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_feature_t_test_rejects_degenerate_groups() {
        let index = index_with_keys(&["x"]);
        let features = array![[1.0], [2.0], [3.0]];
        let labels = array![0.0, 1.0, 1.0];

        let err = feature_t_test(&features, &labels, &index).unwrap_err();
        assert!(matches!(err, ScreenError::Validation { .. }));
    }

    #[test]
    fn test_rank_features_stable_on_ties() {
        let mut scores = SignificanceResult::new();
        scores.insert("gado_a".to_string(), 0.7);
        scores.insert("gado_b".to_string(), 0.9);
        scores.insert("gado_c".to_string(), 0.7);

        let ranked = rank_features(&scores, true);
        let keys: Vec<&str> = ranked.keys().map(String::as_str).collect();
        // a and c tie at 0.7 and keep insertion order
        assert_eq!(keys, vec!["gado_b", "gado_a", "gado_c"]);
    }

    #[test]
    fn test_select_top_n_ordering() {
        let index = index_with_keys(&["a", "b", "c", "d"]);
        let mut scores = SignificanceResult::new();
        scores.insert("gado_a".to_string(), 0.9);
        scores.insert("gado_b".to_string(), 0.5);
        scores.insert("gado_c".to_string(), 0.7);
        scores.insert("gado_d".to_string(), 0.95);

        let selected = select_top_n(&scores, 3, &index, true).unwrap();
        // d, a, c
        assert_eq!(selected, vec![3, 0, 2]);
    }

    #[test]
    fn test_select_top_n_overflow_returns_everything() {
        let index = index_with_keys(&["a", "b"]);
        let mut scores = SignificanceResult::new();
        scores.insert("gado_a".to_string(), 0.2);
        scores.insert("gado_b".to_string(), 0.1);

        let selected = select_top_n(&scores, 10, &index, false).unwrap();
        // ascending: b (0.1) first, then a
        assert_eq!(selected, vec![1, 0]);
    }
}
