//! Sample lifecycle rules: QC banding and the status transitions it drives.
//!
//! Both flag functions are pure over the measurements and the injected
//! [`QcThresholds`]. They are the single source of truth for banding - the
//! ingest paths and the PRS-eligibility check all call them on raw
//! measurements rather than trusting a stored flag.

use serde::{Deserialize, Serialize};
use valuable::Valuable;

use crate::config::QcThresholds;

/// Hard floor on call rate. A sample below this always fails genotype QC, no
/// matter how `CALLRATE_MIN` is configured.
pub const CALLRATE_HARD_FLOOR: f64 = 0.97;

#[derive(Serialize, Deserialize, Valuable, Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
pub enum QcFlag {
    Pass,
    Warn,
    Fail,
}

impl QcFlag {
    /// Pass and Warn samples proceed through the workflow; Fail holds them.
    #[must_use]
    pub fn is_eligible(self) -> bool {
        matches!(self, Self::Pass | Self::Warn)
    }
}

/// Sample workflow states:
/// `Received → Accessioned → Extraction → DNA Ready | Hold for QA → Plated →
/// Genotyped | Hold for QA`.
#[derive(Serialize, Deserialize, Valuable, Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
pub enum SampleStatus {
    Received,
    Accessioned,
    Extraction,
    #[serde(rename = "DNA Ready")]
    #[strum(to_string = "DNA Ready")]
    DnaReady,
    #[serde(rename = "Hold for QA")]
    #[strum(to_string = "Hold for QA")]
    HoldForQa,
    Plated,
    Genotyped,
}

impl SampleStatus {
    #[must_use]
    pub fn after_dna_qc(flag: QcFlag) -> Self {
        if flag.is_eligible() {
            Self::DnaReady
        } else {
            Self::HoldForQa
        }
    }

    #[must_use]
    pub fn after_genotyping(flag: QcFlag) -> Self {
        if flag.is_eligible() {
            Self::Genotyped
        } else {
            Self::HoldForQa
        }
    }
}

/// Band a DNA extraction measurement. Rules apply in order; the first match
/// wins.
#[must_use]
pub fn dna_qc_flag(
    thresholds: &QcThresholds,
    concentration: f64,
    a260_280: f64,
    a260_230: f64,
) -> QcFlag {
    let QcThresholds {
        dna_min_conc,
        a260_280_min,
        a260_280_max,
        a260_230_min,
        ..
    } = thresholds;

    if concentration < *dna_min_conc {
        if concentration >= dna_min_conc * 0.7 {
            QcFlag::Warn
        } else {
            QcFlag::Fail
        }
    } else if !(*a260_280_min..=*a260_280_max).contains(&a260_280) {
        if (a260_280 - 1.9).abs() <= 0.3 {
            QcFlag::Warn
        } else {
            QcFlag::Fail
        }
    } else if a260_230 < *a260_230_min {
        if a260_230 >= a260_230_min * 0.9 {
            QcFlag::Warn
        } else {
            QcFlag::Fail
        }
    } else {
        QcFlag::Pass
    }
}

/// Band a genotyping metrics record.
#[must_use]
pub fn genotype_qc_flag(thresholds: &QcThresholds, call_rate: f64, dish_qc: f64) -> QcFlag {
    let QcThresholds {
        callrate_min,
        dishqc_min,
        ..
    } = thresholds;

    if call_rate < CALLRATE_HARD_FLOOR || dish_qc < *dishqc_min {
        QcFlag::Fail
    } else if (CALLRATE_HARD_FLOOR..*callrate_min).contains(&call_rate) && dish_qc >= *dishqc_min {
        QcFlag::Warn
    } else if call_rate >= *callrate_min && dish_qc >= *dishqc_min {
        QcFlag::Pass
    } else {
        // The three branches above should be exhaustive over the reals, but
        // float comparisons at the band edges get a guarded fallback.
        QcFlag::Fail
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn thresholds() -> QcThresholds {
        QcThresholds::default()
    }

    #[rstest]
    #[case::comfortably_above_all_limits(35.0, 1.85, 2.0, QcFlag::Pass)]
    #[case::concentration_exactly_at_minimum(20.0, 1.85, 2.0, QcFlag::Pass)]
    #[case::low_concentration_warn_band(15.0, 1.85, 2.0, QcFlag::Warn)]
    #[case::concentration_exactly_at_warn_floor(14.0, 1.85, 2.0, QcFlag::Warn)]
    #[case::concentration_below_warn_floor(13.9, 1.85, 2.0, QcFlag::Fail)]
    #[case::purity_slightly_outside_window(25.0, 2.15, 2.0, QcFlag::Warn)]
    #[case::purity_far_outside_window(25.0, 2.3, 2.0, QcFlag::Fail)]
    #[case::purity_low_but_near_nominal(25.0, 1.65, 2.0, QcFlag::Warn)]
    #[case::a260_230_warn_band(25.0, 1.85, 1.7, QcFlag::Warn)]
    #[case::a260_230_just_above_warn_floor(25.0, 1.85, 1.63, QcFlag::Warn)]
    #[case::a260_230_below_warn_floor(25.0, 1.85, 1.5, QcFlag::Fail)]
    fn dna_banding(
        #[case] concentration: f64,
        #[case] a260_280: f64,
        #[case] a260_230: f64,
        #[case] expected: QcFlag,
    ) {
        assert_eq!(
            dna_qc_flag(&thresholds(), concentration, a260_280, a260_230),
            expected
        );
    }

    #[test]
    fn concentration_rule_wins_over_purity() {
        // A sample can be both dilute and impure; the concentration rule is
        // evaluated first.
        assert_eq!(dna_qc_flag(&thresholds(), 10.0, 3.0, 0.5), QcFlag::Fail);
        assert_eq!(dna_qc_flag(&thresholds(), 15.0, 3.0, 0.5), QcFlag::Warn);
    }

    #[rstest]
    #[case::clean_pass(0.985, 0.85, QcFlag::Pass)]
    #[case::call_rate_exactly_at_minimum(0.98, 0.85, QcFlag::Pass)]
    #[case::call_rate_in_warn_band(0.975, 0.85, QcFlag::Warn)]
    #[case::call_rate_exactly_at_hard_floor(0.97, 0.85, QcFlag::Warn)]
    #[case::call_rate_below_hard_floor(0.96, 0.85, QcFlag::Fail)]
    #[case::dish_qc_below_minimum(0.99, 0.81, QcFlag::Fail)]
    #[case::dish_qc_exactly_at_minimum(0.99, 0.82, QcFlag::Pass)]
    #[case::both_out_of_range(0.9, 0.5, QcFlag::Fail)]
    fn genotype_banding(#[case] call_rate: f64, #[case] dish_qc: f64, #[case] expected: QcFlag) {
        assert_eq!(genotype_qc_flag(&thresholds(), call_rate, dish_qc), expected);
    }

    #[test]
    fn genotype_banding_respects_injected_thresholds() {
        let lenient = QcThresholds {
            callrate_min: 0.975,
            dishqc_min: 0.5,
            ..QcThresholds::default()
        };

        assert_eq!(genotype_qc_flag(&lenient, 0.976, 0.6), QcFlag::Pass);
        assert_eq!(genotype_qc_flag(&lenient, 0.972, 0.6), QcFlag::Warn);
        // The 0.97 floor is not configurable.
        assert_eq!(genotype_qc_flag(&lenient, 0.969, 0.9), QcFlag::Fail);
    }

    #[test]
    fn statuses_after_qc() {
        assert_eq!(
            SampleStatus::after_dna_qc(QcFlag::Pass),
            SampleStatus::DnaReady
        );
        assert_eq!(
            SampleStatus::after_dna_qc(QcFlag::Warn),
            SampleStatus::DnaReady
        );
        assert_eq!(
            SampleStatus::after_dna_qc(QcFlag::Fail),
            SampleStatus::HoldForQa
        );
        assert_eq!(
            SampleStatus::after_genotyping(QcFlag::Warn),
            SampleStatus::Genotyped
        );
        assert_eq!(
            SampleStatus::after_genotyping(QcFlag::Fail),
            SampleStatus::HoldForQa
        );
    }
}
