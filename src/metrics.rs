// 🩺 Metric Calculator - BMI, BMI category and risk level
// Pure functions: same inputs, same outputs, no hidden state.

use crate::record::{BmiCategory, Habits, RiskLevel, YesNo};

// ============================================================================
// THRESHOLDS
// ============================================================================

const UNDERWEIGHT_LIMIT: f64 = 18.5;
const NORMAL_LIMIT: f64 = 25.0;
const OVERWEIGHT_LIMIT: f64 = 30.0;

const HIGH_RISK_POINTS: i32 = 6;
const MODERATE_RISK_POINTS: i32 = 3;

/// Round to two decimal places (half away from zero).
///
/// Rounds the binary `value * 100`, so a few `.xx5` inputs can land one
/// hundredth away from a decimal `toFixed(2)`; stored values stay consistent
/// because every writer goes through this function.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ============================================================================
// BMI
// ============================================================================

/// Body Mass Index: weight (kg) / height (m)², rounded to 2 decimals.
///
/// Height must be positive; validation rejects anything outside
/// [0.5, 2.5] before a record is built.
pub fn compute_bmi(weight: f64, height: f64) -> f64 {
    round2(weight / (height * height))
}

/// Map a BMI value to its category. Lower bounds are inclusive,
/// so exactly 18.5 is `Normal` and exactly 30 is `Obese`.
pub fn bmi_category(bmi: f64) -> BmiCategory {
    if bmi < UNDERWEIGHT_LIMIT {
        BmiCategory::Underweight
    } else if bmi < NORMAL_LIMIT {
        BmiCategory::Normal
    } else if bmi < OVERWEIGHT_LIMIT {
        BmiCategory::Overweight
    } else {
        BmiCategory::Obese
    }
}

// ============================================================================
// RISK
// ============================================================================

/// Additive risk score over age, BMI, comorbidities and habits.
pub fn risk_points(
    age: u32,
    bmi: f64,
    diabetes: YesNo,
    hypertension: YesNo,
    habits: Habits,
) -> i32 {
    let mut points = 0;

    points += if age >= 60 {
        3
    } else if age >= 45 {
        2
    } else if age >= 30 {
        1
    } else {
        0
    };

    if bmi >= OVERWEIGHT_LIMIT {
        points += 3;
    } else if bmi >= NORMAL_LIMIT {
        points += 1;
    }

    if diabetes.is_yes() {
        points += 3;
    }
    if hypertension.is_yes() {
        points += 2;
    }

    points += match habits {
        Habits::Poor => 2,
        Habits::Moderate => 0,
        Habits::Healthy => -1,
    };

    points
}

/// Bucket a score: >= 6 high, >= 3 moderate, otherwise low.
pub fn risk_level(points: i32) -> RiskLevel {
    if points >= HIGH_RISK_POINTS {
        RiskLevel::High
    } else if points >= MODERATE_RISK_POINTS {
        RiskLevel::Moderate
    } else {
        RiskLevel::Low
    }
}

pub fn risk_score(
    age: u32,
    bmi: f64,
    diabetes: YesNo,
    hypertension: YesNo,
    habits: Habits,
) -> RiskLevel {
    risk_level(risk_points(age, bmi, diabetes, hypertension, habits))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2_ties_go_away_from_zero() {
        assert_eq!(round2(0.125), 0.13);
        assert_eq!(round2(-0.125), -0.13);
        assert_eq!(round2(22.857142), 22.86);
    }

    #[test]
    fn test_compute_bmi_rounds_to_two_decimals() {
        assert_eq!(compute_bmi(90.0, 1.70), 31.14);
        assert_eq!(compute_bmi(70.0, 1.75), 22.86);
        assert_eq!(compute_bmi(50.0, 1.0), 50.0);
    }

    #[test]
    fn test_compute_bmi_matches_formula() {
        for (weight, height) in [(20.0, 0.5), (300.0, 2.5), (63.4, 1.61), (112.0, 1.93)] {
            let expected = ((weight / (height * height)) * 100.0_f64).round() / 100.0;
            assert_eq!(compute_bmi(weight, height), expected);
        }
    }

    #[test]
    fn test_bmi_category_boundaries() {
        assert_eq!(bmi_category(18.49), BmiCategory::Underweight);
        assert_eq!(bmi_category(18.5), BmiCategory::Normal);
        assert_eq!(bmi_category(24.99), BmiCategory::Normal);
        assert_eq!(bmi_category(25.0), BmiCategory::Overweight);
        assert_eq!(bmi_category(29.99), BmiCategory::Overweight);
        assert_eq!(bmi_category(30.0), BmiCategory::Obese);
    }

    #[test]
    fn test_risk_worst_case_is_high() {
        let points = risk_points(65, 31.0, YesNo::Yes, YesNo::Yes, Habits::Poor);
        assert_eq!(points, 13);
        assert_eq!(risk_level(points), RiskLevel::High);
    }

    #[test]
    fn test_risk_best_case_is_low() {
        let points = risk_points(20, 22.0, YesNo::No, YesNo::No, Habits::Healthy);
        assert_eq!(points, -1);
        assert_eq!(risk_level(points), RiskLevel::Low);
    }

    #[test]
    fn test_age_bands_are_exclusive() {
        let base = |age| risk_points(age, 20.0, YesNo::No, YesNo::No, Habits::Moderate);
        assert_eq!(base(29), 0);
        assert_eq!(base(30), 1);
        assert_eq!(base(45), 2);
        assert_eq!(base(60), 3);
        assert_eq!(base(120), 3);
    }

    #[test]
    fn test_risk_level_thresholds() {
        assert_eq!(risk_level(2), RiskLevel::Low);
        assert_eq!(risk_level(3), RiskLevel::Moderate);
        assert_eq!(risk_level(5), RiskLevel::Moderate);
        assert_eq!(risk_level(6), RiskLevel::High);
    }

    #[test]
    fn test_risk_score_end_to_end_example() {
        let bmi = compute_bmi(90.0, 1.70);
        let points = risk_points(70, bmi, YesNo::Yes, YesNo::No, Habits::Poor);
        assert_eq!(points, 11);
        assert_eq!(
            risk_score(70, bmi, YesNo::Yes, YesNo::No, Habits::Poor),
            RiskLevel::High
        );
    }
}
