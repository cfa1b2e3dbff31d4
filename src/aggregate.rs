// 📊 Aggregator - summary views over a record collection
// Feeds the bar chart (mean BMI per sex), the risk chart and the age x BMI scatter.

use crate::metrics::round2;
use crate::record::{Record, RiskLevel, Sex, YesNo};
use serde::Serialize;

// ============================================================================
// VIEW TYPES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SexBmi {
    pub sexo: Sex,
    #[serde(rename = "avgImc")]
    pub avg_imc: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskSlice {
    pub name: RiskLevel,
    pub value: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub idade: u32,
    pub imc: f64,
    pub diabetes: YesNo,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiabetesSplit {
    #[serde(rename = "comDiabetes")]
    pub com_diabetes: Vec<ScatterPoint>,
    #[serde(rename = "semDiabetes")]
    pub sem_diabetes: Vec<ScatterPoint>,
}

// ============================================================================
// AGGREGATIONS
// ============================================================================

/// Mean BMI per sex, groups in first-seen order.
pub fn average_bmi_by_sex(records: &[Record]) -> Vec<SexBmi> {
    // At most three groups, a Vec keeps insertion order without an index map
    let mut groups: Vec<(Sex, f64, usize)> = Vec::new();

    for record in records {
        match groups.iter_mut().find(|(sex, _, _)| *sex == record.sex) {
            Some((_, sum, count)) => {
                *sum += record.bmi;
                *count += 1;
            }
            None => groups.push((record.sex, record.bmi, 1)),
        }
    }

    groups
        .into_iter()
        .filter(|(_, _, count)| *count > 0)
        .map(|(sexo, sum, count)| SexBmi {
            sexo,
            avg_imc: round2(sum / count as f64),
        })
        .collect()
}

/// Count per risk level. Always `[Alto, Moderado, Baixo]`, zeros included.
pub fn risk_distribution(records: &[Record]) -> Vec<RiskSlice> {
    RiskLevel::ALL
        .iter()
        .map(|level| RiskSlice {
            name: *level,
            value: records.iter().filter(|r| r.risk == *level).count(),
        })
        .collect()
}

/// Age/BMI pairs in record order.
pub fn age_imc_series(records: &[Record]) -> Vec<ScatterPoint> {
    records
        .iter()
        .map(|r| ScatterPoint {
            idade: r.age,
            imc: r.bmi,
            diabetes: r.diabetes,
        })
        .collect()
}

/// Split scatter points into the two chart series.
pub fn split_by_diabetes(points: &[ScatterPoint]) -> DiabetesSplit {
    let (com_diabetes, sem_diabetes): (Vec<ScatterPoint>, Vec<ScatterPoint>) =
        points.iter().copied().partition(|p| p.diabetes.is_yes());
    DiabetesSplit {
        com_diabetes,
        sem_diabetes,
    }
}

// ============================================================================
// DASHBOARD
// ============================================================================

/// Everything the analysis page shows, in one payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub total: usize,
    #[serde(rename = "imcBySexo")]
    pub imc_by_sexo: Vec<SexBmi>,
    #[serde(rename = "riskDistribution")]
    pub risk_distribution: Vec<RiskSlice>,
    #[serde(rename = "ageImc")]
    pub age_imc: DiabetesSplit,
}

impl Dashboard {
    pub fn from_records(records: &[Record]) -> Self {
        Dashboard {
            total: records.len(),
            imc_by_sexo: average_bmi_by_sex(records),
            risk_distribution: risk_distribution(records),
            age_imc: split_by_diabetes(&age_imc_series(records)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{BmiCategory, Habits};

    fn record(id: i64, sex: Sex, bmi: f64, risk: RiskLevel, diabetes: YesNo) -> Record {
        Record {
            id,
            sex,
            age: 40,
            weight: 70.0,
            height: 1.75,
            diabetes,
            hypertension: YesNo::No,
            habits: Habits::Moderate,
            bmi,
            category: BmiCategory::Normal,
            risk,
        }
    }

    #[test]
    fn test_average_bmi_single_group() {
        let records = vec![
            record(1, Sex::Male, 20.0, RiskLevel::Low, YesNo::No),
            record(2, Sex::Male, 30.0, RiskLevel::Low, YesNo::No),
        ];

        assert_eq!(
            average_bmi_by_sex(&records),
            vec![SexBmi { sexo: Sex::Male, avg_imc: 25.0 }]
        );
    }

    #[test]
    fn test_average_bmi_keeps_first_seen_order() {
        let records = vec![
            record(1, Sex::Other, 22.0, RiskLevel::Low, YesNo::No),
            record(2, Sex::Female, 21.0, RiskLevel::Low, YesNo::No),
            record(3, Sex::Other, 23.0, RiskLevel::Low, YesNo::No),
            record(4, Sex::Male, 24.333, RiskLevel::Low, YesNo::No),
        ];

        let groups = average_bmi_by_sex(&records);
        let order: Vec<Sex> = groups.iter().map(|g| g.sexo).collect();
        assert_eq!(order, vec![Sex::Other, Sex::Female, Sex::Male]);
        assert_eq!(groups[0].avg_imc, 22.5);
        assert_eq!(groups[2].avg_imc, 24.33);
    }

    #[test]
    fn test_average_bmi_empty() {
        assert!(average_bmi_by_sex(&[]).is_empty());
    }

    #[test]
    fn test_risk_distribution_empty_has_all_labels() {
        let slices = risk_distribution(&[]);
        assert_eq!(
            slices,
            vec![
                RiskSlice { name: RiskLevel::High, value: 0 },
                RiskSlice { name: RiskLevel::Moderate, value: 0 },
                RiskSlice { name: RiskLevel::Low, value: 0 },
            ]
        );

        let json = serde_json::to_value(&slices).unwrap();
        assert_eq!(json[0]["name"], "Alto");
        assert_eq!(json[2]["name"], "Baixo");
    }

    #[test]
    fn test_risk_distribution_counts() {
        let records = vec![
            record(1, Sex::Male, 20.0, RiskLevel::High, YesNo::No),
            record(2, Sex::Male, 20.0, RiskLevel::Low, YesNo::No),
            record(3, Sex::Male, 20.0, RiskLevel::High, YesNo::No),
        ];

        let values: Vec<usize> = risk_distribution(&records).iter().map(|s| s.value).collect();
        assert_eq!(values, vec![2, 0, 1]);
    }

    #[test]
    fn test_scatter_preserves_order_and_splits() {
        let records = vec![
            record(3, Sex::Male, 31.0, RiskLevel::High, YesNo::Yes),
            record(2, Sex::Female, 22.0, RiskLevel::Low, YesNo::No),
            record(1, Sex::Female, 27.0, RiskLevel::Moderate, YesNo::Yes),
        ];

        let points = age_imc_series(&records);
        assert_eq!(points.iter().map(|p| p.imc).collect::<Vec<_>>(), vec![31.0, 22.0, 27.0]);

        let split = split_by_diabetes(&points);
        assert_eq!(split.com_diabetes.len(), 2);
        assert_eq!(split.sem_diabetes.len(), 1);
        assert_eq!(split.com_diabetes[1].imc, 27.0);
    }

    #[test]
    fn test_dashboard_payload_shape() {
        let records = vec![record(1, Sex::Female, 22.0, RiskLevel::Low, YesNo::No)];
        let json = serde_json::to_value(Dashboard::from_records(&records)).unwrap();

        assert_eq!(json["total"], 1);
        assert_eq!(json["imcBySexo"][0]["sexo"], "Feminino");
        assert_eq!(json["imcBySexo"][0]["avgImc"], 22.0);
        assert_eq!(json["riskDistribution"][2]["value"], 1);
        assert_eq!(json["ageImc"]["semDiabetes"][0]["idade"], 40);
    }
}
