use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::salary::parse_salary;
use crate::models::{Application, StageType};

/// ステージ別の件数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageCount {
    pub stage_id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub stage_type: StageType,
    pub number: i32,
    pub count: usize,
}

/// 給与チャートの1点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalaryPoint {
    pub application_id: Uuid,
    pub company: String,
    pub role: String,
    /// 入力されたままの給与
    pub salary: Option<String>,
    /// 年額換算値
    pub value: f64,
}

/// 応募記録の集計
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_applications: usize,
    /// ステージ名ごとの件数（`number` 昇順）
    pub by_stage: Vec<StageCount>,
    /// 年額換算値の昇順
    pub salary_series: Vec<SalaryPoint>,
}

/// 全件から集計を作り直す
pub fn compute_statistics(applications: &[Application]) -> Statistics {
    let mut by_name: HashMap<&str, StageCount> = HashMap::new();
    for application in applications {
        let stage = &application.stage;
        by_name
            .entry(stage.name.as_str())
            .or_insert_with(|| StageCount {
                stage_id: stage.id,
                name: stage.name.clone(),
                stage_type: stage.stage_type,
                number: stage.number,
                count: 0,
            })
            .count += 1;
    }

    let mut by_stage: Vec<StageCount> = by_name.into_values().collect();
    by_stage.sort_by(|a, b| a.number.cmp(&b.number).then_with(|| a.name.cmp(&b.name)));

    let mut salary_series: Vec<SalaryPoint> = applications
        .iter()
        .map(|application| SalaryPoint {
            application_id: application.id,
            company: application.company.clone(),
            role: application.role.clone(),
            salary: application.salary.clone(),
            value: parse_salary(application.salary.as_deref()),
        })
        .collect();
    salary_series.sort_by(|a, b| a.value.total_cmp(&b.value));

    Statistics {
        total_applications: applications.len(),
        by_stage,
        salary_series,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Stage;
    use time::OffsetDateTime;

    fn application(company: &str, stage: &Stage, salary: Option<&str>) -> Application {
        Application {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            stage: stage.clone(),
            company: company.to_string(),
            role: String::new(),
            url: String::new(),
            location: String::new(),
            salary: salary.map(str::to_string),
            rank: 1,
            comments: None,
            date_created: OffsetDateTime::UNIX_EPOCH,
            date_modified: OffsetDateTime::UNIX_EPOCH,
            date_applied: None,
        }
    }

    fn stage(name: &str, stage_type: StageType, number: i32) -> Stage {
        Stage {
            id: Uuid::new_v4(),
            name: name.to_string(),
            stage_type,
            number,
        }
    }

    #[test]
    fn test_empty_list() {
        let statistics = compute_statistics(&[]);
        assert_eq!(statistics, Statistics::default());
    }

    #[test]
    fn test_groups_by_stage_in_number_order() {
        let offered = stage("Offered", StageType::Success, 33);
        let idea = stage("Idea", StageType::Init, 1);
        let applied = stage("Applied", StageType::Active1, 10);
        let applications = vec![
            application("A", &offered, None),
            application("B", &applied, None),
            application("C", &idea, None),
            application("D", &applied, None),
        ];

        let statistics = compute_statistics(&applications);
        assert_eq!(statistics.total_applications, 4);

        let groups: Vec<(&str, usize)> = statistics
            .by_stage
            .iter()
            .map(|g| (g.name.as_str(), g.count))
            .collect();
        assert_eq!(groups, [("Idea", 1), ("Applied", 2), ("Offered", 1)]);
    }

    #[test]
    fn test_salary_series_is_ascending() {
        let applied = stage("Applied", StageType::Active1, 10);
        let applications = vec![
            application("High", &applied, Some("$150k")),
            application("None", &applied, None),
            application("Hourly", &applied, Some("$50/hr")),
        ];

        let series = compute_statistics(&applications).salary_series;
        let values: Vec<f64> = series.iter().map(|p| p.value).collect();
        assert_eq!(values, [0.0, 104_000.0, 150_000.0]);
        assert_eq!(series[1].salary.as_deref(), Some("$50/hr"));
    }
}
