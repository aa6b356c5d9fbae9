use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::salary::parse_salary;
use crate::models::Application;

/// 並び替えキー
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    None,
    Company,
    Role,
    Url,
    Location,
    Stage,
    /// 年額換算の降順
    Salary,
    /// 昇順
    Rank,
    /// 作成日時の降順
    Date,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "none" => Ok(Self::None),
            "company" => Ok(Self::Company),
            "role" => Ok(Self::Role),
            "url" => Ok(Self::Url),
            "location" => Ok(Self::Location),
            "stage" => Ok(Self::Stage),
            "salary" => Ok(Self::Salary),
            "rank" => Ok(Self::Rank),
            "date" => Ok(Self::Date),
            other => Err(format!("unknown sort key: {other}")),
        }
    }
}

/// 応募記録の絞り込み条件
///
/// リスト系の条件は空なら「制約なし」。全条件は AND で結合する。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplicationsFilter {
    /// 会社名または職種の部分一致（大文字小文字を区別しない）
    pub search: String,
    pub location: Vec<String>,
    /// ステージID
    pub stage: Vec<Uuid>,
    pub rank: Vec<i32>,
    pub sort: SortKey,
}

impl ApplicationsFilter {
    /// 並び替え以外の条件が全て空か
    pub fn is_unconstrained(&self) -> bool {
        self.search.is_empty()
            && self.location.is_empty()
            && self.stage.is_empty()
            && self.rank.is_empty()
    }

    pub fn matches(&self, application: &Application) -> bool {
        let matches_search = self.search.is_empty() || {
            let needle = self.search.to_lowercase();
            application.company.to_lowercase().contains(&needle)
                || application.role.to_lowercase().contains(&needle)
        };
        let matches_location =
            self.location.is_empty() || self.location.contains(&application.location);
        let matches_stage = self.stage.is_empty() || self.stage.contains(&application.stage.id);
        let matches_rank = self.rank.is_empty() || self.rank.contains(&application.rank);

        matches_search && matches_location && matches_stage && matches_rank
    }
}

/// 絞り込みと並び替えを適用した新しい列を返す（入力は変更しない）
pub fn apply_filter(filter: &ApplicationsFilter, applications: &[Application]) -> Vec<Application> {
    let mut filtered: Vec<Application> = if filter.is_unconstrained() {
        applications.to_vec()
    } else {
        applications
            .iter()
            .filter(|application| filter.matches(application))
            .cloned()
            .collect()
    };
    sort_applications(&mut filtered, filter.sort);
    filtered
}

/// 単一キーで並び替え（安定ソート、同値は元の相対順を保持）
pub fn sort_applications(applications: &mut [Application], sort: SortKey) {
    match sort {
        SortKey::None => {}
        SortKey::Company => applications.sort_by(|a, b| a.company.cmp(&b.company)),
        SortKey::Role => applications.sort_by(|a, b| a.role.cmp(&b.role)),
        SortKey::Url => applications.sort_by(|a, b| a.url.cmp(&b.url)),
        SortKey::Location => applications.sort_by(|a, b| a.location.cmp(&b.location)),
        SortKey::Stage => applications.sort_by(|a, b| a.stage.name.cmp(&b.stage.name)),
        SortKey::Salary => applications.sort_by(|a, b| {
            parse_salary(b.salary.as_deref()).total_cmp(&parse_salary(a.salary.as_deref()))
        }),
        SortKey::Rank => applications.sort_by_key(|a| a.rank),
        SortKey::Date => applications.sort_by(|a, b| b.date_created.cmp(&a.date_created)),
    }
}
