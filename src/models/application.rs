use garde::Validate;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::Stage;

/// 優先度の既定値（未指定時）
pub const DEFAULT_RANK: i32 = 1;

/// 応募記録
///
/// 所有ユーザーのみが参照・更新・削除できる（アクセス層で保証）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: Uuid,
    #[serde(rename = "user")]
    pub user_id: Uuid,
    pub stage: Stage,
    pub company: String,
    pub role: String,
    pub url: String,
    pub location: String,
    /// 自由記述（レンジ・時給表記を含みうる）
    pub salary: Option<String>,
    /// 1〜5 のユーザー指定優先度
    pub rank: i32,
    pub comments: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub date_created: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub date_modified: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub date_applied: Option<OffsetDateTime>,
}

/// 応募記録の作成入力
///
/// `stage` 未指定時は `number` が最小のステージになる
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewApplication {
    #[serde(default)]
    #[garde(length(min = 1))]
    pub company: String,
    #[serde(default)]
    #[garde(skip)]
    pub role: String,
    #[serde(default)]
    #[garde(skip)]
    pub url: String,
    #[serde(default)]
    #[garde(skip)]
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[garde(skip)]
    pub salary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[garde(skip)]
    pub stage: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[garde(range(min = 1, max = 5))]
    pub rank: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[garde(skip)]
    pub comments: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    #[garde(skip)]
    pub date_applied: Option<OffsetDateTime>,
}

/// 応募記録の部分更新（None のフィールドは変更しない）
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[garde(length(min = 1))]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[garde(skip)]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[garde(skip)]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[garde(skip)]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[garde(skip)]
    pub salary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[garde(skip)]
    pub stage: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[garde(range(min = 1, max = 5))]
    pub rank: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[garde(skip)]
    pub comments: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    #[garde(skip)]
    pub date_applied: Option<OffsetDateTime>,
}

impl NewApplication {
    /// 前後の空白を除去（空白のみの会社名は検証で弾かれる）
    pub fn normalized(mut self) -> Self {
        self.company = self.company.trim().to_string();
        self
    }
}

impl ApplicationChanges {
    pub fn normalized(mut self) -> Self {
        self.company = self.company.map(|company| company.trim().to_string());
        self
    }
}

impl Application {
    /// 部分更新を適用し `date_modified` を更新する
    pub fn apply_changes(&mut self, changes: &ApplicationChanges, stage: Option<Stage>, now: OffsetDateTime) {
        if let Some(company) = &changes.company {
            self.company = company.clone();
        }
        if let Some(role) = &changes.role {
            self.role = role.clone();
        }
        if let Some(url) = &changes.url {
            self.url = url.clone();
        }
        if let Some(location) = &changes.location {
            self.location = location.clone();
        }
        if changes.salary.is_some() {
            self.salary = changes.salary.clone();
        }
        if let Some(stage) = stage {
            self.stage = stage;
        }
        if let Some(rank) = changes.rank {
            self.rank = rank;
        }
        if changes.comments.is_some() {
            self.comments = changes.comments.clone();
        }
        if changes.date_applied.is_some() {
            self.date_applied = changes.date_applied;
        }
        self.date_modified = now;
    }
}
