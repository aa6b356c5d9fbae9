use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// ステージ種別（表示上のグルーピング・配色にのみ使用）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageType {
    Init,
    Active1,
    Active2,
    Pause,
    Fail,
    Success,
}

impl StageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Active1 => "active1",
            Self::Active2 => "active2",
            Self::Pause => "pause",
            Self::Fail => "fail",
            Self::Success => "success",
        }
    }
}

impl fmt::Display for StageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "init" => Ok(Self::Init),
            "active1" => Ok(Self::Active1),
            "active2" => Ok(Self::Active2),
            "pause" => Ok(Self::Pause),
            "fail" => Ok(Self::Fail),
            "success" => Ok(Self::Success),
            other => Err(format!("unknown stage type: {other}")),
        }
    }
}

impl TryFrom<String> for StageType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// 選考ステージ（参照データ、エンドユーザーからは変更不可）
///
/// `number` がデフォルトの並び順を決める
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Stage {
    pub id: Uuid,
    pub name: String,
    #[sqlx(try_from = "String")]
    #[serde(rename = "type")]
    pub stage_type: StageType,
    pub number: i32,
}

/// 投入用ステージ定義
#[derive(Debug, Clone, Copy)]
pub struct NewStage {
    pub name: &'static str,
    pub stage_type: StageType,
    pub number: i32,
}

const fn stage(name: &'static str, stage_type: StageType, number: i32) -> NewStage {
    NewStage {
        name,
        stage_type,
        number,
    }
}

/// 初期投入するステージ一覧
pub const DEFAULT_STAGES: &[NewStage] = &[
    stage("Idea", StageType::Init, 1),
    stage("Ready to apply", StageType::Init, 2),
    stage("Applied", StageType::Active1, 10),
    stage("Messaged Employee", StageType::Active1, 11),
    stage("Messaged Recruiter", StageType::Active1, 12),
    stage("Followed up 1", StageType::Active1, 13),
    stage("Followed up 2", StageType::Active1, 14),
    stage("Followed up 3", StageType::Active1, 15),
    stage("Interview 1", StageType::Active2, 20),
    stage("Interview 2", StageType::Active2, 21),
    stage("Interview 3", StageType::Active2, 22),
    stage("Interview 4", StageType::Active2, 23),
    stage("Rejected & Interested", StageType::Pause, 30),
    stage("Rejected", StageType::Fail, 31),
    stage("Don't like", StageType::Fail, 32),
    stage("Offered", StageType::Success, 33),
    stage("Signed", StageType::Success, 34),
];
