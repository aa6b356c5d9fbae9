use std::time::{Duration, Instant};

use uuid::Uuid;

use super::filter::{ApplicationsFilter, SortKey, apply_filter, sort_applications};
use super::statistics::{Statistics, compute_statistics};
use crate::models::Application;

/// 検索入力の反映を待つ時間
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(500);

/// 応募一覧の派生状態
///
/// 正本は `applications` のみ。絞り込み結果と集計は変更のたびに全件から作り直す（差分更新しない）。
#[derive(Debug, Clone, Default)]
pub struct ApplicationBoard {
    applications: Vec<Application>,
    filter: ApplicationsFilter,
    filtered: Vec<Application>,
    statistics: Statistics,
    pending_search: Option<PendingSearch>,
}

#[derive(Debug, Clone)]
struct PendingSearch {
    text: String,
    typed_at: Instant,
}

impl ApplicationBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn applications(&self) -> &[Application] {
        &self.applications
    }

    pub fn filter(&self) -> &ApplicationsFilter {
        &self.filter
    }

    /// 絞り込み・並び替え済みの一覧
    pub fn filtered(&self) -> &[Application] {
        &self.filtered
    }

    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    /// 取得結果で一覧を置き換える
    pub fn replace_all(&mut self, applications: Vec<Application>) {
        self.applications = applications;
        self.recompute();
    }

    /// 作成・更新結果を反映（既存なら置換、なければ末尾に追加）
    pub fn upsert(&mut self, application: Application) {
        match self.applications.iter_mut().find(|a| a.id == application.id) {
            Some(existing) => *existing = application,
            None => self.applications.push(application),
        }
        self.recompute();
    }

    pub fn remove(&mut self, application_id: Uuid) {
        self.applications.retain(|a| a.id != application_id);
        self.recompute();
    }

    /// 絞り込み条件を置き換える（保留中の検索入力は破棄）
    pub fn set_filter(&mut self, filter: ApplicationsFilter) {
        self.pending_search = None;
        self.filter = filter;
        self.recompute();
    }

    /// 並び替えのみ変更（現在の絞り込み結果を並べ直す）
    pub fn set_sort(&mut self, sort: SortKey) {
        self.filter.sort = sort;
        sort_applications(&mut self.filtered, sort);
    }

    /// チャートで選択したステージだけに絞り込む（並び替えは維持）
    pub fn filter_to_stage(&mut self, stage_id: Uuid) {
        self.set_filter(ApplicationsFilter {
            stage: vec![stage_id],
            sort: self.filter.sort,
            ..Default::default()
        });
    }

    /// 検索入力を受け付ける（`poll` で反映されるまで保留）
    pub fn type_search(&mut self, text: impl Into<String>, now: Instant) {
        self.pending_search = Some(PendingSearch {
            text: text.into(),
            typed_at: now,
        });
    }

    /// 最後の入力から `SEARCH_DEBOUNCE` 経過していれば検索を反映する
    ///
    /// 反映した場合 true
    pub fn poll(&mut self, now: Instant) -> bool {
        let ready = self
            .pending_search
            .as_ref()
            .is_some_and(|pending| now.saturating_duration_since(pending.typed_at) >= SEARCH_DEBOUNCE);
        if !ready {
            return false;
        }

        if let Some(pending) = self.pending_search.take() {
            self.filter.search = pending.text;
            self.recompute();
        }
        true
    }

    fn recompute(&mut self) {
        self.filtered = apply_filter(&self.filter, &self.applications);
        self.statistics = compute_statistics(&self.applications);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Stage, StageType};
    use time::OffsetDateTime;

    fn stage(name: &str, number: i32) -> Stage {
        Stage {
            id: Uuid::new_v4(),
            name: name.to_string(),
            stage_type: StageType::Active1,
            number,
        }
    }

    fn application(company: &str, stage: &Stage, rank: i32) -> Application {
        Application {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            stage: stage.clone(),
            company: company.to_string(),
            role: "Engineer".to_string(),
            url: String::new(),
            location: "NY".to_string(),
            salary: None,
            rank,
            comments: None,
            date_created: OffsetDateTime::UNIX_EPOCH,
            date_modified: OffsetDateTime::UNIX_EPOCH,
            date_applied: None,
        }
    }

    fn companies(applications: &[Application]) -> Vec<&str> {
        applications.iter().map(|a| a.company.as_str()).collect()
    }

    #[test]
    fn test_mutations_recompute_filtered_and_statistics() {
        let applied = stage("Applied", 10);
        let mut board = ApplicationBoard::new();
        board.replace_all(vec![application("Acme", &applied, 3)]);
        assert_eq!(board.statistics().total_applications, 1);

        let mut globex = application("Globex", &applied, 1);
        board.upsert(globex.clone());
        assert_eq!(board.statistics().total_applications, 2);
        assert_eq!(companies(board.filtered()), ["Acme", "Globex"]);

        globex.company = "Globex Corp".to_string();
        board.upsert(globex.clone());
        assert_eq!(board.applications().len(), 2);
        assert_eq!(companies(board.filtered()), ["Acme", "Globex Corp"]);

        board.remove(globex.id);
        assert_eq!(board.statistics().total_applications, 1);
        assert_eq!(companies(board.filtered()), ["Acme"]);
    }

    #[test]
    fn test_new_record_outside_filter_is_hidden_but_counted() {
        let applied = stage("Applied", 10);
        let mut board = ApplicationBoard::new();
        board.set_filter(ApplicationsFilter {
            rank: vec![5],
            ..Default::default()
        });

        board.upsert(application("Acme", &applied, 3));
        assert!(board.filtered().is_empty());
        assert_eq!(board.statistics().total_applications, 1);
    }

    #[test]
    fn test_sort_only_change_resorts_current_view() {
        let applied = stage("Applied", 10);
        let mut board = ApplicationBoard::new();
        board.replace_all(vec![
            application("C", &applied, 3),
            application("A", &applied, 1),
            application("B", &applied, 2),
        ]);

        board.set_sort(SortKey::Rank);
        assert_eq!(companies(board.filtered()), ["A", "B", "C"]);
        assert_eq!(board.filter().sort, SortKey::Rank);
    }

    #[test]
    fn test_search_is_debounced() {
        let applied = stage("Applied", 10);
        let mut board = ApplicationBoard::new();
        board.replace_all(vec![
            application("Acme", &applied, 1),
            application("Globex", &applied, 1),
        ]);

        let start = Instant::now();
        board.type_search("gl", start);
        board.type_search("glo", start + Duration::from_millis(300));

        // 最後の入力から500ms未満
        assert!(!board.poll(start + Duration::from_millis(600)));
        assert_eq!(board.filtered().len(), 2);

        assert!(board.poll(start + Duration::from_millis(800)));
        assert_eq!(board.filter().search, "glo");
        assert_eq!(companies(board.filtered()), ["Globex"]);

        assert!(!board.poll(start + Duration::from_millis(2000)));
    }

    #[test]
    fn test_filter_to_stage_keeps_sort() {
        let applied = stage("Applied", 10);
        let interview = stage("Interview 1", 20);
        let mut board = ApplicationBoard::new();
        board.replace_all(vec![
            application("Acme", &applied, 2),
            application("Globex", &interview, 1),
            application("Initech", &applied, 1),
        ]);
        board.set_filter(ApplicationsFilter {
            search: "acme".to_string(),
            sort: SortKey::Rank,
            ..Default::default()
        });

        board.filter_to_stage(applied.id);
        assert!(board.filter().search.is_empty());
        assert_eq!(board.filter().stage, [applied.id]);
        assert_eq!(companies(board.filtered()), ["Initech", "Acme"]);
    }
}
