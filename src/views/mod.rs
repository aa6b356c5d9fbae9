//! 応募一覧の派生状態（絞り込み・並び替え・集計）
//!
//! いずれも純粋関数で、正本の一覧から毎回作り直す。

pub mod board;
pub mod filter;
pub mod salary;
pub mod statistics;

pub use board::{ApplicationBoard, SEARCH_DEBOUNCE};
pub use filter::{ApplicationsFilter, SortKey, apply_filter, sort_applications};
pub use salary::parse_salary;
pub use statistics::{SalaryPoint, StageCount, Statistics, compute_statistics};
