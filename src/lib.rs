//! 求人応募トラッカーのバックエンド
//!
//! ベアラートークン認証・ダブルサブミット CSRF 保護・パスワードリセットを備えた REST API と、
//! 応募一覧の派生状態（絞り込み・並び替え・集計）およびそれを使う HTTP クライアント。

pub mod client;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod views;
