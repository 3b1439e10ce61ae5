//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **InMemoryStore / InMemoryCache**: 開発用・テスト用の store と cache
//! - **TelegramGateway**: Bot API クライアント
//! - **SiakadPictureSource**: プロフィール画像の取得元
//! - **MailModerationSink / LogModerationSink**: 通報の送り先
//! - **RecordingGateway / RecordingModerationSink**: 送信内容を記録するだけのテスト用実装

pub mod memory_cache;
pub mod memory_store;
pub mod moderation;
pub mod recording;
pub mod siakad;
pub mod telegram;

pub use self::memory_cache::InMemoryCache;
pub use self::memory_store::InMemoryStore;
pub use self::moderation::{LogModerationSink, MailModerationSink, RecordingModerationSink};
pub use self::recording::RecordingGateway;
pub use self::siakad::SiakadPictureSource;
pub use self::telegram::TelegramGateway;
