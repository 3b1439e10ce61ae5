//! App - アプリケーション層
//!
//! queue / typed / ports を組み合わせて worker サービスを動かす。
//!
//! # 主要コンポーネント
//! - **AppBuilder**: handler のワイヤリングと起動時検証
//! - **Runtime**: kind → handler の dispatch と timeout
//! - **WorkerGroup**: lease → handle → ack/fail のループ
//! - **Scheduler**: cron による定期 enqueue
//! - **HealthProbe**: broker の定期 ping
//! - **WorkerServer**: 上記をまとめた start / stop

pub mod builder;
pub mod health;
pub mod runtime;
pub mod scheduler;
pub mod server;
pub mod worker_loop;

pub use self::builder::{AppBuilder, BuildError};
pub use self::health::HealthProbe;
pub use self::runtime::Runtime;
pub use self::scheduler::Scheduler;
pub use self::server::{ServerHandle, WorkerServer};
pub use self::worker_loop::WorkerGroup;
