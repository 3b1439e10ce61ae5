//! central-core
//!
//! Core of the central worker service: a typed task queue with strict
//! priority lanes, a worker pool, cron scheduling, mail provider failover
//! and the secret messaging relay.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, task kind, mail, secret messaging, errors）
//! - **ports**: 外部との境界（store, cache, bot gateway, mail provider, clock）
//! - **typed**: 型付き Task API（Task trait, Handler trait, TypedRegistry, PayloadCodec）
//! - **queue**: broker trait, in-memory broker, retry, TaskClient
//! - **policy**: kind ごとの max_retry / timeout / backoff / lane
//! - **app**: builder, runtime, worker loop, scheduler, health probe, server
//! - **mailing**: provider failover と mail enqueue use case
//! - **secret**: secret messaging protocol と bot command layer
//! - **handlers**: kind ごとの handler
//! - **impls**: ports の実装（in-memory, Telegram, Siakad）
//! - **service**: 単一プロセス用のワイヤリング

pub mod app;
pub mod config;
pub mod cron;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod impls;
pub mod mailing;
pub mod observability;
pub mod policy;
pub mod ports;
pub mod queue;
pub mod secret;
pub mod service;
pub mod typed;

pub use self::error::{CentralError, Result};
