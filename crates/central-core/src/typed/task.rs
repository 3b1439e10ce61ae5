//! Task trait - 型付き Task の定義
//!
//! routing key（TaskKind）と payload の型を 1:1 で結びつける。

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::domain::TaskKind;

/// Task は TaskKind と payload 型を対応付ける
///
/// # 使用例
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// #[serde(transparent)]
/// struct UserActivationTask {
///     user_id: String,
/// }
///
/// impl Task for UserActivationTask {
///     const KIND: TaskKind = TaskKind::UserActivation;
/// }
/// ```
///
/// # Trait Bounds
/// - `Serialize` / `DeserializeOwned`: broker には JSON で載る
/// - `Send + Sync + 'static`: worker 間で受け渡すため
pub trait Task: Serialize + DeserializeOwned + Send + Sync + 'static {
    const KIND: TaskKind;
}
