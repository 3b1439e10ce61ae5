//! AppBuilder - handler のワイヤリングと起動時検証
//!
//! # Fail-fast 設計
//! - register() は同じ kind の二重登録を RegistryError で弾く
//! - expect_tasks() で期待される kind を宣言
//! - build() 時に「期待集合 ⊆ 登録済み集合」をチェックし、不足があれば BuildError

use super::runtime::Runtime;
use crate::domain::TaskKind;
use crate::typed::{Handler, RegistryError, Task, TypedRegistry};

/// AppBuilder は Runtime を構築
///
/// # 使用例
/// ```ignore
/// let runtime = AppBuilder::new()
///     .register::<UserActivationTask, _>(UserActivationHandler::new(accounts))?
///     .expect_tasks(&[TaskKind::UserActivation])
///     .build()?;
/// ```
pub struct AppBuilder {
    registry: TypedRegistry,
    expected_kinds: Option<Vec<TaskKind>>,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing task kinds: {0:?}. These tasks were expected but not registered.")]
    MissingTaskKinds(Vec<TaskKind>),
}

impl AppBuilder {
    pub fn new() -> Self {
        Self {
            registry: TypedRegistry::new(),
            expected_kinds: None,
        }
    }

    pub fn register<T: Task, H: Handler<T> + 'static>(
        mut self,
        handler: H,
    ) -> Result<Self, RegistryError> {
        self.registry.register::<T, H>(handler)?;
        Ok(self)
    }

    pub fn expect_tasks(mut self, kinds: &[TaskKind]) -> Self {
        self.expected_kinds = Some(kinds.to_vec());
        self
    }

    pub fn build(self) -> Result<Runtime, BuildError> {
        if let Some(expected) = &self.expected_kinds {
            let registered = self.registry.registered_kinds();
            let missing: Vec<TaskKind> = expected
                .iter()
                .filter(|kind| !registered.contains(kind))
                .copied()
                .collect();
            if !missing.is_empty() {
                return Err(BuildError::MissingTaskKinds(missing));
            }
        }
        tracing::debug!(
            kinds = ?self.registry.registered_kinds(),
            "handler registry built"
        );
        Ok(Runtime::new(self.registry))
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}
