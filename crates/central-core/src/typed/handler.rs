//! Handler trait - Task を実行する Handler の定義
//!
//! - ジェネリック trait (Handler<T>)
//! - Object-safe trait (DynHandler)
//! - Type erasure パターン (TypedHandler<T, H> → DynHandler)

use std::marker::PhantomData;
use std::time::Duration;

use async_trait::async_trait;

use super::codec::PayloadCodec;
use super::task::Task;
use crate::domain::{TaskId, TaskKind};
use crate::error::CentralError;

/// Per-invocation metadata handed to every handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskContext {
    pub task_id: TaskId,
    pub kind: TaskKind,
    /// 1-indexed.
    pub attempt: u32,
    pub max_retry: u32,
    pub timeout: Duration,
}

/// Handler は Task を実行する
///
/// # 使用例
/// ```ignore
/// struct UserActivationHandler { accounts: Arc<dyn AccountStore> }
///
/// #[async_trait]
/// impl Handler<UserActivationTask> for UserActivationHandler {
///     async fn handle(&self, ctx: TaskContext, task: UserActivationTask) -> Result<(), CentralError> {
///         self.accounts.activate_user(&task.user_id).await?;
///         Ok(())
///     }
/// }
/// ```
///
/// `Handler<MailingTask>` は `MailingTask` しか受け取れない。
/// Task と Handler の対応はコンパイル時に保証される。
#[async_trait]
pub trait Handler<T: Task>: Send + Sync {
    async fn handle(&self, ctx: TaskContext, task: T) -> Result<(), CentralError>;
}

/// DynHandler は object-safe な Handler の抽象化
///
/// TypedHandler<T> を DynHandler に変換することで、
/// HashMap<TaskKind, Arc<dyn DynHandler>> に格納可能にします。
#[async_trait]
pub trait DynHandler: Send + Sync {
    async fn handle_dyn(
        &self,
        ctx: TaskContext,
        payload: serde_json::Value,
    ) -> Result<(), CentralError>;

    fn kind(&self) -> TaskKind;
}

pub struct TypedHandler<T: Task, H: Handler<T>> {
    handler: H,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Task, H: Handler<T>> TypedHandler<T, H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<T: Task, H: Handler<T>> DynHandler for TypedHandler<T, H> {
    async fn handle_dyn(
        &self,
        ctx: TaskContext,
        payload: serde_json::Value,
    ) -> Result<(), CentralError> {
        let task: T = PayloadCodec::decode(payload)?;
        self.handler.handle(ctx, task).await
    }

    fn kind(&self) -> TaskKind {
        T::KIND
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! 他モジュールのテストからも使う最小 handler

    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    /// Counts invocations and fails the first `failures` of them.
    #[derive(Clone, Default)]
    pub struct CountingHandler {
        pub calls: Arc<AtomicU32>,
        pub failures: u32,
        pub delay: Option<Duration>,
    }

    impl CountingHandler {
        pub fn failing(failures: u32) -> Self {
            Self {
                failures,
                ..Default::default()
            }
        }

        pub fn slow(delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Default::default()
            }
        }

        pub fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl<T: Task> Handler<T> for CountingHandler {
        async fn handle(&self, _ctx: TaskContext, _task: T) -> Result<(), CentralError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if n <= self.failures {
                return Err(CentralError::Other(format!("intentional failure #{n}")));
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::CountingHandler;
    use super::*;
    use crate::typed::payloads::UserActivationTask;
    use serde_json::json;

    fn ctx() -> TaskContext {
        TaskContext {
            task_id: TaskId::generate(),
            kind: TaskKind::UserActivation,
            attempt: 1,
            max_retry: 3,
            timeout: Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn typed_handler_decodes_and_runs() {
        let handler = CountingHandler::default();
        let typed = TypedHandler::<UserActivationTask, _>::new(handler.clone());

        typed.handle_dyn(ctx(), json!("user-1")).await.unwrap();
        assert_eq!(handler.calls(), 1);
        assert_eq!(typed.kind(), TaskKind::UserActivation);
    }

    #[tokio::test]
    async fn undecodable_payload_never_reaches_the_handler() {
        let handler = CountingHandler::default();
        let typed = TypedHandler::<UserActivationTask, _>::new(handler.clone());

        let err = typed.handle_dyn(ctx(), json!({"id": 1})).await.unwrap_err();
        assert!(matches!(err, CentralError::Decode { .. }));
        assert_eq!(handler.calls(), 0);
    }
}
