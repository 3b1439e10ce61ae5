//! PayloadCodec - JSON payload と Task の相互変換
//!
//! decode の失敗は構造的なエラー（`CentralError::Decode`）として扱う。
//! 何回リトライしても直らないが、retry 予算の中で archive される。

use super::task::Task;
use crate::error::CentralError;

pub struct PayloadCodec;

impl PayloadCodec {
    pub fn encode<T: Task>(task: &T) -> Result<serde_json::Value, CentralError> {
        serde_json::to_value(task).map_err(|source| CentralError::Encode {
            kind: T::KIND,
            source,
        })
    }

    pub fn decode<T: Task>(payload: serde_json::Value) -> Result<T, CentralError> {
        serde_json::from_value(payload).map_err(|source| CentralError::Decode {
            kind: T::KIND,
            source,
        })
    }
}
