//! Ports - 外部との境界
//!
//! 永続化・キャッシュ・チャット bot・メール送信などの外部システムを
//! trait で抽象化する。core はここに定義した trait だけに依存し、
//! 具体的な実装は `impls` または利用側のクレートが持つ。

pub mod cache;
pub mod clock;
pub mod gateway;
pub mod id_generator;
pub mod mailer;
pub mod store;

pub use self::cache::Cache;
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::gateway::{
    BotGateway, CallbackAnswer, GatewayError, InlineButton, ModerationReport, ModerationSink,
    OutgoingMessage, ParseMode, PictureFetch, ProfilePictureSource, SentMessage,
};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::mailer::{MailError, MailProvider};
pub use self::store::{
    AccountStore, MailStore, MemeStore, ProfilePictureStore, SecretMessagingStore, StoreError,
    SubscriptionStore, TelegramUserStore,
};
