//! Domain model (IDs, task kinds, mail, secret messaging, ...).

pub mod errors;
pub mod ids;
pub mod mail;
pub mod profile;
pub mod secret;
pub mod subscription;
pub mod task;

pub use self::errors::{ErrorKind, UsecaseError};
pub use self::ids::{MailId, SessionId, TaskId};
pub use self::mail::{Mail, MailAddress, MailResultMetadata, MailStatus, MailingInput};
pub use self::profile::{ProfilePicture, StorageLocation};
pub use self::secret::{
    CallbackAction, Direction, MessageId, SecretMessageNode, SecretMessagingSession,
    TelegramUser, UserId,
};
pub use self::subscription::{GagMeme, GagMemeType, Subscription, SubscriptionChannel, SubscriptionType};
pub use self::task::{Priority, TaskEnvelope, TaskKind};
