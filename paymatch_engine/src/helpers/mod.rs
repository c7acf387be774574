mod credentials;
mod merchant_notification;
mod notification_parser;
mod order_number;
mod signatures;

pub use credentials::{generate_access_key, generate_secret_key, SECRET_KEY_LENGTH};
pub use merchant_notification::MerchantNotification;
pub use notification_parser::{CreditedFundsParser, MatchError, NotificationParser, DEFAULT_CREDIT_MARKER};
pub use order_number::new_order_number;
pub use signatures::{ApiSignature, CallbackSignature, SignatureError, SIGNATURE_FIELD};
