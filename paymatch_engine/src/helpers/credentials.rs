use rand::{distributions::Alphanumeric, Rng};
use uuid::Uuid;

pub const SECRET_KEY_LENGTH: usize = 64;

/// A new public access key: 32 lowercase hex characters.
pub fn generate_access_key() -> String {
    Uuid::new_v4().simple().to_string()
}

/// A new secret key of [`SECRET_KEY_LENGTH`] random alphanumeric characters.
pub fn generate_secret_key() -> String {
    rand::thread_rng().sample_iter(&Alphanumeric).take(SECRET_KEY_LENGTH).map(char::from).collect()
}
