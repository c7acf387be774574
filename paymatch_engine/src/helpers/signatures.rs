//! Merchant signature schemes.
//!
//! Two independent HMAC-SHA256 schemes are in use, both keyed by the merchant's secret key:
//!
//! * [`ApiSignature`] signs merchant API calls (order creation and status checks) and the webhooks the gateway sends
//!   back to the merchant. The payload fields, minus `sign`, are sorted by name and concatenated as `key=value` with
//!   no separator. The digest is lowercase hex.
//! * [`CallbackSignature`] signs payment notification callbacks. The signed string is `"{timestamp}\n{secret}"` and
//!   the digest is base64 encoded and then form-urlencoded.
//!
//! They are separate types so that a notification signature can never be checked with the API scheme or vice versa.
use hmac::{Hmac, Mac};
use pmg_common::Secret;
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_FIELD: &str = "sign";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("sign error")]
    SignatureInvalid,
    #[error("The payload cannot be signed: {0}")]
    UnsignablePayload(String),
}

fn hmac_sha256(secret: &Secret<String>, data: &[u8]) -> Vec<u8> {
    let mut mac = match HmacSha256::new_from_slice(secret.reveal().as_bytes()) {
        Ok(mac) => mac,
        Err(_) => unreachable!("HMAC-SHA256 accepts keys of any size"),
    };
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    a.len() == b.len() && bool::from(a.as_bytes().ct_eq(b.as_bytes()))
}

//--------------------------------------     ApiSignature     ---------------------------------------------------------
/// The sorted `key=value` concatenation scheme used for merchant API calls and outbound webhooks.
pub struct ApiSignature;

impl ApiSignature {
    /// Builds the canonical string for a payload: every field except `sign` (and any `null` field), sorted by name,
    /// rendered as `key=value` and concatenated.
    ///
    /// Strings are used verbatim. Numbers and booleans use their JSON text, so `10.0` stays `10.0`.
    pub fn canonical_string(fields: &Map<String, Value>) -> String {
        let mut pairs = fields
            .iter()
            .filter(|(k, v)| k.as_str() != SIGNATURE_FIELD && !v.is_null())
            .map(|(k, v)| match v {
                Value::String(s) => (k.as_str(), s.clone()),
                other => (k.as_str(), other.to_string()),
            })
            .collect::<Vec<_>>();
        pairs.sort_by(|a, b| a.0.cmp(b.0));
        pairs.into_iter().map(|(k, v)| format!("{k}={v}")).collect()
    }

    /// Converts any serializable payload into its field map. The payload must serialize to a JSON object.
    pub fn fields_of<T: Serialize>(payload: &T) -> Result<Map<String, Value>, SignatureError> {
        match serde_json::to_value(payload) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(SignatureError::UnsignablePayload(format!("expected an object, got {other}"))),
            Err(e) => Err(SignatureError::UnsignablePayload(e.to_string())),
        }
    }

    /// The lowercase hex HMAC-SHA256 digest of the canonical string.
    pub fn sign(fields: &Map<String, Value>, secret: &Secret<String>) -> String {
        let canonical = Self::canonical_string(fields);
        hmac_sha256(secret, canonical.as_bytes()).iter().map(|b| format!("{b:02x}")).collect()
    }

    pub fn sign_payload<T: Serialize>(payload: &T, secret: &Secret<String>) -> Result<String, SignatureError> {
        Self::fields_of(payload).map(|fields| Self::sign(&fields, secret))
    }

    /// Checks the `sign` field of the payload against the digest of the remaining fields.
    pub fn verify(fields: &Map<String, Value>, secret: &Secret<String>) -> Result<(), SignatureError> {
        let supplied = fields.get(SIGNATURE_FIELD).and_then(Value::as_str).ok_or(SignatureError::SignatureInvalid)?;
        let expected = Self::sign(fields, secret);
        if constant_time_eq(&expected, supplied) {
            Ok(())
        } else {
            Err(SignatureError::SignatureInvalid)
        }
    }

    pub fn verify_payload<T: Serialize>(payload: &T, secret: &Secret<String>) -> Result<(), SignatureError> {
        let fields = Self::fields_of(payload)?;
        Self::verify(&fields, secret)
    }
}

//--------------------------------------   CallbackSignature   --------------------------------------------------------
/// The timestamp scheme used by payment notification callbacks.
pub struct CallbackSignature;

impl CallbackSignature {
    /// `urlencode(base64(HMAC-SHA256(secret, "{timestamp}\n{secret}")))`
    pub fn sign(timestamp: &str, secret: &Secret<String>) -> String {
        let message = format!("{timestamp}\n{}", secret.reveal());
        let digest = hmac_sha256(secret, message.as_bytes());
        let encoded = base64::encode(digest);
        url::form_urlencoded::byte_serialize(encoded.as_bytes()).collect()
    }

    pub fn verify(timestamp: &str, sign: &str, secret: &Secret<String>) -> Result<(), SignatureError> {
        let expected = Self::sign(timestamp, secret);
        if constant_time_eq(&expected, sign) {
            Ok(())
        } else {
            Err(SignatureError::SignatureInvalid)
        }
    }
}
