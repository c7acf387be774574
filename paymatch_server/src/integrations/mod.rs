pub mod merchant_webhook;
