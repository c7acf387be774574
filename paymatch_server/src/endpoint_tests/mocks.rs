use chrono::{DateTime, Utc};
use mockall::mock;
use paymatch_engine::{
    db_types::{ApiKey, Cents, NewApiKey, NewOrder, Order, OrderNumber},
    traits::{ApiKeyError, ApiKeyManagement, OrderFlowError, OrderManagement},
};

mock! {
    pub Ledger {}
    impl OrderManagement for Ledger {
        async fn insert_order(&self, order: NewOrder, since: DateTime<Utc>) -> Result<Order, OrderFlowError>;
        async fn fetch_order_by_order_number(&self, order_number: &OrderNumber) -> Result<Option<Order>, OrderFlowError>;
        async fn fetch_pending_order_for_price(&self, price: Cents, since: DateTime<Utc>) -> Result<Option<Order>, OrderFlowError>;
        async fn mark_order_paid(&self, id: i64, amount: Cents) -> Result<Option<Order>, OrderFlowError>;
        async fn expire_orders(&self, since: DateTime<Utc>) -> Result<Vec<Order>, OrderFlowError>;
    }
    impl ApiKeyManagement for Ledger {
        async fn fetch_api_key_by_access_key(&self, access_key: &str) -> Result<Option<ApiKey>, ApiKeyError>;
        async fn fetch_api_key(&self, id: i64) -> Result<Option<ApiKey>, ApiKeyError>;
        async fn insert_api_key(&self, key: NewApiKey) -> Result<ApiKey, ApiKeyError>;
        async fn update_api_key(&self, id: i64, name: &str, remark: &str) -> Result<ApiKey, ApiKeyError>;
    }
}
