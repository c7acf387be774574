use cucumber::given;

use crate::cucumber::{paymatch_world::LedgerSystem, PaymatchWorld};

#[given("a fresh install")]
async fn fresh_database(world: &mut PaymatchWorld) {
    let system = LedgerSystem::new(300).await;
    world.system = Some(system);
}

#[given(expr = "a fresh install with an expiry window of {int} seconds")]
async fn fresh_database_with_expiry(world: &mut PaymatchWorld, seconds: i64) {
    let system = LedgerSystem::new(seconds).await;
    world.system = Some(system);
}

#[given(expr = "a merchant called '{word}'")]
async fn merchant(world: &mut PaymatchWorld, name: String) {
    let key = world.system().keys.create_api_key(&name, "").await.expect("Error creating api key");
    world.system_mut().merchants.insert(name, key);
}
