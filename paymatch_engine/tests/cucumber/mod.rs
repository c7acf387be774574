mod setups;
mod steps;

pub use paymatch_world::PaymatchWorld;
