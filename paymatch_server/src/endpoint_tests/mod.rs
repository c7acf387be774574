mod full_flow;
mod helpers;
mod misc;
mod mocks;
mod notify;
