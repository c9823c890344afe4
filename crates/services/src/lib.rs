pub mod block_reward;
pub mod cache;
pub mod constants;
pub mod sync_duties;
