pub mod a2c;
pub mod policies;
pub mod ppo;
