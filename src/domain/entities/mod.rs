pub mod credentials;
pub mod order;
