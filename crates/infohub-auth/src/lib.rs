pub mod seed;
pub mod service;

pub use seed::default_users;
pub use service::{AuthService, NewUser};
