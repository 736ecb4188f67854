// handlers/public/mod.rs - Endpoints that never need a credential

pub mod login;
pub mod status;

pub use login::post as login_post;
pub use status::{health, ping, root, services};
