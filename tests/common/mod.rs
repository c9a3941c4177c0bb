pub mod database;
pub mod helpers;
pub mod test_app;

pub use database::TestDb;
pub use helpers::{issue_service_token, seed_file, seed_project, seed_user, unique_channel_id, unique_platform_user_id};
pub use test_app::TestApp;
