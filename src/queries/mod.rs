pub mod audit;
pub mod deletions;
pub mod files;
pub mod locks;
pub mod projects;
pub mod references;
pub mod users;
