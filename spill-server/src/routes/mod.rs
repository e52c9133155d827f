pub mod admin;
pub mod analytics;
pub mod auth;
pub mod comments;
pub mod confessions;
pub mod export;
pub mod health;
pub mod reports;
pub mod trending;
pub mod votes;

#[cfg(test)]
mod tests;
