pub mod app_config;
pub mod database;
pub mod mailer;
pub mod order_repo;
pub mod printful;
pub mod redis_repo;
pub mod rest;
pub mod storage;
pub mod stripe;

pub use app_config::Config;
pub use database::DbClient;
pub use mailer::BrevoMailer;
pub use order_repo::PgOrderRepository;
pub use printful::PrintfulClient;
pub use redis_repo::RedisClient;
pub use rest::RestError;
pub use storage::PublicStorage;
pub use stripe::StripeClient;
