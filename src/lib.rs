//! Telegram bot that registers students and forwards their requests to
//! administrators.

pub mod config;
pub mod desk;
pub mod health;
pub mod telegram_log;
