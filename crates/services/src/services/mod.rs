pub mod analytics;
pub mod chatbots;
pub mod config;
pub mod dashboard;
pub mod format;
pub mod integrations;
pub mod knowledge_base;
pub mod marketing;
pub mod session;
pub mod test_chat;
