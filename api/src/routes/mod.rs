pub mod chat;
pub mod chat_code;
pub mod evaluate;
pub mod health_route;
