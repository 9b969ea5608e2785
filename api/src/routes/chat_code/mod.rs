pub mod chat_code_route;
pub mod prompt;
