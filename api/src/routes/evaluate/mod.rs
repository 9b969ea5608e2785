pub mod evaluate_request;
pub mod evaluate_route;
