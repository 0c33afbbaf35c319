pub mod cache;
pub mod concurrency_limiter;
pub mod config;
pub mod coordinates;
pub mod distance_calculation_service;
pub mod distance_request;
pub mod distance_result;
pub mod error;
pub mod here_api;
pub mod interest_point;
pub mod routing_client;
pub mod transportation_mode;
