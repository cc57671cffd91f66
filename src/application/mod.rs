pub mod agent;
pub mod ports;
pub mod services;
pub mod tools;
pub mod use_cases;
