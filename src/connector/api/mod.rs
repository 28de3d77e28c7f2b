pub mod container;
pub mod controller;
pub mod http;
pub mod router;

pub use container::{Container, ContainerConfig, LlmMode};
pub use http::{http_router, serve, CreateSessionResponse, HealthResponse, MessageRequest, MessageResponse};
pub use router::Router;
