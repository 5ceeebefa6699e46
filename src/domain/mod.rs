//! Normalized model shared by every pipeline stage

pub mod auth;
pub mod catalog;
pub mod endpoint;
pub mod policies;
pub mod server_config;
pub mod test_result;

pub use auth::{ApiKeyLocation, Authentication, OAuth2Flow};
pub use catalog::{CatalogAuth, CatalogEndpoint, CatalogParameter, CatalogRateLimit, PublicApiSpec};
pub use endpoint::{
    Endpoint, EndpointKind, HttpMethod, ParamType, Parameter, ParameterLocation,
    ParameterValidation, RequestBodyDescriptor, ResponseMapping, WebSocketOptions,
};
pub use policies::{
    Backoff, CachingPolicy, CorsPolicy, LogFormat, LoggingPolicy, MetricsFormat, MonitoringPolicy,
    RateLimitPolicy, RetryPolicy,
};
pub use server_config::ServerConfig;
pub use test_result::TestResult;
