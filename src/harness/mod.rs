//! Endpoint test harness: live calls against the upstream API and a store
//! of the latest outcome per endpoint.

pub mod auth;
pub mod store;
pub mod tester;

pub use store::TestResultStore;
pub use tester::{EndpointTester, ParameterValues, example_values};
