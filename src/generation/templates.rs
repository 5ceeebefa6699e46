//! Embedded server templates

use tera::Tera;

use crate::core::Result;

pub const SERVER: &str = "server.js";
pub const ENDPOINT_REST: &str = "endpoint_rest.js";
pub const ENDPOINT_WEBSOCKET: &str = "endpoint_websocket.js";
pub const ENDPOINT_GRAPHQL: &str = "endpoint_graphql.js";
pub const AUTH_MIDDLEWARE: &str = "auth_middleware.js";
pub const UPSTREAM_AUTH: &str = "upstream_auth.js";
pub const VALIDATION: &str = "validation.js";
pub const ENV_EXAMPLE: &str = "env.example";

const SOURCES: [(&str, &str); 8] = [
    (SERVER, include_str!("../../templates/server/server.js.tera")),
    (ENDPOINT_REST, include_str!("../../templates/server/endpoint_rest.js.tera")),
    (
        ENDPOINT_WEBSOCKET,
        include_str!("../../templates/server/endpoint_websocket.js.tera"),
    ),
    (
        ENDPOINT_GRAPHQL,
        include_str!("../../templates/server/endpoint_graphql.js.tera"),
    ),
    (
        AUTH_MIDDLEWARE,
        include_str!("../../templates/server/auth_middleware.js.tera"),
    ),
    (UPSTREAM_AUTH, include_str!("../../templates/server/upstream_auth.js.tera")),
    (VALIDATION, include_str!("../../templates/server/validation.js.tera")),
    (ENV_EXAMPLE, include_str!("../../templates/server/env.example.tera")),
];

/// Build a Tera instance holding every server template.
///
/// None of the names end in `.html`, so autoescaping stays off and string
/// literals are escaped by the templates themselves through `json_encode`.
pub fn load() -> Result<Tera> {
    let mut tera = Tera::default();
    tera.add_raw_templates(SOURCES.to_vec())?;
    Ok(tera)
}
