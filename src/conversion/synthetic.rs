//! Default endpoints for APIs that come without usable operations.
//!
//! The category match is a substring heuristic, so "Weather & Climate" and
//! "weather" land on the same set.

use serde_json::json;

use crate::conversion::assembler::EndpointDraft;
use crate::domain::{HttpMethod, ParamType, Parameter, ParameterLocation, ParameterValidation};

/// Category families with a dedicated synthetic endpoint set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntheticCategory {
    Weather,
    Finance,
    Social,
    News,
    Generic,
}

impl SyntheticCategory {
    pub fn classify(category: &str) -> Self {
        let category = category.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| category.contains(w));
        if has(&["weather", "climate"]) {
            Self::Weather
        } else if has(&["financ", "stock", "currenc", "exchange", "crypto"]) {
            Self::Finance
        } else if has(&["social"]) {
            Self::Social
        } else if has(&["news", "media"]) {
            Self::News
        } else {
            Self::Generic
        }
    }
}

/// Synthetic endpoint drafts for a catalog category
pub fn synthetic_endpoints(category: &str) -> Vec<EndpointDraft> {
    let family = SyntheticCategory::classify(category);
    tracing::debug!(category, ?family, "using synthetic endpoints");

    match family {
        SyntheticCategory::Weather => vec![
            EndpointDraft::new(HttpMethod::Get, "/weather/current")
                .named("getCurrentWeather")
                .described("Get current weather conditions for a location")
                .with_parameter(city())
                .with_parameter(
                    query("units", ParamType::String)
                        .described("Units of measurement")
                        .with_example(json!("metric")),
                ),
            EndpointDraft::new(HttpMethod::Get, "/weather/forecast")
                .named("getForecast")
                .described("Get the weather forecast for a location")
                .with_parameter(city())
                .with_parameter({
                    let mut days = query("days", ParamType::Number)
                        .described("Number of days to forecast")
                        .with_example(json!(5));
                    days.validation = Some(ParameterValidation {
                        min: Some(1.0),
                        max: Some(14.0),
                        ..ParameterValidation::default()
                    });
                    days
                }),
        ],
        SyntheticCategory::Finance => vec![
            EndpointDraft::new(HttpMethod::Get, "/stocks/:symbol")
                .named("getStockPrice")
                .described("Get the latest price for a stock symbol")
                .with_parameter(
                    Parameter::new("symbol", ParamType::String, ParameterLocation::Path)
                        .described("Ticker symbol")
                        .with_example(json!("AAPL")),
                ),
            EndpointDraft::new(HttpMethod::Get, "/exchange-rates")
                .named("getExchangeRates")
                .described("Get currency exchange rates")
                .with_parameter(
                    query("base", ParamType::String)
                        .described("Base currency code")
                        .with_example(json!("USD")),
                ),
        ],
        SyntheticCategory::Social => vec![
            EndpointDraft::new(HttpMethod::Get, "/users/:username")
                .named("getUserProfile")
                .described("Get a user profile")
                .with_parameter(username()),
            EndpointDraft::new(HttpMethod::Get, "/users/:username/posts")
                .named("getUserPosts")
                .described("List posts published by a user")
                .with_parameter(username())
                .with_parameter(
                    query("limit", ParamType::Number)
                        .described("Maximum number of posts")
                        .with_example(json!(10)),
                ),
        ],
        SyntheticCategory::News => vec![
            EndpointDraft::new(HttpMethod::Get, "/headlines")
                .named("getTopHeadlines")
                .described("Get top headlines")
                .with_parameter(
                    query("country", ParamType::String)
                        .described("Two-letter country code")
                        .with_example(json!("us")),
                ),
            EndpointDraft::new(HttpMethod::Get, "/articles/search")
                .named("searchArticles")
                .described("Search news articles")
                .with_parameter(
                    query("q", ParamType::String)
                        .required(true)
                        .described("Search keywords")
                        .with_example(json!("technology")),
                ),
        ],
        SyntheticCategory::Generic => vec![
            EndpointDraft::new(HttpMethod::Get, "/api/data")
                .named("getData")
                .described("Fetch data from the API"),
        ],
    }
}

fn query(name: &str, param_type: ParamType) -> Parameter {
    Parameter::new(name, param_type, ParameterLocation::Query)
}

fn city() -> Parameter {
    query("city", ParamType::String)
        .required(true)
        .described("City name")
        .with_example(json!("London"))
}

fn username() -> Parameter {
    Parameter::new("username", ParamType::String, ParameterLocation::Path)
        .described("Account handle")
        .with_example(json!("octocat"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(category: &str) -> Vec<String> {
        synthetic_endpoints(category)
            .into_iter()
            .filter_map(|d| d.operation_id)
            .collect()
    }

    #[test]
    fn test_category_families() {
        assert_eq!(names("weather"), vec!["getCurrentWeather", "getForecast"]);
        assert_eq!(names("Finance"), vec!["getStockPrice", "getExchangeRates"]);
        assert_eq!(names("social"), vec!["getUserProfile", "getUserPosts"]);
        assert_eq!(names("news"), vec!["getTopHeadlines", "searchArticles"]);
        assert_eq!(names("entertainment"), vec!["getData"]);
        assert_eq!(names(""), vec!["getData"]);
    }

    #[test]
    fn test_substring_matching() {
        assert_eq!(SyntheticCategory::classify("Weather & Climate"), SyntheticCategory::Weather);
        assert_eq!(SyntheticCategory::classify("financial"), SyntheticCategory::Finance);
        assert_eq!(SyntheticCategory::classify("social-media"), SyntheticCategory::Social);
    }

    #[test]
    fn test_generic_endpoint_shape() {
        let drafts = synthetic_endpoints("misc");
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].method, HttpMethod::Get);
        assert_eq!(drafts[0].path, "/api/data");
        assert!(drafts[0].parameters.is_empty());
    }

    #[test]
    fn test_finance_endpoints_are_gets() {
        let drafts = synthetic_endpoints("finance");
        assert!(drafts.iter().all(|d| d.method == HttpMethod::Get));
        assert_eq!(drafts[0].parameters[0].location, ParameterLocation::Path);
        assert!(drafts[0].parameters[0].required);
    }
}
