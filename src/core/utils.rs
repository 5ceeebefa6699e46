//! String transformation utilities shared by the conversion and generation stages

/// Converts a string to snake_case.
///
/// Handles camelCase, PascalCase, kebab-case and space-separated input.
/// Characters that are neither alphanumeric nor a separator are dropped.
///
/// # Examples
/// ```
/// use mcpforge::core::utils::to_snake_case;
///
/// assert_eq!(to_snake_case("findPetsByStatus"), "find_pets_by_status");
/// assert_eq!(to_snake_case("find-pets-by-status"), "find_pets_by_status");
/// assert_eq!(to_snake_case("get HTTP Response"), "get_http_response");
/// ```
pub fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    let mut prev_is_lowercase = false;

    for ch in s.chars() {
        if ch.is_uppercase() {
            if prev_is_lowercase {
                result.push('_');
            }
            result.extend(ch.to_lowercase());
            prev_is_lowercase = false;
        } else if ch.is_alphanumeric() {
            result.push(ch);
            prev_is_lowercase = ch.is_lowercase() || ch.is_numeric();
        } else if is_separator(ch) {
            if !result.is_empty() && !result.ends_with('_') {
                result.push('_');
            }
            prev_is_lowercase = false;
        }
    }

    result.trim_matches('_').to_string()
}

fn is_separator(ch: char) -> bool {
    matches!(ch, '-' | '_' | ' ' | '/' | '.' | '\t' | '\n')
}

/// Converts a string to PascalCase.
///
/// # Examples
/// ```
/// use mcpforge::core::utils::to_proper_case;
///
/// assert_eq!(to_proper_case("find_pets_by_status"), "FindPetsByStatus");
/// assert_eq!(to_proper_case("http_response"), "HttpResponse");
/// ```
pub fn to_proper_case(s: &str) -> String {
    to_snake_case(s)
        .split('_')
        .filter(|s| !s.is_empty())
        .map(capitalize)
        .collect()
}

/// Converts a string to the tool-name casing: first token lowercase, every
/// following token capitalized, no separators.
///
/// # Examples
/// ```
/// use mcpforge::core::utils::to_camel_case;
///
/// assert_eq!(to_camel_case("Get current weather!"), "getCurrentWeather");
/// assert_eq!(to_camel_case("list-users"), "listUsers");
/// ```
pub fn to_camel_case(s: &str) -> String {
    let snake = to_snake_case(s);
    let mut tokens = snake.split('_').filter(|t| !t.is_empty());

    let Some(first) = tokens.next() else {
        return String::new();
    };

    let mut out = first.to_lowercase();
    for token in tokens {
        out.push_str(&capitalize(token));
    }
    out
}

/// Converts a string to SCREAMING_SNAKE_CASE, suitable for environment variable prefixes.
///
/// # Examples
/// ```
/// use mcpforge::core::utils::to_env_prefix;
///
/// assert_eq!(to_env_prefix("Open Weather Map"), "OPEN_WEATHER_MAP");
/// assert_eq!(to_env_prefix("github.com"), "GITHUB_COM");
/// ```
pub fn to_env_prefix(s: &str) -> String {
    to_snake_case(s).to_uppercase()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_snake_case() {
        assert_eq!(to_snake_case("findPetsByStatus"), "find_pets_by_status");
        assert_eq!(to_snake_case("FindPetsByStatus"), "find_pets_by_status");
        assert_eq!(to_snake_case("find-pets-by-status"), "find_pets_by_status");
        assert_eq!(to_snake_case("find_pets_by_status"), "find_pets_by_status");
        assert_eq!(to_snake_case("HTTPResponse"), "httpresponse");
        assert_eq!(to_snake_case("get HTTP Response"), "get_http_response");
        assert_eq!(to_snake_case("/users/{id}/posts"), "users_id_posts");
    }

    #[test]
    fn test_to_proper_case() {
        assert_eq!(to_proper_case("find_pets_by_status"), "FindPetsByStatus");
        assert_eq!(to_proper_case("findPetsByStatus"), "FindPetsByStatus");
        assert_eq!(to_proper_case("FIND_PETS_BY_STATUS"), "FindPetsByStatus");
    }

    #[test]
    fn test_to_camel_case() {
        assert_eq!(to_camel_case("find_pets_by_status"), "findPetsByStatus");
        assert_eq!(to_camel_case("FindPetsByStatus"), "findPetsByStatus");
        assert_eq!(to_camel_case("getPetById"), "getPetById");
        assert_eq!(to_camel_case("Get the current weather."), "getTheCurrentWeather");
        assert_eq!(to_camel_case("get weather2 data"), "getWeather2Data");
        assert_eq!(to_camel_case("!!!"), "");
    }

    #[test]
    fn test_to_env_prefix() {
        assert_eq!(to_env_prefix("weather"), "WEATHER");
        assert_eq!(to_env_prefix("OpenWeather"), "OPEN_WEATHER");
        assert_eq!(to_env_prefix("api-ninjas"), "API_NINJAS");
    }
}
