//! Upstream credentials for harness calls, applied the way the generated
//! server applies them: API keys, bearer and basic headers, OAuth 2.0 client
//! credentials, AWS Signature Version 4, digest challenges and client
//! certificates.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use md5::Md5;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Certificate, Client, Identity, Request};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::conversion::assembler::env_var_name;
use crate::core::{Error, Result};
use crate::domain::auth::CUSTOM_AUTH_PLACEHOLDER;
use crate::domain::{ApiKeyLocation, Authentication, OAuth2Flow, ServerConfig};

type HmacSha256 = Hmac<Sha256>;

const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);
const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 3600;
const DIGEST_NONCE_COUNT: &str = "00000001";

/// Stored credential first, then `{PREFIX}_{SUFFIX}` from the environment
fn credential(config: &ServerConfig, stored: &Option<String>, suffix: &str) -> Option<String> {
    stored
        .clone()
        .or_else(|| std::env::var(env_var_name(&config.env_prefix, suffix)).ok())
        .filter(|value| !value.is_empty())
}

#[derive(Debug, Deserialize)]
struct TokenGrant {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Client-credentials tokens keyed by token URL and client id, reused until
/// a minute before they expire
#[derive(Debug, Default)]
pub struct TokenCache {
    tokens: Mutex<HashMap<String, CachedToken>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    async fn client_credentials(
        &self,
        client: &Client,
        token_url: &str,
        client_id: &str,
        client_secret: &str,
        scopes: &[String],
    ) -> Result<String> {
        let key = format!("{token_url} {client_id}");
        let mut tokens = self.tokens.lock().await;
        if let Some(cached) = tokens.get(&key).filter(|t| t.expires_at > Instant::now()) {
            return Ok(cached.value.clone());
        }

        let mut form = vec![
            ("grant_type", "client_credentials".to_string()),
            ("client_id", client_id.to_string()),
            ("client_secret", client_secret.to_string()),
        ];
        if !scopes.is_empty() {
            form.push(("scope", scopes.join(" ")));
        }

        tracing::debug!(token_url, "requesting client credentials token");
        let response = client.post(token_url).form(&form).send().await?;
        if !response.status().is_success() {
            return Err(Error::fetch(format!(
                "token request to {token_url} failed with HTTP {}",
                response.status()
            )));
        }
        let grant: TokenGrant = response
            .json()
            .await
            .map_err(|e| Error::parse(format!("token response from {token_url}: {e}")))?;

        let lifetime = Duration::from_secs(grant.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS));
        let expires_at = Instant::now() + lifetime.saturating_sub(TOKEN_EXPIRY_MARGIN);
        tokens.insert(
            key,
            CachedToken {
                value: grant.access_token.clone(),
                expires_at,
            },
        );
        Ok(grant.access_token)
    }
}

/// A dedicated client presenting the configured client certificate.
///
/// Returns `None` for every other scheme. Mutual TLS without a certificate
/// and key is an error, since the upstream would refuse the handshake.
pub async fn client_certificate_client(
    config: &ServerConfig,
    timeout: Duration,
) -> Result<Option<Client>> {
    let Authentication::MutualTls {
        cert_path,
        key_path,
        ca_path,
    } = &config.authentication
    else {
        return Ok(None);
    };

    let (Some(cert), Some(key)) = (
        credential(config, cert_path, "CLIENT_CERT"),
        credential(config, key_path, "CLIENT_KEY"),
    ) else {
        return Err(Error::validation(format!(
            "unsupported auth: mutual-tls needs a client certificate and key ({} and {})",
            env_var_name(&config.env_prefix, "CLIENT_CERT"),
            env_var_name(&config.env_prefix, "CLIENT_KEY"),
        )));
    };

    let mut pem = read_pem(&cert).await?;
    pem.push(b'\n');
    pem.extend(read_pem(&key).await?);
    let identity = Identity::from_pem(&pem)
        .map_err(|e| Error::validation(format!("invalid client certificate {cert}: {e}")))?;

    let mut builder = Client::builder().timeout(timeout).identity(identity);
    if let Some(ca) = credential(config, ca_path, "CA_CERT") {
        let root = Certificate::from_pem(&read_pem(&ca).await?)
            .map_err(|e| Error::validation(format!("invalid CA certificate {ca}: {e}")))?;
        builder = builder.add_root_certificate(root);
    }
    let client = builder
        .build()
        .map_err(|e| Error::fetch(format!("failed to create HTTP client: {e}")))?;
    Ok(Some(client))
}

async fn read_pem(path: &str) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .map_err(|e| Error::validation(format!("cannot read {path}: {e}")))
}

/// Attach the configured credentials to `request`.
///
/// Digest answers need the upstream challenge, so they are added after the
/// first response (see [`digest_authorization`]). Client certificates live
/// on the client instead of the request.
pub async fn apply(
    config: &ServerConfig,
    client: &Client,
    tokens: &TokenCache,
    request: &mut Request,
) -> Result<()> {
    match &config.authentication {
        Authentication::None | Authentication::Digest { .. } | Authentication::MutualTls { .. } => {}
        Authentication::ApiKey {
            location,
            name,
            value,
        } => {
            if let Some(key) = credential(config, value, "API_KEY") {
                match location {
                    ApiKeyLocation::Header => set_header(request.headers_mut(), name, &key)?,
                    ApiKeyLocation::Query => {
                        request.url_mut().query_pairs_mut().append_pair(name, &key);
                    }
                }
            }
        }
        Authentication::Bearer { token } => {
            if let Some(token) = credential(config, token, "BEARER_TOKEN") {
                set_header(request.headers_mut(), AUTHORIZATION.as_str(), &format!("Bearer {token}"))?;
            }
        }
        Authentication::Basic { username, password } => {
            if let Some(username) = credential(config, username, "USERNAME") {
                let password = credential(config, password, "PASSWORD").unwrap_or_default();
                let encoded = STANDARD.encode(format!("{username}:{password}"));
                set_header(request.headers_mut(), AUTHORIZATION.as_str(), &format!("Basic {encoded}"))?;
            }
        }
        Authentication::OAuth2 {
            token_url,
            scopes,
            flow,
            client_id,
            client_secret,
            access_token,
            ..
        } => {
            let mut token = credential(config, access_token, "ACCESS_TOKEN");
            if token.is_none() && *flow == OAuth2Flow::ClientCredentials {
                if let (Some(url), Some(id), Some(secret)) = (
                    token_url.as_deref(),
                    credential(config, client_id, "CLIENT_ID"),
                    credential(config, client_secret, "CLIENT_SECRET"),
                ) {
                    token = Some(tokens.client_credentials(client, url, &id, &secret, scopes).await?);
                }
            }
            if let Some(token) = token {
                set_header(request.headers_mut(), AUTHORIZATION.as_str(), &format!("Bearer {token}"))?;
            }
        }
        Authentication::AwsSignature {
            region,
            service,
            access_key_id,
            secret_access_key,
        } => {
            if let (Some(key_id), Some(secret)) = (
                credential(config, access_key_id, "AWS_ACCESS_KEY_ID"),
                credential(config, secret_access_key, "AWS_SECRET_ACCESS_KEY"),
            ) {
                sign_aws_v4(request, region, service, &key_id, &secret, Utc::now())?;
            }
        }
        Authentication::Custom {
            headers,
            pre_request_script,
        } => {
            let script = pre_request_script.as_deref().map(str::trim).unwrap_or_default();
            if !script.is_empty() && script != CUSTOM_AUTH_PLACEHOLDER {
                return Err(Error::validation(
                    "unsupported auth: custom pre-request scripts only run inside the generated server",
                ));
            }
            for (name, value) in headers {
                set_header(request.headers_mut(), name, value)?;
            }
        }
    }
    Ok(())
}

fn set_header(headers: &mut HeaderMap, name: &str, value: &str) -> Result<()> {
    let name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| Error::validation(format!("invalid header name '{name}': {e}")))?;
    let value = HeaderValue::from_str(value)
        .map_err(|e| Error::validation(format!("invalid value for header '{name}': {e}")))?;
    headers.insert(name, value);
    Ok(())
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn hmac_sha256(key: &[u8], data: &str) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| Error::validation(format!("invalid signing key: {e}")))?;
    mac.update(data.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

/// `kSigning` from the secret key, date, region and service
fn aws_signing_key(secret: &str, date_stamp: &str, region: &str, service: &str) -> Result<Vec<u8>> {
    let date = hmac_sha256(format!("AWS4{secret}").as_bytes(), date_stamp)?;
    let region = hmac_sha256(&date, region)?;
    let service = hmac_sha256(&region, service)?;
    hmac_sha256(&service, "aws4_request")
}

/// RFC 3986 encoding with only unreserved characters left as is
fn aws_uri_encode(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~') {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    encoded
}

/// Sign `request` with AWS Signature Version 4, covering every header it carries
fn sign_aws_v4(
    request: &mut Request,
    region: &str,
    service: &str,
    access_key_id: &str,
    secret_access_key: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let date_stamp = now.format("%Y%m%d").to_string();
    let payload = request.body().and_then(|b| b.as_bytes()).unwrap_or_default();
    let payload_hash = sha256_hex(payload);

    set_header(request.headers_mut(), "x-amz-date", &amz_date)?;
    set_header(request.headers_mut(), "x-amz-content-sha256", &payload_hash)?;

    let url = request.url();
    let host = match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        (None, _) => return Err(Error::validation(format!("cannot sign {url}: no host"))),
    };

    let mut signed: Vec<(String, String)> = vec![("host".to_string(), host)];
    for (name, value) in request.headers() {
        let value = value
            .to_str()
            .map_err(|_| Error::validation(format!("header '{name}' is not printable")))?;
        signed.push((name.as_str().to_lowercase(), value.trim().to_string()));
    }
    signed.sort();
    signed.dedup_by(|later, earlier| {
        if later.0 == earlier.0 {
            earlier.1 = format!("{},{}", earlier.1, later.1);
            true
        } else {
            false
        }
    });

    let canonical_headers: String = signed
        .iter()
        .map(|(name, value)| format!("{name}:{value}\n"))
        .collect();
    let signed_headers = signed
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(";");

    let mut query: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (aws_uri_encode(&k), aws_uri_encode(&v)))
        .collect();
    query.sort();
    let canonical_query = query
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let canonical_request = [
        request.method().as_str(),
        url.path(),
        &canonical_query,
        &canonical_headers,
        &signed_headers,
        &payload_hash,
    ]
    .join("\n");

    let scope = format!("{date_stamp}/{region}/{service}/aws4_request");
    let string_to_sign = [
        "AWS4-HMAC-SHA256",
        &amz_date,
        &scope,
        &sha256_hex(canonical_request.as_bytes()),
    ]
    .join("\n");
    let signing_key = aws_signing_key(secret_access_key, &date_stamp, region, service)?;
    let signature = hex::encode(hmac_sha256(&signing_key, &string_to_sign)?);

    let authorization = format!(
        "AWS4-HMAC-SHA256 Credential={access_key_id}/{scope}, SignedHeaders={signed_headers}, Signature={signature}"
    );
    set_header(request.headers_mut(), AUTHORIZATION.as_str(), &authorization)
}

/// Username and password for digest retries, when the scheme is digest
pub fn digest_credentials(config: &ServerConfig) -> Option<(String, String)> {
    let Authentication::Digest {
        username, password, ..
    } = &config.authentication
    else {
        return None;
    };
    let username = credential(config, username, "USERNAME")?;
    Some((username, credential(config, password, "PASSWORD").unwrap_or_default()))
}

/// `key=value` / `key="value"` pairs of a `WWW-Authenticate: Digest ...` challenge
fn parse_challenge(header: &str) -> Option<HashMap<String, String>> {
    let rest = header.trim().strip_prefix("Digest")?.trim_start();
    let mut params = HashMap::new();
    let mut chars = rest.chars().peekable();
    loop {
        while chars.peek().is_some_and(|c| *c == ',' || c.is_whitespace()) {
            chars.next();
        }
        let key: String = chars.by_ref().take_while(|c| *c != '=').collect();
        if key.is_empty() {
            break;
        }
        let value = if chars.peek() == Some(&'"') {
            chars.next();
            let mut value = String::new();
            while let Some(c) = chars.next() {
                match c {
                    '\\' => value.extend(chars.next()),
                    '"' => break,
                    other => value.push(other),
                }
            }
            value
        } else {
            chars.by_ref().take_while(|c| *c != ',').collect::<String>().trim().to_string()
        };
        params.insert(key.trim().to_lowercase(), value);
    }
    Some(params)
}

fn digest_hash(algorithm: &str, data: &str) -> Result<String> {
    match algorithm.trim_end_matches("-sess").to_uppercase().as_str() {
        "MD5" => Ok(hex::encode(Md5::digest(data.as_bytes()))),
        "SHA-256" => Ok(sha256_hex(data.as_bytes())),
        other => Err(Error::validation(format!(
            "unsupported auth: digest algorithm {other}"
        ))),
    }
}

/// Answer a digest challenge (RFC 7616, MD5 and SHA-256, `auth` quality of protection)
pub fn digest_authorization(
    challenge: &str,
    username: &str,
    password: &str,
    method: &str,
    uri: &str,
    cnonce: &str,
) -> Result<String> {
    let params = parse_challenge(challenge)
        .ok_or_else(|| Error::validation("upstream challenge is not a digest challenge"))?;
    let realm = params.get("realm").map(String::as_str).unwrap_or_default();
    let nonce = params
        .get("nonce")
        .ok_or_else(|| Error::validation("digest challenge carries no nonce"))?;
    let algorithm = params.get("algorithm").map(String::as_str).unwrap_or("MD5");
    let qop = params
        .get("qop")
        .filter(|q| q.split(',').any(|option| option.trim() == "auth"))
        .map(|_| "auth");

    let mut ha1 = digest_hash(algorithm, &format!("{username}:{realm}:{password}"))?;
    if algorithm.to_lowercase().ends_with("-sess") {
        ha1 = digest_hash(algorithm, &format!("{ha1}:{nonce}:{cnonce}"))?;
    }
    let ha2 = digest_hash(algorithm, &format!("{method}:{uri}"))?;
    let response = match qop {
        Some(qop) => digest_hash(
            algorithm,
            &format!("{ha1}:{nonce}:{DIGEST_NONCE_COUNT}:{cnonce}:{qop}:{ha2}"),
        )?,
        None => digest_hash(algorithm, &format!("{ha1}:{nonce}:{ha2}"))?,
    };

    let mut header = format!(
        r#"Digest username="{username}", realm="{realm}", nonce="{nonce}", uri="{uri}", algorithm={algorithm}, response="{response}""#
    );
    if let Some(qop) = qop {
        header.push_str(&format!(r#", qop={qop}, nc={DIGEST_NONCE_COUNT}, cnonce="{cnonce}""#));
    }
    if let Some(opaque) = params.get("opaque") {
        header.push_str(&format!(r#", opaque="{opaque}""#));
    }
    Ok(header)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use reqwest::Method;

    #[test]
    fn test_digest_response_matches_rfc_2617_example() {
        let challenge = r#"Digest realm="testrealm@host.com", qop="auth,auth-int", nonce="dcd98b7102dd2f0e8b11d0f600bfb0c093", opaque="5ccc069c403ebaf9f0171e9517f40e41""#;
        let header = digest_authorization(
            challenge,
            "Mufasa",
            "Circle Of Life",
            "GET",
            "/dir/index.html",
            "0a4f113b",
        )
        .unwrap();

        assert!(header.contains(r#"response="6629fae49393a05397450978507c4ef1""#));
        assert!(header.contains("qop=auth, nc=00000001"));
        assert!(header.contains(r#"opaque="5ccc069c403ebaf9f0171e9517f40e41""#));
    }

    #[test]
    fn test_digest_rejects_unknown_algorithm() {
        let err = digest_authorization(
            r#"Digest realm="r", nonce="n", algorithm=SHA-512-256"#,
            "u",
            "p",
            "GET",
            "/",
            "c",
        )
        .unwrap_err();
        assert!(err.to_string().contains("unsupported auth"));
    }

    #[test]
    fn test_aws_signing_key_derivation() {
        let key = aws_signing_key(
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            "20120215",
            "us-east-1",
            "iam",
        )
        .unwrap();
        assert_eq!(
            hex::encode(key),
            "f4780e2d9f65fa895f9c67b32ce1baf0b0d8a43505a000a1a9e090d414db404d"
        );
    }

    #[test]
    fn test_aws_signature_covers_headers_and_payload() {
        let url = reqwest::Url::parse("https://api.example.com/items?b=2&a=one two").unwrap();
        let mut request = Request::new(Method::GET, url);
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        sign_aws_v4(&mut request, "us-east-1", "execute-api", "AKID", "secret", now).unwrap();

        let headers = request.headers();
        assert_eq!(headers["x-amz-date"], "20240102T030405Z");
        assert_eq!(
            headers["x-amz-content-sha256"],
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        let authorization = headers[AUTHORIZATION].to_str().unwrap();
        assert!(authorization.starts_with(
            "AWS4-HMAC-SHA256 Credential=AKID/20240102/us-east-1/execute-api/aws4_request, \
             SignedHeaders=host;x-amz-content-sha256;x-amz-date, Signature="
        ));
        let signature = authorization.rsplit('=').next().unwrap();
        assert_eq!(signature.len(), 64);

        let mut again = Request::new(Method::GET, request.url().clone());
        sign_aws_v4(&mut again, "us-east-1", "execute-api", "AKID", "secret", now).unwrap();
        assert_eq!(again.headers()[AUTHORIZATION], headers[AUTHORIZATION]);
    }

    #[test]
    fn test_aws_uri_encoding() {
        assert_eq!(aws_uri_encode("one two/~x"), "one%20two%2F~x");
    }

    #[tokio::test]
    async fn test_custom_script_is_reported_as_unsupported() {
        let mut config = ServerConfig::new("Test API", "https://api.example.com");
        config.authentication = Authentication::Custom {
            headers: Default::default(),
            pre_request_script: Some("request.headers['X-Sig'] = sign();".to_string()),
        };
        let url = reqwest::Url::parse("https://api.example.com/").unwrap();
        let mut request = Request::new(Method::GET, url);
        let err = apply(&config, &Client::new(), &TokenCache::new(), &mut request)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unsupported auth"));
    }
}
