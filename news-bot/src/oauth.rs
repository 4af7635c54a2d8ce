//! OAuth 1.0a request signing (HMAC-SHA1) for user-context API calls.

use crate::config::XCredentials;
use crate::types::Result;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use ring::hmac;
use url::Url;
use uuid::Uuid;

/// RFC 3986 percent-encoding: everything but unreserved characters is escaped.
pub fn percent_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

/// `METHOD&encoded-base-url&encoded-sorted-params`
pub fn signature_base_string(method: &str, base_url: &str, params: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .collect();
    encoded.sort();

    let param_string = encoded
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_uppercase(),
        percent_encode(base_url),
        percent_encode(&param_string)
    )
}

fn sign(base_string: &str, consumer_secret: &str, token_secret: &str) -> String {
    let key_material = format!(
        "{}&{}",
        percent_encode(consumer_secret),
        percent_encode(token_secret)
    );
    let key = hmac::Key::new(hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY, key_material.as_bytes());
    STANDARD.encode(hmac::sign(&key, base_string.as_bytes()).as_ref())
}

pub struct OAuthSigner {
    credentials: XCredentials,
}

impl OAuthSigner {
    pub fn new(credentials: XCredentials) -> Self {
        Self { credentials }
    }

    /// `Authorization` header value for one request. JSON bodies are not
    /// part of the signature; query parameters on `url` are.
    pub fn authorization_header(&self, method: &str, url: &str) -> Result<String> {
        let nonce = Uuid::new_v4().simple().to_string();
        let timestamp = Utc::now().timestamp().to_string();
        self.header_with(method, url, &nonce, &timestamp)
    }

    fn header_with(&self, method: &str, url: &str, nonce: &str, timestamp: &str) -> Result<String> {
        let parsed = Url::parse(url)?;
        let mut base = parsed.clone();
        base.set_query(None);
        base.set_fragment(None);

        let oauth_params: Vec<(String, String)> = vec![
            ("oauth_consumer_key".into(), self.credentials.api_key.clone()),
            ("oauth_nonce".into(), nonce.to_string()),
            ("oauth_signature_method".into(), "HMAC-SHA1".into()),
            ("oauth_timestamp".into(), timestamp.to_string()),
            ("oauth_token".into(), self.credentials.access_token.clone()),
            ("oauth_version".into(), "1.0".into()),
        ];

        let mut all_params = oauth_params.clone();
        all_params.extend(
            parsed
                .query_pairs()
                .map(|(k, v)| (k.into_owned(), v.into_owned())),
        );

        let base_string = signature_base_string(method, base.as_str(), &all_params);
        let signature = sign(
            &base_string,
            &self.credentials.api_secret,
            &self.credentials.access_token_secret,
        );

        let mut header_params = oauth_params;
        header_params.push(("oauth_signature".into(), signature));
        header_params.sort();

        let fields = header_params
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
            .collect::<Vec<_>>()
            .join(", ");
        Ok(format!("OAuth {}", fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds() -> XCredentials {
        XCredentials {
            api_key: "key".into(),
            api_secret: "secret".into(),
            access_token: "token".into(),
            access_token_secret: "token-secret".into(),
        }
    }

    #[test]
    fn percent_encoding_follows_rfc3986() {
        assert_eq!(percent_encode("Ladies + Gentlemen"), "Ladies%20%2B%20Gentlemen");
        assert_eq!(percent_encode("An encoded string!"), "An%20encoded%20string%21");
        assert_eq!(percent_encode("Dogs, Cats & Mice"), "Dogs%2C%20Cats%20%26%20Mice");
        assert_eq!(percent_encode("☃"), "%E2%98%83");
        assert_eq!(percent_encode("a-b.c_d~e"), "a-b.c_d~e");
    }

    #[test]
    fn base_string_sorts_and_encodes() {
        let params = vec![
            ("status".to_string(), "Hello Ladies!".to_string()),
            ("include_entities".to_string(), "true".to_string()),
        ];
        assert_eq!(
            signature_base_string("post", "https://api.x.com/2/tweets", &params),
            "POST&https%3A%2F%2Fapi.x.com%2F2%2Ftweets&include_entities%3Dtrue%26status%3DHello%2520Ladies%2521"
        );
    }

    #[test]
    fn header_is_deterministic_for_fixed_nonce() {
        let signer = OAuthSigner::new(creds());
        let a = signer
            .header_with("POST", "https://api.x.com/2/tweets", "abc", "1700000000")
            .unwrap();
        let b = signer
            .header_with("POST", "https://api.x.com/2/tweets", "abc", "1700000000")
            .unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with("OAuth oauth_consumer_key=\"key\", oauth_nonce=\"abc\""));
        assert!(a.contains("oauth_signature_method=\"HMAC-SHA1\""));
        assert!(a.contains("oauth_token=\"token\""));
        assert!(a.contains("oauth_signature=\""));

        let c = signer
            .header_with("POST", "https://api.x.com/2/tweets", "abd", "1700000000")
            .unwrap();
        assert_ne!(a, c);
    }
}
