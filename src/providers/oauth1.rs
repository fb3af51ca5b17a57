//! OAuth 1.0a request signing (RFC 5849, HMAC-SHA1).

use base64::{Engine as _, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use sha1::Sha1;
use thiserror::Error;
use url::Url;

type HmacSha1 = Hmac<Sha1>;

#[derive(Debug, Error)]
#[error("failed to initialize HMAC-SHA1 signer")]
pub struct SigningError;

/// Credentials and protocol parameters for one signed request.
#[derive(Debug, Clone, Default)]
pub struct OAuth1Params<'a> {
    pub consumer_key: &'a str,
    pub consumer_secret: &'a str,
    pub token: Option<&'a str>,
    pub token_secret: Option<&'a str>,
    pub callback: Option<&'a str>,
    pub verifier: Option<&'a str>,
}

/// RFC 5849 section 3.6: everything but unreserved characters is encoded.
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

pub fn percent_encode(value: &str) -> String {
    utf8_percent_encode(value, OAUTH_ENCODE_SET).to_string()
}

fn base_string_uri(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    let port = url.port().map(|p| format!(":{p}")).unwrap_or_default();
    format!("{}://{}{}{}", url.scheme(), host, port, url.path())
}

/// Signature base string from the method, the URL (including its query) and the
/// `oauth_*` protocol parameters.
pub fn signature_base_string(method: &str, url: &Url, oauth_params: &[(String, String)]) -> String {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (percent_encode(&k), percent_encode(&v)))
        .chain(
            oauth_params
                .iter()
                .map(|(k, v)| (percent_encode(k), percent_encode(v))),
        )
        .collect();
    params.sort();

    let normalized = params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        percent_encode(&base_string_uri(url)),
        percent_encode(&normalized)
    )
}

pub fn sign(
    base_string: &str,
    consumer_secret: &str,
    token_secret: Option<&str>,
) -> Result<String, SigningError> {
    let key = format!(
        "{}&{}",
        percent_encode(consumer_secret),
        percent_encode(token_secret.unwrap_or_default())
    );
    let mut mac = HmacSha1::new_from_slice(key.as_bytes()).map_err(|_| SigningError)?;
    mac.update(base_string.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// `Authorization` header value for a signed request.
pub fn authorization_header(
    method: &str,
    url: &Url,
    params: &OAuth1Params<'_>,
    nonce: &str,
    timestamp: i64,
) -> Result<String, SigningError> {
    let mut oauth_params: Vec<(String, String)> = vec![
        ("oauth_consumer_key".into(), params.consumer_key.into()),
        ("oauth_nonce".into(), nonce.into()),
        ("oauth_signature_method".into(), "HMAC-SHA1".into()),
        ("oauth_timestamp".into(), timestamp.to_string()),
    ];
    if let Some(token) = params.token {
        oauth_params.push(("oauth_token".into(), token.into()));
    }
    if let Some(callback) = params.callback {
        oauth_params.push(("oauth_callback".into(), callback.into()));
    }
    if let Some(verifier) = params.verifier {
        oauth_params.push(("oauth_verifier".into(), verifier.into()));
    }

    let base = signature_base_string(method, url, &oauth_params);
    let signature = sign(&base, params.consumer_secret, params.token_secret)?;
    oauth_params.push(("oauth_signature".into(), signature));
    oauth_params.sort();

    let fields = oauth_params
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, percent_encode(v)))
        .collect::<Vec<_>>()
        .join(", ");
    Ok(format!("OAuth {fields}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rfc_params() -> Vec<(String, String)> {
        vec![
            ("oauth_consumer_key".into(), "dpf43f3p2l4k3l03".into()),
            ("oauth_token".into(), "nnch734d00sl2jdk".into()),
            ("oauth_signature_method".into(), "HMAC-SHA1".into()),
            ("oauth_timestamp".into(), "137131202".into()),
            ("oauth_nonce".into(), "chapoH".into()),
        ]
    }

    #[test]
    fn percent_encoding_keeps_only_unreserved() {
        assert_eq!(percent_encode("abc-._~XYZ019"), "abc-._~XYZ019");
        assert_eq!(percent_encode("a b&c=d/é"), "a%20b%26c%3Dd%2F%C3%A9");
    }

    #[test]
    fn base_string_sorts_query_and_protocol_params() {
        let url = Url::parse("http://Photos.Example.net:80/photos?size=original&file=vacation.jpg")
            .unwrap();
        assert_eq!(
            signature_base_string("get", &url, &rfc_params()),
            "GET&http%3A%2F%2Fphotos.example.net%2Fphotos&file%3Dvacation.jpg%26\
             oauth_consumer_key%3Ddpf43f3p2l4k3l03%26oauth_nonce%3DchapoH%26\
             oauth_signature_method%3DHMAC-SHA1%26oauth_timestamp%3D137131202%26\
             oauth_token%3Dnnch734d00sl2jdk%26size%3Doriginal"
        );
    }

    #[test]
    fn signature_uses_both_secrets_as_key() {
        let base = "GET&http%3A%2F%2Fexample.com%2F&a%3D1";
        let mut mac = HmacSha1::new_from_slice(b"consumer&token").unwrap();
        mac.update(base.as_bytes());
        let expected = STANDARD.encode(mac.finalize().into_bytes());

        assert_eq!(sign(base, "consumer", Some("token")).unwrap(), expected);
        assert_ne!(sign(base, "consumer", None).unwrap(), expected);
    }

    #[test]
    fn header_carries_callback_and_signature() {
        let url = Url::parse("https://www.zotero.org/oauth/request").unwrap();
        let header = authorization_header(
            "POST",
            &url,
            &OAuth1Params {
                consumer_key: "key",
                consumer_secret: "secret",
                callback: Some("http://localhost:5000/oauth/callback/zotero/"),
                ..Default::default()
            },
            "nonce123",
            1_700_000_000,
        )
        .unwrap();

        assert!(header.starts_with("OAuth "));
        assert!(header.contains(
            "oauth_callback=\"http%3A%2F%2Flocalhost%3A5000%2Foauth%2Fcallback%2Fzotero%2F\""
        ));
        assert!(header.contains("oauth_signature=\""));
        assert!(header.contains("oauth_nonce=\"nonce123\""));
        assert!(!header.contains("oauth_token="));
    }
}
