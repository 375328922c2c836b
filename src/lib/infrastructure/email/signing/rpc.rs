//! Signature for RPC style APIs (Aliyun DirectMail, `SignatureVersion=1.0`).
//!
//! The parameters are sorted by key, percent-encoded per RFC 3986 and joined
//! into a canonical query string. That string is signed with HMAC-SHA1 keyed
//! by the access key secret followed by `&`.

use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha1::Sha1;

use super::keyed;

type HmacSha1 = Hmac<Sha1>;

/// The value of the `SignatureMethod` parameter
pub const SIGNATURE_METHOD: &str = "HMAC-SHA1";

/// The value of the `SignatureVersion` parameter
pub const SIGNATURE_VERSION: &str = "1.0";

/// Percent-encodes `value`, leaving only `A-Z a-z 0-9 - _ . ~` untouched.
pub fn percent_encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Joins the sorted, encoded parameters as `key=value` pairs.
pub fn canonicalize(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{}={}", percent_encode(key), percent_encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// The string the signature is computed over.
pub fn string_to_sign(method: &str, params: &BTreeMap<String, String>) -> String {
    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        percent_encode("/"),
        percent_encode(&canonicalize(params))
    )
}

/// Signs `params` for a request made with `method`.
///
/// `params` must not contain the `Signature` parameter itself.
pub fn sign(method: &str, params: &BTreeMap<String, String>, secret: &str) -> String {
    let mut mac: HmacSha1 = keyed(format!("{secret}&").as_bytes());

    mac.update(string_to_sign(method, params).as_bytes());

    STANDARD.encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn documented_params() -> BTreeMap<String, String> {
        [
            ("Timestamp", "2016-02-23T12:46:24Z"),
            ("Format", "XML"),
            ("AccessKeyId", "testid"),
            ("Action", "DescribeDedicatedHosts"),
            ("SignatureMethod", "HMAC-SHA1"),
            ("SignatureNonce", "3ee8c1b8-83d3-44af-a94f-4e0ad82fd6cf"),
            ("Version", "2014-05-26"),
            ("SignatureVersion", "1.0"),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
    }

    #[test]
    fn test_percent_encoding_follows_rfc_3986() {
        assert_eq!(percent_encode("a b*c~d"), "a%20b%2Ac~d");
        assert_eq!(
            percent_encode("2016-02-23T12:46:24Z"),
            "2016-02-23T12%3A46%3A24Z"
        );
        assert_eq!(percent_encode("a@x.com,b@y.com"), "a%40x.com%2Cb%40y.com");
        assert_eq!(percent_encode("你好"), "%E4%BD%A0%E5%A5%BD");
    }

    #[test]
    fn test_canonical_query_is_sorted() {
        assert_eq!(
            canonicalize(&documented_params()),
            "AccessKeyId=testid&Action=DescribeDedicatedHosts&Format=XML&SignatureMethod=HMAC-SHA1&SignatureNonce=3ee8c1b8-83d3-44af-a94f-4e0ad82fd6cf&SignatureVersion=1.0&Timestamp=2016-02-23T12%3A46%3A24Z&Version=2014-05-26"
        );
    }

    #[test]
    fn test_string_to_sign() {
        assert_eq!(
            string_to_sign("get", &documented_params()),
            "GET&%2F&AccessKeyId%3Dtestid%26Action%3DDescribeDedicatedHosts%26Format%3DXML%26SignatureMethod%3DHMAC-SHA1%26SignatureNonce%3D3ee8c1b8-83d3-44af-a94f-4e0ad82fd6cf%26SignatureVersion%3D1.0%26Timestamp%3D2016-02-23T12%253A46%253A24Z%26Version%3D2014-05-26"
        );
    }

    #[test]
    fn test_signature_golden_value() {
        assert_eq!(
            sign("GET", &documented_params(), "testsecret"),
            "5ACtZHtjqvBbWa1PFQm1U5JYiQI="
        );
    }

    #[test]
    fn test_signature_matches_published_describe_regions_example() {
        let mut params = documented_params();
        params.insert("Action".to_string(), "DescribeRegions".to_string());

        assert_eq!(
            canonicalize(&params),
            "AccessKeyId=testid&Action=DescribeRegions&Format=XML&SignatureMethod=HMAC-SHA1&SignatureNonce=3ee8c1b8-83d3-44af-a94f-4e0ad82fd6cf&SignatureVersion=1.0&Timestamp=2016-02-23T12%3A46%3A24Z&Version=2014-05-26"
        );
        assert_eq!(
            sign("GET", &params, "testsecret"),
            "OLeaidS1JvxuMvnyHOwuJ+uX5qY="
        );
    }

    #[test]
    fn test_signature_changes_with_every_input() {
        let params = documented_params();
        let signature = sign("POST", &params, "secret");

        assert_eq!(signature, sign("POST", &params.clone(), "secret"));
        assert_ne!(signature, sign("GET", &params, "secret"));
        assert_ne!(signature, sign("POST", &params, "other-secret"));

        let mut changed = params;
        changed.insert("ToAddress".to_string(), "a@x.com".to_string());

        assert_ne!(signature, sign("POST", &changed, "secret"));
    }
}
