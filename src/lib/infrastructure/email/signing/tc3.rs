//! Tencent Cloud API 3.0 signature (`TC3-HMAC-SHA256`).
//!
//! Only `POST /` requests with a JSON body are signed, with `content-type`
//! and `host` as the signed headers.

use chrono::DateTime;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use super::keyed;

type HmacSha256 = Hmac<Sha256>;

/// The signature algorithm name
pub const ALGORITHM: &str = "TC3-HMAC-SHA256";

/// The content type every signed request is sent with
pub const CONTENT_TYPE: &str = "application/json; charset=utf-8";

const SIGNED_HEADERS: &str = "content-type;host";

/// The parts of a request that are covered by the signature
#[derive(Debug, Clone, Copy)]
pub struct Tc3Request<'a> {
    /// The API host, e.g. `ses.tencentcloudapi.com`
    pub host: &'a str,

    /// The service name, e.g. `ses`
    pub service: &'a str,

    /// The JSON request body
    pub payload: &'a str,

    /// Unix timestamp in seconds, sent as `X-TC-Timestamp`
    pub timestamp: i64,
}

impl Tc3Request<'_> {
    /// The UTC date of the timestamp, `YYYY-MM-DD`
    pub fn date(&self) -> String {
        DateTime::from_timestamp(self.timestamp, 0)
            .unwrap_or_default()
            .format("%Y-%m-%d")
            .to_string()
    }

    /// `{date}/{service}/tc3_request`
    pub fn credential_scope(&self) -> String {
        format!("{}/{}/tc3_request", self.date(), self.service)
    }

    /// The canonical form of the request
    pub fn canonical_request(&self) -> String {
        format!(
            "POST\n/\n\ncontent-type:{}\nhost:{}\n\n{}\n{}",
            CONTENT_TYPE,
            self.host.to_ascii_lowercase(),
            SIGNED_HEADERS,
            sha256_hex(self.payload)
        )
    }

    /// The string the signature is computed over
    pub fn string_to_sign(&self) -> String {
        format!(
            "{}\n{}\n{}\n{}",
            ALGORITHM,
            self.timestamp,
            self.credential_scope(),
            sha256_hex(&self.canonical_request())
        )
    }

    /// The hex-encoded signature, derived from `secret_key` through the
    /// date, service and `tc3_request` key chain.
    pub fn signature(&self, secret_key: &str) -> String {
        let secret_date = hmac_sha256(format!("TC3{secret_key}").as_bytes(), &self.date());
        let secret_service = hmac_sha256(&secret_date, self.service);
        let secret_signing = hmac_sha256(&secret_service, "tc3_request");

        hex::encode(hmac_sha256(&secret_signing, &self.string_to_sign()))
    }

    /// The value of the `Authorization` header
    pub fn authorization(&self, secret_id: &str, secret_key: &str) -> String {
        format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            ALGORITHM,
            secret_id,
            self.credential_scope(),
            SIGNED_HEADERS,
            self.signature(secret_key)
        )
    }
}

fn sha256_hex(data: &str) -> String {
    hex::encode(Sha256::digest(data.as_bytes()))
}

fn hmac_sha256(key: &[u8], data: &str) -> Vec<u8> {
    let mut mac: HmacSha256 = keyed(key);
    mac.update(data.as_bytes());
    mac.finalize().into_bytes().to_vec()
}
