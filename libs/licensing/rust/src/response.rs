/*
 * Copyright (C) 2021 The Android Open Source Project
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! Licensing server responses.
//!
//! The listener receives a [`VerificationResult`]: the server's response code
//! plus a signed payload of the form
//!
//! ```text
//! code|nonce|package|version_code|user_id|timestamp[:extras]
//! ```
//!
//! where `extras` is a URL-encoded query string. [`ResponseData::parse`]
//! decodes the payload once its signature has been checked by a
//! [`LicenseVerifier`](crate::LicenseVerifier).

use crate::verifier::LicenseError;

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Raw reply delivered to `ILicenseResultListener.verifyLicense`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationResult {
    pub response_code: i32,
    pub signed_data: String,
    pub signature: String,
}

/// Response codes sent by the licensing server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ResponseCode {
    Licensed = 0x0,
    NotLicensed = 0x1,
    LicensedOldKey = 0x2,
    ErrorNotMarketManaged = 0x3,
    ErrorServerFailure = 0x4,
    ErrorOverQuota = 0x5,
    ErrorContactingServer = 0x101,
    ErrorInvalidPackageName = 0x102,
    ErrorNonMatchingUid = 0x103,
}

impl ResponseCode {
    pub fn from_i32(code: i32) -> Option<ResponseCode> {
        Some(match code {
            0x0 => ResponseCode::Licensed,
            0x1 => ResponseCode::NotLicensed,
            0x2 => ResponseCode::LicensedOldKey,
            0x3 => ResponseCode::ErrorNotMarketManaged,
            0x4 => ResponseCode::ErrorServerFailure,
            0x5 => ResponseCode::ErrorOverQuota,
            0x101 => ResponseCode::ErrorContactingServer,
            0x102 => ResponseCode::ErrorInvalidPackageName,
            0x103 => ResponseCode::ErrorNonMatchingUid,
            _ => return None,
        })
    }

    /// Whether the user is entitled to run the application.
    pub fn is_licensed(self) -> bool {
        matches!(self, ResponseCode::Licensed | ResponseCode::LicensedOldKey)
    }

    /// Whether the check could be retried later with a different outcome.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            ResponseCode::ErrorServerFailure
                | ResponseCode::ErrorOverQuota
                | ResponseCode::ErrorContactingServer
        )
    }
}

/// An APK expansion file advertised in the response extras.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpansionFile {
    pub url: Option<String>,
    pub name: Option<String>,
    pub size: Option<u64>,
}

/// Extra fields that follow the `:` of the signed payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extras {
    /// `GR`: retries allowed before the license must be re-checked.
    pub max_retries: Option<u32>,
    /// `VT`: time until which the response may be cached.
    pub validity_timestamp: Option<DateTime<Utc>>,
    /// `GT`: end of the grace period for retries.
    pub grace_period_timestamp: Option<DateTime<Utc>>,
    /// `UT`: time of the last update to the license.
    pub update_timestamp: Option<DateTime<Utc>>,
    /// `FILE_URL1`, `FILE_NAME1`, `FILE_SIZE1`
    pub main_file: Option<ExpansionFile>,
    /// `FILE_URL2`, `FILE_NAME2`, `FILE_SIZE2`
    pub patch_file: Option<ExpansionFile>,
    /// `LU`
    pub licensing_url: Option<String>,
    /// Keys not interpreted above.
    pub other: BTreeMap<String, String>,
}

/// Decoded signed payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseData {
    pub response_code: i32,
    pub nonce: i64,
    pub package_name: String,
    pub version_code: i32,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    pub extras: Extras,
}

fn malformed(what: impl Into<String>) -> LicenseError {
    LicenseError::MalformedResponse(what.into())
}

fn parse_field<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, LicenseError> {
    value.trim().parse().map_err(|_| malformed(format!("{} is not a number: {:?}", name, value)))
}

/// Epoch seconds to a UTC time. Negative values clamp to the epoch and values
/// past the representable range clamp to its end.
fn timestamp_from_secs(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs.max(0), 0).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Form-style unescaping: `+` is a space, then `%XX` escapes.
fn decode_component(raw: &str) -> Result<String, LicenseError> {
    urlencoding::decode(&raw.replace('+', " "))
        .map(|decoded| decoded.into_owned())
        .map_err(|e| malformed(e.to_string()))
}

impl ResponseData {
    pub fn parse(signed_data: &str) -> Result<ResponseData, LicenseError> {
        let (main, extras) = signed_data.split_once(':').unwrap_or((signed_data, ""));

        let fields: Vec<&str> = main.split('|').collect();
        if fields.len() < 6 {
            return Err(malformed(format!("expected 6 fields, found {}", fields.len())));
        }

        Ok(ResponseData {
            response_code: parse_field("response code", fields[0])?,
            nonce: parse_field("nonce", fields[1])?,
            package_name: fields[2].to_string(),
            version_code: parse_field("version code", fields[3])?,
            user_id: fields[4].to_string(),
            timestamp: timestamp_from_secs(parse_field("timestamp", fields[5])?),
            extras: Extras::decode(extras)?,
        })
    }

    pub fn code(&self) -> Option<ResponseCode> {
        ResponseCode::from_i32(self.response_code)
    }
}

impl Extras {
    /// Decode the `name=value&...` query string, with an optional leading `?`.
    pub fn decode(query: &str) -> Result<Extras, LicenseError> {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut extras = Extras::default();
        let mut main_file = ExpansionFile::default();
        let mut patch_file = ExpansionFile::default();

        for pair in query.split('&').filter(|pair| !pair.is_empty()) {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            let name = decode_component(name)?;
            let value = decode_component(value)?;

            match name.as_str() {
                "GR" => extras.max_retries = Some(parse_field("GR", &value)?),
                "VT" => extras.validity_timestamp = Some(timestamp_from_secs(parse_field("VT", &value)?)),
                "GT" => {
                    extras.grace_period_timestamp = Some(timestamp_from_secs(parse_field("GT", &value)?))
                }
                "UT" => extras.update_timestamp = Some(timestamp_from_secs(parse_field("UT", &value)?)),
                "FILE_URL1" => main_file.url = Some(value),
                "FILE_NAME1" => main_file.name = Some(value),
                "FILE_SIZE1" => main_file.size = Some(parse_field("FILE_SIZE1", &value)?),
                "FILE_URL2" => patch_file.url = Some(value),
                "FILE_NAME2" => patch_file.name = Some(value),
                "FILE_SIZE2" => patch_file.size = Some(parse_field("FILE_SIZE2", &value)?),
                "LU" => extras.licensing_url = Some(value),
                _ => {
                    extras.other.insert(name, value);
                }
            }
        }

        if main_file != ExpansionFile::default() {
            extras.main_file = Some(main_file);
        }
        if patch_file != ExpansionFile::default() {
            extras.patch_file = Some(patch_file);
        }
        Ok(extras)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn main_fields() {
        let data = ResponseData::parse("0|42|com.example.game|17|ANlOHQOShF3uJUwv3Ql+fs7tW/cw|1279154193").unwrap();
        assert_eq!(data.response_code, 0);
        assert_eq!(data.code(), Some(ResponseCode::Licensed));
        assert_eq!(data.nonce, 42);
        assert_eq!(data.package_name, "com.example.game");
        assert_eq!(data.version_code, 17);
        assert_eq!(data.user_id, "ANlOHQOShF3uJUwv3Ql+fs7tW/cw");
        assert_eq!(data.timestamp.timestamp(), 1279154193);
        assert_eq!(data.extras, Extras::default());
    }

    #[test]
    fn extras_are_decoded() {
        let data = ResponseData::parse(
            "2|-7|com.example.game|3|user|1000:GR=10&VT=2000&GT=3000&UT=1500\
             &FILE_URL1=https%3A%2F%2Fexample.com%2Fmain.obb&FILE_NAME1=main.3.obb&FILE_SIZE1=1024\
             &LU=https%3A%2F%2Fplay.google.com&XX=y",
        )
        .unwrap();
        assert_eq!(data.code(), Some(ResponseCode::LicensedOldKey));
        assert_eq!(data.nonce, -7);

        let extras = data.extras;
        assert_eq!(extras.max_retries, Some(10));
        assert_eq!(extras.validity_timestamp.map(|t| t.timestamp()), Some(2000));
        assert_eq!(extras.grace_period_timestamp.map(|t| t.timestamp()), Some(3000));
        assert_eq!(extras.update_timestamp.map(|t| t.timestamp()), Some(1500));
        assert_eq!(
            extras.main_file,
            Some(ExpansionFile {
                url: Some("https://example.com/main.obb".to_string()),
                name: Some("main.3.obb".to_string()),
                size: Some(1024),
            })
        );
        assert_eq!(extras.patch_file, None);
        assert_eq!(extras.licensing_url.as_deref(), Some("https://play.google.com"));
        assert_eq!(extras.other.get("XX").map(String::as_str), Some("y"));
    }

    #[test]
    fn leading_question_mark_and_empty_pairs() {
        let extras = Extras::decode("?GR=3&&FLAG").unwrap();
        assert_eq!(extras.max_retries, Some(3));
        assert_eq!(extras.other.get("FLAG").map(String::as_str), Some(""));
    }

    #[test]
    fn plus_decodes_as_space() {
        let extras = Extras::decode("FILE_NAME2=patch+3.obb&NOTE=a%2Bb+c").unwrap();
        assert_eq!(extras.patch_file.and_then(|f| f.name).as_deref(), Some("patch 3.obb"));
        assert_eq!(extras.other.get("NOTE").map(String::as_str), Some("a+b c"));
    }

    #[test]
    fn negative_timestamp_clamps_to_epoch() {
        let data = ResponseData::parse("1|1|p|1|u|-50").unwrap();
        assert_eq!(data.timestamp.timestamp(), 0);
        assert_eq!(data.code(), Some(ResponseCode::NotLicensed));
    }

    #[test]
    fn malformed_payloads() {
        assert!(matches!(ResponseData::parse("0|1|p"), Err(LicenseError::MalformedResponse(_))));
        assert!(matches!(ResponseData::parse("x|1|p|1|u|0"), Err(LicenseError::MalformedResponse(_))));
        assert!(matches!(
            ResponseData::parse("0|1|p|1|u|0:GR=many"),
            Err(LicenseError::MalformedResponse(_))
        ));
    }

    #[test]
    fn code_classification() {
        assert!(ResponseCode::Licensed.is_licensed());
        assert!(!ResponseCode::NotLicensed.is_licensed());
        assert!(ResponseCode::ErrorContactingServer.is_transient());
        assert_eq!(ResponseCode::from_i32(0x103), Some(ResponseCode::ErrorNonMatchingUid));
        assert_eq!(ResponseCode::from_i32(-1), None);
    }
}
