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

//! Signature and consistency checks on a licensing server reply.

use crate::response::{ResponseData, VerificationResult};

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use rsa::pkcs8::DecodePublicKey;
use rsa::{BigUint, Pkcs1v15Sign, RsaPublicKey};
use sha1::{Digest, Sha1};

/// Reasons a reply is not accepted as a license.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LicenseError {
    #[error("licensing server failed with response code {response_code}")]
    ServerError { response_code: i32 },
    #[error("invalid public key: {0}")]
    InvalidKey(String),
    #[error("signature does not match the signed data")]
    InvalidSignature,
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("signed response code {signed} does not match reported code {reported}")]
    ResponseMismatch { reported: i32, signed: i32 },
    #[error("nonce mismatch: expected {expected}, received {received}")]
    NonceMismatch { expected: i64, received: i64 },
    #[error("package mismatch: expected {expected}, received {received}")]
    PackageMismatch { expected: String, received: String },
}

fn decode_base64(what: &str, encoded: &str) -> Result<Vec<u8>, LicenseError> {
    let cleaned: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    B64.decode(cleaned).map_err(|e| LicenseError::InvalidKey(format!("{}: {}", what, e)))
}

/// Verifies replies against the application's licensing public key.
#[derive(Debug, Clone)]
pub struct LicenseVerifier {
    public_key: RsaPublicKey,
}

impl LicenseVerifier {
    pub fn new(public_key: RsaPublicKey) -> Self {
        Self { public_key }
    }

    /// Build from the base64 X.509 `SubjectPublicKeyInfo` shown in the Play
    /// Console.
    pub fn from_base64_key(encoded: &str) -> Result<Self, LicenseError> {
        let der = decode_base64("public key", encoded)?;
        let public_key = RsaPublicKey::from_public_key_der(&der)
            .map_err(|e| LicenseError::InvalidKey(e.to_string()))?;
        Ok(Self::new(public_key))
    }

    /// Build from a base64 big-endian modulus and exponent.
    pub fn from_modulus_exponent(modulus: &str, exponent: &str) -> Result<Self, LicenseError> {
        let n = BigUint::from_bytes_be(&decode_base64("modulus", modulus)?);
        let e = BigUint::from_bytes_be(&decode_base64("exponent", exponent)?);
        let public_key = RsaPublicKey::new(n, e).map_err(|e| LicenseError::InvalidKey(e.to_string()))?;
        Ok(Self::new(public_key))
    }

    /// Check the SHA1withRSA signature (base64) over the UTF-8 `signed_data`.
    pub fn check_signature(&self, signed_data: &str, signature: &str) -> Result<(), LicenseError> {
        let signature = B64.decode(signature.trim()).map_err(|e| {
            log::warn!("Signature is not valid base64: {}", e);
            LicenseError::InvalidSignature
        })?;
        let digest = Sha1::digest(signed_data.as_bytes());
        self.public_key
            .verify(Pkcs1v15Sign::new::<Sha1>(), &digest, &signature)
            .map_err(|_| LicenseError::InvalidSignature)
    }

    /// Verify a reply to the request made with `nonce` from `package_name`.
    pub fn verify(
        &self,
        result: &VerificationResult,
        nonce: i64,
        package_name: &str,
    ) -> Result<ResponseData, LicenseError> {
        if result.response_code < 0 || result.signed_data.is_empty() || result.signature.is_empty() {
            return Err(LicenseError::ServerError { response_code: result.response_code });
        }

        self.check_signature(&result.signed_data, &result.signature)?;

        let data = ResponseData::parse(&result.signed_data)?;
        if data.response_code != result.response_code {
            return Err(LicenseError::ResponseMismatch {
                reported: result.response_code,
                signed: data.response_code,
            });
        }
        if data.nonce != nonce {
            return Err(LicenseError::NonceMismatch { expected: nonce, received: data.nonce });
        }
        if data.package_name != package_name {
            return Err(LicenseError::PackageMismatch {
                expected: package_name.to_string(),
                received: data.package_name,
            });
        }

        log::info!(
            "Verified license response {} for {} (version {})",
            data.response_code,
            data.package_name,
            data.version_code
        );
        Ok(data)
    }
}
