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

//! ILicenseResultListener interface.

use crate::binder::{Remotable, SpIBinder, TransactionCode, TransactionFlags};
use crate::error::{Result, StatusCode};
use crate::parcel::Parcel;
use crate::response::VerificationResult;

pub const VERIFY_LICENSE_TRANSACTION: TransactionCode = SpIBinder::FIRST_CALL_TRANSACTION;

pub trait ILicenseResultListener {
    const INTERFACE_DESCRIPTOR: &'static str =
        "com.android.vending.licensing.ILicenseResultListener";

    /// `oneway void verifyLicense(int responseCode, String signedData, String signature)`
    fn verify_license(&self, response_code: i32, signed_data: &str, signature: &str) -> Result<()>;
}

declare_binder_proxy!(BpLicenseResultListener: ILicenseResultListener);

impl ILicenseResultListener for BpLicenseResultListener {
    fn verify_license(&self, response_code: i32, signed_data: &str, signature: &str) -> Result<()> {
        let mut data = Parcel::new();
        data.write_interface_token(Self::INTERFACE_DESCRIPTOR)?;
        data.write(&response_code)?;
        data.write(signed_data)?;
        data.write(signature)?;

        self.remote().transact(VERIFY_LICENSE_TRANSACTION, &data, None, SpIBinder::FLAG_ONEWAY)
    }
}

type ResultCallback = Box<dyn Fn(VerificationResult) + Send + Sync + 'static>;

/// Local listener object handed to the licensing service.
pub struct LicenseResultListener(ResultCallback);

impl LicenseResultListener {
    pub fn new<C>(callback: C) -> Self
    where
        C: Fn(VerificationResult) + Send + Sync + 'static,
    {
        LicenseResultListener(Box::new(callback))
    }
}

impl ILicenseResultListener for LicenseResultListener {
    fn verify_license(&self, response_code: i32, signed_data: &str, signature: &str) -> Result<()> {
        (self.0)(VerificationResult {
            response_code,
            signed_data: signed_data.to_string(),
            signature: signature.to_string(),
        });
        Ok(())
    }
}

impl Remotable for LicenseResultListener {
    const DESCRIPTOR: &'static str = <Self as ILicenseResultListener>::INTERFACE_DESCRIPTOR;

    fn on_transact(
        &self,
        code: TransactionCode,
        data: &Parcel,
        reply: Option<&mut Parcel>,
        _flags: TransactionFlags,
    ) -> Result<()> {
        match code {
            VERIFY_LICENSE_TRANSACTION => {
                self.check_interface(data)?;
                let response_code: i32 = data.read()?;
                // The service sends null strings along with error codes.
                let signed_data: Option<String> = data.read()?;
                let signature: Option<String> = data.read()?;
                (self.0)(VerificationResult {
                    response_code,
                    signed_data: signed_data.unwrap_or_default(),
                    signature: signature.unwrap_or_default(),
                });
                if let Some(reply) = reply {
                    reply.write_no_exception()?;
                }
                Ok(())
            }
            _ => Err(StatusCode::UNKNOWN_TRANSACTION),
        }
    }
}
