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

//! ILicensingService interface.

use crate::binder::{Remotable, SpIBinder, TransactionCode, TransactionFlags};
use crate::error::{Result, StatusCode};
use crate::parcel::Parcel;

pub const CHECK_LICENSE_TRANSACTION: TransactionCode = SpIBinder::FIRST_CALL_TRANSACTION;

pub trait ILicensingService {
    const INTERFACE_DESCRIPTOR: &'static str = "com.android.vending.licensing.ILicensingService";

    /// `oneway void checkLicense(long nonce, String packageName, in ILicenseResultListener listener)`
    fn check_license(&self, nonce: i64, package_name: &str, listener: &SpIBinder) -> Result<()>;
}

declare_binder_proxy!(BpLicensingService: ILicensingService);

impl ILicensingService for BpLicensingService {
    fn check_license(&self, nonce: i64, package_name: &str, listener: &SpIBinder) -> Result<()> {
        let mut data = Parcel::new();
        data.write_interface_token(Self::INTERFACE_DESCRIPTOR)?;
        data.write(&nonce)?;
        data.write(package_name)?;
        data.write(listener)?;

        self.remote().transact(CHECK_LICENSE_TRANSACTION, &data, None, SpIBinder::FLAG_ONEWAY)
    }
}

/// Arguments of a `checkLicense` call as seen by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckLicenseRequest {
    pub nonce: i64,
    pub package_name: String,
    pub listener: SpIBinder,
}

impl CheckLicenseRequest {
    /// Read the arguments that follow the interface token.
    pub fn from_parcel(data: &Parcel) -> Result<Self> {
        Ok(CheckLicenseRequest {
            nonce: data.read()?,
            package_name: data.read()?,
            listener: data.read()?,
        })
    }
}

type CheckLicenseHandler = Box<dyn Fn(CheckLicenseRequest) -> Result<()> + Send + Sync + 'static>;

/// Service side of `ILicensingService`, dispatching each request to a
/// closure.
pub struct LicensingService(CheckLicenseHandler);

impl LicensingService {
    pub fn new<C>(handler: C) -> Self
    where
        C: Fn(CheckLicenseRequest) -> Result<()> + Send + Sync + 'static,
    {
        LicensingService(Box::new(handler))
    }
}

impl ILicensingService for LicensingService {
    fn check_license(&self, nonce: i64, package_name: &str, listener: &SpIBinder) -> Result<()> {
        (self.0)(CheckLicenseRequest {
            nonce,
            package_name: package_name.to_string(),
            listener: listener.clone(),
        })
    }
}

impl Remotable for LicensingService {
    const DESCRIPTOR: &'static str = <Self as ILicensingService>::INTERFACE_DESCRIPTOR;

    fn on_transact(
        &self,
        code: TransactionCode,
        data: &Parcel,
        reply: Option<&mut Parcel>,
        _flags: TransactionFlags,
    ) -> Result<()> {
        match code {
            CHECK_LICENSE_TRANSACTION => {
                self.check_interface(data)?;
                (self.0)(CheckLicenseRequest::from_parcel(data)?)?;
                if let Some(reply) = reply {
                    reply.write_no_exception()?;
                }
                Ok(())
            }
            _ => Err(StatusCode::UNKNOWN_TRANSACTION),
        }
    }
}
