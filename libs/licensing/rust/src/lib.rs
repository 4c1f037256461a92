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

//! Single-use binding to the Play licensing service over Binder IPC.
//!
//! [`LicenseServiceBinder`] binds `com.android.vending.licensing.ILicensingService`,
//! sends one one-way `checkLicense` transaction carrying the caller's nonce,
//! package name and a listener object, and hands the listener's single
//! `verifyLicense` callback to the caller as a [`CheckResult`]. A
//! [`LicenseVerifier`] then checks the reply's signature and decodes it.
//!
//! The platform's binding mechanism is supplied through [`ServiceContext`];
//! remote objects are reached through [`IBinder`] and messages are marshaled
//! in a [`Parcel`].
//!
//! # Example
//!
//! ```
//! use licensing::{
//!     CheckError, LicenseServiceBinder, ServiceConnection, ServiceContext, ServiceIntent,
//!     StatusCode,
//! };
//! use std::sync::Arc;
//!
//! // A device without the Play Store.
//! struct NoVending;
//!
//! impl ServiceContext for NoVending {
//!     fn package_name(&self) -> String {
//!         "com.example.game".to_string()
//!     }
//!
//!     fn bind_service(
//!         &self,
//!         _intent: &ServiceIntent,
//!         _connection: Arc<dyn ServiceConnection>,
//!     ) -> licensing::Result<()> {
//!         Err(StatusCode::NAME_NOT_FOUND)
//!     }
//!
//!     fn unbind_service(&self, _connection: &Arc<dyn ServiceConnection>) {}
//! }
//!
//! let binder = LicenseServiceBinder::new(Arc::new(NoVending));
//! binder.initiate(42, |result| {
//!     assert_eq!(result, Err(CheckError::ConnectionRejected(StatusCode::NAME_NOT_FOUND)));
//! });
//! assert!(binder.pending().is_none());
//! ```

#[macro_use]
mod proxy;

mod binder;
mod config;
mod connection;
mod error;
mod response;
mod service_binder;
mod verifier;

pub mod interfaces;
pub mod parcel;

pub use crate::binder::{Binder, IBinder, Remotable, SpIBinder, TransactionCode, TransactionFlags};
pub use config::{BinderConfig, DEFAULT_REPLY_TIMEOUT, VENDING_PACKAGE};
pub use connection::{ComponentName, ServiceConnection, ServiceContext, ServiceIntent};
pub use error::{Result, StatusCode};
pub use interfaces::{BpLicenseResultListener, BpLicensingService};
pub use parcel::Parcel;
pub use response::{ExpansionFile, Extras, ResponseCode, ResponseData, VerificationResult};
pub use service_binder::{
    CheckError, CheckResult, LicenseServiceBinder, PendingInfo, RequestId, RequestPhase,
};
pub use verifier::{LicenseError, LicenseVerifier};

#[doc(hidden)]
pub use log;

/// Re-exports of core structures, prefixed with `Binder`.
///
/// This module renames binder exports so they be glob-imported without
/// conflicting with standard structures. Import the prelude with:
/// ```rust
/// use licensing::prelude::*;
/// ```
pub mod prelude {
    pub use super::Binder;
    pub use super::IBinder;
    pub use super::Remotable as BinderRemotable;
    pub use super::Result as BinderResult;
    pub use super::StatusCode as BinderStatusCode;
}
