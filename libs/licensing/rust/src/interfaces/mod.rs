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

//! Hand-written bindings for the licensing AIDL interfaces.

mod license_result_listener;
mod licensing_service;

pub use license_result_listener::{
    BpLicenseResultListener, ILicenseResultListener, LicenseResultListener,
    VERIFY_LICENSE_TRANSACTION,
};
pub use licensing_service::{
    BpLicensingService, CheckLicenseRequest, ILicensingService, LicensingService,
    CHECK_LICENSE_TRANSACTION,
};
