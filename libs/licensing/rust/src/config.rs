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

use crate::interfaces::ILicensingService;

use std::time::Duration;

/// Package hosting the licensing service.
pub const VENDING_PACKAGE: &str = "com.android.vending";

/// How long a request may wait for the service's reply.
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings for a [`LicenseServiceBinder`](crate::LicenseServiceBinder).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinderConfig {
    /// Intent action that names the service.
    pub service_action: String,
    /// Package the bind is restricted to.
    pub service_package: String,
    /// Deadline applied to each request, measured from `initiate`.
    pub reply_timeout: Duration,
}

impl Default for BinderConfig {
    fn default() -> Self {
        BinderConfig {
            service_action: <crate::BpLicensingService as ILicensingService>::INTERFACE_DESCRIPTOR
                .to_string(),
            service_package: VENDING_PACKAGE.to_string(),
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
        }
    }
}

impl BinderConfig {
    pub fn with_reply_timeout(mut self, reply_timeout: Duration) -> Self {
        self.reply_timeout = reply_timeout;
        self
    }

    pub fn with_service_package(mut self, package: impl Into<String>) -> Self {
        self.service_package = package.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_name_the_play_service() {
        let config = BinderConfig::default();
        assert_eq!(config.service_action, "com.android.vending.licensing.ILicensingService");
        assert_eq!(config.service_package, "com.android.vending");
        assert_eq!(config.reply_timeout, Duration::from_secs(10));

        let config = config.with_reply_timeout(Duration::from_millis(5)).with_service_package("x");
        assert_eq!(config.reply_timeout, Duration::from_millis(5));
        assert_eq!(config.service_package, "x");
    }
}
