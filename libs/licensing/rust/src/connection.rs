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

//! Platform component binding.
//!
//! The platform owns service discovery and process lifecycle. It is reached
//! through [`ServiceContext`]; connection state flows back through a
//! [`ServiceConnection`] registered with each bind.

use crate::binder::SpIBinder;
use crate::error::Result;

use std::fmt;
use std::sync::Arc;

/// Identifier of a component in another package.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComponentName {
    pub package: String,
    pub class: String,
}

impl ComponentName {
    pub fn new(package: impl Into<String>, class: impl Into<String>) -> Self {
        ComponentName { package: package.into(), class: class.into() }
    }
}

impl fmt::Display for ComponentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.package, self.class)
    }
}

/// Description of the service to bind: an action restricted to one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceIntent {
    pub action: String,
    pub package: Option<String>,
}

impl ServiceIntent {
    pub fn new(action: impl Into<String>) -> Self {
        ServiceIntent { action: action.into(), package: None }
    }

    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = Some(package.into());
        self
    }
}

/// Monitors the state of one bind.
pub trait ServiceConnection: Send + Sync {
    /// The service is connected and `service` may be used to talk to it.
    fn on_service_connected(&self, name: &ComponentName, service: SpIBinder);

    /// The process hosting the service went away. The bind stays registered
    /// and the platform may deliver `on_service_connected` again.
    fn on_service_disconnected(&self, name: &ComponentName);
}

/// The binding half of the platform's application context.
pub trait ServiceContext: Send + Sync {
    /// Package name of the calling application.
    fn package_name(&self) -> String;

    /// Ask the platform to bind the service described by `intent`.
    ///
    /// `Ok(())` means the bind was accepted and `connection` will be notified
    /// once the service is up; `connection` must then be released with
    /// [`unbind_service`](ServiceContext::unbind_service). An error means no
    /// bind exists (e.g. `NAME_NOT_FOUND`, `PERMISSION_DENIED`).
    fn bind_service(&self, intent: &ServiceIntent, connection: Arc<dyn ServiceConnection>) -> Result<()>;

    /// Release a bind previously accepted for `connection`.
    fn unbind_service(&self, connection: &Arc<dyn ServiceConnection>);
}
