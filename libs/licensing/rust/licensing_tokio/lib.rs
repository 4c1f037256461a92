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

//! Tokio support for the licensing service binder.
//!
//! [`LicenseServiceBinder::initiate`] reports through a completion callback
//! and leaves timing out to the caller. The functions here turn a check into
//! a future that resolves with the reply, or with [`CheckError::TimedOut`]
//! once the configured reply timeout has passed.
//!
//! ```no_run
//! # async fn check(binder: licensing::LicenseServiceBinder) {
//! match licensing_tokio::check_license(&binder, 42).await {
//!     Ok(reply) => println!("response code {}", reply.response_code),
//!     Err(e) => println!("license check failed: {}", e),
//! }
//! # }
//! ```

use licensing::{CheckError, CheckResult, LicenseServiceBinder};

use std::time::Duration;
use tokio::sync::oneshot;

/// Run one license check, waiting at most the binder's configured
/// `reply_timeout`.
pub async fn check_license(binder: &LicenseServiceBinder, nonce: i64) -> CheckResult {
    check_license_with_timeout(binder, nonce, binder.config().reply_timeout).await
}

/// Run one license check, waiting at most `timeout` for the reply.
///
/// Starting another check on the same binder while this one waits completes
/// this one with [`CheckError::Superseded`].
pub async fn check_license_with_timeout(
    binder: &LicenseServiceBinder,
    nonce: i64,
    timeout: Duration,
) -> CheckResult {
    let (tx, mut rx) = oneshot::channel();
    let id = binder.initiate(nonce, move |result| {
        // The receiver is gone only if the caller stopped waiting.
        let _ = tx.send(result);
    });

    match tokio::time::timeout(timeout, &mut rx).await {
        Ok(received) => received.unwrap_or(Err(CheckError::Abandoned)),
        Err(_) => {
            if !binder.expire(id) {
                log::debug!("License check {} finished as it timed out", id);
            }
            // Either the expiry or the reply that beat it is now in the channel.
            rx.await.unwrap_or(Err(CheckError::Abandoned))
        }
    }
}
