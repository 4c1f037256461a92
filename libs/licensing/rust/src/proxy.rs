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

//! Rust API for interacting with a remote binder service.

/// Declare a typed proxy around a remote binder object.
///
/// The interface trait must provide an `INTERFACE_DESCRIPTOR` constant; the
/// proxy implements the trait itself by writing transactions to `remote()`.
///
/// ```
/// use licensing::{declare_binder_proxy, Parcel, SpIBinder};
///
/// pub trait ITest {
///     const INTERFACE_DESCRIPTOR: &'static str = "android.os.ITest";
///
///     fn test(&self) -> licensing::Result<()>;
/// }
///
/// declare_binder_proxy!(BpTest: ITest);
///
/// impl ITest for BpTest {
///     fn test(&self) -> licensing::Result<()> {
///         let mut data = Parcel::new();
///         data.write_interface_token(Self::INTERFACE_DESCRIPTOR)?;
///         self.remote().transact(SpIBinder::FIRST_CALL_TRANSACTION, &data, None, 0)
///     }
/// }
/// ```
#[macro_export]
macro_rules! declare_binder_proxy {
    ($proxy:ident : $interface:ident) => {
        /// Proxy for a remote binder object.
        pub struct $proxy {
            binder: $crate::SpIBinder,
        }

        impl $proxy {
            /// Wrap a binder reference without checking what it implements.
            pub fn new(binder: $crate::SpIBinder) -> Self {
                $proxy { binder }
            }

            /// Wrap a binder reference after checking that it reports this
            /// proxy's interface descriptor.
            pub fn from_binder(binder: $crate::SpIBinder) -> $crate::Result<Self> {
                let descriptor = binder.get_interface_descriptor()?;
                if descriptor == <$proxy as $interface>::INTERFACE_DESCRIPTOR {
                    Ok($proxy { binder })
                } else {
                    $crate::log::error!(
                        "Expected {} but binder implements {}",
                        <$proxy as $interface>::INTERFACE_DESCRIPTOR,
                        descriptor
                    );
                    Err($crate::StatusCode::BAD_TYPE)
                }
            }

            /// The wrapped remote object.
            pub fn remote(&self) -> &$crate::SpIBinder {
                &self.binder
            }

            pub fn as_binder(&self) -> $crate::SpIBinder {
                self.binder.clone()
            }
        }

        impl std::fmt::Debug for $proxy {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_tuple(stringify!($proxy)).field(&self.binder).finish()
            }
        }
    };
}
