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

//! Trait definitions for binder objects

use crate::error::{Result, StatusCode};
use crate::parcel::Parcel;

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Binder action to perform.
///
/// Interface calls are numbered from [`SpIBinder::FIRST_CALL_TRANSACTION`];
/// the reserved meta transactions use packed ASCII codes.
pub type TransactionCode = u32;

/// Additional operation flags.
///
/// Can be either 0 for a normal RPC, or [`SpIBinder::FLAG_ONEWAY`] for a
/// one-way RPC.
pub type TransactionFlags = u32;

const fn pack_chars(c1: u8, c2: u8, c3: u8, c4: u8) -> u32 {
    ((c1 as u32) << 24) | ((c2 as u32) << 16) | ((c3 as u32) << 8) | (c4 as u32)
}

/// Interface of binder local or remote objects.
///
/// This trait corresponds to the interface of the C++ `IBinder` class. A
/// platform transport implements it for remote handles; [`Binder`] implements
/// it for objects living in this process.
pub trait IBinder: Send + Sync {
    /// Perform a generic operation with the object.
    ///
    /// # Arguments
    /// * `code` - Transaction code for the operation
    /// * `data` - [`Parcel`] with input data
    /// * `reply` - Optional [`Parcel`] for reply data
    /// * `flags` - Transaction flags, e.g. marking the transaction as
    /// asynchronous ([`FLAG_ONEWAY`](SpIBinder::FLAG_ONEWAY))
    fn transact(
        &self,
        code: TransactionCode,
        data: &Parcel,
        reply: Option<&mut Parcel>,
        flags: TransactionFlags,
    ) -> Result<()>;

    /// Is this object still alive?
    fn is_binder_alive(&self) -> bool {
        true
    }

    /// Return the canonical name of the interface provided by this object.
    fn get_interface_descriptor(&self) -> Result<String> {
        let mut reply = Parcel::new();
        self.transact(SpIBinder::INTERFACE_TRANSACTION, &Parcel::new(), Some(&mut reply), 0)?;
        reply.read_string16()?.ok_or(StatusCode::UNEXPECTED_NULL)
    }

    /// Send a ping transaction to this object
    fn ping_binder(&self) -> Result<()> {
        let mut reply = Parcel::new();
        self.transact(SpIBinder::PING_TRANSACTION, &Parcel::new(), Some(&mut reply), 0)
    }
}

/// A struct that is remotable via Binder.
///
/// This is a low-level interface that should normally be automatically
/// generated from AIDL.
pub trait Remotable: Send + Sync {
    /// The Binder interface descriptor string.
    const DESCRIPTOR: &'static str;

    /// Handle and reply to a request to invoke a transaction on this object.
    ///
    /// `reply` is [`None`] for one-way transactions.
    fn on_transact(
        &self,
        code: TransactionCode,
        data: &Parcel,
        reply: Option<&mut Parcel>,
        flags: TransactionFlags,
    ) -> Result<()>;

    /// Consume the interface token at the front of `data`, failing with
    /// `PERMISSION_DENIED` if it names a different interface.
    fn check_interface(&self, data: &Parcel) -> Result<()> {
        if data.enforce_interface(Self::DESCRIPTOR) {
            Ok(())
        } else {
            Err(StatusCode::PERMISSION_DENIED)
        }
    }
}

/// Binder object living in this process.
///
/// Dispatches incoming transactions to the wrapped [`Remotable`] and answers
/// the meta transactions (`INTERFACE_TRANSACTION`, `PING_TRANSACTION`) the
/// way `BBinder` does.
pub struct Binder<T: Remotable> {
    rust_object: T,
}

impl<T: Remotable> Binder<T> {
    /// Create a new Binder remotable object.
    pub fn new(rust_object: T) -> Binder<T> {
        Binder { rust_object }
    }
}

impl<T: Remotable> IBinder for Binder<T> {
    fn transact(
        &self,
        code: TransactionCode,
        data: &Parcel,
        reply: Option<&mut Parcel>,
        flags: TransactionFlags,
    ) -> Result<()> {
        let oneway = flags & SpIBinder::FLAG_ONEWAY != 0;
        let received = data.delivered();
        let mut reply = if oneway { None } else { reply };

        let result = match code {
            SpIBinder::INTERFACE_TRANSACTION => match reply.as_deref_mut() {
                Some(reply) => reply.write(T::DESCRIPTOR),
                None => Ok(()),
            },
            SpIBinder::PING_TRANSACTION => Ok(()),
            _ => self.rust_object.on_transact(code, &received, reply.as_deref_mut(), flags),
        };

        if let Some(reply) = reply {
            reply.set_data_position(0)?;
        }

        match result {
            // A one-way caller has already moved on; the failure stays here.
            Err(status) if oneway => {
                log::warn!("{}: one-way transaction {} failed: {}", T::DESCRIPTOR, code, status);
                Ok(())
            }
            result => result,
        }
    }

    fn get_interface_descriptor(&self) -> Result<String> {
        Ok(T::DESCRIPTOR.to_string())
    }
}

impl<T: Remotable> Deref for Binder<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.rust_object
    }
}

/// Strong reference to a binder object, local or remote.
#[derive(Clone)]
pub struct SpIBinder(Arc<dyn IBinder>);

impl SpIBinder {
    pub const FIRST_CALL_TRANSACTION: TransactionCode = 0x0000_0001;
    pub const PING_TRANSACTION: TransactionCode = pack_chars(b'_', b'P', b'N', b'G');
    pub const INTERFACE_TRANSACTION: TransactionCode = pack_chars(b'_', b'N', b'T', b'F');

    /// Corresponds to TF_ONE_WAY -- an asynchronous call.
    pub const FLAG_ONEWAY: TransactionFlags = 0x01;

    pub fn new<B: IBinder + 'static>(binder: B) -> Self {
        SpIBinder(Arc::new(binder))
    }

    /// Perform a binder transaction on the referenced object.
    pub fn transact(
        &self,
        code: TransactionCode,
        data: &Parcel,
        reply: Option<&mut Parcel>,
        flags: TransactionFlags,
    ) -> Result<()> {
        self.0.transact(code, data, reply, flags)
    }

    pub fn is_binder_alive(&self) -> bool {
        self.0.is_binder_alive()
    }

    pub fn get_interface_descriptor(&self) -> Result<String> {
        self.0.get_interface_descriptor()
    }

    pub fn ping_binder(&self) -> Result<()> {
        self.0.ping_binder()
    }
}

impl<T: Remotable + 'static> From<Binder<T>> for SpIBinder {
    fn from(binder: Binder<T>) -> Self {
        SpIBinder::new(binder)
    }
}

/// Two references are equal when they point at the same object.
impl PartialEq for SpIBinder {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for SpIBinder {}

impl fmt::Debug for SpIBinder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SpIBinder").field(&Arc::as_ptr(&self.0).cast::<()>()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl Remotable for Echo {
        const DESCRIPTOR: &'static str = "android.os.IEcho";

        fn on_transact(
            &self,
            code: TransactionCode,
            data: &Parcel,
            reply: Option<&mut Parcel>,
            _flags: TransactionFlags,
        ) -> Result<()> {
            match code {
                SpIBinder::FIRST_CALL_TRANSACTION => {
                    self.check_interface(data)?;
                    let value: i32 = data.read()?;
                    if let Some(reply) = reply {
                        reply.write_no_exception()?;
                        reply.write(&value)?;
                    }
                    Ok(())
                }
                _ => Err(StatusCode::UNKNOWN_TRANSACTION),
            }
        }
    }

    #[test]
    fn transaction_codes() {
        assert_eq!(SpIBinder::INTERFACE_TRANSACTION, 0x5f4e_5446);
        assert_eq!(SpIBinder::PING_TRANSACTION, 0x5f50_4e47);
    }

    #[test]
    fn local_transaction_replies() {
        let binder: SpIBinder = Binder::new(Echo).into();
        let mut data = Parcel::new();
        data.write_interface_token(Echo::DESCRIPTOR).unwrap();
        data.write(&117i32).unwrap();

        let mut reply = Parcel::new();
        binder.transact(SpIBinder::FIRST_CALL_TRANSACTION, &data, Some(&mut reply), 0).unwrap();
        assert_eq!(reply.read::<i32>(), Ok(0));
        assert_eq!(reply.read::<i32>(), Ok(117));
        // The sender's parcel is untouched by the receiver's reads.
        assert_eq!(data.data_position(), 0);
    }

    #[test]
    fn meta_transactions() {
        let binder: SpIBinder = Binder::new(Echo).into();
        assert_eq!(binder.get_interface_descriptor().unwrap(), "android.os.IEcho");
        assert!(binder.ping_binder().is_ok());
        assert!(binder.is_binder_alive());

        let mut reply = Parcel::new();
        binder
            .transact(SpIBinder::INTERFACE_TRANSACTION, &Parcel::new(), Some(&mut reply), 0)
            .unwrap();
        assert_eq!(reply.read::<String>().unwrap(), "android.os.IEcho");
    }

    #[test]
    fn errors_reach_synchronous_callers_only() {
        let binder: SpIBinder = Binder::new(Echo).into();
        let mut data = Parcel::new();
        data.write_interface_token("android.os.INotEcho").unwrap();

        let mut reply = Parcel::new();
        assert_eq!(
            binder.transact(SpIBinder::FIRST_CALL_TRANSACTION, &data, Some(&mut reply), 0),
            Err(StatusCode::PERMISSION_DENIED)
        );
        assert_eq!(
            binder.transact(SpIBinder::FIRST_CALL_TRANSACTION, &data, None, SpIBinder::FLAG_ONEWAY),
            Ok(())
        );
        assert_eq!(
            binder.transact(42, &Parcel::new(), Some(&mut reply), 0),
            Err(StatusCode::UNKNOWN_TRANSACTION)
        );
    }

    #[test]
    fn references_compare_by_identity() {
        let a: SpIBinder = Binder::new(Echo).into();
        let b: SpIBinder = Binder::new(Echo).into();
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }
}
