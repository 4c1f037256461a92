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

use crate::binder::SpIBinder;
use crate::error::{Result, StatusCode};
use crate::parcel::Parcel;

/// A struct whose instances can be written to a [`Parcel`].
pub trait Serialize {
    /// Serialize this instance into the given [`Parcel`].
    fn serialize(&self, parcel: &mut Parcel) -> Result<()>;
}

/// A struct whose instances can be restored from a [`Parcel`].
pub trait Deserialize: Sized {
    /// Deserialize an instance from the given [`Parcel`].
    fn deserialize(parcel: &Parcel) -> Result<Self>;
}

impl<T: Serialize + ?Sized> Serialize for &T {
    fn serialize(&self, parcel: &mut Parcel) -> Result<()> {
        (**self).serialize(parcel)
    }
}

impl Serialize for bool {
    fn serialize(&self, parcel: &mut Parcel) -> Result<()> {
        parcel.write_bool(*self)
    }
}

impl Deserialize for bool {
    fn deserialize(parcel: &Parcel) -> Result<Self> {
        parcel.read_bool()
    }
}

impl Serialize for i32 {
    fn serialize(&self, parcel: &mut Parcel) -> Result<()> {
        parcel.write_i32(*self)
    }
}

impl Deserialize for i32 {
    fn deserialize(parcel: &Parcel) -> Result<Self> {
        parcel.read_i32()
    }
}

impl Serialize for u32 {
    fn serialize(&self, parcel: &mut Parcel) -> Result<()> {
        parcel.write_u32(*self)
    }
}

impl Deserialize for u32 {
    fn deserialize(parcel: &Parcel) -> Result<Self> {
        parcel.read_u32()
    }
}

impl Serialize for i64 {
    fn serialize(&self, parcel: &mut Parcel) -> Result<()> {
        parcel.write_i64(*self)
    }
}

impl Deserialize for i64 {
    fn deserialize(parcel: &Parcel) -> Result<Self> {
        parcel.read_i64()
    }
}

impl Serialize for str {
    fn serialize(&self, parcel: &mut Parcel) -> Result<()> {
        parcel.write_string16(Some(self))
    }
}

impl Serialize for String {
    fn serialize(&self, parcel: &mut Parcel) -> Result<()> {
        parcel.write_string16(Some(self))
    }
}

impl Serialize for Option<String> {
    fn serialize(&self, parcel: &mut Parcel) -> Result<()> {
        parcel.write_string16(self.as_deref())
    }
}

impl Serialize for Option<&str> {
    fn serialize(&self, parcel: &mut Parcel) -> Result<()> {
        parcel.write_string16(*self)
    }
}

impl Deserialize for Option<String> {
    fn deserialize(parcel: &Parcel) -> Result<Self> {
        parcel.read_string16()
    }
}

impl Deserialize for String {
    fn deserialize(parcel: &Parcel) -> Result<Self> {
        parcel.read_string16()?.ok_or(StatusCode::UNEXPECTED_NULL)
    }
}

impl Serialize for SpIBinder {
    fn serialize(&self, parcel: &mut Parcel) -> Result<()> {
        parcel.write_strong_binder(Some(self))
    }
}

impl Serialize for Option<SpIBinder> {
    fn serialize(&self, parcel: &mut Parcel) -> Result<()> {
        parcel.write_strong_binder(self.as_ref())
    }
}

impl Deserialize for Option<SpIBinder> {
    fn deserialize(parcel: &Parcel) -> Result<Self> {
        parcel.read_strong_binder()
    }
}

impl Deserialize for SpIBinder {
    fn deserialize(parcel: &Parcel) -> Result<Self> {
        parcel.read_strong_binder()?.ok_or(StatusCode::UNEXPECTED_NULL)
    }
}
