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

//! Container for messages that are sent via binder.

use crate::binder::SpIBinder;
use crate::error::{Result, StatusCode};

use std::cell::Cell;
use std::fmt;

mod parcelable;

pub use self::parcelable::{Deserialize, Serialize};

const fn pack_chars(c1: u8, c2: u8, c3: u8, c4: u8) -> u32 {
    ((c1 as u32) << 24) | ((c2 as u32) << 16) | ((c3 as u32) << 8) | (c4 as u32)
}

/// Strict mode policy word written ahead of every interface token.
pub const STRICT_MODE_PENALTY_GATHER: u32 = 1 << 31;

/// Work source written by callers that do not propagate one.
pub const UNSET_WORK_SOURCE: i32 = -1;

/// Header word that marks a system (non-vendor) interface token.
pub const INTERFACE_HEADER: u32 = pack_chars(b'S', b'Y', b'S', b'T');

/// Type word of a flattened strong binder reference.
pub const BINDER_TYPE_BINDER: u32 = pack_chars(b's', b'b', b'*', 0x85);

const NULL_BINDER: u32 = 0;

fn pad_size(len: usize) -> usize {
    (len + 3) & !3
}

/// Container for a message (data and object references) that can be sent
/// through Binder.
///
/// A Parcel contains flattened data that will be unflattened on the other side
/// of the IPC (using the various methods here for writing specific types, or
/// the general [`Serialize`] and [`Deserialize`] traits), and references to
/// live Binder objects that the other side receives as handles to the original
/// object.
///
/// All values are little-endian and every write is padded to four bytes, as
/// in libbinder's `Parcel`.
pub struct Parcel {
    data: Vec<u8>,
    objects: Vec<SpIBinder>,
    position: Cell<usize>,
}

impl Parcel {
    pub fn new() -> Self {
        Self { data: Vec::new(), objects: Vec::new(), position: Cell::new(0) }
    }

    /// Copy of this parcel as the receiving side of a transaction sees it: same
    /// data and objects, read position at the start.
    pub(crate) fn delivered(&self) -> Self {
        Self { data: self.data.clone(), objects: self.objects.clone(), position: Cell::new(0) }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns the total amount of data contained in the parcel.
    pub fn data_size(&self) -> usize {
        self.data.len()
    }

    /// Returns the current position in the parcel data. Never more than
    /// `data_size()`.
    pub fn data_position(&self) -> usize {
        self.position.get()
    }

    /// Returns the amount of data remaining to be read from the parcel. That
    /// is, `data_size() - data_position()`.
    pub fn data_avail(&self) -> usize {
        self.data.len() - self.position.get()
    }

    /// Move the current read position in the parcel.
    pub fn set_data_position(&self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(StatusCode::BAD_VALUE);
        }
        self.position.set(pos);
        Ok(())
    }

    /// Number of binder objects referenced by this parcel.
    pub fn objects_count(&self) -> usize {
        self.objects.len()
    }

    fn write_aligned(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
        let padded = pad_size(self.data.len());
        self.data.resize(padded, 0);
    }

    fn read_aligned(&self, len: usize) -> Result<&[u8]> {
        let start = self.position.get();
        let padded = pad_size(len);
        if self.data.len() - start < padded {
            return Err(StatusCode::NOT_ENOUGH_DATA);
        }
        self.position.set(start + padded);
        Ok(&self.data[start..start + len])
    }

    pub fn write_i32(&mut self, val: i32) -> Result<()> {
        self.write_aligned(&val.to_le_bytes());
        Ok(())
    }

    pub fn write_u32(&mut self, val: u32) -> Result<()> {
        self.write_aligned(&val.to_le_bytes());
        Ok(())
    }

    pub fn write_i64(&mut self, val: i64) -> Result<()> {
        self.write_aligned(&val.to_le_bytes());
        Ok(())
    }

    pub fn write_bool(&mut self, val: bool) -> Result<()> {
        self.write_i32(val as i32)
    }

    /// Take a UTF-8 encoded string, convert to UTF-16, write it to the parcel.
    ///
    /// `None` is written as a null string (length -1).
    pub fn write_string16(&mut self, s: Option<&str>) -> Result<()> {
        let s = match s {
            Some(s) => s,
            None => return self.write_i32(-1),
        };
        let units: Vec<u16> = s.encode_utf16().collect();
        let len: i32 = units.len().try_into().map_err(|_| StatusCode::BAD_VALUE)?;
        self.write_i32(len)?;

        let mut bytes = Vec::with_capacity((units.len() + 1) * 2);
        for unit in units.iter().chain(std::iter::once(&0u16)) {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        self.write_aligned(&bytes);
        Ok(())
    }

    /// Writes a reply header that signals the absence of an exception.
    pub fn write_no_exception(&mut self) -> Result<()> {
        self.write_i32(0)
    }

    /// Writes the RPC header.
    pub fn write_interface_token(&mut self, interface: &str) -> Result<()> {
        self.write_u32(STRICT_MODE_PENALTY_GATHER)?;
        self.write_i32(UNSET_WORK_SOURCE)?;
        self.write_u32(INTERFACE_HEADER)?;
        self.write_string16(Some(interface))
    }

    /// Flattens a reference to a live binder object into the parcel.
    pub fn write_strong_binder(&mut self, binder: Option<&SpIBinder>) -> Result<()> {
        match binder {
            Some(binder) => {
                let index: u32 =
                    self.objects.len().try_into().map_err(|_| StatusCode::NO_MEMORY)?;
                self.write_u32(BINDER_TYPE_BINDER)?;
                self.write_u32(index)?;
                self.objects.push(binder.clone());
            }
            None => {
                self.write_u32(NULL_BINDER)?;
                self.write_u32(0)?;
            }
        }
        Ok(())
    }

    pub fn read_i32(&self) -> Result<i32> {
        let bytes = self.read_aligned(4)?;
        Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_u32(&self) -> Result<u32> {
        Ok(self.read_i32()? as u32)
    }

    pub fn read_i64(&self) -> Result<i64> {
        let bytes = self.read_aligned(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(i64::from_le_bytes(buf))
    }

    pub fn read_bool(&self) -> Result<bool> {
        Ok(self.read_i32()? != 0)
    }

    /// Reads a UTF-16 string, returning `None` for a null string.
    pub fn read_string16(&self) -> Result<Option<String>> {
        let start = self.position.get();
        let len = self.read_i32()?;
        if len == -1 {
            return Ok(None);
        }
        let result = usize::try_from(len)
            .map_err(|_| StatusCode::BAD_VALUE)
            .and_then(|len| self.read_utf16_units(len));
        if result.is_err() {
            self.position.set(start);
        }
        result.map(Some)
    }

    fn read_utf16_units(&self, len: usize) -> Result<String> {
        let byte_len = len.checked_add(1).and_then(|n| n.checked_mul(2)).ok_or(StatusCode::BAD_VALUE)?;
        let bytes = self.read_aligned(byte_len)?;
        let units: Vec<u16> =
            bytes.chunks_exact(2).map(|pair| u16::from_le_bytes([pair[0], pair[1]])).collect();
        if units[len] != 0 {
            return Err(StatusCode::BAD_VALUE);
        }
        String::from_utf16(&units[..len]).map_err(|_| StatusCode::BAD_VALUE)
    }

    /// Parses the RPC header, returning true if the interface name in the
    /// header matches the expected interface from the caller.
    pub fn enforce_interface(&self, interface: &str) -> bool {
        let header = (|| -> Result<Option<String>> {
            let _strict_mode_policy = self.read_u32()?;
            let _work_source = self.read_i32()?;
            if self.read_u32()? != INTERFACE_HEADER {
                return Err(StatusCode::BAD_TYPE);
            }
            self.read_string16()
        })();

        match header {
            Ok(Some(descriptor)) if descriptor == interface => true,
            Ok(descriptor) => {
                log::error!(
                    "Expected interface {} but received {:?}",
                    interface,
                    descriptor.as_deref().unwrap_or("<null>")
                );
                false
            }
            Err(status) => {
                log::error!("Malformed interface token while expecting {}: {}", interface, status);
                false
            }
        }
    }

    /// Reads a flattened binder reference, returning `None` for a null
    /// reference.
    pub fn read_strong_binder(&self) -> Result<Option<SpIBinder>> {
        let kind = self.read_u32()?;
        let index = self.read_u32()?;
        match kind {
            NULL_BINDER => Ok(None),
            BINDER_TYPE_BINDER => self
                .objects
                .get(index as usize)
                .cloned()
                .map(Some)
                .ok_or(StatusCode::BAD_INDEX),
            _ => Err(StatusCode::BAD_TYPE),
        }
    }

    /// Write a value that implements [`Serialize`] to the parcel.
    pub fn write<S: Serialize + ?Sized>(&mut self, parcelable: &S) -> Result<()> {
        parcelable.serialize(self)
    }

    /// Read a value that implements [`Deserialize`] from the parcel.
    pub fn read<D: Deserialize>(&self) -> Result<D> {
        D::deserialize(self)
    }
}

impl Default for Parcel {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Parcel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parcel")
            .field("data_size", &self.data.len())
            .field("data_position", &self.position.get())
            .field("objects", &self.objects.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_are_padded_to_four_bytes() {
        let mut parcel = Parcel::new();
        parcel.write_string16(Some("a")).unwrap();
        // length word, 'a', NUL terminator
        assert_eq!(parcel.data(), &[1, 0, 0, 0, b'a', 0, 0, 0]);

        parcel.write_i64(-2).unwrap();
        assert_eq!(parcel.data_size(), 16);
    }

    #[test]
    fn null_string_is_negative_length() {
        let mut parcel = Parcel::new();
        parcel.write_string16(None).unwrap();
        assert_eq!(parcel.data(), &(-1i32).to_le_bytes());
        assert_eq!(parcel.read_string16(), Ok(None));
    }

    #[test]
    fn reads_past_end_fail() {
        let mut parcel = Parcel::new();
        parcel.write_i32(7).unwrap();
        assert_eq!(parcel.read_i64(), Err(StatusCode::NOT_ENOUGH_DATA));
        assert_eq!(parcel.read_i32(), Ok(7));
        assert_eq!(parcel.read_i32(), Err(StatusCode::NOT_ENOUGH_DATA));
        assert_eq!(parcel.data_avail(), 0);
    }

    #[test]
    fn truncated_string_leaves_position() {
        let mut parcel = Parcel::new();
        parcel.write_i32(50).unwrap();
        parcel.write_i32(0).unwrap();
        assert_eq!(parcel.read_string16(), Err(StatusCode::NOT_ENOUGH_DATA));
        assert_eq!(parcel.data_position(), 0);
    }

    #[test]
    fn string_without_terminator_is_rejected() {
        let mut parcel = Parcel::new();
        parcel.write_i32(1).unwrap();
        parcel.write_u32(0x0041_0041).unwrap();
        assert_eq!(parcel.read_string16(), Err(StatusCode::BAD_VALUE));
    }

    #[test]
    fn interface_token_layout() {
        let mut parcel = Parcel::new();
        parcel.write_interface_token("x").unwrap();
        assert_eq!(parcel.read_u32(), Ok(STRICT_MODE_PENALTY_GATHER));
        assert_eq!(parcel.read_i32(), Ok(UNSET_WORK_SOURCE));
        assert_eq!(parcel.read_u32(), Ok(0x5359_5354));
        assert_eq!(parcel.read_string16(), Ok(Some("x".to_string())));
    }

    #[test]
    fn enforce_interface_checks_descriptor() {
        let mut parcel = Parcel::new();
        parcel.write_interface_token("android.os.ITest").unwrap();
        assert!(parcel.enforce_interface("android.os.ITest"));

        parcel.set_data_position(0).unwrap();
        assert!(!parcel.enforce_interface("android.os.IOther"));

        let empty = Parcel::new();
        assert!(!empty.enforce_interface("android.os.ITest"));
    }

    #[test]
    fn null_binder_reference() {
        let mut parcel = Parcel::new();
        parcel.write_strong_binder(None).unwrap();
        assert_eq!(parcel.objects_count(), 0);
        assert!(parcel.read_strong_binder().unwrap().is_none());
    }

    #[test]
    fn dangling_binder_reference_is_rejected() {
        let mut parcel = Parcel::new();
        parcel.write_u32(BINDER_TYPE_BINDER).unwrap();
        parcel.write_u32(3).unwrap();
        assert_eq!(parcel.read_strong_binder().err(), Some(StatusCode::BAD_INDEX));
    }

    #[test]
    fn set_data_position_is_bounded() {
        let mut parcel = Parcel::new();
        parcel.write_i32(1).unwrap();
        assert_eq!(parcel.set_data_position(5), Err(StatusCode::BAD_VALUE));
        assert_eq!(parcel.set_data_position(4), Ok(()));
    }
}
