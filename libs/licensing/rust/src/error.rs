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

use std::result;

const UNKNOWN_ERROR_BASE: i32 = i32::MIN;

/// Error codes from Android `libutils`.
// All error codes are negative integer values. Derived from the anonymous enum
// in utils/Errors.h
#[allow(non_camel_case_types)]
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum StatusCode {
    #[error("ok")]
    OK = 0,
    #[error("unknown error")]
    UNKNOWN_ERROR = UNKNOWN_ERROR_BASE,
    #[error("out of memory")]
    NO_MEMORY = -12,
    #[error("invalid operation")]
    INVALID_OPERATION = -38,
    #[error("bad value")]
    BAD_VALUE = -22,
    #[error("bad type")]
    BAD_TYPE = UNKNOWN_ERROR_BASE + 1,
    #[error("name not found")]
    NAME_NOT_FOUND = -2,
    #[error("permission denied")]
    PERMISSION_DENIED = -1,
    #[error("not initialized")]
    NO_INIT = -19,
    #[error("already exists")]
    ALREADY_EXISTS = -17,
    #[error("dead object")]
    DEAD_OBJECT = -32,
    #[error("failed transaction")]
    FAILED_TRANSACTION = UNKNOWN_ERROR_BASE + 2,
    #[error("bad index")]
    BAD_INDEX = -75,
    #[error("not enough data")]
    NOT_ENOUGH_DATA = -61,
    #[error("would block")]
    WOULD_BLOCK = -11,
    #[error("timed out")]
    TIMED_OUT = -110,
    #[error("unknown transaction")]
    UNKNOWN_TRANSACTION = -74,
    #[error("file descriptors not allowed")]
    FDS_NOT_ALLOWED = UNKNOWN_ERROR_BASE + 7,
    #[error("unexpected null")]
    UNEXPECTED_NULL = UNKNOWN_ERROR_BASE + 8,
}

/// A specialized [`Result`](result::Result) for binder operations.
pub type Result<T> = result::Result<T, StatusCode>;
