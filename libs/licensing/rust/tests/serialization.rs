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

//! Wire layout of the licensing transactions.

use licensing::interfaces::{
    BpLicenseResultListener, BpLicensingService, ILicenseResultListener, ILicensingService,
    LicenseResultListener, CHECK_LICENSE_TRANSACTION, VERIFY_LICENSE_TRANSACTION,
};
use licensing::parcel::{BINDER_TYPE_BINDER, INTERFACE_HEADER, STRICT_MODE_PENALTY_GATHER};
use licensing::{
    Binder, IBinder, Parcel, SpIBinder, StatusCode, TransactionCode, TransactionFlags,
    VerificationResult,
};

use std::sync::{Arc, Mutex};

/// A transaction as it left the proxy.
#[derive(Debug, Clone)]
struct Sent {
    code: TransactionCode,
    flags: TransactionFlags,
    data: Vec<u8>,
    objects: usize,
    expects_reply: bool,
}

#[derive(Default)]
struct RecordingBinder {
    sent: Mutex<Vec<Sent>>,
}

impl IBinder for RecordingBinder {
    fn transact(
        &self,
        code: TransactionCode,
        data: &Parcel,
        reply: Option<&mut Parcel>,
        flags: TransactionFlags,
    ) -> licensing::Result<()> {
        self.sent.lock().unwrap().push(Sent {
            code,
            flags,
            data: data.data().to_vec(),
            objects: data.objects_count(),
            expects_reply: reply.is_some(),
        });
        Ok(())
    }
}

fn recording() -> (Arc<RecordingBinder>, SpIBinder) {
    let recorder = Arc::new(RecordingBinder::default());
    (recorder.clone(), SpIBinder::new(Forward(recorder)))
}

struct Forward(Arc<RecordingBinder>);

impl IBinder for Forward {
    fn transact(
        &self,
        code: TransactionCode,
        data: &Parcel,
        reply: Option<&mut Parcel>,
        flags: TransactionFlags,
    ) -> licensing::Result<()> {
        self.0.transact(code, data, reply, flags)
    }
}

fn push_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn push_string16(out: &mut Vec<u8>, value: &str) {
    let units: Vec<u16> = value.encode_utf16().collect();
    out.extend_from_slice(&(units.len() as i32).to_le_bytes());
    for unit in units.iter().chain([0u16].iter()) {
        out.extend_from_slice(&unit.to_le_bytes());
    }
    while out.len() % 4 != 0 {
        out.push(0);
    }
}

fn interface_token(descriptor: &str) -> Vec<u8> {
    let mut out = Vec::new();
    push_u32(&mut out, STRICT_MODE_PENALTY_GATHER);
    out.extend_from_slice(&(-1i32).to_le_bytes());
    push_u32(&mut out, INTERFACE_HEADER);
    push_string16(&mut out, descriptor);
    out
}

#[test]
fn check_license_layout() {
    let (recorder, remote) = recording();
    let listener: SpIBinder = Binder::new(LicenseResultListener::new(|_| {})).into();

    BpLicensingService::new(remote)
        .check_license(0x0102_0304_0506_0708, "com.example.game", &listener)
        .unwrap();

    let mut expected = interface_token("com.android.vending.licensing.ILicensingService");
    expected.extend_from_slice(&0x0102_0304_0506_0708i64.to_le_bytes());
    push_string16(&mut expected, "com.example.game");
    push_u32(&mut expected, BINDER_TYPE_BINDER);
    push_u32(&mut expected, 0);

    let sent = recorder.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].code, CHECK_LICENSE_TRANSACTION);
    assert_eq!(sent[0].code, 1);
    assert_eq!(sent[0].flags, SpIBinder::FLAG_ONEWAY);
    assert!(!sent[0].expects_reply);
    assert_eq!(sent[0].objects, 1);
    assert_eq!(sent[0].data, expected);
}

#[test]
fn verify_license_layout() {
    let (recorder, remote) = recording();

    BpLicenseResultListener::new(remote).verify_license(0x101, "D", "").unwrap();

    let mut expected = interface_token("com.android.vending.licensing.ILicenseResultListener");
    expected.extend_from_slice(&0x101i32.to_le_bytes());
    push_string16(&mut expected, "D");
    push_string16(&mut expected, "");

    let sent = recorder.sent.lock().unwrap();
    assert_eq!(sent[0].code, VERIFY_LICENSE_TRANSACTION);
    assert_eq!(sent[0].flags, SpIBinder::FLAG_ONEWAY);
    assert_eq!(sent[0].objects, 0);
    assert_eq!(sent[0].data, expected);
}

fn listener() -> (SpIBinder, Arc<Mutex<Vec<VerificationResult>>>) {
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();
    let binder = Binder::new(LicenseResultListener::new(move |result| {
        sink.lock().unwrap().push(result);
    }));
    (binder.into(), received)
}

#[test]
fn listener_accepts_null_strings() {
    let (binder, received) = listener();

    let mut data = Parcel::new();
    data.write_interface_token("com.android.vending.licensing.ILicenseResultListener").unwrap();
    data.write(&0x103i32).unwrap();
    data.write_string16(None).unwrap();
    data.write_string16(None).unwrap();
    binder.transact(VERIFY_LICENSE_TRANSACTION, &data, None, SpIBinder::FLAG_ONEWAY).unwrap();

    assert_eq!(
        *received.lock().unwrap(),
        vec![VerificationResult { response_code: 0x103, ..Default::default() }]
    );
}

#[test]
fn listener_rejects_foreign_token() {
    let (binder, received) = listener();

    let mut data = Parcel::new();
    data.write_interface_token("com.android.vending.licensing.ILicensingService").unwrap();
    data.write(&0i32).unwrap();
    data.write("D").unwrap();
    data.write("S").unwrap();
    assert_eq!(
        binder.transact(VERIFY_LICENSE_TRANSACTION, &data, Some(&mut Parcel::new()), 0),
        Err(StatusCode::PERMISSION_DENIED)
    );

    let mut reply = Parcel::new();
    assert_eq!(
        binder.transact(VERIFY_LICENSE_TRANSACTION + 1, &Parcel::new(), Some(&mut reply), 0),
        Err(StatusCode::UNKNOWN_TRANSACTION)
    );
    assert!(received.lock().unwrap().is_empty());
}

#[test]
fn listener_reports_its_descriptor() {
    let (binder, _) = listener();
    assert_eq!(
        binder.get_interface_descriptor().unwrap(),
        <BpLicenseResultListener as ILicenseResultListener>::INTERFACE_DESCRIPTOR
    );
    assert!(binder.ping_binder().is_ok());
    assert!(BpLicenseResultListener::from_binder(binder.clone()).is_ok());
    assert_eq!(
        BpLicensingService::from_binder(binder).unwrap_err(),
        StatusCode::BAD_TYPE
    );
}
