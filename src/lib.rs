//! Kerberos v5 client and service wire core.
//!
//! This crate implements the message codec and cryptographic envelope
//! layer of a Kerberos client and service acceptor: DER tickets and their
//! encrypted bodies, Microsoft PAC parsing and signature verification with
//! the MS primitive types it relies on, the UDP/TCP KDC transport policy,
//! and the service-side authenticator replay cache.
//!
//! Credential acquisition flows (AS/TGS orchestration), keytab file
//! formats and SPNEGO glue live above this crate; it consumes keys through
//! the in-memory [`keytab::Keytab`] and exposes ticket, PAC and transport
//! operations through [`proto`], [`pac`] and [`transport`].

// #![deny(warnings)]
#![warn(unused_extern_crates)]
// Enable some groups of clippy lints.
#![deny(clippy::suspicious)]
#![deny(clippy::perf)]
// Specific lints to enforce.
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![deny(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::await_holding_lock)]
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::trivially_copy_pass_by_ref)]
#![deny(clippy::disallowed_types)]
#![deny(clippy::manual_let_else)]
#![allow(clippy::unreachable)]

mod asn1;
pub mod constants;
pub mod crypto;
pub mod error;
pub mod keytab;
pub mod mstypes;
pub mod ndr;
pub mod pac;
pub mod proto;
pub mod service;
pub mod transport;

pub use crate::asn1::constants::{
    AuthorizationDataType, ChecksumType, EncryptionType, KrbErrorCode, PrincipalNameType,
};
