//! Error types.

use std::collections::TryReserveError;

use thiserror::Error;

use crate::registry::DeviceId;

/// HID transport failures.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("unable to access HID: {0}")]
    Api(String),

    #[error("unable to list HID devices: {0}")]
    Enumerate(String),

    #[error("unable to open device: {0}")]
    Open(String),

    #[error("unable to write report: {0}")]
    Write(String),
}

/// Device registry construction failures.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("unable to allocate device record: {0}")]
    Alloc(#[from] TryReserveError),
}

/// Failures reported by the CLI with a non-zero exit code.
#[derive(Error, Debug)]
pub enum Error {
    #[error("cannot find Webmail Window HID device {0}")]
    NotFound(DeviceId),

    #[error("cannot open Webmail Window HID device: {0}")]
    Open(#[source] TransportError),

    #[error("cannot set LED pattern: {0}")]
    Write(#[source] TransportError),
}
