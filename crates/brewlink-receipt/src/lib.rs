//! # brewlink-receipt
//!
//! The receipt submission flow: a captured image travels through REST
//! initialization, binary upload, and asynchronous server-side processing
//! to produce a cafe session. The flow is driven by
//! [`machine::ReceiptSubmissionMachine`], which composes the REST
//! collaborator client, the receipt push channel, and the session store.

pub mod api;
pub mod image;
pub mod machine;

pub use api::{HttpReceiptApi, ReceiptApi, ReceiptInit};
pub use image::{CapturedImage, ImageSource};
pub use machine::{
    MachineState, ProcessingPhase, ReceiptSubmissionMachine, SubmissionOutcome, SubmitMode,
    WarningChoice, WarningResolution,
};
