//! Types shared between the face engine client and its front-ends.

pub mod domain;
pub mod error;
pub mod protocol;
