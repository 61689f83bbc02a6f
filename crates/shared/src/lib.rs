//! Types shared between the prediction client and its front ends: the form
//! schema, the wire protocol of the prediction service and the error taxonomy.

pub mod domain;
pub mod error;
pub mod protocol;
