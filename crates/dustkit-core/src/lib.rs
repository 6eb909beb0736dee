//! Core types for reading and transforming Dustforce levels.
//!
//! This is the model-level leaf crate. It defines the self-describing
//! [`Variable`] value tree used for all semi-structured metadata, typed
//! [`Field`] views over variable maps, the [`TxMatrix`] affine transform
//! applied to every spatial object, and the shared [`ObjectId`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod field;
pub mod id;
pub mod json;
pub mod transform;
pub mod variable;

pub use error::CoreError;
pub use field::{get_field, set_field, try_get_field, ArrayField, Field, VariableValue};
pub use id::ObjectId;
pub use json::{json_to_variables, map_to_json, merge_schema, variables_to_json};
pub use transform::{Transformable, TxMatrix};
pub use variable::{Variable, VariableArray, VariableMap, VariableType};
