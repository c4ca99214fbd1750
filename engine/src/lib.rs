//! Map API key probe engine.
//!
//! Tests a key against AMap, Baidu and Tencent endpoints by sending one
//! representative request per product surface and classifying the answer
//! with a substring heuristic.
//!
//! Flow: [`registry`] resolves identifiers to URLs, [`probe`] sends the
//! requests, [`classifier`] judges each answer, [`validator`] collects the
//! outcomes in request order. [`session`] wraps the same path for
//! interactive front ends.

pub mod classifier;
pub mod config;
pub mod error;
pub mod probe;
pub mod registry;
pub mod session;
pub mod validator;

pub use classifier::Classifier;
pub use config::{EngineConfig, ProbeMode};
pub use error::{ConfigError, SessionError, ValidationError};
pub use probe::{HttpProber, KeyProber, ProbeOutcome};
pub use registry::{ServiceDefinition, ServiceRegistry};
pub use session::ProbeSession;
pub use validator::{ValidationRequest, Validator};
