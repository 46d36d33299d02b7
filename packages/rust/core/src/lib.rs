//! Resolution orchestration for bibresolve.
//!
//! [`Resolver`] walks an ordered provider list per lookup kind and returns the
//! first record along with the attempt trace. [`Annotator`] optionally enriches
//! a resolved record with generated keywords and a summary.

pub mod annotate;
pub mod cancel;
pub mod resolver;

pub use annotate::Annotator;
pub use cancel::CancellationToken;
pub use resolver::{Resolution, ResolveFailure, Resolver, ResolverBuilder};
