//! Import-side decisions: whether a local file may enter the library.
//!
//! A [`Specification`] is a named predicate with a fixed rejection reason.
//! [`evaluate`] runs every registered specification against a candidate and
//! collects all the reasons it was rejected; an empty list means approved.
//! [`ImportDecisionMaker`] drives this for whole folders.

mod decision_maker;
mod engine;
mod sample;
mod specs;

pub use decision_maker::{filter_existing_files, CandidateResolver, ImportDecisionMaker, UNPARSEABLE_REASON};
pub use engine::{
    evaluate, ImportDecision, Rejection, RejectionKind, Specification, SpecificationError,
    SpecificationRegistry,
};
pub use sample::{minimum_runtime, DetectSample, SampleStatus};
pub use specs::{NotInUse, NotSample, NotUnpacking, UnpackingCheck, UNPACKING_FRESHNESS};
