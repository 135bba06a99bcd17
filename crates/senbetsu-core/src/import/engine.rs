use thiserror::Error;
use tracing::{debug, error};

use crate::error::SenbetsuError;
use crate::models::LocalCandidate;

/// Failure raised by a specification predicate. Always turned into a
/// rejection; never propagated.
#[derive(Debug, Error)]
pub enum SpecificationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0} is unavailable")]
    Unavailable(String),

    #[error("{0}")]
    Other(String),
}

type Predicate = Box<dyn Fn(&LocalCandidate) -> Result<bool, SpecificationError> + Send + Sync>;

/// A named rejection rule. The predicate returns `true` when the candidate
/// passes (is *not* rejected).
pub struct Specification {
    name: String,
    rejection_reason: String,
    predicate: Predicate,
}

impl Specification {
    pub fn new<F>(name: impl Into<String>, rejection_reason: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&LocalCandidate) -> Result<bool, SpecificationError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            rejection_reason: rejection_reason.into(),
            predicate: Box::new(predicate),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rejection_reason(&self) -> &str {
        &self.rejection_reason
    }

    pub fn is_satisfied_by(&self, candidate: &LocalCandidate) -> Result<bool, SpecificationError> {
        (self.predicate)(candidate)
    }

    fn validate(&self) -> Result<(), SenbetsuError> {
        if self.rejection_reason.trim().is_empty() {
            return Err(SenbetsuError::MissingRejectionReason(self.name.clone()));
        }
        Ok(())
    }
}

impl std::fmt::Debug for Specification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Specification")
            .field("name", &self.name)
            .field("rejection_reason", &self.rejection_reason)
            .finish_non_exhaustive()
    }
}

/// Ordered set of specifications. Reasons are reported in registration
/// order.
#[derive(Debug, Default)]
pub struct SpecificationRegistry {
    specifications: Vec<Specification>,
}

impl SpecificationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a specification. Rejects one without rejection text.
    pub fn register(&mut self, specification: Specification) -> Result<(), SenbetsuError> {
        specification.validate()?;
        self.specifications.push(specification);
        Ok(())
    }

    pub fn specifications(&self) -> &[Specification] {
        &self.specifications
    }

    pub fn len(&self) -> usize {
        self.specifications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specifications.is_empty()
    }

    pub fn evaluate(&self, candidate: LocalCandidate) -> Result<ImportDecision, SenbetsuError> {
        evaluate(candidate, &self.specifications)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    /// The predicate ran and said no.
    Rejected,
    /// The predicate failed; the reason carries the failure.
    EvaluationError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub reason: String,
    pub kind: RejectionKind,
}

impl Rejection {
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            kind: RejectionKind::Rejected,
        }
    }
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.reason)
    }
}

/// Outcome for one candidate.
#[derive(Debug, Clone)]
pub struct ImportDecision {
    pub candidate: LocalCandidate,
    pub rejections: Vec<Rejection>,
}

impl ImportDecision {
    pub fn new(candidate: LocalCandidate, rejections: Vec<Rejection>) -> Self {
        Self {
            candidate,
            rejections,
        }
    }

    pub fn approved(&self) -> bool {
        self.rejections.is_empty()
    }

    pub fn reasons(&self) -> impl Iterator<Item = &str> {
        self.rejections.iter().map(|r| r.reason.as_str())
    }
}

/// Run every specification against `candidate` and collect the reasons it
/// was rejected.
///
/// Every specification is checked up front for rejection text; a missing
/// one fails the whole call. Predicate failures become
/// [`RejectionKind::EvaluationError`] rejections and evaluation carries on.
pub fn evaluate(
    candidate: LocalCandidate,
    specifications: &[Specification],
) -> Result<ImportDecision, SenbetsuError> {
    for specification in specifications {
        specification.validate()?;
    }

    let mut rejections = Vec::new();
    for specification in specifications {
        match specification.is_satisfied_by(&candidate) {
            Ok(true) => {}
            Ok(false) => {
                debug!(
                    path = %candidate.path().display(),
                    specification = specification.name(),
                    "Rejected"
                );
                rejections.push(Rejection::rejected(specification.rejection_reason()));
            }
            Err(e) => {
                error!(
                    path = %candidate.path().display(),
                    specification = specification.name(),
                    error = %e,
                    "Couldn't evaluate decision"
                );
                rejections.push(Rejection {
                    reason: format!("{}: {e}", specification.name()),
                    kind: RejectionKind::EvaluationError,
                });
            }
        }
    }

    Ok(ImportDecision::new(candidate, rejections))
}
