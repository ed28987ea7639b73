//! Crate-wide error type for the one fallible surface (the verifier).
//!
//! Everything else in this crate either can't fail (analyses over an
//! entry-less graph just return an empty result) or fails loudly via a
//! panic (builder preconditions, per the design's error taxonomy: those
//! are programmer bugs, not values to recover from).

use std::fmt;

use crate::entity::{BlockId, InstId};

/// An entity a `VerifierError` can point at.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum AnyEntity {
    Block(BlockId),
    Inst(InstId),
}

impl fmt::Display for AnyEntity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AnyEntity::Block(b) => write!(f, "{}", b),
            AnyEntity::Inst(i) => write!(f, "{}", i),
        }
    }
}

impl From<BlockId> for AnyEntity {
    fn from(b: BlockId) -> Self {
        AnyEntity::Block(b)
    }
}

impl From<InstId> for AnyEntity {
    fn from(i: InstId) -> Self {
        AnyEntity::Inst(i)
    }
}

/// A single structural-invariant violation, located at the entity it
/// was detected on.
#[derive(Clone, Debug)]
pub struct VerifierError {
    pub location: AnyEntity,
    pub message: String,
}

impl fmt::Display for VerifierError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

/// The full set of violations found by one verifier run.
#[derive(Clone, Debug, Default)]
pub struct VerifierErrors(pub Vec<VerifierError>);

impl VerifierErrors {
    pub fn new() -> Self {
        VerifierErrors(Vec::new())
    }

    pub fn push(&mut self, location: impl Into<AnyEntity>, message: impl Into<String>) {
        self.0.push(VerifierError {
            location: location.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for VerifierErrors {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", e)?;
        }
        Ok(())
    }
}

impl std::error::Error for VerifierErrors {}

/// Any error this crate's public API can produce.
#[derive(Clone, Debug)]
pub enum CodegenError {
    Verifier(VerifierErrors),
}

impl fmt::Display for CodegenError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CodegenError::Verifier(errs) => write!(f, "verifier errors:\n{}", errs),
        }
    }
}

impl std::error::Error for CodegenError {}

impl From<VerifierErrors> for CodegenError {
    fn from(errs: VerifierErrors) -> Self {
        CodegenError::Verifier(errs)
    }
}

pub type CodegenResult<T> = Result<T, CodegenError>;
