//! Ordered processor chains.
//!
//! A chain is assembled once when the client context starts and is only
//! read afterwards, so it is shared by every concurrent invocation.

use std::fmt;

/// A stage that can report its own name for diagnostics.
pub trait NamedStage {
    fn name(&self) -> &'static str;
}

/// Immutable ordered list of stages.
pub struct ProcessorChain<S: ?Sized> {
    stages: Vec<Box<S>>,
}

impl<S: ?Sized> ProcessorChain<S> {
    pub fn builder() -> ProcessorChainBuilder<S> {
        ProcessorChainBuilder { stages: Vec::new() }
    }

    /// Stages in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &S> {
        self.stages.iter().map(|s| s.as_ref())
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl<S: NamedStage + ?Sized> ProcessorChain<S> {
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.iter().map(|s| s.name()).collect()
    }
}

impl<S: NamedStage + ?Sized> fmt::Debug for ProcessorChain<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ProcessorChain")
            .field(&self.stage_names())
            .finish()
    }
}

/// Builder for [`ProcessorChain`].
pub struct ProcessorChainBuilder<S: ?Sized> {
    stages: Vec<Box<S>>,
}

impl<S: ?Sized> ProcessorChainBuilder<S> {
    /// Appends a stage after the ones already added.
    pub fn stage(mut self, stage: Box<S>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn build(self) -> ProcessorChain<S> {
        ProcessorChain {
            stages: self.stages,
        }
    }
}
