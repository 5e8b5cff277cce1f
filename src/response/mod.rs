//! Response processor chain
//!
//! Maps the raw [`HttpResponse`] back to the operation's [`Reply`]:
//!
//! 1. `headers`: fills response-header slots
//! 2. `entity`: raw shortcuts, status policy and deserialization
//!
//! Unless a raw return type hands the body to the caller, the body is read
//! or drained exactly once whatever the outcome.

mod entity;
mod headers;

use std::sync::Arc;

use async_trait::async_trait;

use crate::chain::{NamedStage, ProcessorChain};
use crate::codec::CodecRegistry;
use crate::descriptor::InvocationDescriptor;
use crate::error::ResponseError;
use crate::types::{HttpResponse, Reply};

pub use entity::EntityStage;
pub use headers::HeaderStage;

/// State shared by the response stages of one invocation.
#[derive(Debug)]
pub struct ResponseContext {
    /// Taken by the entity stage when the caller asked for the raw response.
    pub response: Option<HttpResponse>,
    pub reply: Reply,
}

impl ResponseContext {
    pub fn new(response: HttpResponse) -> Self {
        Self {
            response: Some(response),
            reply: Reply::None,
        }
    }

    fn response_mut(&mut self) -> Result<&mut HttpResponse, ResponseError> {
        self.response.as_mut().ok_or(ResponseError::MissingResponse)
    }
}

/// One step of response processing.
#[async_trait]
pub trait ResponseStage: NamedStage + Send + Sync {
    async fn process(
        &self,
        context: &mut ResponseContext,
        descriptor: &InvocationDescriptor,
    ) -> Result<(), ResponseError>;
}

/// A stage failure together with the response, when it is still held.
#[derive(Debug)]
pub struct ResponseChainFailure {
    pub stage: &'static str,
    pub error: ResponseError,
    pub response: Option<HttpResponse>,
}

/// The ordered response stages.
#[derive(Debug)]
pub struct ResponseChain {
    chain: ProcessorChain<dyn ResponseStage>,
}

impl ResponseChain {
    pub fn new(chain: ProcessorChain<dyn ResponseStage>) -> Self {
        Self { chain }
    }

    pub fn standard(codecs: Arc<CodecRegistry>) -> Self {
        Self::new(
            ProcessorChain::<dyn ResponseStage>::builder()
                .stage(Box::new(HeaderStage))
                .stage(Box::new(EntityStage::new(codecs)))
                .build(),
        )
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.chain.stage_names()
    }

    pub async fn run(
        &self,
        response: HttpResponse,
        descriptor: &InvocationDescriptor,
    ) -> Result<Reply, ResponseChainFailure> {
        let mut context = ResponseContext::new(response);
        for stage in self.chain.iter() {
            if let Err(error) = stage.process(&mut context, descriptor).await {
                tracing::debug!(
                    target: "wirelink::response",
                    invocation = %descriptor.id(),
                    stage = stage.name(),
                    err = %error,
                    "response stage failed"
                );
                return Err(ResponseChainFailure {
                    stage: stage.name(),
                    error,
                    response: context.response,
                });
            }
        }
        Ok(context.reply)
    }
}
