use std::sync::Arc;

use async_trait::async_trait;

use super::{ResponseContext, ResponseStage};
use crate::chain::NamedStage;
use crate::codec::{CodecRegistry, resolve_deserializer};
use crate::descriptor::InvocationDescriptor;
use crate::error::ResponseError;
use crate::types::{Reply, ResponseBody, ReturnType};

/// Turns the response body into the declared return value.
///
/// Raw return types take the response or its body as is. Otherwise a
/// non-2xx status is an error (the body stays buffered for inspection),
/// 204, 205 and unit returns yield [`Reply::None`], and everything else
/// goes through the resolved deserializer.
pub struct EntityStage {
    codecs: Arc<CodecRegistry>,
}

impl EntityStage {
    pub fn new(codecs: Arc<CodecRegistry>) -> Self {
        Self { codecs }
    }
}

impl NamedStage for EntityStage {
    fn name(&self) -> &'static str {
        "entity"
    }
}

#[async_trait]
impl ResponseStage for EntityStage {
    async fn process(
        &self,
        context: &mut ResponseContext,
        descriptor: &InvocationDescriptor,
    ) -> Result<(), ResponseError> {
        let target = descriptor.return_type();
        match target {
            ReturnType::RawResponse => {
                let response = context.response.take().ok_or(ResponseError::MissingResponse)?;
                context.reply = Reply::Response(response);
                return Ok(());
            }
            ReturnType::RawEntity => {
                let response = context
                    .response
                    .as_mut()
                    .ok_or(ResponseError::MissingResponse)?;
                context.reply = Reply::Entity(std::mem::take(&mut response.body));
                return Ok(());
            }
            _ => {}
        }

        let response = context
            .response
            .as_mut()
            .ok_or(ResponseError::MissingResponse)?;
        if !response.is_success() {
            response.body.buffer().await.map_err(ResponseError::Body)?;
            return Err(ResponseError::UnsuccessfulStatus {
                status: response.status,
            });
        }
        if response.is_no_content() || target.is_unit() {
            response.body.drain().await.map_err(ResponseError::Body)?;
            context.reply = Reply::None;
            return Ok(());
        }

        let Some(reference) = resolve_deserializer(descriptor) else {
            discard(&mut response.body).await;
            if descriptor.is_asynchronous() {
                context.reply = Reply::None;
                return Ok(());
            }
            return Err(ResponseError::ParserUndefined {
                return_type: target.describe(),
            });
        };
        let deserializer = match self.codecs.deserializer(&reference, target) {
            Ok(deserializer) => deserializer,
            Err(e) => {
                discard(&mut response.body).await;
                return Err(e.into());
            }
        };
        let body = response.body.bytes().await.map_err(ResponseError::Body)?;
        context.reply = deserializer.deserialize(&body, target)?;
        Ok(())
    }
}

/// Drains a body on an error path, where the drain outcome is secondary.
async fn discard(body: &mut ResponseBody) {
    if let Err(e) = body.drain().await {
        tracing::debug!(target: "wirelink::response", err = %e, "failed to drain response body");
    }
}

impl std::fmt::Debug for EntityStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityStage").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{DeserializerRef, Lifecycle};
    use crate::endpoint::{Detachable, EndpointDefinition, Operation};
    use crate::error::CodecError;
    use crate::request::test_support::descriptor;
    use crate::response::test_support::response;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    struct User {
        id: u64,
        first_name: String,
    }

    fn json_endpoint() -> crate::endpoint::EndpointBuilder {
        EndpointDefinition::builder("E")
            .host("localhost")
            .deserializer(DeserializerRef::json())
    }

    async fn run(
        operation: Operation,
        status: u16,
        body: &'static str,
    ) -> (Result<(), ResponseError>, ResponseContext) {
        let d = descriptor(json_endpoint(), operation, Vec::new());
        let mut context = ResponseContext::new(response(status, &[], body));
        let result = EntityStage::new(Arc::new(CodecRegistry::new()))
            .process(&mut context, &d)
            .await;
        (result, context)
    }

    fn body_consumed(context: &ResponseContext) -> bool {
        context
            .response
            .as_ref()
            .is_some_and(|r| r.body.is_consumed())
    }

    #[tokio::test]
    async fn deserializes_models() {
        let (result, context) = run(
            Operation::get("op", "/").returns(ReturnType::model::<User>()),
            200,
            r#"{"id":1,"firstName":"A"}"#,
        )
        .await;
        result.unwrap();
        assert!(body_consumed(&context));
        assert_eq!(
            context.reply.into_model::<User>(),
            Some(User {
                id: 1,
                first_name: "A".into()
            })
        );
    }

    #[tokio::test]
    async fn no_content_statuses_skip_the_deserializer() {
        for status in [204, 205] {
            let (result, context) = run(
                Operation::get("op", "/").returns(ReturnType::model::<User>()),
                status,
                "not json",
            )
            .await;
            result.unwrap();
            assert!(context.reply.is_none());
            assert!(body_consumed(&context));
        }
    }

    #[tokio::test]
    async fn unit_returns_drain_the_body() {
        let (result, context) = run(Operation::get("op", "/"), 200, "ignored").await;
        result.unwrap();
        assert!(context.reply.is_none());
        assert!(body_consumed(&context));
    }

    #[tokio::test]
    async fn raw_response_is_handed_over_unread() {
        let (result, context) =
            run(Operation::get("op", "/").returns(ReturnType::RawResponse), 500, "boom").await;
        result.unwrap();
        assert!(context.response.is_none());
        let mut response = context.reply.into_response().unwrap();
        assert!(!response.body.is_consumed());
        assert_eq!(response.body.text().await.unwrap(), "boom");
    }

    #[tokio::test]
    async fn raw_entity_is_handed_over_unread() {
        let (result, context) =
            run(Operation::get("op", "/").returns(ReturnType::RawEntity), 200, "data").await;
        result.unwrap();
        let mut entity = context.reply.into_entity().unwrap();
        assert_eq!(entity.text().await.unwrap(), "data");
    }

    #[tokio::test]
    async fn detached_deserializer_returns_raw_text() {
        let (result, context) = run(
            Operation::get("op", "/")
                .detach(Detachable::Deserializer)
                .returns(ReturnType::Text),
            200,
            r#"{"id":1}"#,
        )
        .await;
        result.unwrap();
        assert_eq!(context.reply.into_text().as_deref(), Some(r#"{"id":1}"#));
    }

    #[tokio::test]
    async fn missing_deserializer_is_parser_undefined() {
        let (result, context) = run(
            Operation::get("op", "/")
                .detach(Detachable::Deserializer)
                .returns(ReturnType::model::<User>()),
            200,
            "{}",
        )
        .await;
        assert!(matches!(result, Err(ResponseError::ParserUndefined { .. })));
        assert!(body_consumed(&context));
    }

    #[tokio::test]
    async fn asynchronous_calls_without_deserializer_yield_nothing() {
        let (result, context) = run(
            Operation::get("op", "/")
                .asynchronous()
                .detach(Detachable::Deserializer)
                .returns(ReturnType::model::<User>()),
            200,
            "{}",
        )
        .await;
        result.unwrap();
        assert!(context.reply.is_none());
    }

    #[tokio::test]
    async fn unsuccessful_status_buffers_the_body() {
        let (result, mut context) = run(
            Operation::get("op", "/").returns(ReturnType::model::<User>()),
            503,
            "maintenance",
        )
        .await;
        assert!(matches!(
            result,
            Err(ResponseError::UnsuccessfulStatus { status: 503 })
        ));
        let response = context.response.as_mut().unwrap();
        assert!(response.body.is_buffered());
        assert_eq!(response.body.text().await.unwrap(), "maintenance");
    }

    #[tokio::test]
    async fn codec_failures_still_drain_the_body() {
        let (result, context) = run(
            Operation::get("op", "/").returns(ReturnType::model::<User>()),
            200,
            "not json",
        )
        .await;
        assert!(matches!(result, Err(ResponseError::Codec(_))));
        assert!(body_consumed(&context));

        let broken = DeserializerRef::custom("broken", Lifecycle::PerCall, || {
            Err::<crate::codec::JsonCodec, _>(CodecError::instantiation("broken", "no constructor"))
        });
        let (result, context) = run(
            Operation::get("op", "/")
                .deserializer(broken)
                .returns(ReturnType::model::<User>()),
            200,
            "{}",
        )
        .await;
        assert!(matches!(
            result,
            Err(ResponseError::Codec(CodecError::InstantiationFailed { .. }))
        ));
        assert!(body_consumed(&context));
    }
}
