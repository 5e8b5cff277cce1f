//! Per-invocation codec resolution.

use super::{DeserializerRef, SerializerRef};
use crate::descriptor::InvocationDescriptor;
use crate::endpoint::Detachable;

/// Method-level serializer, else the endpoint's unless detached.
pub fn resolve_serializer(descriptor: &InvocationDescriptor) -> Option<&SerializerRef> {
    descriptor.operation().serializer_ref().or_else(|| {
        if descriptor.is_detached(Detachable::Serializer) {
            None
        } else {
            descriptor.endpoint().serializer_ref()
        }
    })
}

/// Method-level deserializer, else the endpoint's unless detached, else the
/// plain pass-through for text-like return types.
pub fn resolve_deserializer(descriptor: &InvocationDescriptor) -> Option<DeserializerRef> {
    if let Some(declared) = descriptor.operation().deserializer_ref() {
        return Some(declared.clone());
    }
    if !descriptor.is_detached(Detachable::Deserializer) {
        if let Some(inherited) = descriptor.endpoint().deserializer_ref() {
            return Some(inherited.clone());
        }
    }
    if descriptor.return_type().is_text_like() {
        return Some(DeserializerRef::plain());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ContentType;
    use crate::endpoint::{EndpointDefinition, Operation};
    use crate::types::ReturnType;
    use std::sync::Arc;

    fn descriptor(endpoint: EndpointDefinition, op: &str) -> InvocationDescriptor {
        let endpoint = Arc::new(endpoint);
        let operation = endpoint.operation(op).unwrap().clone();
        InvocationDescriptor::new(endpoint, operation, Vec::new())
    }

    fn endpoint() -> EndpointDefinition {
        EndpointDefinition::builder("Codecs")
            .host("localhost")
            .serializer(SerializerRef::json())
            .deserializer(DeserializerRef::json())
            .operation(Operation::get("inherited", "/").returns(ReturnType::model::<u8>()))
            .operation(
                Operation::get("method_level", "/")
                    .deserializer(DeserializerRef::xml())
                    .serializer(SerializerRef::plain()),
            )
            .operation(
                Operation::get("detached", "/")
                    .detach(Detachable::Deserializer)
                    .detach(Detachable::Serializer)
                    .returns(ReturnType::Text),
            )
            .operation(
                Operation::get("detached_model", "/")
                    .detach(Detachable::Deserializer)
                    .returns(ReturnType::model::<u8>()),
            )
            .operation(
                Operation::get("detached_string", "/")
                    .detach(Detachable::Deserializer)
                    .returns(ReturnType::model::<String>()),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn endpoint_level_codecs_are_inherited() {
        let d = descriptor(endpoint(), "inherited");
        assert!(matches!(
            resolve_serializer(&d),
            Some(SerializerRef::Builtin(ContentType::Json))
        ));
        assert!(resolve_deserializer(&d).unwrap().is_builtin(ContentType::Json));
    }

    #[test]
    fn method_level_codecs_take_precedence() {
        let d = descriptor(endpoint(), "method_level");
        assert!(matches!(
            resolve_serializer(&d),
            Some(SerializerRef::Builtin(ContentType::Plain))
        ));
        assert!(resolve_deserializer(&d).unwrap().is_builtin(ContentType::Xml));
    }

    #[test]
    fn detach_falls_back_to_plain_for_text() {
        let d = descriptor(endpoint(), "detached");
        assert!(resolve_serializer(&d).is_none());
        assert!(resolve_deserializer(&d).unwrap().is_builtin(ContentType::Plain));
    }

    #[test]
    fn detached_model_has_no_deserializer() {
        let d = descriptor(endpoint(), "detached_model");
        assert!(resolve_deserializer(&d).is_none());
    }

    #[test]
    fn string_models_fall_back_to_plain() {
        let d = descriptor(endpoint(), "detached_string");
        assert!(resolve_deserializer(&d).unwrap().is_builtin(ContentType::Plain));
    }
}
