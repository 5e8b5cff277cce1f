use std::io::Read;
use std::sync::Arc;

use bytes::Bytes;

use super::RequestStage;
use crate::chain::NamedStage;
use crate::codec::{CodecRegistry, SerializeInput, resolve_serializer};
use crate::descriptor::InvocationDescriptor;
use crate::endpoint::ParamRole;
use crate::error::RequestError;
use crate::types::{Argument, HttpRequest, RequestBody};

const OCTET_STREAM: &str = "application/octet-stream";
const PLAIN_TEXT: &str = "text/plain; charset=utf-8";

/// Attaches the single entity argument of POST, PUT and PATCH requests.
///
/// The wire form is picked from the argument variant, first match wins:
/// ready-made body, bytes, file, stream, text, then model. Text and models
/// go through the resolved serializer; a model without one is an error.
pub struct EntityStage {
    codecs: Arc<CodecRegistry>,
}

impl EntityStage {
    pub fn new(codecs: Arc<CodecRegistry>) -> Self {
        Self { codecs }
    }

    fn serialize(
        &self,
        request: &mut HttpRequest,
        descriptor: &InvocationDescriptor,
        input: SerializeInput<'_>,
    ) -> Result<Option<RequestBody>, RequestError> {
        let Some(reference) = resolve_serializer(descriptor) else {
            return Ok(None);
        };
        let serializer = self.codecs.serializer(reference)?;
        let body = serializer.serialize(input)?;
        request.set_content_type_if_absent(serializer.content_type())?;
        Ok(Some(RequestBody::Bytes(body)))
    }
}

impl NamedStage for EntityStage {
    fn name(&self) -> &'static str {
        "entity"
    }
}

impl RequestStage for EntityStage {
    fn process(
        &self,
        request: &mut HttpRequest,
        descriptor: &InvocationDescriptor,
    ) -> Result<(), RequestError> {
        if !descriptor.method().encloses_entity() {
            return Ok(());
        }

        let entities: Vec<&Argument> = descriptor
            .bindings()
            .filter(|(role, _)| **role == ParamRole::Entity)
            .map(|(_, argument)| argument)
            .collect();
        let argument = match entities.as_slice() {
            [] if !request.body.is_empty() => return Ok(()),
            [] => return Err(RequestError::MissingEntity),
            [one] => *one,
            many => return Err(RequestError::MultipleEntity { count: many.len() }),
        };

        let unresolved = |reason: &str| RequestError::EntityResolutionFailed {
            argument: argument.variant_name().to_string(),
            reason: reason.to_string(),
        };

        let body = match argument {
            Argument::Body(body) => body.clone(),
            Argument::Bytes(bytes) => {
                request.set_content_type_if_absent(OCTET_STREAM)?;
                RequestBody::Bytes(bytes.clone())
            }
            Argument::File(path) => {
                if !path.is_file() {
                    return Err(unresolved(&format!("{} is not a readable file", path.display())));
                }
                let mime = mime_guess::from_path(path).first_or_octet_stream();
                request.set_content_type_if_absent(mime.as_ref())?;
                RequestBody::File(path.clone())
            }
            Argument::Stream(source) => {
                let mut reader = source
                    .take()
                    .ok_or_else(|| unresolved("the stream has already been consumed"))?;
                let mut buffer = Vec::new();
                reader
                    .read_to_end(&mut buffer)
                    .map_err(|e| unresolved(&e.to_string()))?;
                request.set_content_type_if_absent(OCTET_STREAM)?;
                RequestBody::Bytes(Bytes::from(buffer))
            }
            Argument::Text(_) | Argument::Integer(_) | Argument::Boolean(_) => {
                let text = argument.scalar_text().unwrap_or_default();
                match self.serialize(request, descriptor, SerializeInput::Text(&text))? {
                    Some(body) => body,
                    None => {
                        request.set_content_type_if_absent(PLAIN_TEXT)?;
                        RequestBody::Text(text)
                    }
                }
            }
            Argument::Model(model) => self
                .serialize(request, descriptor, SerializeInput::Model(&**model))?
                .ok_or_else(|| unresolved("no serializer is declared for model entities"))?,
            Argument::Absent => return Err(unresolved("the entity argument is absent")),
            _ => return Err(unresolved("the value has no wire representation")),
        };
        request.body = body;
        Ok(())
    }
}

impl std::fmt::Debug for EntityStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityStage").finish_non_exhaustive()
    }
}
