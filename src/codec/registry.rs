//! Process-scoped codec instances.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use bytes::Bytes;

use super::availability;
use super::builtin::{JsonCodec, PlainCodec};
use super::{ContentType, Deserializer, DeserializerRef, Lifecycle, Serializer, SerializerRef};
use crate::error::CodecError;
use crate::types::ReturnType;

/// Resolves codec references to instances.
///
/// Builtins and singleton customs are created on first use and cached by
/// key. The first instance stored under a key wins; later registrations
/// under the same key are ignored.
#[derive(Default)]
pub struct CodecRegistry {
    serializers: RwLock<HashMap<String, Arc<dyn Serializer>>>,
    deserializers: RwLock<HashMap<String, Arc<dyn Deserializer>>>,
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serializer(&self, reference: &SerializerRef) -> Result<Arc<dyn Serializer>, CodecError> {
        match reference {
            SerializerRef::Builtin(content_type) => {
                availability::ensure(*content_type)?;
                cached(&self.serializers, &reference.key(), || {
                    builtin_serializer(*content_type)
                })
            }
            SerializerRef::Custom(custom) => match custom.lifecycle() {
                Lifecycle::Singleton => {
                    cached(&self.serializers, custom.key(), || custom.instantiate())
                }
                Lifecycle::PerCall => custom.instantiate(),
            },
        }
    }

    /// Resolves a deserializer and checks it can produce `target`.
    pub fn deserializer(
        &self,
        reference: &DeserializerRef,
        target: &ReturnType,
    ) -> Result<Arc<dyn Deserializer>, CodecError> {
        let deserializer = match reference {
            DeserializerRef::Builtin(content_type) => {
                availability::ensure(*content_type)?;
                cached(&self.deserializers, &reference.key(), || {
                    builtin_deserializer(*content_type)
                })?
            }
            DeserializerRef::Custom(custom) => match custom.lifecycle() {
                Lifecycle::Singleton => {
                    cached(&self.deserializers, custom.key(), || custom.instantiate())?
                }
                Lifecycle::PerCall => custom.instantiate()?,
            },
        };
        check_output(deserializer.as_ref(), &reference.key(), target)?;
        Ok(deserializer)
    }

    /// Stores a serializer under `key`. Returns `false` if the key was taken.
    pub fn register_serializer(&self, key: impl Into<String>, serializer: Arc<dyn Serializer>) -> bool {
        register(&self.serializers, key.into(), serializer)
    }

    /// Stores a deserializer under `key`. Returns `false` if the key was taken.
    pub fn register_deserializer(
        &self,
        key: impl Into<String>,
        deserializer: Arc<dyn Deserializer>,
    ) -> bool {
        register(&self.deserializers, key.into(), deserializer)
    }
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("serializers", &keys_of(&self.serializers))
            .field("deserializers", &keys_of(&self.deserializers))
            .finish()
    }
}

fn keys_of<T: ?Sized>(map: &RwLock<HashMap<String, Arc<T>>>) -> Vec<String> {
    map.read()
        .unwrap_or_else(PoisonError::into_inner)
        .keys()
        .cloned()
        .collect()
}

fn cached<T: ?Sized>(
    map: &RwLock<HashMap<String, Arc<T>>>,
    key: &str,
    create: impl FnOnce() -> Result<Arc<T>, CodecError>,
) -> Result<Arc<T>, CodecError> {
    if let Some(found) = map.read().unwrap_or_else(PoisonError::into_inner).get(key) {
        return Ok(Arc::clone(found));
    }
    let created = create()?;
    let mut guard = map.write().unwrap_or_else(PoisonError::into_inner);
    Ok(Arc::clone(guard.entry(key.to_string()).or_insert(created)))
}

fn register<T: ?Sized>(map: &RwLock<HashMap<String, Arc<T>>>, key: String, value: Arc<T>) -> bool {
    let mut guard = map.write().unwrap_or_else(PoisonError::into_inner);
    if guard.contains_key(&key) {
        tracing::debug!(target: "wirelink::codec", %key, "codec already registered; keeping the first");
        return false;
    }
    guard.insert(key, value);
    true
}

fn builtin_serializer(content_type: ContentType) -> Result<Arc<dyn Serializer>, CodecError> {
    match content_type {
        ContentType::Json => Ok(Arc::new(JsonCodec)),
        ContentType::Plain => Ok(Arc::new(PlainCodec)),
        #[cfg(feature = "xml")]
        ContentType::Xml => Ok(Arc::new(super::builtin::XmlCodec)),
        #[cfg(not(feature = "xml"))]
        ContentType::Xml => Err(xml_disabled()),
    }
}

fn builtin_deserializer(content_type: ContentType) -> Result<Arc<dyn Deserializer>, CodecError> {
    match content_type {
        ContentType::Json => Ok(Arc::new(JsonCodec)),
        ContentType::Plain => Ok(Arc::new(PlainCodec)),
        #[cfg(feature = "xml")]
        ContentType::Xml => Ok(Arc::new(super::builtin::XmlCodec)),
        #[cfg(not(feature = "xml"))]
        ContentType::Xml => Err(xml_disabled()),
    }
}

#[cfg(not(feature = "xml"))]
fn xml_disabled() -> CodecError {
    CodecError::CodecUnavailable {
        codec: "xml".to_string(),
        reason: "wirelink was compiled without the `xml` feature".to_string(),
    }
}

fn check_output(
    deserializer: &dyn Deserializer,
    key: &str,
    target: &ReturnType,
) -> Result<(), CodecError> {
    let Some(declared) = deserializer.output_type() else {
        return Ok(());
    };
    let expected = match target {
        ReturnType::Model(model) => Some(model.type_id()),
        ReturnType::Text => Some(TypeId::of::<String>()),
        ReturnType::Bytes => Some(TypeId::of::<Bytes>()),
        _ => None,
    };
    match expected {
        Some(expected) if expected != declared => Err(CodecError::instantiation(
            key,
            format!(
                "declared output type does not match the {} return value",
                target.describe()
            ),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::SerializeInput;
    use crate::types::Reply;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Upper;

    impl Serializer for Upper {
        fn content_type(&self) -> &str {
            "text/upper"
        }

        fn serialize(&self, input: SerializeInput<'_>) -> Result<Bytes, CodecError> {
            match input {
                SerializeInput::Text(t) => Ok(Bytes::from(t.to_uppercase())),
                SerializeInput::Model(_) => Err(CodecError::failed("upper", "text only")),
            }
        }
    }

    #[derive(Default)]
    struct Counted;

    impl Deserializer for Counted {
        fn content_type(&self) -> &str {
            "text/plain"
        }

        fn output_type(&self) -> Option<TypeId> {
            Some(TypeId::of::<u32>())
        }

        fn deserialize(&self, body: &[u8], _target: &ReturnType) -> Result<Reply, CodecError> {
            Ok(Reply::Model(Box::new(body.len() as u32)))
        }
    }

    #[test]
    fn builtins_are_cached() {
        let registry = CodecRegistry::new();
        let a = registry.serializer(&SerializerRef::json()).unwrap();
        let b = registry.serializer(&SerializerRef::json()).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn singleton_customs_are_created_once() {
        let created = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&created);
        let reference = SerializerRef::custom("upper", Lifecycle::Singleton, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Upper)
        });
        let registry = CodecRegistry::new();
        registry.serializer(&reference).unwrap();
        registry.serializer(&reference).unwrap();
        assert_eq!(created.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn per_call_customs_are_created_every_time() {
        let created = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&created);
        let reference = SerializerRef::custom("upper", Lifecycle::PerCall, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Upper)
        });
        let registry = CodecRegistry::new();
        registry.serializer(&reference).unwrap();
        registry.serializer(&reference).unwrap();
        assert_eq!(created.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn factory_failure_is_an_instantiation_error() {
        let reference = SerializerRef::custom::<Upper, _>("broken", Lifecycle::Singleton, || {
            Err(CodecError::instantiation("broken", "no default constructor"))
        });
        let err = CodecRegistry::new().serializer(&reference).err().unwrap();
        assert!(matches!(err, CodecError::InstantiationFailed { .. }));
    }

    #[test]
    fn mismatched_output_type_is_an_instantiation_error() {
        let registry = CodecRegistry::new();
        let reference = DeserializerRef::of::<Counted>();
        assert!(
            registry
                .deserializer(&reference, &ReturnType::model::<u32>())
                .is_ok()
        );
        let err = registry
            .deserializer(&reference, &ReturnType::model::<String>())
            .err()
            .unwrap();
        assert!(matches!(err, CodecError::InstantiationFailed { .. }));
    }

    #[test]
    fn first_registration_wins() {
        let registry = CodecRegistry::new();
        assert!(registry.register_serializer("k", Arc::new(Upper)));
        assert!(!registry.register_serializer("k", Arc::new(JsonCodec)));
        let custom = SerializerRef::custom("k", Lifecycle::Singleton, || Ok(PlainCodec));
        let resolved = registry.serializer(&custom).unwrap();
        assert_eq!(resolved.content_type(), "text/upper");
    }
}
