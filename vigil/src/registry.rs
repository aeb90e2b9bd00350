//! Registry of message types and their handlers.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use vigil_core::{MessageHandler, MessageType, VigilError};

/// Holds the set of registered message types, each bound to its handler.
///
/// A single lock guards the map; reads copy out the handler reference so the
/// lock is never held across handler invocations. Subscriber lists live in
/// the subscription registry and survive unregister/override, which is what
/// keeps re-registration backward compatible.
#[derive(Default)]
pub(crate) struct TypeRegistry {
    handlers: RwLock<HashMap<MessageType, Arc<dyn MessageHandler>>>,
}

impl TypeRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Bind a handler to a type.
    ///
    /// Fails with `TypeAlreadyRegistered` when the type exists and override
    /// was not requested, and with `HandlerContract` when the handler's own
    /// `type_name()` disagrees with the type being registered.
    pub(crate) fn register(
        &self,
        message_type: &MessageType,
        handler: Arc<dyn MessageHandler>,
        allow_override: bool,
    ) -> Result<(), VigilError> {
        if handler.type_name() != message_type {
            return Err(VigilError::handler_contract(
                message_type.as_str(),
                format!(
                    "handler reports type {:?}, registered as {:?}",
                    handler.type_name().as_str(),
                    message_type.as_str()
                ),
            ));
        }
        let mut handlers = self
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if handlers.contains_key(message_type) && !allow_override {
            return Err(VigilError::type_already_registered(message_type.as_str()));
        }
        handlers.insert(message_type.clone(), handler);
        Ok(())
    }

    /// Remove the handler for a type; returns whether one was present.
    pub(crate) fn unregister(&self, message_type: &str) -> bool {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(message_type)
            .is_some()
    }

    pub(crate) fn is_registered(&self, message_type: &str) -> bool {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(message_type)
    }

    /// Copy out the handler reference for a type, if registered.
    pub(crate) fn get_handler(&self, message_type: &str) -> Option<Arc<dyn MessageHandler>> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(message_type)
            .cloned()
    }

    /// All registered type names, sorted for deterministic output.
    pub(crate) fn list_types(&self) -> Vec<MessageType> {
        let mut types: Vec<MessageType> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        types.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        types
    }
}
