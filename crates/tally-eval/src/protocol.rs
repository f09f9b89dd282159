//! Protocols for extension ops
//!
//! Built-in ops are interpreted directly. An [`Op::Custom`](tally_core::Op::Custom)
//! node is executed by the [`Protocol`] that a [`ProtocolFactory`] returns
//! for its `(kind, return type)` pair. Factories compose: a
//! [`ProtocolFactoryChain`] asks each of its factories in order and uses
//! the first protocol found.

use std::fmt;
use std::sync::Arc;

use ahash::AHashMap;
use async_trait::async_trait;
use tally_core::{CustomOp, Value, ValueType};

use crate::context::ExecutionContext;
use crate::error::OpResult;

/// Executes one kind of extension op
///
/// Protocols may suspend, e.g. to call out to another system. Child ops
/// are evaluated through the context.
#[async_trait]
pub trait Protocol: Send + Sync {
    async fn execute(&self, op: &dyn CustomOp, ctx: &ExecutionContext<'_>) -> OpResult<Value>;
}

/// Resolves the protocol for an extension op
pub trait ProtocolFactory: Send + Sync {
    fn protocol_for(&self, kind: &str, return_type: ValueType) -> Option<Arc<dyn Protocol>>;
}

/// Protocols registered by `(kind, return type)`
#[derive(Default, Clone)]
pub struct ProtocolRegistry {
    protocols: AHashMap<(String, ValueType), Arc<dyn Protocol>>,
}

impl ProtocolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a protocol, replacing any previous one for the same key
    pub fn register<P: Protocol + 'static>(
        &mut self,
        kind: &str,
        return_type: ValueType,
        protocol: P,
    ) {
        self.protocols
            .insert((kind.to_string(), return_type), Arc::new(protocol));
    }

    pub fn with<P: Protocol + 'static>(
        mut self,
        kind: &str,
        return_type: ValueType,
        protocol: P,
    ) -> Self {
        self.register(kind, return_type, protocol);
        self
    }

    pub fn len(&self) -> usize {
        self.protocols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.protocols.is_empty()
    }
}

impl fmt::Debug for ProtocolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtocolRegistry")
            .field("keys", &self.protocols.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ProtocolFactory for ProtocolRegistry {
    fn protocol_for(&self, kind: &str, return_type: ValueType) -> Option<Arc<dyn Protocol>> {
        self.protocols
            .get(&(kind.to_string(), return_type))
            .cloned()
    }
}

/// Several factories asked in order
#[derive(Default, Clone)]
pub struct ProtocolFactoryChain {
    factories: Vec<Arc<dyn ProtocolFactory>>,
}

impl ProtocolFactoryChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, factory: Arc<dyn ProtocolFactory>) {
        self.factories.push(factory);
    }

    pub fn with(mut self, factory: Arc<dyn ProtocolFactory>) -> Self {
        self.push(factory);
        self
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl fmt::Debug for ProtocolFactoryChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtocolFactoryChain")
            .field("factories", &self.factories.len())
            .finish()
    }
}

impl FromIterator<Arc<dyn ProtocolFactory>> for ProtocolFactoryChain {
    fn from_iter<I: IntoIterator<Item = Arc<dyn ProtocolFactory>>>(iter: I) -> Self {
        Self {
            factories: iter.into_iter().collect(),
        }
    }
}

impl ProtocolFactory for ProtocolFactoryChain {
    fn protocol_for(&self, kind: &str, return_type: ValueType) -> Option<Arc<dyn Protocol>> {
        self.factories
            .iter()
            .find_map(|factory| factory.protocol_for(kind, return_type))
    }
}
