//! Caller-supplied codecs for QUserType payloads.
//!
//! A user type is written as its NUL-terminated name followed by whatever the
//! registered codec appends. The registry is built once and then shared
//! read-only between any number of readers and writers.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::datastream::{Reader, Writer};
use crate::error::{DataStreamError, Result};
use crate::types::Variant;

/// Encodes and decodes the payload of one named user type.
///
/// Implementations use the reader's and writer's primitive methods, so a
/// payload can be any sequence of wire fields.
pub trait UserTypeCodec: Send + Sync + 'static {
    /// Appends the payload for `value`.
    fn encode(&self, value: &Variant, writer: &mut Writer) -> Result<()>;

    /// Consumes the payload and returns the decoded value.
    fn decode(&self, reader: &mut Reader<'_>) -> Result<Variant>;
}

/// Adapts a pair of closures into a [`UserTypeCodec`].
pub struct FnCodec<E, D> {
    encode: E,
    decode: D,
}

impl<E, D> FnCodec<E, D>
where
    E: Fn(&Variant, &mut Writer) -> Result<()> + Send + Sync + 'static,
    D: Fn(&mut Reader<'_>) -> Result<Variant> + Send + Sync + 'static,
{
    pub fn new(encode: E, decode: D) -> Self {
        Self { encode, decode }
    }
}

impl<E, D> UserTypeCodec for FnCodec<E, D>
where
    E: Fn(&Variant, &mut Writer) -> Result<()> + Send + Sync + 'static,
    D: Fn(&mut Reader<'_>) -> Result<Variant> + Send + Sync + 'static,
{
    fn encode(&self, value: &Variant, writer: &mut Writer) -> Result<()> {
        (self.encode)(value, writer)
    }

    fn decode(&self, reader: &mut Reader<'_>) -> Result<Variant> {
        (self.decode)(reader)
    }
}

/// Immutable name-keyed table of user type codecs.
#[derive(Default)]
pub struct UserTypeRegistry {
    codecs: HashMap<String, Arc<dyn UserTypeCodec>>,
}

impl UserTypeRegistry {
    /// Starts building a registry.
    pub fn builder() -> UserTypeRegistryBuilder {
        UserTypeRegistryBuilder::default()
    }

    /// A shared registry with no user types.
    pub fn empty() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Looks up the codec for `name`.
    pub fn get(&self, name: &str) -> Result<&dyn UserTypeCodec> {
        self.codecs
            .get(name)
            .map(|codec| codec.as_ref())
            .ok_or_else(|| DataStreamError::UnknownUserType(name.to_owned()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.codecs.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }

    /// Registered names, in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.codecs.keys().map(String::as_str)
    }
}

impl fmt::Debug for UserTypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("UserTypeRegistry").field("names", &names).finish()
    }
}

/// Builder for [`UserTypeRegistry`].
#[derive(Default)]
pub struct UserTypeRegistryBuilder {
    codecs: HashMap<String, Arc<dyn UserTypeCodec>>,
}

impl UserTypeRegistryBuilder {
    /// Registers a codec under `name`. A later registration of the same name
    /// replaces the earlier one.
    pub fn register(mut self, name: impl Into<String>, codec: impl UserTypeCodec) -> Self {
        let name = name.into();
        if self.codecs.insert(name.clone(), Arc::new(codec)).is_some() {
            tracing::debug!(user_type = %name, "replaced user type codec");
        }
        self
    }

    /// Freezes the table.
    pub fn build(self) -> Arc<UserTypeRegistry> {
        Arc::new(UserTypeRegistry {
            codecs: self.codecs,
        })
    }
}
