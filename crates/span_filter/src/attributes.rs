//! Typed span attributes.
//!
//! An attribute's identity is the pair *(name, declared type)*: `"retries"` as
//! a string and `"retries"` as an integer are two different attributes and may
//! sit side by side on one span. Every lookup in this crate goes through that
//! pair, never through the name alone.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

/// The closed set of attribute value kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    String,
    Int,
    Float,
    Bool,
    StringArray,
    IntArray,
    FloatArray,
    BoolArray,
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::StringArray => "string[]",
            Self::IntArray => "int[]",
            Self::FloatArray => "float[]",
            Self::BoolArray => "bool[]",
        };
        f.write_str(name)
    }
}

/// Attribute value types for span metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    StringArray(Vec<String>),
    IntArray(Vec<i64>),
    FloatArray(Vec<f64>),
    BoolArray(Vec<bool>),
}

impl AttributeValue {
    /// The declared type this value is stored under.
    pub fn attribute_type(&self) -> AttributeType {
        match self {
            Self::String(_) => AttributeType::String,
            Self::Int(_) => AttributeType::Int,
            Self::Float(_) => AttributeType::Float,
            Self::Bool(_) => AttributeType::Bool,
            Self::StringArray(_) => AttributeType::StringArray,
            Self::IntArray(_) => AttributeType::IntArray,
            Self::FloatArray(_) => AttributeType::FloatArray,
            Self::BoolArray(_) => AttributeType::BoolArray,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(v) => f.write_str(v),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::StringArray(v) => write!(f, "{v:?}"),
            Self::IntArray(v) => write!(f, "{v:?}"),
            Self::FloatArray(v) => write!(f, "{v:?}"),
            Self::BoolArray(v) => write!(f, "{v:?}"),
        }
    }
}

macro_rules! impl_from_for_value {
    ($($from:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$from> for AttributeValue {
                #[inline]
                fn from(value: $from) -> Self {
                    Self::$variant(value.into())
                }
            }
        )*
    };
}

impl_from_for_value! {
    String => String,
    &str => String,
    i64 => Int,
    f64 => Float,
    bool => Bool,
    Vec<String> => StringArray,
    Vec<i64> => IntArray,
    Vec<f64> => FloatArray,
    Vec<bool> => BoolArray,
}

/// Untyped attribute identity: name plus declared type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeKey {
    name: String,
    #[serde(rename = "type")]
    ty: AttributeType,
}

impl AttributeKey {
    pub fn new(name: impl Into<String>, ty: AttributeType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attribute_type(&self) -> AttributeType {
        self.ty
    }

    #[inline]
    pub(crate) fn matches(&self, name: &str, ty: AttributeType) -> bool {
        self.ty == ty && self.name == name
    }
}

impl fmt::Display for AttributeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.ty)
    }
}

/// A Rust type that one [`AttributeValue`] variant can be viewed as.
///
/// Implemented for `str`, `i64`, `f64`, `bool` and slices of those (with
/// `[String]` for string arrays). Rules registered through a [`TypedKey<T>`]
/// receive `&T`, so the right variant is selected by pattern matching and
/// never by a cast.
pub trait AttributeKind: Send + Sync + 'static {
    /// Owned form a transform returns for this kind.
    type Owned: Into<AttributeValue>;

    const TYPE: AttributeType;

    /// Borrows the payload if `value` is of this kind.
    fn extract(value: &AttributeValue) -> Option<&Self>;
}

macro_rules! impl_attribute_kind {
    ($kind:ty, $owned:ty, $variant:ident, |$v:ident| $borrow:expr) => {
        impl AttributeKind for $kind {
            type Owned = $owned;
            const TYPE: AttributeType = AttributeType::$variant;

            #[inline]
            fn extract(value: &AttributeValue) -> Option<&Self> {
                match value {
                    AttributeValue::$variant($v) => Some($borrow),
                    _ => None,
                }
            }
        }
    };
}

impl_attribute_kind!(str, String, String, |v| v.as_str());
impl_attribute_kind!(i64, i64, Int, |v| v);
impl_attribute_kind!(f64, f64, Float, |v| v);
impl_attribute_kind!(bool, bool, Bool, |v| v);
impl_attribute_kind!([String], Vec<String>, StringArray, |v| v.as_slice());
impl_attribute_kind!([i64], Vec<i64>, IntArray, |v| v.as_slice());
impl_attribute_kind!([f64], Vec<f64>, FloatArray, |v| v.as_slice());
impl_attribute_kind!([bool], Vec<bool>, BoolArray, |v| v.as_slice());

/// An attribute key whose declared type is fixed at compile time.
pub struct TypedKey<T: ?Sized> {
    key: AttributeKey,
    _kind: PhantomData<fn() -> *const T>,
}

impl<T: AttributeKind + ?Sized> TypedKey<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            key: AttributeKey::new(name, T::TYPE),
            _kind: PhantomData,
        }
    }

    pub fn key(&self) -> &AttributeKey {
        &self.key
    }

    pub fn name(&self) -> &str {
        self.key.name()
    }
}

impl<T: ?Sized> Clone for TypedKey<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            _kind: PhantomData,
        }
    }
}

impl<T: ?Sized> fmt::Debug for TypedKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypedKey").field(&self.key).finish()
    }
}

pub fn string_key(name: impl Into<String>) -> TypedKey<str> {
    TypedKey::new(name)
}

pub fn int_key(name: impl Into<String>) -> TypedKey<i64> {
    TypedKey::new(name)
}

pub fn float_key(name: impl Into<String>) -> TypedKey<f64> {
    TypedKey::new(name)
}

pub fn bool_key(name: impl Into<String>) -> TypedKey<bool> {
    TypedKey::new(name)
}

pub fn string_array_key(name: impl Into<String>) -> TypedKey<[String]> {
    TypedKey::new(name)
}

pub fn int_array_key(name: impl Into<String>) -> TypedKey<[i64]> {
    TypedKey::new(name)
}

pub fn float_array_key(name: impl Into<String>) -> TypedKey<[f64]> {
    TypedKey::new(name)
}

pub fn bool_array_key(name: impl Into<String>) -> TypedKey<[bool]> {
    TypedKey::new(name)
}

/// One name/value entry. The declared type is the value's variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: AttributeValue,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn attribute_type(&self) -> AttributeType {
        self.value.attribute_type()
    }

    pub fn key(&self) -> AttributeKey {
        AttributeKey::new(self.name.clone(), self.attribute_type())
    }
}

/// Insertion-ordered attribute set with unique (name, type) keys.
///
/// Backed by a `Vec`: spans carry a handful of attributes, and a linear scan
/// keeps iteration order stable for the rewrite pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Attribute>", into = "Vec<Attribute>")]
pub struct Attributes {
    entries: Vec<Attribute>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Sets `name` to `value` under the value's type.
    ///
    /// An existing entry with the same name *and* type is overwritten in place
    /// and its old value returned; an entry with the same name but another
    /// type is left alone.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Option<AttributeValue> {
        let name = name.into();
        let value = value.into();
        let ty = value.attribute_type();
        match self
            .entries
            .iter_mut()
            .find(|a| a.attribute_type() == ty && a.name == name)
        {
            Some(existing) => Some(std::mem::replace(&mut existing.value, value)),
            None => {
                self.entries.push(Attribute { name, value });
                None
            }
        }
    }

    /// Appends an entry known not to collide with any existing key.
    #[inline]
    pub(crate) fn push_unique(&mut self, attribute: Attribute) {
        debug_assert!(
            self.find(&attribute.name, attribute.attribute_type()).is_none(),
            "duplicate attribute key {}",
            attribute.key()
        );
        self.entries.push(attribute);
    }

    /// Looks up a value by name and declared type.
    pub fn find(&self, name: &str, ty: AttributeType) -> Option<&AttributeValue> {
        self.entries
            .iter()
            .find(|a| a.attribute_type() == ty && a.name == name)
            .map(|a| &a.value)
    }

    pub fn get(&self, key: &AttributeKey) -> Option<&AttributeValue> {
        self.find(key.name(), key.attribute_type())
    }

    /// Typed lookup: `attrs.value(&int_key("http.status_code"))` is an `Option<&i64>`.
    pub fn value<T: AttributeKind + ?Sized>(&self, key: &TypedKey<T>) -> Option<&T> {
        self.get(key.key()).and_then(T::extract)
    }

    pub fn contains_key(&self, key: &AttributeKey) -> bool {
        self.get(key).is_some()
    }

    /// Removes an entry, preserving the order of the others.
    pub fn remove(&mut self, key: &AttributeKey) -> Option<AttributeValue> {
        let index = self
            .entries
            .iter()
            .position(|a| key.matches(&a.name, a.attribute_type()))?;
        Some(self.entries.remove(index).value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Attribute> {
        self.entries.iter()
    }
}

impl From<Vec<Attribute>> for Attributes {
    /// Later duplicates overwrite earlier ones, keeping the first position.
    fn from(entries: Vec<Attribute>) -> Self {
        let mut attributes = Self::with_capacity(entries.len());
        for Attribute { name, value } in entries {
            attributes.insert(name, value);
        }
        attributes
    }
}

impl From<Attributes> for Vec<Attribute> {
    fn from(attributes: Attributes) -> Self {
        attributes.entries
    }
}

impl<K: Into<String>, V: Into<AttributeValue>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attributes = Self::new();
        for (name, value) in iter {
            attributes.insert(name, value);
        }
        attributes
    }
}

impl<'a> IntoIterator for &'a Attributes {
    type Item = &'a Attribute;
    type IntoIter = std::slice::Iter<'a, Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
