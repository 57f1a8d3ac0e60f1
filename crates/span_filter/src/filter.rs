//! Span Filter Rules
//!
//! [`SpanFilterBuilder`] collects four kinds of rules:
//!
//! | Rule | Keyed by | Registering the same key again |
//! |------|----------|--------------------------------|
//! | reject by name | – | predicates accumulate (OR) |
//! | reject by attribute value | (name, type) | predicates accumulate (OR) |
//! | remove attribute | (name, type) | overwrites the earlier rewrite |
//! | replace attribute | (name, type) | overwrites the earlier rewrite |
//!
//! [`SpanFilterBuilder::build`] snapshots the rules into an immutable
//! [`SpanFilter`]. The snapshot is shared behind an `Arc` and read without
//! synchronization, so one filter can process batches on many threads at once.
//!
//! # Evaluation
//!
//! For each span, in batch order:
//!
//! 1. any name predicate true → span dropped
//! 2. any attribute predicate true for an attribute the span carries → dropped
//! 3. if any rewrite rule exists, the attribute set is rebuilt in its original
//!    order, each attribute passed through its (name, type) rewrite if one is
//!    registered; a rewrite returning `None` deletes the attribute
//! 4. otherwise the span keeps its original attribute set untouched
//!
//! Predicates and transforms run inline; a panic in one of them unwinds out of
//! the whole batch rather than exporting part of it.

use crate::attributes::{
    Attribute, AttributeKey, AttributeKind, AttributeType, AttributeValue, Attributes, TypedKey,
};
use crate::exporter::SpanExporter;
use crate::filtering_exporter::FilteringExporter;
use crate::span::Span;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

type NamePredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;
type ValuePredicate = Arc<dyn Fn(&AttributeValue) -> bool + Send + Sync>;
type ValueTransform = Arc<dyn Fn(&AttributeValue) -> Option<AttributeValue> + Send + Sync>;

/// All predicates registered for one (name, type) key.
#[derive(Clone)]
struct AttributeRejection {
    key: AttributeKey,
    predicates: Vec<ValuePredicate>,
}

impl AttributeRejection {
    fn matches(&self, attributes: &Attributes) -> bool {
        attributes
            .get(&self.key)
            .is_some_and(|value| self.predicates.iter().any(|p| p(value)))
    }
}

/// Rewrites keyed per declared type, then by name.
#[derive(Clone, Default)]
struct RewriteTable {
    by_type: HashMap<AttributeType, HashMap<String, ValueTransform>>,
}

impl RewriteTable {
    fn insert(&mut self, key: &AttributeKey, transform: ValueTransform) {
        self.by_type
            .entry(key.attribute_type())
            .or_default()
            .insert(key.name().to_owned(), transform);
    }

    #[inline]
    fn get(&self, name: &str, ty: AttributeType) -> Option<&ValueTransform> {
        self.by_type.get(&ty)?.get(name)
    }

    fn is_empty(&self) -> bool {
        self.by_type.values().all(HashMap::is_empty)
    }

    fn len(&self) -> usize {
        self.by_type.values().map(HashMap::len).sum()
    }
}

#[derive(Clone, Default)]
struct FilterRules {
    reject_names: Vec<NamePredicate>,
    /// In order of first registration per key.
    reject_attributes: Vec<AttributeRejection>,
    rewrites: RewriteTable,
}

/// Why a span was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Name,
    Attribute,
}

/// Fluent builder for [`SpanFilter`].
///
/// # Example
///
/// ```
/// use span_filter::{int_key, string_key, SpanFilterBuilder};
///
/// let filter = SpanFilterBuilder::new()
///     .reject_spans_by_name(|name| name == "healthcheck")
///     .reject_spans_by_attribute_value(&int_key("http.status_code"), |code| *code == 304)
///     .remove_span_attribute(&string_key("user.email"))
///     .replace_span_attribute(&string_key("http.url"), |url| {
///         Some(url.split('?').next().unwrap_or(url).to_owned())
///     })
///     .build();
/// assert_eq!(filter.rewrite_rule_count(), 2);
/// ```
#[derive(Clone, Default)]
pub struct SpanFilterBuilder {
    rules: FilterRules,
}

impl SpanFilterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops spans whose name matches `predicate`.
    pub fn reject_spans_by_name<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.rules.reject_names.push(Arc::new(predicate));
        self
    }

    /// Drops spans carrying `key` with a value matching `predicate`.
    ///
    /// Spans without that exact (name, type) attribute are never affected.
    pub fn reject_spans_by_attribute_value<T, F>(mut self, key: &TypedKey<T>, predicate: F) -> Self
    where
        T: AttributeKind + ?Sized,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let predicate: ValuePredicate =
            Arc::new(move |value: &AttributeValue| T::extract(value).is_some_and(&predicate));

        let rejections = &mut self.rules.reject_attributes;
        match rejections.iter_mut().find(|r| &r.key == key.key()) {
            Some(existing) => existing.predicates.push(predicate),
            None => rejections.push(AttributeRejection {
                key: key.key().clone(),
                predicates: vec![predicate],
            }),
        }
        self
    }

    /// Deletes the attribute `key` from every exported span.
    pub fn remove_span_attribute<T>(self, key: &TypedKey<T>) -> Self
    where
        T: AttributeKind + ?Sized,
    {
        self.rewrite(
            key.key(),
            Arc::new(|_: &AttributeValue| -> Option<AttributeValue> { None }),
        )
    }

    /// Deletes the attribute `key` where its value matches `predicate`.
    pub fn remove_span_attribute_if<T, F>(self, key: &TypedKey<T>, predicate: F) -> Self
    where
        T: AttributeKind + ?Sized,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.rewrite(
            key.key(),
            Arc::new(move |value: &AttributeValue| -> Option<AttributeValue> {
                match T::extract(value) {
                    Some(v) if predicate(v) => None,
                    _ => Some(value.clone()),
                }
            }),
        )
    }

    /// Rewrites the attribute `key` with `transform`; `None` deletes it.
    pub fn replace_span_attribute<T, F>(self, key: &TypedKey<T>, transform: F) -> Self
    where
        T: AttributeKind + ?Sized,
        F: Fn(&T) -> Option<T::Owned> + Send + Sync + 'static,
    {
        self.rewrite(
            key.key(),
            Arc::new(move |value: &AttributeValue| -> Option<AttributeValue> {
                match T::extract(value) {
                    Some(v) => transform(v).map(Into::into),
                    None => Some(value.clone()),
                }
            }),
        )
    }

    fn rewrite(mut self, key: &AttributeKey, transform: ValueTransform) -> Self {
        self.rules.rewrites.insert(key, transform);
        self
    }

    /// Snapshots the current rules into a filter.
    ///
    /// Later changes to this builder (or clones of it) do not reach filters
    /// already built.
    pub fn build(&self) -> SpanFilter {
        SpanFilter {
            rules: Arc::new(self.rules.clone()),
        }
    }
}

impl fmt::Debug for SpanFilterBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.rules, f)
    }
}

/// Immutable, cheaply clonable set of span filter rules.
#[derive(Clone)]
pub struct SpanFilter {
    rules: Arc<FilterRules>,
}

impl SpanFilter {
    pub fn builder() -> SpanFilterBuilder {
        SpanFilterBuilder::new()
    }

    /// Wraps `exporter` so every batch it receives is filtered first.
    pub fn apply<E: SpanExporter>(&self, exporter: E) -> FilteringExporter<E> {
        FilteringExporter::new(exporter, self.clone())
    }

    /// Returns why `span` would be dropped, if it would be.
    pub fn rejection(&self, span: &Span) -> Option<Rejection> {
        if self.rules.reject_names.iter().any(|p| p(&span.name)) {
            return Some(Rejection::Name);
        }
        if self
            .rules
            .reject_attributes
            .iter()
            .any(|r| r.matches(&span.attributes))
        {
            return Some(Rejection::Attribute);
        }
        None
    }

    /// Applies the rewrite rules to a span that survived rejection.
    ///
    /// Returns the span and whether its attribute set was rebuilt. With no
    /// rewrite rules the span comes back as-is, sharing its attribute set.
    pub fn rewrite(&self, span: Span) -> (Span, bool) {
        if self.rules.rewrites.is_empty() {
            return (span, false);
        }
        let attributes = self.rewrite_attributes(&span.attributes);
        (
            Span {
                attributes: Arc::new(attributes),
                ..span
            },
            true,
        )
    }

    fn rewrite_attributes(&self, original: &Attributes) -> Attributes {
        let mut rewritten = Attributes::with_capacity(original.len());
        for attribute in original {
            let Some(transform) = self
                .rules
                .rewrites
                .get(&attribute.name, attribute.attribute_type())
            else {
                rewritten.push_unique(attribute.clone());
                continue;
            };
            if let Some(value) = transform(&attribute.value) {
                debug_assert_eq!(value.attribute_type(), attribute.attribute_type());
                rewritten.push_unique(Attribute {
                    name: attribute.name.clone(),
                    value,
                });
            }
        }
        rewritten
    }

    pub fn name_rule_count(&self) -> usize {
        self.rules.reject_names.len()
    }

    /// Number of distinct (name, type) keys with rejection predicates.
    pub fn attribute_rule_count(&self) -> usize {
        self.rules.reject_attributes.len()
    }

    /// Number of distinct (name, type) keys with a removal or replacement.
    pub fn rewrite_rule_count(&self) -> usize {
        self.rules.rewrites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.reject_names.is_empty()
            && self.rules.reject_attributes.is_empty()
            && self.rules.rewrites.is_empty()
    }
}

impl fmt::Debug for FilterRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rejected: Vec<_> = self.reject_attributes.iter().map(|r| &r.key).collect();
        let mut rewritten: Vec<_> = self
            .rewrites
            .by_type
            .iter()
            .flat_map(|(ty, names)| names.keys().map(move |n| AttributeKey::new(n.clone(), *ty)))
            .collect();
        rewritten.sort_by(|a, b| a.name().cmp(b.name()));
        f.debug_struct("SpanFilter")
            .field("name_rules", &self.reject_names.len())
            .field("attribute_rejections", &rejected)
            .field("rewrites", &rewritten)
            .finish()
    }
}

impl fmt::Debug for SpanFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.rules, f)
    }
}
