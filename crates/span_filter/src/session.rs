//! Session attribution for spans.
//!
//! Instrumentation asks the [`SessionManager`] for the current id when it
//! records a span and stores it under `session.id`. The filter pipeline treats
//! that attribute like any other; rules can match or rewrite it.

use crate::attributes::{string_key, TypedKey};
use crate::span::Span;
use rum_session::{Clock, SessionId, SessionManager};

/// Attribute name carrying the session id.
pub const SESSION_ID_ATTRIBUTE: &str = "session.id";

/// Typed key for [`SESSION_ID_ATTRIBUTE`].
pub fn session_id_key() -> TypedKey<str> {
    string_key(SESSION_ID_ATTRIBUTE)
}

/// Stamps `span` with the current session id and returns it.
///
/// May rotate the session (and run its change listener) as a side effect of
/// [`SessionManager::current`].
pub fn stamp_session<C: Clock>(span: &mut Span, sessions: &SessionManager<C>) -> SessionId {
    let id = sessions.current();
    span.set_attribute(SESSION_ID_ATTRIBUTE, id.to_string());
    id
}
