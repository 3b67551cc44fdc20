use std::fmt;
use std::sync::Arc;

/// An external service that may be absent or unconfigured.
///
/// Components match on this once at the boundary instead of threading
/// `Option` checks through their logic.
pub enum Collaborator<T: ?Sized> {
    Available(Arc<T>),
    Unavailable,
}

impl<T: ?Sized> Collaborator<T> {
    pub fn available(inner: Arc<T>) -> Self {
        Collaborator::Available(inner)
    }

    pub fn get(&self) -> Option<&Arc<T>> {
        match self {
            Collaborator::Available(inner) => Some(inner),
            Collaborator::Unavailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Collaborator::Available(_))
    }
}

impl<T: ?Sized> Clone for Collaborator<T> {
    fn clone(&self) -> Self {
        match self {
            Collaborator::Available(inner) => Collaborator::Available(Arc::clone(inner)),
            Collaborator::Unavailable => Collaborator::Unavailable,
        }
    }
}

impl<T: ?Sized> Default for Collaborator<T> {
    fn default() -> Self {
        Collaborator::Unavailable
    }
}

impl<T: ?Sized> From<Option<Arc<T>>> for Collaborator<T> {
    fn from(value: Option<Arc<T>>) -> Self {
        value.map_or(Collaborator::Unavailable, Collaborator::Available)
    }
}

impl<T: ?Sized> fmt::Debug for Collaborator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Collaborator::Available(_) => f.write_str("Collaborator::Available"),
            Collaborator::Unavailable => f.write_str("Collaborator::Unavailable"),
        }
    }
}
