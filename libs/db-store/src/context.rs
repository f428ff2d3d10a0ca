use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// Immutable, chainable carrier for request-scoped values.
///
/// A `Context` is a persistent linked list of frames. [`Context::with_value`]
/// returns a child context sharing the parent's frames; the parent is never
/// mutated, so sibling chains cannot observe each other's values.
///
/// Values are keyed by their Rust type. Two crates can never collide on a key
/// the way string-keyed maps allow: carrying a private newtype makes the slot
/// unreachable to everyone else.
#[derive(Clone, Default)]
pub struct Context {
    head: Option<Arc<Frame>>,
}

struct Frame {
    parent: Option<Arc<Frame>>,
    key: TypeId,
    value: Arc<dyn Any + Send + Sync>,
}

impl Context {
    /// An empty root context.
    pub fn new() -> Self {
        Self { head: None }
    }

    /// Returns a child context that additionally carries `value`.
    ///
    /// The receiver is left unchanged. A value of the same type carried
    /// further up the chain is shadowed, not replaced.
    pub fn with_value<T: Send + Sync + 'static>(&self, value: T) -> Self {
        Self {
            head: Some(Arc::new(Frame {
                parent: self.head.clone(),
                key: TypeId::of::<T>(),
                value: Arc::new(value),
            })),
        }
    }

    /// Looks up the innermost carried value of type `T`.
    pub fn value<T: Send + Sync + 'static>(&self) -> Option<&T> {
        let mut frame = self.head.as_deref();
        while let Some(f) = frame {
            if f.key == TypeId::of::<T>() {
                return f.value.downcast_ref::<T>();
            }
            frame = f.parent.as_deref();
        }
        None
    }

    fn depth(&self) -> usize {
        let mut n = 0;
        let mut frame = self.head.as_deref();
        while let Some(f) = frame {
            n += 1;
            frame = f.parent.as_deref();
        }
        n
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context").field("depth", &self.depth()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct RequestId(u64);

    #[derive(Debug, PartialEq)]
    struct TenantId(u64);

    #[test]
    fn empty_context_carries_nothing() {
        let ctx = Context::new();
        assert!(ctx.value::<RequestId>().is_none());
    }

    #[test]
    fn child_carries_value_parent_unchanged() {
        let root = Context::new();
        let child = root.with_value(RequestId(7));

        assert_eq!(child.value::<RequestId>(), Some(&RequestId(7)));
        assert!(root.value::<RequestId>().is_none());
    }

    #[test]
    fn innermost_value_shadows_outer() {
        let ctx = Context::new().with_value(RequestId(1)).with_value(RequestId(2));
        assert_eq!(ctx.value::<RequestId>(), Some(&RequestId(2)));
    }

    #[test]
    fn distinct_types_never_collide() {
        // Same inner representation, different types: each gets its own slot.
        let ctx = Context::new()
            .with_value(RequestId(1))
            .with_value(TenantId(2));

        assert_eq!(ctx.value::<RequestId>(), Some(&RequestId(1)));
        assert_eq!(ctx.value::<TenantId>(), Some(&TenantId(2)));
    }

    #[test]
    fn lookup_walks_the_whole_chain() {
        let ctx = Context::new()
            .with_value(RequestId(1))
            .with_value(TenantId(2))
            .with_value("unrelated");
        assert_eq!(ctx.value::<RequestId>(), Some(&RequestId(1)));
    }
}
