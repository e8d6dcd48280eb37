/// Stack of enclosing function scopes for use during AST traversal.
///
/// Rewriting passes often need to know which function they are currently
/// inside: a statement nested in a closure belongs to the closure, not to
/// the declaration around it. The tracker keeps one frame per function
/// entered, innermost last.
///
/// # Examples
///
/// ```rust
/// use ego::visit::scope_tracker::ScopeTracker;
///
/// let mut tracker = ScopeTracker::new();
///
/// // Enter a function declaration
/// tracker.push("outer");
///
/// // Enter a closure inside it
/// tracker.push("closure");
/// assert_eq!(tracker.current(), Some(&"closure"));
/// assert_eq!(tracker.depth(), 2);
///
/// // Leave the closure
/// tracker.pop();
/// assert_eq!(tracker.current(), Some(&"outer"));
/// ```
#[derive(Debug, Clone)]
pub struct ScopeTracker<T> {
    frames: Vec<T>,
}

impl<T> ScopeTracker<T> {
    /// Create a tracker with no frames.
    pub fn new() -> Self {
        Self { frames: Vec::new() }
    }

    /// Enter a new innermost scope.
    pub fn push(&mut self, frame: T) {
        self.frames.push(frame);
    }

    /// Leave the innermost scope, returning its frame.
    ///
    /// Returns `None` if there are no scopes to pop.
    pub fn pop(&mut self) -> Option<T> {
        self.frames.pop()
    }

    /// The innermost frame, or `None` outside any function.
    pub fn current(&self) -> Option<&T> {
        self.frames.last()
    }

    /// Number of active scopes.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl<T> Default for ScopeTracker<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ==============================================================================
// Tests
// ==============================================================================
