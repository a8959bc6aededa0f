//! The element-type registry: a context DAG resolving tag codes.
//!
//! Resolution is a pure function `(context, code) -> element type` over
//! immutable maps built once at startup. A context searches its local map
//! first, then each declared parent depth-first; the first hit wins.
//! Contexts form a DAG, not necessarily a tree: a context may list several
//! parents (the signed-element scope is shared this way by entry headers
//! and cheques).
//!
//! Codes with no resolution anywhere in the closure synthesize an
//! *unknown* element whose structural flag comes from the tag's own
//! low-bit convention, which is what lets a decoder stay byte-aligned
//! across types it does not understand.

use crate::core::tag::TagCode;
use std::collections::HashMap;

/// Index of a context within its registry.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ContextId(pub(crate) u16);

/// Whether an element is a container or a terminal value, and for
/// containers, which context its children resolve against.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ElementKind {
    Container { scope: ContextId },
    Value,
}

/// Immutable descriptor of one element type.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ElementDef {
    pub name: &'static str,
    pub code: TagCode,
    pub kind: ElementKind,
}

impl ElementDef {
    pub const fn container(name: &'static str, code: u64, scope: ContextId) -> Self {
        Self {
            name,
            code: TagCode::from_numeric(code),
            kind: ElementKind::Container { scope },
        }
    }

    pub const fn value(name: &'static str, code: u64) -> Self {
        Self {
            name,
            code: TagCode::from_numeric(code),
            kind: ElementKind::Value,
        }
    }

    pub fn is_structural(&self) -> bool {
        matches!(self.kind, ElementKind::Container { .. })
    }

    /// The child context of a container element.
    pub fn scope(&self) -> Option<ContextId> {
        match self.kind {
            ElementKind::Container { scope } => Some(scope),
            ElementKind::Value => None,
        }
    }
}

/// A resolved element: either a registered descriptor or a synthesized
/// unknown whose structural nature follows the code's trailing bit.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ElementType {
    Known(&'static ElementDef),
    Unknown { code: TagCode, structural: bool },
}

impl ElementType {
    pub fn code(&self) -> TagCode {
        match self {
            ElementType::Known(def) => def.code,
            ElementType::Unknown { code, .. } => *code,
        }
    }

    pub fn is_structural(&self) -> bool {
        match self {
            ElementType::Known(def) => def.is_structural(),
            ElementType::Unknown { structural, .. } => *structural,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, ElementType::Unknown { .. })
    }

    /// Whether this is the given registered element.
    pub fn is(&self, def: &'static ElementDef) -> bool {
        matches!(self, ElementType::Known(known) if *known == def)
    }

    /// Display name for diagnostics.
    pub fn describe(&self) -> String {
        match self {
            ElementType::Known(def) => def.name.to_string(),
            ElementType::Unknown { code, .. } => format!("unknown {code}"),
        }
    }
}

struct ContextNode {
    name: &'static str,
    parents: Vec<ContextId>,
    elements: HashMap<TagCode, &'static ElementDef>,
}

/// The immutable code-to-element lookup graph.
///
/// Built once at startup, read-only thereafter; safe for unsynchronized
/// concurrent reads across conversations.
pub struct Registry {
    contexts: Vec<ContextNode>,
}

impl Registry {
    /// Resolve a code within a context's closure.
    pub fn resolve(&self, context: ContextId, code: &TagCode) -> Option<&'static ElementDef> {
        let node = &self.contexts[context.0 as usize];
        if let Some(def) = node.elements.get(code).copied() {
            return Some(def);
        }
        for parent in &node.parents {
            if let Some(def) = self.resolve(*parent, code) {
                return Some(def);
            }
        }
        None
    }

    /// Resolve a code, synthesizing an unknown element on a miss.
    pub fn resolve_or_unknown(&self, context: ContextId, code: TagCode) -> ElementType {
        match self.resolve(context, &code) {
            Some(def) => ElementType::Known(def),
            None => ElementType::Unknown {
                code,
                structural: code.is_structural_hint(),
            },
        }
    }

    pub fn context_name(&self, context: ContextId) -> &'static str {
        self.contexts[context.0 as usize].name
    }
}

/// Startup-time registry construction.
///
/// Registration failures are fatal initialization errors and panic: the tag
/// tables are process-wide constants, and a duplicate code within a
/// context's closure is a programming error, not a runtime condition.
pub struct RegistryBuilder {
    contexts: Vec<ContextNode>,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self {
            contexts: Vec::new(),
        }
    }

    /// Declare a context under a pre-assigned id. Parents must already be
    /// declared; ids must be declared in order.
    pub fn context_as(&mut self, id: ContextId, name: &'static str, parents: &[ContextId]) {
        assert_eq!(
            id.0 as usize,
            self.contexts.len(),
            "context {name} declared out of order"
        );
        for parent in parents {
            assert!(
                (parent.0 as usize) < self.contexts.len(),
                "context {name} lists an undeclared parent"
            );
        }
        self.contexts.push(ContextNode {
            name,
            parents: parents.to_vec(),
            elements: HashMap::new(),
        });
    }

    /// Register an element in a context. Panics if the element's code
    /// already resolves anywhere in the context's closure.
    pub fn register(&mut self, context: ContextId, def: &'static ElementDef) {
        if let Some(existing) = self.resolve_in_closure(context, &def.code) {
            panic!(
                "duplicate registration: code {} of {} already resolves to {} in context {}",
                def.code,
                def.name,
                existing.name,
                self.contexts[context.0 as usize].name
            );
        }
        self.contexts[context.0 as usize]
            .elements
            .insert(def.code, def);
    }

    fn resolve_in_closure(
        &self,
        context: ContextId,
        code: &TagCode,
    ) -> Option<&'static ElementDef> {
        let node = &self.contexts[context.0 as usize];
        if let Some(def) = node.elements.get(code).copied() {
            return Some(def);
        }
        for parent in &node.parents {
            if let Some(def) = self.resolve_in_closure(*parent, code) {
                return Some(def);
            }
        }
        None
    }

    pub fn finish(self) -> Registry {
        Registry {
            contexts: self.contexts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: ContextId = ContextId(0);
    const CHILD: ContextId = ContextId(1);

    static SHARED: ElementDef = ElementDef::value("Shared", 0xFC);
    static LOCAL: ElementDef = ElementDef::value("Local", 0x80);
    static CLASH: ElementDef = ElementDef::value("Clash", 0xFC);

    fn build() -> Registry {
        let mut builder = RegistryBuilder::new();
        builder.context_as(BASE, "Base", &[]);
        builder.context_as(CHILD, "Child", &[BASE]);
        builder.register(BASE, &SHARED);
        builder.register(CHILD, &LOCAL);
        builder.finish()
    }

    #[test]
    fn resolves_through_parent() {
        let registry = build();
        let code = TagCode::from_numeric(0xFC);
        assert_eq!(registry.resolve(CHILD, &code), Some(&SHARED));
        assert_eq!(
            registry.resolve(BASE, &TagCode::from_numeric(0x80)),
            None,
            "parents do not see child registrations"
        );
    }

    #[test]
    fn miss_synthesizes_unknown_with_hint() {
        let registry = build();
        let odd = registry.resolve_or_unknown(BASE, TagCode::from_numeric(0x91));
        assert!(odd.is_unknown());
        assert!(odd.is_structural());
        let even = registry.resolve_or_unknown(BASE, TagCode::from_numeric(0x90));
        assert!(!even.is_structural());
    }

    #[test]
    #[should_panic(expected = "duplicate registration")]
    fn duplicate_in_closure_is_fatal() {
        let mut builder = RegistryBuilder::new();
        builder.context_as(BASE, "Base", &[]);
        builder.context_as(CHILD, "Child", &[BASE]);
        builder.register(BASE, &SHARED);
        builder.register(CHILD, &CLASH);
    }
}
