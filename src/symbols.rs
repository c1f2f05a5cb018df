//! Symbol model supplied by a compiler frontend.
//!
//! The core never creates symbols on its own; it only reads the arena a
//! frontend builds. Keys are stable indices into one solution-wide table so
//! documents processed on different workers agree on identity before any
//! digest is computed.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::types::TextRange;

/// Index of a symbol in its `SymbolTable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolKey(
    /// Position in the table.
    pub u32,
);

/// What a symbol is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    /// Using-alias or import alias.
    Alias,
    /// Event member.
    Event,
    /// Field or enum member.
    Field,
    /// Statement label.
    Label,
    /// Local variable or local constant.
    Local,
    /// Method, constructor, operator, accessor, or free function.
    Method,
    /// Class, struct, interface, enum, delegate, or module.
    NamedType,
    /// Namespace, including the global namespace.
    Namespace,
    /// Method or indexer parameter.
    Parameter,
    /// Property or indexer.
    Property,
    /// Query range variable.
    RangeVariable,
    /// Generic type parameter.
    TypeParameter,
}

impl SymbolKind {
    /// Symbols that only live inside one document and are never indexed globally.
    pub const fn is_document_local(self) -> bool {
        return matches!(
            self,
            SymbolKind::Local
                | SymbolKind::Parameter
                | SymbolKind::TypeParameter
                | SymbolKind::RangeVariable
                | SymbolKind::Label
        );
    }
}

/// Flavor of a named type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    /// Reference type.
    Class,
    /// Delegate type.
    Delegate,
    /// Enumeration.
    Enum,
    /// Interface or trait.
    Interface,
    /// VB module or static container.
    Module,
    /// Value type.
    Struct,
}

/// Flavor of a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodKind {
    /// Instance constructor.
    Constructor,
    /// User-defined conversion operator.
    Conversion,
    /// Finalizer.
    Destructor,
    /// Event `add` accessor.
    EventAdd,
    /// Event `remove` accessor.
    EventRemove,
    /// Explicit interface implementation.
    ExplicitInterfaceImplementation,
    /// Anonymous function.
    Lambda,
    /// Function nested inside another member's body.
    LocalFunction,
    /// Overloaded operator.
    Operator,
    /// Plain method or free function.
    Ordinary,
    /// Property getter.
    PropertyGet,
    /// Property setter.
    PropertySet,
    /// Extension method invoked with receiver syntax.
    ReducedExtension,
    /// Type initializer.
    StaticConstructor,
}

/// Declared accessibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accessibility {
    /// Visible within the assembly.
    Internal,
    /// Not applicable (namespaces, locals).
    #[default]
    NotApplicable,
    /// Visible to the containing type only.
    Private,
    /// Visible to derived types in the same assembly.
    PrivateProtected,
    /// Visible to derived types.
    Protected,
    /// Visible to derived types or the assembly.
    ProtectedInternal,
    /// Visible everywhere.
    Public,
}

/// How a parameter is passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefKind {
    /// Read-only reference.
    In,
    /// By value.
    #[default]
    None,
    /// Output reference.
    Out,
    /// Read-write reference.
    Ref,
}

/// Shape of a type as it appears in a signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeRef {
    /// Array of `element` with `rank` dimensions.
    Array {
        /// Element type.
        element: Box<TypeRef>,
        /// Number of dimensions.
        rank: u32,
    },
    /// Named type, possibly constructed with type arguments.
    Named {
        /// The (original definition of the) named type.
        symbol: SymbolKey,
        /// Type arguments, empty for non-generic uses.
        #[serde(default)]
        type_arguments: Vec<TypeRef>,
    },
    /// Unmanaged pointer.
    Pointer(Box<TypeRef>),
    /// Reference to a type parameter of a type or method.
    TypeParameter(SymbolKey),
}

/// Declaration site of a source symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Project-relative path of the declaring document.
    pub document: String,
    /// Span of the declaring name.
    pub span: TextRange,
}

/// Everything the core reads about one symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolData {
    /// Declared accessibility.
    #[serde(default)]
    pub accessibility: Accessibility,
    /// Containing assembly. `None` only for the global namespace.
    #[serde(default)]
    pub assembly: Option<String>,
    /// Base class of a named type.
    #[serde(default)]
    pub base_type: Option<SymbolKey>,
    /// Containing symbol; `None` for the global namespace.
    #[serde(default)]
    pub containing: Option<SymbolKey>,
    /// Interface members this member implements through explicit syntax.
    #[serde(default)]
    pub explicit_interface_implementations: Vec<SymbolKey>,
    /// Interface members this member implements implicitly.
    #[serde(default)]
    pub implemented_interface_members: Vec<SymbolKey>,
    /// Interfaces a named type lists directly.
    #[serde(default)]
    pub interfaces: Vec<SymbolKey>,
    /// Whether the field is a compile-time constant.
    #[serde(default)]
    pub is_const: bool,
    /// Whether the method is declared as an extension method.
    #[serde(default)]
    pub is_extension_method: bool,
    /// Whether the compiler synthesized this symbol (e.g. default constructors).
    #[serde(default)]
    pub is_implicitly_declared: bool,
    /// Whether the member is static.
    #[serde(default)]
    pub is_static: bool,
    /// What the symbol is.
    pub kind: SymbolKind,
    /// Source declaration sites; empty for metadata symbols.
    #[serde(default)]
    pub locations: Vec<SourceLocation>,
    /// Metadata name when it differs from `name` (e.g. `List`1`).
    #[serde(default)]
    pub metadata_name: Option<String>,
    /// Flavor of a method.
    #[serde(default)]
    pub method_kind: Option<MethodKind>,
    /// Source name.
    pub name: String,
    /// Original definition for constructed generic symbols.
    #[serde(default)]
    pub original_definition: Option<SymbolKey>,
    /// Member this member overrides.
    #[serde(default)]
    pub overridden: Option<SymbolKey>,
    /// Parameters of methods and indexers.
    #[serde(default)]
    pub parameters: Vec<SymbolKey>,
    /// Unreduced extension method behind a reduced one.
    #[serde(default)]
    pub reduced_from: Option<SymbolKey>,
    /// How a parameter is passed.
    #[serde(default)]
    pub ref_kind: RefKind,
    /// Type of fields, properties, locals, and parameters; return type of methods.
    #[serde(default)]
    pub ty: Option<TypeRef>,
    /// Flavor of a named type.
    #[serde(default)]
    pub type_kind: Option<TypeKind>,
    /// Type parameters of generic types and methods.
    #[serde(default)]
    pub type_parameters: Vec<SymbolKey>,
}

impl SymbolData {
    /// A bare symbol of `kind` named `name`; every other property defaulted.
    pub fn new(kind: SymbolKind, name: &str) -> Self {
        return Self {
            accessibility: Accessibility::NotApplicable,
            assembly: None,
            base_type: None,
            containing: None,
            explicit_interface_implementations: Vec::new(),
            implemented_interface_members: Vec::new(),
            interfaces: Vec::new(),
            is_const: false,
            is_extension_method: false,
            is_implicitly_declared: false,
            is_static: false,
            kind,
            locations: Vec::new(),
            metadata_name: None,
            method_kind: None,
            name: name.to_string(),
            original_definition: None,
            overridden: None,
            parameters: Vec::new(),
            reduced_from: None,
            ref_kind: RefKind::None,
            ty: None,
            type_kind: None,
            type_parameters: Vec::new(),
        };
    }

    /// Whether the symbol is an instance or static constructor.
    pub fn is_constructor(&self) -> bool {
        return self.kind == SymbolKind::Method
            && matches!(
                self.method_kind,
                Some(MethodKind::Constructor | MethodKind::StaticConstructor)
            );
    }

    /// Whether the symbol is the root namespace.
    pub fn is_global_namespace(&self) -> bool {
        return self.kind == SymbolKind::Namespace && self.containing.is_none();
    }

    /// Name as it appears in metadata.
    pub fn metadata_name(&self) -> &str {
        return self.metadata_name.as_deref().unwrap_or(&self.name);
    }
}

/// Arena of every symbol in a solution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolTable {
    /// Symbols, indexed by `SymbolKey`.
    symbols: Vec<SymbolData>,
}

impl SymbolTable {
    /// An empty table.
    pub const fn new() -> Self {
        return Self { symbols: Vec::new() };
    }

    /// Look up a symbol.
    pub fn get(&self, key: SymbolKey) -> Option<&SymbolData> {
        let index = usize::try_from(key.0).ok()?;
        return self.symbols.get(index);
    }

    /// Mutable lookup, used by frontends while wiring relationships.
    pub fn get_mut(&mut self, key: SymbolKey) -> Option<&mut SymbolData> {
        let index = usize::try_from(key.0).ok()?;
        return self.symbols.get_mut(index);
    }

    /// Whether `key` points inside the table.
    pub fn contains(&self, key: SymbolKey) -> bool {
        return self.get(key).is_some();
    }

    /// Iterate over keys and symbols.
    pub fn iter(&self) -> impl Iterator<Item = (SymbolKey, &SymbolData)> {
        return self
            .symbols
            .iter()
            .enumerate()
            .filter_map(|(index, data)| return Some((SymbolKey(u32::try_from(index).ok()?), data)));
    }

    /// Number of symbols.
    pub fn len(&self) -> usize {
        return self.symbols.len();
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        return self.symbols.is_empty();
    }

    /// Follow `original_definition` links to the definition symbol.
    /// Cycles stop at the first repeated key.
    pub fn original_definition(&self, key: SymbolKey) -> SymbolKey {
        let mut current = key;
        let mut steps = 0_usize;
        while let Some(next) = self.get(current).and_then(|data| return data.original_definition) {
            if next == current || steps > self.symbols.len() {
                break;
            }
            current = next;
            steps = steps.saturating_add(1);
        }
        return current;
    }

    /// Containing symbols from the immediate container outward, excluding `key`.
    pub fn containers(&self, key: SymbolKey) -> Vec<SymbolKey> {
        let mut chain = Vec::new();
        let mut current = self.get(key).and_then(|data| return data.containing);
        while let Some(next) = current {
            if chain.contains(&next) || next == key {
                break;
            }
            chain.push(next);
            current = self.get(next).and_then(|data| return data.containing);
        }
        return chain;
    }

    /// Outermost named type containing `key` (or `key` itself when it is a
    /// top-level type). Used to look up type forwarding for metadata symbols.
    pub fn top_level_type(&self, key: SymbolKey) -> Option<SymbolKey> {
        let mut candidate = None;
        let mut chain = vec![key];
        chain.extend(self.containers(key));
        for item in chain {
            if self.get(item)?.kind == SymbolKind::NamedType {
                candidate = Some(item);
            }
        }
        return candidate;
    }

    /// Append a symbol and return its key.
    ///
    /// # Errors
    ///
    /// Returns `Error::SymbolTableFull` once every 32-bit key is taken.
    pub fn push(&mut self, data: SymbolData) -> Result<SymbolKey, Error> {
        let key = u32::try_from(self.symbols.len()).map_err(|_err| return Error::SymbolTableFull { limit: u64::from(u32::MAX) })?;
        self.symbols.push(data);
        return Ok(SymbolKey(key));
    }
}

/// Assembly-level forwarding of a type to another assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeForward {
    /// Assembly that used to define the type.
    pub from_assembly: String,
    /// Assembly that defines it now.
    pub to_assembly: String,
    /// Fully qualified metadata name of the type, e.g. `System.Collections.Generic.List`1`.
    pub type_name: String,
}
