// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Type resolver: compiles an [`AbiDef`] into a [`ResolvedAbi`].
//!
//! Resolution runs in three passes over one arena:
//!
//! 1. every built-in, struct and variant gets its node up front (structs and
//!    variants as empty placeholders), so any name that is not an alias maps
//!    to an index immediately;
//! 2. aliases are flattened onto their target's index; since declarations
//!    already have indices, a chain that comes back to itself is a true
//!    alias cycle;
//! 3. struct bases and fields and variant alternatives are filled in. Field
//!    types may name any struct, including the one being filled.
//!
//! Wrapper spellings (`T[]`, `T?`, `T$`) get a node the first time they are
//! seen and are cached under that spelling.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::abi::{AbiDef, StructDef, VariantDef};
use crate::error::{AbiError, Result, ResultExt};
use crate::name::Name;
use crate::types::{
    Alternative, Builtin, Field, MessageType, ResolvedAbi, StructType, TypeIndex, TypeNode,
    VariantType,
};

/// Name of the built-in `{quantity: asset, contract: name}` struct.
pub const EXTENDED_ASSET: &str = "extended_asset";

/// Compile a schema document into a resolved type graph.
pub fn resolve(def: &AbiDef) -> Result<ResolvedAbi> {
    let mut resolver = Resolver::new(def);
    resolver.declare()?;
    resolver.flatten_aliases()?;
    resolver.fill_declarations()?;
    resolver.bind_messages()?;
    let abi = resolver.abi;
    debug!(
        version = %abi.version,
        nodes = abi.nodes.len(),
        actions = abi.actions.len(),
        tables = abi.tables.len(),
        action_results = abi.action_results.len(),
        "resolved abi"
    );
    Ok(abi)
}

struct Resolver<'a> {
    def: &'a AbiDef,
    abi: ResolvedAbi,
    aliases: HashMap<&'a str, &'a str>,
    structs: HashMap<&'a str, &'a StructDef>,
    /// Aliases whose chain is currently being walked.
    resolving_aliases: HashSet<String>,
    /// Structs whose base chain is currently being filled.
    filling: HashSet<String>,
    filled: HashSet<String>,
}

impl<'a> Resolver<'a> {
    fn new(def: &'a AbiDef) -> Self {
        let mut abi = ResolvedAbi {
            version: def.version.clone(),
            ..ResolvedAbi::default()
        };
        for builtin in Builtin::ALL {
            let idx = push(&mut abi, TypeNode::Builtin(*builtin));
            abi.names.insert(builtin.name().to_string(), idx);
        }
        let asset = abi.names[Builtin::Asset.name()];
        let name = abi.names[Builtin::Name.name()];
        let extended = push(
            &mut abi,
            TypeNode::Struct(StructType {
                name: EXTENDED_ASSET.to_string(),
                base: None,
                fields: vec![
                    Field {
                        name: "quantity".into(),
                        ty: asset,
                    },
                    Field {
                        name: "contract".into(),
                        ty: name,
                    },
                ],
            }),
        );
        abi.names.insert(EXTENDED_ASSET.to_string(), extended);

        Self {
            def,
            abi,
            aliases: HashMap::new(),
            structs: HashMap::new(),
            resolving_aliases: HashSet::new(),
            filling: HashSet::new(),
            filled: HashSet::from([EXTENDED_ASSET.to_string()]),
        }
    }

    fn claim(&self, name: &str, declared: &HashSet<&str>) -> Result<()> {
        if name.is_empty() {
            return Err(AbiError::definition(name, "empty type name"));
        }
        if self.abi.names.contains_key(name) || declared.contains(name) {
            return Err(AbiError::definition(name, "type is defined more than once"));
        }
        Ok(())
    }

    /// Pass 1: register declarations, giving structs and variants a node.
    fn declare(&mut self) -> Result<()> {
        let def = self.def;
        let mut declared: HashSet<&str> = HashSet::new();
        for alias in &def.types {
            let name = alias.new_type_name.as_str();
            self.claim(name, &declared)?;
            declared.insert(name);
            self.aliases.insert(name, alias.type_name.as_str());
        }
        for s in &def.structs {
            let name = s.name.as_str();
            self.claim(name, &declared)?;
            declared.insert(name);
            self.structs.insert(name, s);
            let idx = push(
                &mut self.abi,
                TypeNode::Struct(StructType {
                    name: s.name.clone(),
                    base: None,
                    fields: Vec::new(),
                }),
            );
            self.abi.names.insert(s.name.clone(), idx);
        }
        for v in &def.variants {
            let name = v.name.as_str();
            self.claim(name, &declared)?;
            declared.insert(name);
            let idx = push(
                &mut self.abi,
                TypeNode::Variant(VariantType {
                    name: v.name.clone(),
                    alternatives: Vec::new(),
                }),
            );
            self.abi.names.insert(v.name.clone(), idx);
        }
        Ok(())
    }

    /// Pass 2: map every alias name onto its target's node.
    fn flatten_aliases(&mut self) -> Result<()> {
        let def = self.def;
        for alias in &def.types {
            self.get_type(&alias.new_type_name)
                .context_with(|| format!("alias \"{}\"", alias.new_type_name))?;
        }
        Ok(())
    }

    /// Pass 3: fill struct bases/fields and variant alternatives.
    fn fill_declarations(&mut self) -> Result<()> {
        let def = self.def;
        for s in &def.structs {
            self.fill_struct(&s.name)?;
        }
        for v in &def.variants {
            self.fill_variant(v)?;
        }
        Ok(())
    }

    fn bind_messages(&mut self) -> Result<()> {
        let def = self.def;
        for action in &def.actions {
            let entry = self
                .message(&action.type_name)
                .context_with(|| format!("action \"{}\"", action.name))?;
            insert_message(&mut self.abi.actions, action.name, entry, "action")?;
        }
        for table in &def.tables {
            let entry = self
                .message(&table.type_name)
                .context_with(|| format!("table \"{}\"", table.name))?;
            insert_message(&mut self.abi.tables, table.name, entry, "table")?;
        }
        for result in &def.action_results {
            let entry = self
                .message(&result.result_type)
                .context_with(|| format!("action result \"{}\"", result.name))?;
            insert_message(&mut self.abi.action_results, result.name, entry, "action result")?;
        }
        Ok(())
    }

    fn message(&mut self, type_name: &str) -> Result<MessageType> {
        Ok(MessageType {
            type_name: type_name.to_string(),
            ty: self.get_type(type_name)?,
        })
    }

    fn get_type(&mut self, name: &str) -> Result<TypeIndex> {
        if let Some(idx) = self.abi.names.get(name) {
            return Ok(*idx);
        }
        if let Some(inner) = name.strip_suffix("[]") {
            let inner_idx = self.get_type(inner)?;
            if self.abi.node(inner_idx).is_extension() {
                return Err(AbiError::definition(name, "array of a binary extension"));
            }
            return Ok(self.wrap(name, TypeNode::Array(inner_idx)));
        }
        if let Some(inner) = name.strip_suffix('?') {
            let inner_idx = self.get_type(inner)?;
            let node = self.abi.node(inner_idx);
            if node.is_extension() {
                return Err(AbiError::definition(name, "optional of a binary extension"));
            }
            if node.is_optional() {
                return Err(AbiError::definition(name, "optional of an optional"));
            }
            return Ok(self.wrap(name, TypeNode::Optional(inner_idx)));
        }
        if let Some(inner) = name.strip_suffix('$') {
            let inner_idx = self.get_type(inner)?;
            if self.abi.node(inner_idx).is_extension() {
                return Err(AbiError::definition(name, "binary extension of a binary extension"));
            }
            return Ok(self.wrap(name, TypeNode::Extension(inner_idx)));
        }
        if self.aliases.contains_key(name) {
            return self.resolve_alias(name);
        }
        Err(AbiError::UnknownType(name.to_string()))
    }

    fn wrap(&mut self, name: &str, node: TypeNode) -> TypeIndex {
        let idx = push(&mut self.abi, node);
        self.abi.names.insert(name.to_string(), idx);
        idx
    }

    fn resolve_alias(&mut self, name: &str) -> Result<TypeIndex> {
        let mut chain: Vec<String> = Vec::new();
        let mut current = name;
        while let Some(target) = self.aliases.get(current).copied() {
            if self.resolving_aliases.contains(current) || chain.iter().any(|c| c == current) {
                return Err(AbiError::CyclicAlias(current.to_string()));
            }
            chain.push(current.to_string());
            current = target;
            if self.abi.names.contains_key(current) {
                break;
            }
        }
        self.resolving_aliases.extend(chain.iter().cloned());
        let resolved = self.get_type(current);
        for alias in &chain {
            self.resolving_aliases.remove(alias);
        }
        let idx = resolved?;
        for alias in chain {
            self.abi.names.insert(alias, idx);
        }
        Ok(idx)
    }

    fn fill_struct(&mut self, name: &str) -> Result<()> {
        if self.filled.contains(name) {
            return Ok(());
        }
        if !self.filling.insert(name.to_string()) {
            return Err(AbiError::CyclicBase(name.to_string()));
        }
        let Some(def) = self.structs.get(name).copied() else {
            return Err(AbiError::UnknownType(name.to_string()));
        };

        let mut fields = Vec::new();
        let mut base = None;
        if let Some(base_name) = &def.base {
            let base_idx = self
                .get_type(base_name)
                .context_with(|| format!("base of struct \"{name}\""))?;
            let base_struct = match self.abi.node(base_idx) {
                TypeNode::Struct(s) => s.name.clone(),
                _ => {
                    return Err(AbiError::definition(
                        name,
                        format!("base \"{base_name}\" is not a struct"),
                    ))
                }
            };
            self.fill_struct(&base_struct)?;
            if let TypeNode::Struct(s) = self.abi.node(base_idx) {
                fields.extend(s.fields.iter().cloned());
            }
            base = Some(base_idx);
        }
        for field in &def.fields {
            let ty = self
                .get_type(&field.type_name)
                .context_with(|| format!("struct \"{name}\" field \"{}\"", field.name))?;
            fields.push(Field {
                name: field.name.clone(),
                ty,
            });
        }

        let mut names = HashSet::with_capacity(fields.len());
        let mut seen_extension = false;
        for field in &fields {
            if !names.insert(field.name.as_str()) {
                return Err(AbiError::definition(
                    name,
                    format!("field \"{}\" is declared more than once", field.name),
                ));
            }
            if self.abi.node(field.ty).is_extension() {
                seen_extension = true;
            } else if seen_extension {
                return Err(AbiError::definition(
                    name,
                    format!("field \"{}\" follows a binary extension field", field.name),
                ));
            }
        }

        let idx = self.abi.names[name];
        self.abi.nodes[idx.as_usize()] = TypeNode::Struct(StructType {
            name: name.to_string(),
            base,
            fields,
        });
        self.filling.remove(name);
        self.filled.insert(name.to_string());
        Ok(())
    }

    fn fill_variant(&mut self, def: &VariantDef) -> Result<()> {
        let invalid = |reason: String| AbiError::InvalidVariant {
            name: def.name.clone(),
            reason,
        };
        let mut alternatives: Vec<Alternative> = Vec::with_capacity(def.types.len());
        for type_name in &def.types {
            if alternatives.iter().any(|alt| &alt.name == type_name) {
                return Err(invalid(format!("duplicate alternative \"{type_name}\"")));
            }
            let ty = self
                .get_type(type_name)
                .map_err(|e| invalid(format!("alternative \"{type_name}\": {e}")))?;
            if self.abi.node(ty).is_extension() {
                return Err(invalid(format!(
                    "alternative \"{type_name}\" is a binary extension"
                )));
            }
            alternatives.push(Alternative {
                name: type_name.clone(),
                ty,
            });
        }
        let idx = self.abi.names[def.name.as_str()];
        self.abi.nodes[idx.as_usize()] = TypeNode::Variant(VariantType {
            name: def.name.clone(),
            alternatives,
        });
        Ok(())
    }
}

#[allow(clippy::cast_possible_truncation)]
fn push(abi: &mut ResolvedAbi, node: TypeNode) -> TypeIndex {
    // arena size is bounded by the document, far below u32::MAX
    let idx = TypeIndex(abi.nodes.len() as u32);
    abi.nodes.push(node);
    idx
}

fn insert_message(
    map: &mut HashMap<Name, MessageType>,
    name: Name,
    entry: MessageType,
    what: &str,
) -> Result<()> {
    if map.insert(name, entry).is_some() {
        return Err(AbiError::definition(
            &name.to_string(),
            format!("{what} declared more than once"),
        ));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::abi::{ActionDef, FieldDef, TypeDef};

    fn field(name: &str, ty: &str) -> FieldDef {
        FieldDef {
            name: name.into(),
            type_name: ty.into(),
        }
    }

    fn strukt(name: &str, base: Option<&str>, fields: Vec<FieldDef>) -> StructDef {
        StructDef {
            name: name.into(),
            base: base.map(Into::into),
            fields,
        }
    }

    fn alias(name: &str, target: &str) -> TypeDef {
        TypeDef {
            new_type_name: name.into(),
            type_name: target.into(),
        }
    }

    #[test]
    fn aliases_share_their_target_node() {
        let mut def = AbiDef::new("eosio::abi/1.1");
        def.types = vec![alias("account", "name"), alias("owner", "account")];
        let abi = resolve(&def).unwrap();
        let name = abi.get_type("name").unwrap();
        assert_eq!(abi.get_type("account").unwrap(), name);
        assert_eq!(abi.get_type("owner").unwrap(), name);
    }

    #[test]
    fn alias_cycles_are_detected() {
        let mut def = AbiDef::new("eosio::abi/1.1");
        def.types = vec![alias("a", "b"), alias("b", "c"), alias("c", "a")];
        let err = resolve(&def).unwrap_err();
        assert!(matches!(err.root(), AbiError::CyclicAlias(_)), "{err}");

        def.types = vec![alias("a", "b[]"), alias("b", "a")];
        let err = resolve(&def).unwrap_err();
        assert!(matches!(err.root(), AbiError::CyclicAlias(_)), "{err}");
    }

    #[test]
    fn base_fields_come_first() {
        let mut def = AbiDef::new("eosio::abi/1.1");
        def.structs = vec![
            strukt("child", Some("parent"), vec![field("c", "string")]),
            strukt("parent", Some("root"), vec![field("b", "uint8")]),
            strukt("root", None, vec![field("a", "bool")]),
        ];
        let abi = resolve(&def).unwrap();
        let TypeNode::Struct(s) = abi.node(abi.get_type("child").unwrap()) else {
            panic!("child is not a struct");
        };
        let names: Vec<_> = s.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert_eq!(s.base, Some(abi.get_type("parent").unwrap()));
    }

    #[test]
    fn base_cycles_are_detected() {
        let mut def = AbiDef::new("eosio::abi/1.1");
        def.structs = vec![
            strukt("a", Some("b"), vec![]),
            strukt("b", Some("a"), vec![]),
        ];
        let err = resolve(&def).unwrap_err();
        assert!(matches!(err.root(), AbiError::CyclicBase(_)), "{err}");
    }

    #[test]
    fn recursive_structs_resolve() {
        let mut def = AbiDef::new("eosio::abi/1.1");
        def.types = vec![alias("children", "node[]")];
        def.structs = vec![strukt(
            "node",
            None,
            vec![field("value", "uint32"), field("children", "children")],
        )];
        let abi = resolve(&def).unwrap();
        let node = abi.get_type("node").unwrap();
        let TypeNode::Array(inner) = abi.node(abi.get_type("children").unwrap()) else {
            panic!("children is not an array");
        };
        assert_eq!(*inner, node);
    }

    #[test]
    fn extension_fields_must_trail() {
        let mut def = AbiDef::new("eosio::abi/1.1");
        def.structs = vec![strukt(
            "bad",
            None,
            vec![field("a", "uint32$"), field("b", "uint32")],
        )];
        let err = resolve(&def).unwrap_err();
        assert!(matches!(err.root(), AbiError::InvalidDefinition { .. }), "{err}");

        def.structs = vec![
            strukt("base", None, vec![field("a", "uint32$")]),
            strukt("derived", Some("base"), vec![field("b", "uint32")]),
        ];
        let err = resolve(&def).unwrap_err();
        assert!(matches!(err.root(), AbiError::InvalidDefinition { .. }), "{err}");
    }

    #[test]
    fn duplicate_field_names_are_rejected() {
        let mut def = AbiDef::new("eosio::abi/1.1");
        def.structs = vec![
            strukt("base", None, vec![field("id", "uint64")]),
            strukt("derived", Some("base"), vec![field("id", "name")]),
        ];
        let err = resolve(&def).unwrap_err();
        assert!(matches!(err.root(), AbiError::InvalidDefinition { .. }), "{err}");
    }

    #[test]
    fn wrapper_nesting_rules() {
        for bad in ["uint8$[]", "uint8$?", "uint8$$", "uint8??"] {
            let mut def = AbiDef::new("eosio::abi/1.1");
            def.structs = vec![strukt("s", None, vec![field("f", bad)])];
            let err = resolve(&def).unwrap_err();
            assert!(
                matches!(err.root(), AbiError::InvalidDefinition { .. }),
                "{bad}: {err}"
            );
        }
        let mut def = AbiDef::new("eosio::abi/1.1");
        def.structs = vec![strukt("s", None, vec![field("f", "string?[]")])];
        assert!(resolve(&def).is_ok());
    }

    #[test]
    fn unknown_and_duplicate_definitions() {
        let mut def = AbiDef::new("eosio::abi/1.1");
        def.structs = vec![strukt("s", None, vec![field("f", "nosuch")])];
        let err = resolve(&def).unwrap_err();
        assert_eq!(err.root(), &AbiError::UnknownType("nosuch".into()));

        let mut def = AbiDef::new("eosio::abi/1.1");
        def.types = vec![alias("uint64", "name")];
        let err = resolve(&def).unwrap_err();
        assert!(matches!(err.root(), AbiError::InvalidDefinition { .. }));
    }

    #[test]
    fn variant_alternatives() {
        let mut def = AbiDef::new("eosio::abi/1.1");
        def.variants = vec![VariantDef {
            name: "v".into(),
            types: vec!["uint8".into(), "uint8".into()],
        }];
        let err = resolve(&def).unwrap_err();
        assert!(matches!(err, AbiError::InvalidVariant { .. }));

        def.variants[0].types = vec!["uint8".into(), "missing".into()];
        let err = resolve(&def).unwrap_err();
        assert!(matches!(err, AbiError::InvalidVariant { .. }));
    }

    #[test]
    fn message_lookup() {
        let mut def = AbiDef::new("eosio::abi/1.1");
        def.structs = vec![strukt("transfer", None, vec![field("to", "name")])];
        def.actions = vec![ActionDef {
            name: Name::encode("transfer").unwrap(),
            type_name: "transfer".into(),
            ricardian_contract: String::new(),
        }];
        let abi = resolve(&def).unwrap();
        let action = Name::encode("transfer").unwrap();
        assert_eq!(
            abi.get_action_type(action).unwrap(),
            abi.get_type("transfer").unwrap()
        );
        assert_eq!(abi.action_type_name(action).unwrap(), "transfer");
        assert!(matches!(
            abi.get_table_type(action),
            Err(AbiError::NotFound(_))
        ));
    }
}
