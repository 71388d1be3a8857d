use crate::FragmentGeneratorError;
use apollo_parser::ast::{
    Definition, FieldsDefinition, Name, NamedType, RootOperationTypeDefinition, Type,
};
use indexmap::IndexMap;
use std::collections::HashMap;

const BUILTIN_SCALARS: [&str; 5] = ["Int", "Float", "String", "Boolean", "ID"];

/// A field's declared type, with wrappers kept in the order they were written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeRef {
    Named(String),
    List(Box<TypeRef>),
    NonNull(Box<TypeRef>),
}

impl TypeRef {
    /// Strips list and non-null wrappers, in whatever order they nest.
    pub fn innermost(&self) -> &str {
        let mut ty = self;
        loop {
            match ty {
                TypeRef::Named(name) => return name,
                TypeRef::List(inner) | TypeRef::NonNull(inner) => ty = inner,
            }
        }
    }

    fn from_ast(mut ty: Type) -> Result<Self, FragmentGeneratorError> {
        // Wrappers are collected outside-in, then folded back around the name.
        let mut wrappers = Vec::new();
        let name = loop {
            match ty {
                Type::NamedType(named_type) => break named_type_name(&named_type)?,
                Type::ListType(list_type) => {
                    wrappers.push(Wrapper::List);
                    ty = list_type
                        .ty()
                        .ok_or(FragmentGeneratorError::Schema("list has no type"))?;
                }
                Type::NonNullType(non_null_type) => {
                    wrappers.push(Wrapper::NonNull);
                    if let Some(list_type) = non_null_type.list_type() {
                        wrappers.push(Wrapper::List);
                        ty = list_type
                            .ty()
                            .ok_or(FragmentGeneratorError::Schema("list has no type"))?;
                        continue;
                    }
                    let named_type = non_null_type
                        .named_type()
                        .ok_or(FragmentGeneratorError::Schema("non-null has no named type"))?;
                    break named_type_name(&named_type)?;
                }
            }
        };
        Ok(wrappers
            .into_iter()
            .rev()
            .fold(TypeRef::Named(name), |inner, wrapper| match wrapper {
                Wrapper::List => TypeRef::List(Box::new(inner)),
                Wrapper::NonNull => TypeRef::NonNull(Box::new(inner)),
            }))
    }
}

enum Wrapper {
    List,
    NonNull,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NamedKind {
    Scalar,
    Enum,
    Object,
    Interface,
    Union,
    InputObject,
}

/// Structural category of a field once its wrappers are gone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Scalar,
    Enum,
    Object(String),
    /// Interfaces, unions and input objects. These are never printed.
    Other(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub ty: TypeRef,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectType {
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
}

#[derive(Debug, Default)]
struct RootTypes {
    query: Option<String>,
    mutation: Option<String>,
    subscription: Option<String>,
}

impl RootTypes {
    /// Roots of a schema without a `schema {}` definition.
    fn conventional() -> Self {
        Self {
            query: Some("Query".into()),
            mutation: Some("Mutation".into()),
            subscription: Some("Subscription".into()),
        }
    }
}

/// Parsed schema. Object types keep their declaration order.
#[derive(Debug)]
pub struct TypeSystem {
    kinds: HashMap<String, NamedKind>,
    objects: IndexMap<String, ObjectType>,
    roots: Vec<String>,
}

impl TypeSystem {
    pub fn parse(schema_content: &str) -> Result<Self, FragmentGeneratorError> {
        let parser = apollo_parser::Parser::new(schema_content);
        let ast = parser.parse();
        if let Some(err) = ast.errors().next() {
            return Err(FragmentGeneratorError::Parse(
                err.index(),
                err.data().into(),
                err.message().into(),
            ));
        }

        let mut kinds: HashMap<String, NamedKind> = BUILTIN_SCALARS
            .iter()
            .map(|name| (name.to_string(), NamedKind::Scalar))
            .collect();
        let mut objects: IndexMap<String, ObjectType> = IndexMap::new();
        let mut extensions = Vec::new();
        let mut schema_definition = None;
        let mut schema_extensions = Vec::new();

        for def in ast.document().definitions() {
            use Definition::*;
            match def {
                ScalarTypeDefinition(typedef) => {
                    kinds.insert(
                        required_name(typedef.name(), "scalar has no name")?,
                        NamedKind::Scalar,
                    );
                }
                EnumTypeDefinition(typedef) => {
                    kinds.insert(
                        required_name(typedef.name(), "enum has no name")?,
                        NamedKind::Enum,
                    );
                }
                InterfaceTypeDefinition(typedef) => {
                    kinds.insert(
                        required_name(typedef.name(), "interface type has no name")?,
                        NamedKind::Interface,
                    );
                }
                UnionTypeDefinition(typedef) => {
                    kinds.insert(
                        required_name(typedef.name(), "union type has no name")?,
                        NamedKind::Union,
                    );
                }
                InputObjectTypeDefinition(typedef) => {
                    kinds.insert(
                        required_name(typedef.name(), "input object type has no name")?,
                        NamedKind::InputObject,
                    );
                }
                ObjectTypeDefinition(typedef) => {
                    let name = required_name(typedef.name(), "object type has no name")?;
                    let fields = collect_fields(typedef.fields_definition())?;
                    kinds.insert(name.clone(), NamedKind::Object);
                    objects.insert(name.clone(), ObjectType { name, fields });
                }
                ObjectTypeExtension(typedef) => {
                    let name =
                        required_name(typedef.name(), "object type extension has no name")?;
                    extensions.push((name, collect_fields(typedef.fields_definition())?));
                }
                SchemaDefinition(def) => schema_definition = Some(def),
                SchemaExtension(def) => schema_extensions.push(def),
                _ => (),
            }
        }

        for (name, fields) in extensions {
            let object = objects.get_mut(&name).ok_or(FragmentGeneratorError::Schema(
                "extension of an undefined object type",
            ))?;
            object.fields.extend(fields);
        }

        let mut roots = match schema_definition {
            Some(def) => {
                let mut roots = RootTypes::default();
                set_root_types(&mut roots, def.root_operation_type_definitions())?;
                roots
            }
            None => RootTypes::conventional(),
        };
        for def in schema_extensions {
            set_root_types(&mut roots, def.root_operation_type_definitions())?;
        }
        let roots = [roots.query, roots.mutation, roots.subscription]
            .into_iter()
            .flatten()
            .collect();

        Ok(Self {
            kinds,
            objects,
            roots,
        })
    }

    pub fn kind_of(&self, type_name: &str) -> Option<NamedKind> {
        self.kinds.get(type_name).copied()
    }

    pub fn object(&self, type_name: &str) -> Option<&ObjectType> {
        self.objects.get(type_name)
    }

    pub fn is_root(&self, type_name: &str) -> bool {
        self.roots.iter().any(|root| root == type_name)
    }

    /// Object types that get fragments: everything but the root operation
    /// types and introspection types.
    pub fn fragment_types(&self) -> impl Iterator<Item = &ObjectType> {
        self.objects
            .values()
            .filter(|object| !object.name.starts_with("__") && !self.is_root(&object.name))
    }

    pub fn classify(
        &self,
        owner: &str,
        field: &FieldDescriptor,
    ) -> Result<FieldKind, FragmentGeneratorError> {
        let named_type = field.ty.innermost();
        let kind = self.kind_of(named_type).ok_or_else(|| {
            FragmentGeneratorError::FieldClassification {
                type_name: owner.into(),
                field_name: field.name.clone(),
                named_type: named_type.into(),
            }
        })?;
        Ok(match kind {
            NamedKind::Scalar => FieldKind::Scalar,
            NamedKind::Enum => FieldKind::Enum,
            NamedKind::Object => FieldKind::Object(named_type.into()),
            NamedKind::Interface | NamedKind::Union | NamedKind::InputObject => {
                FieldKind::Other(named_type.into())
            }
        })
    }
}

fn required_name(
    name: Option<Name>,
    missing: &'static str,
) -> Result<String, FragmentGeneratorError> {
    Ok(name
        .ok_or(FragmentGeneratorError::Schema(missing))?
        .text()
        .to_string())
}

fn named_type_name(named_type: &NamedType) -> Result<String, FragmentGeneratorError> {
    Ok(named_type
        .name()
        .ok_or(FragmentGeneratorError::Schema("named type has no name"))?
        .text()
        .to_string())
}

fn collect_fields(
    fields_definition: Option<FieldsDefinition>,
) -> Result<Vec<FieldDescriptor>, FragmentGeneratorError> {
    let Some(fields_definition) = fields_definition else {
        return Ok(Vec::new());
    };
    let mut fields = Vec::new();
    for field_definition in fields_definition.field_definitions() {
        let name = field_definition
            .name()
            .ok_or(FragmentGeneratorError::Schema("field has no name"))?
            .text()
            .to_string();
        let ty = field_definition
            .ty()
            .ok_or(FragmentGeneratorError::Schema("field has no type"))?;
        fields.push(FieldDescriptor {
            name,
            ty: TypeRef::from_ast(ty)?,
        });
    }
    Ok(fields)
}

fn set_root_types(
    roots: &mut RootTypes,
    definitions: impl Iterator<Item = RootOperationTypeDefinition>,
) -> Result<(), FragmentGeneratorError> {
    for root in definitions {
        let operation_type = root
            .operation_type()
            .ok_or(FragmentGeneratorError::Schema("root operation has no operation type"))?;
        let named_type = root
            .named_type()
            .ok_or(FragmentGeneratorError::Schema("root operation has no named type"))?;
        let type_name = named_type_name(&named_type)?;
        if operation_type.query_token().is_some() {
            roots.query = Some(type_name);
        } else if operation_type.mutation_token().is_some() {
            roots.mutation = Some(type_name);
        } else if operation_type.subscription_token().is_some() {
            roots.subscription = Some(type_name);
        }
    }
    Ok(())
}
