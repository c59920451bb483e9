//! Type resolution: expand named references into concrete shapes.

use crate::error::SchemaError;
use crate::schema::{FieldDef, TypeBody, TypeRegistry};
use crate::types::{ResolvedField, ResolvedShape, ResolvedVariant, TypeRef};

/// Expand `ty` against `registry`.
///
/// Fails with [`SchemaError::UnknownType`] for names the registry does not
/// hold and [`SchemaError::CyclicType`] when a name is reached again while it
/// is still being expanded. The error carries the path that closed the loop.
pub fn resolve(ty: &TypeRef, registry: &TypeRegistry) -> Result<ResolvedShape, SchemaError> {
    let mut active = Vec::new();
    resolve_inner(ty, registry, &mut active)
}

fn resolve_inner(ty: &TypeRef, registry: &TypeRegistry, active: &mut Vec<String>) -> Result<ResolvedShape, SchemaError> {
    match ty {
        TypeRef::Primitive(p) => Ok(ResolvedShape::Primitive(*p)),
        TypeRef::Vec(inner) => Ok(ResolvedShape::Vec(Box::new(resolve_inner(inner, registry, active)?))),
        TypeRef::Array(inner, len) => Ok(ResolvedShape::Array(
            Box::new(resolve_inner(inner, registry, active)?),
            *len,
        )),
        TypeRef::Option(inner) => Ok(ResolvedShape::Option(Box::new(resolve_inner(inner, registry, active)?))),
        TypeRef::Map(k, v) => Ok(ResolvedShape::Map(
            Box::new(resolve_inner(k, registry, active)?),
            Box::new(resolve_inner(v, registry, active)?),
        )),
        TypeRef::Named(name) => {
            if active.iter().any(|n| n == name) {
                let mut path = active.clone();
                path.push(name.clone());
                return Err(SchemaError::CyclicType(path));
            }
            let def = registry
                .get(name)
                .ok_or_else(|| SchemaError::UnknownType(name.clone()))?;
            active.push(name.clone());
            let shape = match &def.body {
                TypeBody::Struct { fields, tuple } => ResolvedShape::Struct {
                    name: name.clone(),
                    fields: resolve_fields(fields, registry, active)?,
                    tuple: *tuple,
                },
                TypeBody::Enum { variants } => {
                    let mut resolved = Vec::with_capacity(variants.len());
                    for (index, variant) in variants.iter().enumerate() {
                        let index = u8::try_from(index).map_err(|_| {
                            SchemaError::InvalidIdl(format!("enum `{}` has too many variants", name))
                        })?;
                        resolved.push(ResolvedVariant {
                            name: variant.name.clone(),
                            index,
                            fields: resolve_fields(&variant.fields, registry, active)?,
                            tuple: variant.tuple,
                        });
                    }
                    ResolvedShape::Enum {
                        name: name.clone(),
                        variants: resolved,
                    }
                }
                TypeBody::Alias(target) => resolve_inner(target, registry, active)?,
            };
            active.pop();
            Ok(shape)
        }
    }
}

fn resolve_fields(
    fields: &[FieldDef],
    registry: &TypeRegistry,
    active: &mut Vec<String>,
) -> Result<Vec<ResolvedField>, SchemaError> {
    fields
        .iter()
        .map(|f| {
            Ok(ResolvedField {
                name: f.name.clone(),
                shape: resolve_inner(&f.ty, registry, active)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{TypeDefinition, VariantDef};
    use crate::types::PrimitiveKind;

    fn field(name: &str, ty: TypeRef) -> FieldDef {
        FieldDef {
            name: name.into(),
            ty,
        }
    }

    #[test]
    fn shared_type_used_twice_is_not_a_cycle() {
        let mut registry = TypeRegistry::new();
        registry
            .insert(TypeDefinition {
                name: "Point".into(),
                body: TypeBody::Struct {
                    fields: vec![field("x", TypeRef::Primitive(PrimitiveKind::I32))],
                    tuple: false,
                },
            })
            .unwrap();
        registry
            .insert(TypeDefinition {
                name: "Line".into(),
                body: TypeBody::Struct {
                    fields: vec![
                        field("from", TypeRef::Named("Point".into())),
                        field("to", TypeRef::Named("Point".into())),
                    ],
                    tuple: false,
                },
            })
            .unwrap();

        let shape = resolve(&TypeRef::Named("Line".into()), &registry).unwrap();
        match shape {
            ResolvedShape::Struct { fields, .. } => assert_eq!(fields.len(), 2),
            other => panic!("unexpected shape {:?}", other),
        }
    }

    #[test]
    fn self_reference_through_enum_is_cyclic() {
        let mut registry = TypeRegistry::new();
        registry
            .insert(TypeDefinition {
                name: "Expr".into(),
                body: TypeBody::Enum {
                    variants: vec![
                        VariantDef {
                            name: "Lit".into(),
                            fields: vec![field("0", TypeRef::Primitive(PrimitiveKind::U64))],
                            tuple: true,
                        },
                        VariantDef {
                            name: "Neg".into(),
                            fields: vec![field("0", TypeRef::Named("Expr".into()))],
                            tuple: true,
                        },
                    ],
                },
            })
            .unwrap();

        let err = resolve(&TypeRef::Named("Expr".into()), &registry).unwrap_err();
        assert_eq!(err, SchemaError::CyclicType(vec!["Expr".into(), "Expr".into()]));
    }

    #[test]
    fn alias_expands_to_target() {
        let mut registry = TypeRegistry::new();
        registry
            .insert(TypeDefinition {
                name: "Amount".into(),
                body: TypeBody::Alias(TypeRef::Primitive(PrimitiveKind::U64)),
            })
            .unwrap();
        let shape = resolve(&TypeRef::Vec(Box::new(TypeRef::Named("Amount".into()))), &registry).unwrap();
        assert_eq!(
            shape,
            ResolvedShape::Vec(Box::new(ResolvedShape::Primitive(PrimitiveKind::U64)))
        );
    }
}
