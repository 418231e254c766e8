//! Caller value -> foreign type mapping.
//!
//! Integers map to the configured fixed-width integer types (32-bit when the
//! value fits, wide otherwise), floats and text to their configured types,
//! sequences and mappings to the configured generic interfaces applied to
//! their element types. Foreign objects keep their own type. Anything else
//! passes through as a host type.

use dynbind_reflect::{Ty, TypeName};

use crate::config::TypeMapConfig;
use crate::value::Value;

#[derive(Clone, Debug)]
pub struct TypeMapper {
    integer: Ty,
    wide_integer: Ty,
    float: Ty,
    text: Ty,
    sequence: TypeName,
    mapping: TypeName,
    object: Ty,
}

impl TypeMapper {
    pub fn new(config: &TypeMapConfig) -> Self {
        TypeMapper {
            integer: Ty::named(&config.integer),
            wide_integer: Ty::named(&config.wide_integer),
            float: Ty::named(&config.float),
            text: Ty::named(&config.text),
            sequence: TypeName::parse(&config.sequence),
            mapping: TypeName::parse(&config.mapping),
            object: Ty::named(&config.object),
        }
    }

    /// The universal object type.
    pub fn object(&self) -> &Ty {
        &self.object
    }

    pub fn map_value(&self, value: &Value) -> Ty {
        match value {
            Value::Int(i) => {
                if i32::try_from(*i).is_ok() {
                    self.integer.clone()
                } else {
                    self.wide_integer.clone()
                }
            }
            Value::Float(_) => self.float.clone(),
            Value::Text(_) => self.text.clone(),
            Value::Seq(items) => Ty::App(
                self.sequence.clone(),
                vec![self.element_type(items.iter())],
            ),
            Value::Map(entries) => Ty::App(
                self.mapping.clone(),
                vec![
                    self.element_type(entries.iter().map(|(k, _)| k)),
                    self.element_type(entries.iter().map(|(_, v)| v)),
                ],
            ),
            Value::Foreign(obj) => obj.ty.clone(),
            Value::Bool(_) => Ty::Host("bool".to_string()),
            Value::Null => Ty::Host("null".to_string()),
            Value::Host(name) => Ty::Host(name.clone()),
        }
    }

    pub fn map_values(&self, values: &[Value]) -> Vec<Ty> {
        values
            .iter()
            .map(|value| {
                let ty = self.map_value(value);
                tracing::trace!(category = value.category(), %ty, "mapped argument");
                ty
            })
            .collect()
    }

    /// The shared mapped type of `items`. Integers of both widths share the
    /// wide integer type. Empty or mixed containers, and those holding host
    /// values, get the object type.
    fn element_type<'a>(&self, items: impl Iterator<Item = &'a Value>) -> Ty {
        let mut shared: Option<Ty> = None;
        for item in items {
            let ty = self.map_value(item);
            if matches!(ty, Ty::Host(_)) {
                return self.object.clone();
            }
            let next = match shared.take() {
                None => ty,
                Some(existing) if existing == ty => existing,
                Some(existing) if self.is_integer(&existing) && self.is_integer(&ty) => {
                    self.wide_integer.clone()
                }
                Some(_) => return self.object.clone(),
            };
            shared = Some(next);
        }
        shared.unwrap_or_else(|| self.object.clone())
    }

    fn is_integer(&self, ty: &Ty) -> bool {
        *ty == self.integer || *ty == self.wide_integer
    }
}

impl Default for TypeMapper {
    fn default() -> Self {
        TypeMapper::new(&TypeMapConfig::default())
    }
}
