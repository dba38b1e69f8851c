use std::fmt::Write;

use itertools::Itertools;

use crate::alias::AliasId;
use crate::engine::JitEngine;
use crate::specialize::SpecializationId;
use crate::type_expr::TypeExpr;
use crate::value::Value;

impl JitEngine {
    pub fn type_expr_to_string(&self, expr: &TypeExpr) -> String {
        let mut s = String::new();
        let _ = self.display_type_expr(expr, &mut s);
        s
    }

    pub fn type_expr_list_to_string(&self, exprs: &[TypeExpr]) -> String {
        exprs.iter().map(|e| self.type_expr_to_string(e)).join(", ")
    }

    fn display_type_expr(&self, expr: &TypeExpr, w: &mut impl Write) -> std::fmt::Result {
        let args = expr.args();
        match expr {
            TypeExpr::Native(type_id) => return self.types.display_type(*type_id, &self.idents, w),
            TypeExpr::Param(param) => w.write_str(&param.name)?,
            TypeExpr::Named { name, .. } => w.write_str(self.idents.get_name(*name))?,
            TypeExpr::Class { class, .. } => w.write_str(self.class_name(*class))?,
            TypeExpr::OwnClass { .. } => w.write_str("Self")?,
            TypeExpr::Alias(alias) => return w.write_str(&self.alias_to_string(*alias)),
            TypeExpr::Unparsed(text) => return w.write_str(text),
        }
        if !args.is_empty() {
            w.write_str("[")?;
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    w.write_str(", ")?;
                }
                self.display_type_expr(arg, w)?;
            }
            w.write_str("]")?;
        }
        Ok(())
    }

    pub fn alias_to_string(&self, alias: AliasId) -> String {
        let alias = self.aliases.get(alias);
        let name = self.class_name(alias.origin);
        match &alias.args {
            Some(key) if !key.is_empty() => {
                format!("{name}[{}]", self.types.type_list_to_string(key.as_slice(), &self.idents))
            }
            _ => name.to_string(),
        }
    }

    pub fn value_to_string(&self, value: &Value) -> String {
        match value {
            Value::None => "None".to_string(),
            Value::Bool(true) => "True".to_string(),
            Value::Bool(false) => "False".to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) if f.fract() == 0.0 && f.is_finite() => format!("{f:.1}"),
            Value::Float(f) => f.to_string(),
            Value::Str(s) => format!("'{s}'"),
            Value::List(list) => {
                format!("[{}]", list.items.borrow().iter().map(|v| self.value_to_string(v)).join(", "))
            }
            Value::Dict(dict) => {
                let entries = dict.entries.borrow();
                let body = entries
                    .iter()
                    .sorted_by(|a, b| a.0.cmp(b.0))
                    .map(|(k, v)| {
                        format!("{}: {}", self.value_to_string(&k.to_value()), self.value_to_string(v))
                    })
                    .join(", ");
                format!("{{{body}}}")
            }
            Value::Tuple(elements) if elements.len() == 1 => {
                format!("({},)", self.value_to_string(&elements[0]))
            }
            Value::Tuple(elements) => {
                format!("({})", elements.iter().map(|v| self.value_to_string(v)).join(", "))
            }
            Value::Record(record) => {
                let fields = record.fields.borrow();
                let body = match self.types.record(record.type_id) {
                    Some(r) => r
                        .fields
                        .iter()
                        .zip(fields.iter())
                        .map(|(f, v)| format!("{}={}", self.idents.get_name(f.name), self.value_to_string(v)))
                        .join(", "),
                    None => String::new(),
                };
                format!("{}({body})", self.types.type_to_string(record.type_id, &self.idents))
            }
        }
    }

    /// Physical layout and bound methods of one specialization
    pub fn dump_specialization(&self, spec: SpecializationId) -> String {
        let spec = self.specialization(spec);
        let mut s = String::new();
        let name = self.types.type_to_string(spec.record_type, &self.idents);
        let record = self.types.record(spec.record_type);
        let _ = writeln!(s, "{name} (specialization {})", spec.id);
        if let Some(record) = record {
            for field in &record.fields {
                let _ = writeln!(
                    s,
                    "  {:>4}  {}: {}",
                    field.offset,
                    self.idents.get_name(field.name),
                    self.types.type_to_string(field.type_id, &self.idents)
                );
            }
            if let Some(layout) = record.layout {
                let _ = writeln!(
                    s,
                    "  size {} align {} stride {}",
                    layout.size, layout.align, layout.stride
                );
            }
        }
        let methods = spec
            .all_methods()
            .map(|m| {
                let compiled = if m.compile { "" } else { " (interpreted)" };
                format!("{}({}){compiled}", self.idents.get_name(m.name), m.params.iter().join(", "))
            })
            .sorted()
            .collect::<Vec<_>>();
        for method in methods {
            let _ = writeln!(s, "  fn {method}");
        }
        let operators = spec.operators.keys().sorted().map(|op| op.method_name()).join(" ");
        if !operators.is_empty() {
            let _ = writeln!(s, "  operators: {operators}");
        }
        s
    }
}
