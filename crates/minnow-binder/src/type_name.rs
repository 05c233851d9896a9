//! Type and signature formatting for diagnostics and tracing.

use minnow_solver::{SubFuncId, Type, TypeVars};

use crate::symbols::{Arg, StructDef, Symbols};

impl Symbols {
    /// Render a type for the user, resolving bound variables through the
    /// unification table.
    pub fn type_name(&self, ty: &Type, vars: &TypeVars) -> String {
        match ty {
            Type::Undefined => "undefined".to_string(),
            Type::Any => "any".to_string(),
            Type::Int => "int".to_string(),
            Type::Float => "float".to_string(),
            Type::Str => "string".to_string(),
            Type::Nil => "nil".to_string(),
            Type::Nilable(e) => format!("{}?", self.type_name(e, vars)),
            Type::Vector(e) => format!("[{}]", self.type_name(e, vars)),
            Type::Struct(s) => self.struct_def(*s).name.clone(),
            Type::Function(None) => "function".to_string(),
            Type::Function(Some(f)) => format!("function {}", self.function(*f).name),
            Type::Coroutine => "coroutine".to_string(),
            Type::Var(v) => {
                let bound = vars.get(*v);
                if *bound == Type::Undefined {
                    "undefined".to_string()
                } else {
                    let resolved = bound.clone();
                    self.type_name(&resolved, vars)
                }
            }
        }
    }

    fn typed_arg(&self, arg: &Arg, vars: &TypeVars) -> String {
        let name = &self.ident(arg.ident).name;
        if arg.ty == Type::Any {
            name.clone()
        } else {
            format!("{}:{}", name, self.type_name(&arg.ty, vars))
        }
    }

    fn arg_list(&self, args: &[Arg], vars: &TypeVars) -> String {
        let parts: Vec<String> = args.iter().map(|a| self.typed_arg(a, vars)).collect();
        format!("({})", parts.join(", "))
    }

    /// `name(arg:type, ...)` for a SubFunction.
    pub fn signature(&self, sf: SubFuncId, vars: &TypeVars) -> String {
        let sub = self.subfunction(sf);
        let f = self.function(sub.parent);
        format!("{}{}", f.name, self.arg_list(&sub.args, vars))
    }

    /// Signature plus the captured free variables and their specialized
    /// types.
    pub fn signature_with_freevars(&self, sf: SubFuncId, vars: &TypeVars) -> String {
        let mut s = self.signature(sf, vars);
        s.push_str(" { ");
        for fv in &self.subfunction(sf).freevars {
            s.push_str(&self.typed_arg(fv, vars));
            s.push(' ');
        }
        s.push('}');
        s
    }

    /// `name(field:type, ...)` for a record.
    pub fn struct_signature(&self, struc: &StructDef, vars: &TypeVars) -> String {
        let parts: Vec<String> = struc
            .fields
            .iter()
            .map(|sf| {
                let name = &self.field(sf.field).name;
                if sf.ty == Type::Any {
                    name.clone()
                } else {
                    format!("{}:{}", name, self.type_name(&sf.ty, vars))
                }
            })
            .collect();
        format!("{}({})", struc.name, parts.join(", "))
    }
}
