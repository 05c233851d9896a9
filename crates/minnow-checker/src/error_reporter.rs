//! Diagnostic construction.
//!
//! Every type error carries a backtrace of the enclosing function scopes:
//! each scope's call-site location, its signature with free variables,
//! and the current types of the identifiers it defines.

use minnow_ast::NodeId;
use minnow_common::{Diagnostic, codes};
use minnow_solver::Type;

use crate::checker::TypeChecker;

impl TypeChecker<'_> {
    /// "1st", "2nd", ... for call-argument attribution.
    pub(crate) fn arg_name(i: usize) -> String {
        match i {
            0 => "1st".to_string(),
            1 => "2nd".to_string(),
            2 => "3rd".to_string(),
            _ => format!("{}th", i + 1),
        }
    }

    /// A type mismatch at `n`, naming the required type, what was found,
    /// and optionally which argument of which construct.
    pub(crate) fn type_error(
        &self,
        required: &str,
        got: &Type,
        n: NodeId,
        argname: Option<&str>,
        context: Option<&str>,
    ) -> Diagnostic {
        let ctx = context.unwrap_or_else(|| self.arena[n].kind.name());
        let arg = argname
            .map(|a| format!("({a} argument) "))
            .unwrap_or_default();
        let msg = format!(
            "\"{}\" {}requires type: {}, got: {}",
            ctx,
            arg,
            required,
            self.syms.type_name(got, &self.vars)
        );
        self.error_at(msg, n, codes::TYPE_MISMATCH)
    }

    /// Build a diagnostic at `n` with the scope backtrace attached.
    pub(crate) fn error_at(&self, msg: String, n: NodeId, code: u32) -> Diagnostic {
        let mut diag = Diagnostic::error(self.arena[n].loc, msg, code);
        for scope in self.scopes.iter().rev() {
            let loc = self.arena[scope.call_context].loc;
            let mut text = format!(
                "in {}: {}",
                loc,
                self.syms.signature_with_freevars(scope.sf, &self.vars)
            );
            for &stmt in &self.syms.subfunction(scope.sf).body {
                if let minnow_ast::NodeKind::Def { ids, .. } = &self.arena[stmt].kind {
                    for &idn in ids {
                        if let Some(id) = self.arena[idn].kind.ident() {
                            let ident = self.syms.ident(id);
                            text.push_str(&format!(
                                ", {}:{}",
                                ident.name,
                                self.syms.type_name(&ident.ty, &self.vars)
                            ));
                        }
                    }
                }
            }
            diag = diag.with_related(loc, text);
        }
        diag
    }
}
