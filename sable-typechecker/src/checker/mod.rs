//! Type checker driver
//!
//! This module orchestrates checking of a whole program:
//! - Template registration for every declared type
//! - Supertype ordering and one-time reference verification
//! - Eager instantiation of the non-generic declared types
//! - The entry expression, then the body-checking fixed-point loop

pub mod context;
pub mod expressions;
pub mod functions;

pub use context::{CheckContext, CheckMode, Frame, Scope, Trial, Variable};
pub use expressions::{ExpressionChecker, LambdaBody};
pub use functions::{ensure_resolved, FunctionChecker};

use crate::ast::{Expr, Program};
use crate::config::CheckerConfig;
use crate::error::{TypeResult, TypecheckError};
use crate::hierarchy::SupertypeGraph;
use crate::registry::TypeRegistry;
use crate::templates::declared::DeclaredTemplate;
use crate::templates::TypeTemplate;
use crate::typed_ast::{TypedExpr, TypedProgram};
use crate::types::TemplateId;
use crate::verify::verify_program;
use indexmap::IndexMap;
use std::rc::Rc;
use tracing::{debug, info};

/// Main type checker that orchestrates the entire checking process
#[derive(Debug, Clone, Default)]
pub struct TypeChecker {
    config: CheckerConfig,
}

impl TypeChecker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CheckerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    /// Check a complete program; the first error aborts
    pub fn check_program(&self, program: &Program) -> TypeResult<TypedProgram> {
        let mut registry = TypeRegistry::new();

        for (index, decl) in program.types.iter().enumerate() {
            let id = registry.register_template(TypeTemplate {
                name: decl.name.clone(),
                arity: decl.generic_params.len(),
                category: DeclaredTemplate::category(decl),
                builder: Rc::new(DeclaredTemplate::new(decl)),
                span: decl.span,
            });
            if id != TemplateId::declared(index) {
                return Err(TypecheckError::internal(format!(
                    "declared type {} registered out of order",
                    decl.name
                )));
            }
        }

        let order = SupertypeGraph::build(program).declaration_order(program)?;
        verify_program(&registry, program)?;
        for (index, extension) in program.extensions.iter().enumerate() {
            registry.register_extension(index, extension)?;
        }

        let mut ctx = CheckContext::new(registry, self.config, program);
        for template in order {
            if ctx.registry.template(template)?.arity == 0 {
                ctx.registry.instantiate(template, Vec::new())?;
            }
        }
        debug!(types = ctx.registry.len(), "declared types instantiated");

        let entry = program
            .entry
            .as_ref()
            .map(|entry| Self::check_entry(&mut ctx, entry))
            .transpose()?;

        let mut bodies = IndexMap::new();
        FunctionChecker::check_all(&mut ctx, &mut bodies)?;

        info!(
            types = ctx.registry.len(),
            bodies = bodies.len(),
            closures = ctx.closures.len(),
            "type checking complete"
        );
        Ok(TypedProgram {
            registry: ctx.registry,
            bodies,
            entry,
        })
    }

    /// Top-level code runs in its own scope with no `this`
    fn check_entry(ctx: &mut CheckContext<'_>, entry: &Expr) -> TypeResult<TypedExpr> {
        let depth = ctx.scope_depth();
        ctx.push_scope();
        let checked = ExpressionChecker::check(ctx, entry, None);
        ctx.truncate_scopes(depth);

        let checked = checked?;
        ensure_resolved(&ctx.registry, &checked)?;
        Ok(checked)
    }
}
