//! Checking context and scope management
//!
//! The context is passed explicitly by `&mut` through every checking call. It
//! holds:
//! - the type registry and checker limits
//! - local variable scopes and the frame of the body being checked
//! - the checking mode (committed or speculative)
//! - body-check requests and closure records produced by committed checks

use crate::ast::{Program, Span};
use crate::config::CheckerConfig;
use crate::error::{TypeResult, TypecheckError};
use crate::registry::TypeRegistry;
use crate::typed_ast::TypedBody;
use crate::types::{Handle, MethodInstance};
use indexmap::{IndexMap, IndexSet};

/// Whether results of the current check are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckMode {
    Commit,
    /// Trial check of an overload candidate or an inference probe; registers
    /// no closure types and queues no body checks
    Speculative,
}

/// Outcome of a speculative check
#[derive(Debug, Clone, PartialEq)]
pub enum Trial<T> {
    Accepted(T),
    Rejected(TypecheckError),
}

impl<T> Trial<T> {
    pub fn accepted(self) -> Option<T> {
        match self {
            Trial::Accepted(value) => Some(value),
            Trial::Rejected(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub ty: Handle,
    pub span: Span,
}

#[derive(Debug, Clone, Default)]
pub struct Scope {
    pub variables: IndexMap<String, Variable>,
}

/// The body being checked
#[derive(Debug, Clone, Default)]
pub struct Frame {
    /// Type of `this`; absent in static methods and top-level code
    pub this: Option<Handle>,
    pub type_generics: Vec<Handle>,
    pub method_generics: Vec<Handle>,
}

/// Locals read by a lambda body from outside the lambda
#[derive(Debug, Clone)]
struct CaptureFrame {
    /// Index of the first scope belonging to the lambda
    base: usize,
    captures: IndexMap<String, Handle>,
}

/// A lambda checked in commit mode
#[derive(Debug, Clone)]
pub struct ClosureRecord {
    pub handle: Handle,
    pub body: TypedBody,
}

pub struct CheckContext<'p> {
    pub registry: TypeRegistry,
    pub config: CheckerConfig,
    pub program: &'p Program,
    pub mode: CheckMode,
    pub frame: Frame,
    /// Generic method instances whose bodies still have to be checked
    pub requests: IndexSet<MethodInstance>,
    pub closures: Vec<ClosureRecord>,
    scopes: Vec<Scope>,
    capture_frames: Vec<CaptureFrame>,
}

impl<'p> CheckContext<'p> {
    pub fn new(registry: TypeRegistry, config: CheckerConfig, program: &'p Program) -> Self {
        Self {
            registry,
            config,
            program,
            mode: CheckMode::Commit,
            frame: Frame::default(),
            requests: IndexSet::new(),
            closures: Vec::new(),
            scopes: vec![Scope::default()],
            capture_frames: Vec::new(),
        }
    }

    pub fn is_speculative(&self) -> bool {
        self.mode == CheckMode::Speculative
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    pub fn pop_scope(&mut self) -> Option<Scope> {
        self.scopes.pop()
    }

    pub fn scope_depth(&self) -> usize {
        self.scopes.len()
    }

    /// Drop every scope above `depth`
    pub fn truncate_scopes(&mut self, depth: usize) {
        self.scopes.truncate(depth.max(1));
    }

    /// Declare a local in the innermost scope, shadowing any earlier one
    pub fn declare(&mut self, name: &str, ty: Handle, span: Span) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.variables.insert(
                name.to_string(),
                Variable {
                    name: name.to_string(),
                    ty,
                    span,
                },
            );
        }
    }

    /// Look up a local, recording it as a capture of every lambda it crosses
    pub fn lookup(&mut self, name: &str, span: Span) -> TypeResult<Handle> {
        let found = self
            .scopes
            .iter()
            .enumerate()
            .rev()
            .find_map(|(depth, scope)| scope.variables.get(name).map(|var| (depth, var.ty)));

        let (depth, ty) = found.ok_or_else(|| TypecheckError::undeclared("variable", name, span))?;
        for frame in self.capture_frames.iter_mut().filter(|frame| frame.base > depth) {
            frame.captures.entry(name.to_string()).or_insert(ty);
        }
        Ok(ty)
    }

    /// Type of `this`, captured like a local inside lambdas
    pub fn this_type(&mut self, span: Span) -> TypeResult<Handle> {
        let this = self
            .frame
            .this
            .ok_or_else(|| TypecheckError::undeclared("receiver", "this", span))?;
        for frame in &mut self.capture_frames {
            frame.captures.entry("this".to_string()).or_insert(this);
        }
        Ok(this)
    }

    /// Start checking a lambda body; its scope is pushed by the caller next
    pub fn enter_lambda(&mut self) {
        self.capture_frames.push(CaptureFrame {
            base: self.scopes.len(),
            captures: IndexMap::new(),
        });
    }

    /// Finish a lambda body, returning what it captured in first-use order
    pub fn exit_lambda(&mut self) -> Vec<(String, Handle)> {
        self.capture_frames
            .pop()
            .map(|frame| frame.captures.into_iter().collect())
            .unwrap_or_default()
    }

    /// Run `check` speculatively
    ///
    /// Scopes and capture records are restored afterwards whatever the
    /// outcome. Recoverable errors become `Trial::Rejected` and drop every
    /// type the attempt instantiated; any other error still aborts.
    pub fn trial<T>(
        &mut self,
        check: impl FnOnce(&mut CheckContext<'p>) -> TypeResult<T>,
    ) -> TypeResult<Trial<T>> {
        let mode = self.mode;
        let depth = self.scopes.len();
        let capture_frames = self.capture_frames.clone();
        let mark = self.registry.mark();

        self.mode = CheckMode::Speculative;
        let result = check(self);
        self.mode = mode;
        self.scopes.truncate(depth);
        self.capture_frames = capture_frames;

        match result {
            Ok(value) => Ok(Trial::Accepted(value)),
            Err(error) if error.is_recoverable() => {
                self.registry.rollback(mark);
                Ok(Trial::Rejected(error))
            }
            Err(error) => Err(error),
        }
    }

    /// Queue a generic method instance for body checking
    pub fn request(&mut self, instance: MethodInstance) {
        if !self.is_speculative() {
            self.requests.insert(instance);
        }
    }

    /// Replace the frame, returning the previous one
    pub fn enter_frame(&mut self, frame: Frame) -> Frame {
        std::mem::replace(&mut self.frame, frame)
    }
}
