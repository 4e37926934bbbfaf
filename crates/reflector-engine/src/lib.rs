//! Reflector engine: header reflection compiler
//!
//! Scans C++ headers annotated with `UCLASS`, `USTRUCT`, `UENUM`,
//! `UFUNCTION`, `UPROPERTY` and `UDELEGATE`, builds a resolved type graph
//! of every reflected entity, and generates the code that registers those
//! entities with the runtime reflection system.
//!
//! # Pipeline
//!
//! ```text
//! header text → preparser → module::graph → declare → resolve → codegen
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use reflector_engine::{compile_module, ModuleDescriptor, RunConfig, RunContext};
//!
//! let mut ctx = RunContext::new(RunConfig::default());
//! let descriptor = ModuleDescriptor::new("Game");
//! let output = compile_module(&mut ctx, &descriptor, &files)?;
//! ```

// ============================================================================
// Front end
// ============================================================================

pub mod parser;
pub mod preparser;

// ============================================================================
// Model
// ============================================================================

pub mod config;
pub mod context;
pub mod error;
pub mod module;
pub mod registry;

// ============================================================================
// Passes
// ============================================================================

pub mod codegen;
pub mod compile;
pub mod declare;
pub mod diagnostic;
pub mod resolve;

pub use codegen::{CodeGenerator, GeneratedUnit, ModuleOutput, UnitHash, UnitKind};
pub use compile::compile_module;
pub use config::{ModuleDescriptor, RunConfig};
pub use context::{RunContext, Warning};
pub use diagnostic::Diagnostic;
pub use error::{Error, ErrorKind, Result};
pub use registry::Registry;
