/* src/render/script/rust/src/lib.rs */

pub mod ast;
mod builtins;
pub mod context;
pub mod descriptor;
pub mod errors;
pub mod eval;
pub mod helpers;
pub mod parser;
mod token;

pub use context::{ChangeDetector, PageScriptContext};
pub use descriptor::{LifecycleHook, ScriptDescriptor, ScriptMember, parse_script};
pub use errors::{EvalResult, ScriptError};
pub use eval::{Bindings, MethodTable, Scope, ScriptFn};
pub use parser::{parse_expression, parse_statements};
