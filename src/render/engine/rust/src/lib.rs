/* src/render/engine/rust/src/lib.rs */

pub mod directive;
pub mod dom;
pub mod errors;
pub mod events;
mod helpers;
pub mod mount;
pub mod placeholder;
pub mod resolve;
pub mod session;
pub mod viewer;

// Re-exports for ergonomic use
pub use directive::{DirectiveProcessor, RepeatSpec};
pub use dom::{Attr, Document, NodeId, NodeKind};
pub use errors::EngineError;
pub use events::{DispatchOutcome, Handler, HandlerArg, Listener, ListenerScope};
pub use helpers::escape_html;
pub use mount::{ComponentInstance, ComponentRenderState, RenderState, mount_placeholders};
pub use placeholder::{ComponentPlaceholder, distinct_component_ids, extract_placeholders};
pub use resolve::{ComponentResolver, ResolvedComponent};
pub use session::RenderSession;
pub use viewer::{PageTicket, PageViewer, load_site_pages};
