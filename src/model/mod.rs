pub mod color;
pub mod config;
pub mod part;
pub mod persona;
pub mod plan;

// Re-export commonly used types at the model level.
pub use color::Color;
pub use config::{DesignConfiguration, PartSlot, DEFAULT_LOGO_SCALE};
pub use part::Part;
pub use persona::{Capability, PersonaDefinition};
pub use plan::{Action, ActionKind, ActionPlan, PartChange, PropertyValue};
