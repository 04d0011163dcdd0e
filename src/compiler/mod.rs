//! Plan compiler: turns a validated [`ActionPlan`](crate::model::ActionPlan) into
//! either a new [`DesignConfiguration`](crate::model::DesignConfiguration) (live
//! preview) or a Blender script (offline assembly).

pub mod apply;
pub mod script;

pub use apply::{apply, apply_with, Applied, ApplyOptions};
pub use script::{compile, compile_with, ScriptOptions, VIEW_DISTANCE_FACTOR};
