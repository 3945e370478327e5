#[macro_use]
extern crate common;

mod cancellation_token_set;
mod macros;
mod resource;
mod resource_dependencies;
mod resource_group;
mod resource_report_tracker;
mod root_resource;
mod task_resource;

pub use self::macros::*;
pub use cancellation_token_set::*;
pub use resource::*;
pub use resource_dependencies::*;
pub use resource_group::*;
pub use resource_report_tracker::*;
pub use root_resource::*;
pub use task_resource::*;
