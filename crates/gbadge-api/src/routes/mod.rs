//! HTTP route handlers, grouped by resource.

pub mod badges;
pub mod claim;
pub mod evidence;
pub mod verify;
