pub mod collider;
pub mod component;
pub mod entity;
pub mod rigid_body;
