pub mod broadcaster;
pub mod delivery;
pub mod subscription;
