pub mod aitoggle;
pub mod sync;
