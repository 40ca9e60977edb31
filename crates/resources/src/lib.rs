//! Asset loading.
//!
//! - Raw file reads for shader bytecode
//! - Image decoding to RGBA8 for textures

mod error;
pub mod image;
pub mod loader;

pub use error::{ResourceError, ResourceResult};
pub use self::image::{DecodedImage, decode};
pub use loader::{read_bytes, read_shader_bytes};
