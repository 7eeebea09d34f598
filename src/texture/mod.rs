//! Texture module.

mod data_texture;

pub use data_texture::DataTexture;
