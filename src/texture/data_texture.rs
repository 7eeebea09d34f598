//! CPU-authored float texture uploaded to the GPU on demand.

/// Bytes per RGBA32Float texel.
const BYTES_PER_TEXEL: u32 = 16;

/// A square RGBA32Float texture whose texels are written on the CPU.
///
/// Writes go through [`data_mut`](Self::data_mut), which flags the texture for
/// upload; [`upload`](Self::upload) pushes the texels and clears the flag.
pub struct DataTexture {
    /// Side length in texels.
    size: u32,
    /// RGBA texel data, row-major, 4 floats per texel.
    data: Vec<f32>,
    /// Whether the GPU copy is stale.
    needs_update: bool,
    /// The GPU texture, created on first upload.
    texture: Option<wgpu::Texture>,
    /// Texture view.
    view: Option<wgpu::TextureView>,
    /// Debug label.
    label: &'static str,
}

impl DataTexture {
    /// Create a zero-filled `size × size` RGBA32Float texture.
    pub fn new_rgba_f32(size: u32, label: &'static str) -> Self {
        Self {
            size,
            data: vec![0.0; (size as usize) * (size as usize) * 4],
            needs_update: true,
            texture: None,
            view: None,
            label,
        }
    }

    /// Side length in texels.
    #[inline]
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Texel data, 4 floats per texel.
    #[inline]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Mutable texel data. Marks the texture for upload.
    pub fn data_mut(&mut self) -> &mut [f32] {
        self.needs_update = true;
        &mut self.data
    }

    /// Check if the GPU texture is stale.
    #[inline]
    pub fn needs_update(&self) -> bool {
        self.needs_update
    }

    /// Mark as needing upload.
    pub fn mark_needs_update(&mut self) {
        self.needs_update = true;
    }

    /// Acknowledge an upload done elsewhere.
    pub fn clear_needs_update(&mut self) {
        self.needs_update = false;
    }

    /// The GPU texture, once uploaded.
    #[inline]
    pub fn texture(&self) -> Option<&wgpu::Texture> {
        self.texture.as_ref()
    }

    /// The texture view, once uploaded.
    #[inline]
    pub fn view(&self) -> Option<&wgpu::TextureView> {
        self.view.as_ref()
    }

    /// Upload texels if dirty, creating the texture on first use.
    pub fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        if !self.needs_update && self.texture.is_some() {
            return;
        }

        let extent = wgpu::Extent3d {
            width: self.size,
            height: self.size,
            depth_or_array_layers: 1,
        };

        if self.texture.is_none() {
            log::info!("Creating {} ({}x{} RGBA32F)", self.label, self.size, self.size);
            let texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some(self.label),
                size: extent,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba32Float,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            });
            self.view = Some(texture.create_view(&wgpu::TextureViewDescriptor::default()));
            self.texture = Some(texture);
        }

        if let Some(texture) = &self.texture {
            queue.write_texture(
                wgpu::ImageCopyTexture {
                    texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                bytemuck::cast_slice(&self.data),
                wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(self.size * BYTES_PER_TEXEL),
                    rows_per_image: Some(self.size),
                },
                extent,
            );
        }

        self.needs_update = false;
    }

    /// Release the GPU texture. Safe to call any number of times; a later
    /// [`upload`](Self::upload) recreates it.
    pub fn dispose(&mut self) {
        if self.texture.take().is_some() {
            log::debug!("Disposed {}", self.label);
        }
        self.view = None;
        self.needs_update = true;
    }

    /// Check if a GPU texture is currently held.
    #[inline]
    pub fn is_allocated(&self) -> bool {
        self.texture.is_some()
    }
}

impl std::fmt::Debug for DataTexture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataTexture")
            .field("label", &self.label)
            .field("size", &self.size)
            .field("needs_update", &self.needs_update)
            .field("allocated", &self.texture.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_and_dirty_flag() {
        let mut texture = DataTexture::new_rgba_f32(4, "Test Texture");
        assert_eq!(texture.data().len(), 64);
        assert!(texture.needs_update());

        texture.clear_needs_update();
        texture.data_mut()[0] = 1.0;
        assert!(texture.needs_update());
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let mut texture = DataTexture::new_rgba_f32(4, "Test Texture");
        texture.dispose();
        texture.dispose();
        assert!(!texture.is_allocated());
        assert_eq!(texture.data().len(), 64);
    }
}
