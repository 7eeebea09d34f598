//! Typed vertex attribute and index storage.

use wgpu::util::DeviceExt;

/// Component type of an attribute array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    /// 32-bit float.
    F32,
    /// Unsigned 32-bit integer.
    U32,
    /// Unsigned 16-bit integer.
    U16,
    /// Unsigned 8-bit integer.
    U8,
    /// Signed 32-bit integer.
    I32,
    /// Signed 16-bit integer.
    I16,
    /// Signed 8-bit integer.
    I8,
}

impl ComponentType {
    /// Size of one component in bytes.
    #[inline]
    pub const fn byte_size(self) -> usize {
        match self {
            Self::F32 | Self::U32 | Self::I32 => 4,
            Self::U16 | Self::I16 => 2,
            Self::U8 | Self::I8 => 1,
        }
    }
}

/// A typed component array, the Rust counterpart of a JS typed array.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeArray {
    /// `f32` components.
    F32(Vec<f32>),
    /// `u32` components.
    U32(Vec<u32>),
    /// `u16` components.
    U16(Vec<u16>),
    /// `u8` components.
    U8(Vec<u8>),
    /// `i32` components.
    I32(Vec<i32>),
    /// `i16` components.
    I16(Vec<i16>),
    /// `i8` components.
    I8(Vec<i8>),
}

macro_rules! each_array {
    ($value:expr, $v:ident => $body:expr) => {
        match $value {
            AttributeArray::F32($v) => $body,
            AttributeArray::U32($v) => $body,
            AttributeArray::U16($v) => $body,
            AttributeArray::U8($v) => $body,
            AttributeArray::I32($v) => $body,
            AttributeArray::I16($v) => $body,
            AttributeArray::I8($v) => $body,
        }
    };
}

impl AttributeArray {
    /// Allocate a zero-filled array of the given type.
    pub fn zeroed(component_type: ComponentType, len: usize) -> Self {
        match component_type {
            ComponentType::F32 => Self::F32(vec![0.0; len]),
            ComponentType::U32 => Self::U32(vec![0; len]),
            ComponentType::U16 => Self::U16(vec![0; len]),
            ComponentType::U8 => Self::U8(vec![0; len]),
            ComponentType::I32 => Self::I32(vec![0; len]),
            ComponentType::I16 => Self::I16(vec![0; len]),
            ComponentType::I8 => Self::I8(vec![0; len]),
        }
    }

    /// Component type of this array.
    pub fn component_type(&self) -> ComponentType {
        match self {
            Self::F32(_) => ComponentType::F32,
            Self::U32(_) => ComponentType::U32,
            Self::U16(_) => ComponentType::U16,
            Self::U8(_) => ComponentType::U8,
            Self::I32(_) => ComponentType::I32,
            Self::I16(_) => ComponentType::I16,
            Self::I8(_) => ComponentType::I8,
        }
    }

    /// Number of components.
    #[inline]
    pub fn len(&self) -> usize {
        each_array!(self, v => v.len())
    }

    /// Check if the array has no components.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read one component widened to `f64`.
    pub fn get(&self, index: usize) -> Option<f64> {
        each_array!(self, v => v.get(index).map(|&c| c as f64))
    }

    /// Copy every component of `src` into this array starting at `offset`.
    ///
    /// Returns `false` without writing if the types differ or `src` does not fit.
    pub fn copy_from(&mut self, src: &AttributeArray, offset: usize) -> bool {
        macro_rules! copy {
            ($dst:expr, $src:expr) => {{
                match offset.checked_add($src.len()).and_then(|end| $dst.get_mut(offset..end)) {
                    Some(dst) => {
                        dst.copy_from_slice($src);
                        true
                    }
                    None => false,
                }
            }};
        }

        match (self, src) {
            (Self::F32(d), Self::F32(s)) => copy!(d, s),
            (Self::U32(d), Self::U32(s)) => copy!(d, s),
            (Self::U16(d), Self::U16(s)) => copy!(d, s),
            (Self::U8(d), Self::U8(s)) => copy!(d, s),
            (Self::I32(d), Self::I32(s)) => copy!(d, s),
            (Self::I16(d), Self::I16(s)) => copy!(d, s),
            (Self::I8(d), Self::I8(s)) => copy!(d, s),
            _ => false,
        }
    }

    /// Raw bytes for GPU upload.
    pub fn as_bytes(&self) -> &[u8] {
        each_array!(self, v => bytemuck::cast_slice(v.as_slice()))
    }
}

/// Buffer usage hint carried over from the source attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttributeUsage {
    /// Written once, drawn many times.
    #[default]
    Static,
    /// Rewritten often, drawn many times.
    Dynamic,
    /// Rewritten every frame.
    Stream,
}

/// A vertex attribute (or index list): a typed array interpreted as
/// `count` items of `item_size` components each.
#[derive(Debug)]
pub struct BufferAttribute {
    array: AttributeArray,
    item_size: usize,
    normalized: bool,
    usage: AttributeUsage,
    needs_update: bool,
    buffer: Option<wgpu::Buffer>,
}

impl BufferAttribute {
    /// Create a new attribute.
    pub fn new(array: AttributeArray, item_size: usize, normalized: bool) -> Self {
        Self {
            array,
            item_size: item_size.max(1),
            normalized,
            usage: AttributeUsage::Static,
            needs_update: true,
            buffer: None,
        }
    }

    /// Float attribute from tightly packed items, e.g. `[[f32; 3]]` positions.
    pub fn from_f32<const N: usize>(items: &[[f32; N]]) -> Self {
        Self::new(AttributeArray::F32(items.iter().flatten().copied().collect()), N, false)
    }

    /// Index list (`item_size` 1) from 16-bit values.
    pub fn from_u16_indices(indices: &[u16]) -> Self {
        Self::new(AttributeArray::U16(indices.to_vec()), 1, false)
    }

    /// Index list (`item_size` 1) from 32-bit values.
    pub fn from_u32_indices(indices: &[u32]) -> Self {
        Self::new(AttributeArray::U32(indices.to_vec()), 1, false)
    }

    /// Set the usage hint.
    pub fn with_usage(mut self, usage: AttributeUsage) -> Self {
        self.usage = usage;
        self
    }

    /// The component array.
    #[inline]
    pub fn array(&self) -> &AttributeArray {
        &self.array
    }

    /// Components per item.
    #[inline]
    pub fn item_size(&self) -> usize {
        self.item_size
    }

    /// Whether integer components are normalized when read by the GPU.
    #[inline]
    pub fn normalized(&self) -> bool {
        self.normalized
    }

    /// Usage hint.
    #[inline]
    pub fn usage(&self) -> AttributeUsage {
        self.usage
    }

    /// Number of items.
    #[inline]
    pub fn count(&self) -> usize {
        self.array.len() / self.item_size
    }

    /// Read component `component` of item `index` as `f32`.
    pub fn get_component(&self, index: usize, component: usize) -> Option<f32> {
        if component >= self.item_size {
            return None;
        }
        self.array
            .get(index * self.item_size + component)
            .map(|c| c as f32)
    }

    /// Read the first component of item `index` as an index value.
    pub fn get_index(&self, index: usize) -> Option<u32> {
        match &self.array {
            AttributeArray::U16(v) => v.get(index).map(|&i| u32::from(i)),
            AttributeArray::U32(v) => v.get(index).copied(),
            _ => None,
        }
    }

    /// Write an index value. Returns `false` if out of range or not representable.
    pub(crate) fn set_index(&mut self, index: usize, value: u32) -> bool {
        let written = match &mut self.array {
            AttributeArray::U16(v) => match (v.get_mut(index), u16::try_from(value)) {
                (Some(slot), Ok(value)) => {
                    *slot = value;
                    true
                }
                _ => false,
            },
            AttributeArray::U32(v) => match v.get_mut(index) {
                Some(slot) => {
                    *slot = value;
                    true
                }
                None => false,
            },
            _ => false,
        };
        if written {
            self.needs_update = true;
        }
        written
    }

    /// Copy the components of `src` in at component `offset` and mark dirty.
    pub(crate) fn copy_array_at(&mut self, src: &AttributeArray, offset: usize) -> bool {
        let copied = self.array.copy_from(src, offset);
        if copied {
            self.needs_update = true;
        }
        copied
    }

    /// Allocate an empty attribute with the same layout and room for `count` items.
    pub(crate) fn allocate_like(&self, count: usize) -> Self {
        Self::new(
            AttributeArray::zeroed(self.array.component_type(), count * self.item_size),
            self.item_size,
            self.normalized,
        )
        .with_usage(self.usage)
    }

    /// Check if the GPU buffer is stale.
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

    /// The GPU buffer, once uploaded.
    #[inline]
    pub fn buffer(&self) -> Option<&wgpu::Buffer> {
        self.buffer.as_ref()
    }

    /// Upload to the GPU if dirty, creating the buffer on first use.
    pub fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, usage: wgpu::BufferUsages) {
        if !self.needs_update && self.buffer.is_some() {
            return;
        }

        let data = self.array.as_bytes();
        match &self.buffer {
            Some(buffer) if buffer.size() >= data.len() as u64 => {
                let aligned = data.len() - data.len() % wgpu::COPY_BUFFER_ALIGNMENT as usize;
                queue.write_buffer(buffer, 0, &data[..aligned]);
                if aligned < data.len() {
                    // Buffers are created padded, so the tail fits in one aligned word.
                    let mut tail = [0u8; wgpu::COPY_BUFFER_ALIGNMENT as usize];
                    tail[..data.len() - aligned].copy_from_slice(&data[aligned..]);
                    queue.write_buffer(buffer, aligned as u64, &tail);
                }
            }
            _ => {
                self.buffer = Some(device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Batched Attribute Buffer"),
                    contents: data,
                    usage: usage | wgpu::BufferUsages::COPY_DST,
                }));
            }
        }

        self.needs_update = false;
    }
}

impl Clone for BufferAttribute {
    fn clone(&self) -> Self {
        Self {
            array: self.array.clone(),
            item_size: self.item_size,
            normalized: self.normalized,
            usage: self.usage,
            needs_update: true,
            buffer: None,
        }
    }
}
