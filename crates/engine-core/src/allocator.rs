//! GPU resource pooling for the wgpu backend.
//!
//! Offscreen attachments are keyed by size, format and usage so a resize back to a recent size
//! reuses textures; vertex buffers are keyed by rounded size and reused frame to frame.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

#[derive(Debug)]
pub struct OwnedTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub key: TexKey,
}

#[derive(Debug)]
pub struct OwnedBuffer {
    pub buffer: wgpu::Buffer,
    pub key: BufKey,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct TexKey {
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
    pub usage: wgpu::TextureUsages,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct BufKey {
    pub size: u64,
    pub usage: wgpu::BufferUsages,
}

/// Free lists of released resources, grouped by key.
#[derive(Debug)]
pub struct Pool<K, V> {
    free: HashMap<K, Vec<V>>,
}

impl<K, V> Default for Pool<K, V> {
    fn default() -> Self {
        Self {
            free: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash, V> Pool<K, V> {
    pub fn take(&mut self, key: &K) -> Option<V> {
        self.free.get_mut(key).and_then(Vec::pop)
    }

    pub fn put(&mut self, key: K, value: V) {
        self.free.entry(key).or_default().push(value);
    }

    /// Drop every pooled value whose key fails `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(&K) -> bool) {
        self.free.retain(|key, _| keep(key));
    }

    /// Number of pooled values across all keys.
    pub fn len(&self) -> usize {
        self.free.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Indexed storage that hands freed indices back out before growing.
#[derive(Debug)]
pub struct Slots<T> {
    items: Vec<Option<T>>,
}

impl<T> Default for Slots<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> Slots<T> {
    /// Store `value` in the lowest free index.
    pub fn insert(&mut self, value: T) -> u32 {
        match self.items.iter().position(Option::is_none) {
            Some(index) => {
                self.items[index] = Some(value);
                index as u32
            }
            None => {
                self.items.push(Some(value));
                (self.items.len() - 1) as u32
            }
        }
    }

    pub fn remove(&mut self, index: u32) -> Option<T> {
        self.items.get_mut(index as usize).and_then(Option::take)
    }

    pub fn get(&self, index: u32) -> Option<&T> {
        self.items.get(index as usize).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, index: u32) -> Option<&mut T> {
        self.items.get_mut(index as usize).and_then(Option::as_mut)
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.items.iter().flatten()
    }

    /// Number of indices ever handed out and not yet reclaimed by growth.
    pub fn capacity(&self) -> usize {
        self.items.len()
    }
}

/// Pools offscreen attachments and per-frame vertex buffers for one device.
pub struct RenderAllocator {
    device: Arc<wgpu::Device>,
    textures: Pool<TexKey, wgpu::Texture>,
    buffers: Pool<BufKey, wgpu::Buffer>,
}

impl RenderAllocator {
    pub fn new(device: Arc<wgpu::Device>) -> Self {
        Self {
            device,
            textures: Pool::default(),
            buffers: Pool::default(),
        }
    }

    pub fn allocate_texture(&mut self, key: TexKey, label: &str) -> OwnedTexture {
        let texture = self.textures.take(&key).unwrap_or_else(|| {
            self.device.create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width: key.width,
                    height: key.height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: key.format,
                usage: key.usage,
                view_formats: &[],
            })
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        OwnedTexture { texture, view, key }
    }

    pub fn release_texture(&mut self, tex: OwnedTexture) {
        self.textures.put(tex.key, tex.texture);
    }

    pub fn allocate_buffer(&mut self, key: BufKey) -> OwnedBuffer {
        let buffer = self.buffers.take(&key).unwrap_or_else(|| {
            self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("underlay:scene-vertices"),
                size: key.size,
                usage: key.usage,
                mapped_at_creation: false,
            })
        });
        OwnedBuffer { buffer, key }
    }

    pub fn release_buffer(&mut self, buf: OwnedBuffer) {
        self.buffers.put(buf.key, buf.buffer);
    }

    /// Drop pooled textures whose size matches none of `sizes` (the live targets' viewports).
    pub fn retain_texture_sizes(&mut self, sizes: &[(u32, u32)]) {
        self.textures
            .retain(|key| sizes.contains(&(key.width, key.height)));
    }

    pub fn pooled_textures(&self) -> usize {
        self.textures.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_hands_back_released_values_by_key() {
        let mut pool: Pool<(u32, u32), &str> = Pool::default();
        assert_eq!(pool.take(&(4, 4)), None);
        pool.put((4, 4), "a");
        pool.put((8, 8), "b");
        assert_eq!(pool.take(&(4, 4)), Some("a"));
        assert_eq!(pool.take(&(4, 4)), None);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn pool_retain_drops_stale_sizes() {
        let mut pool: Pool<(u32, u32), u8> = Pool::default();
        pool.put((800, 600), 1);
        pool.put((800, 600), 2);
        pool.put((1024, 768), 3);
        let live = [(1024, 768)];
        pool.retain(|key| live.contains(key));
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.take(&(1024, 768)), Some(3));
        assert!(pool.is_empty());
    }

    #[test]
    fn slots_reuse_freed_indices() {
        let mut slots = Slots::default();
        assert_eq!(slots.insert('a'), 0);
        assert_eq!(slots.insert('b'), 1);
        assert_eq!(slots.remove(0), Some('a'));
        assert_eq!(slots.remove(0), None);
        assert_eq!(slots.insert('c'), 0);
        assert_eq!(slots.get(0), Some(&'c'));
        assert_eq!(slots.capacity(), 2);
    }

    #[test]
    fn repeated_replace_keeps_slots_bounded() {
        let mut slots = Slots::default();
        let mut live = slots.insert(0u32);
        for generation in 1..50 {
            let next = slots.insert(generation);
            slots.remove(live);
            live = next;
        }
        assert_eq!(slots.capacity(), 2);
        assert_eq!(slots.values().copied().collect::<Vec<_>>(), vec![49]);
    }
}
