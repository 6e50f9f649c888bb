/// GPU texture cache - per-texture lifecycle mirror of the texture library
///
/// Each library entry gets a GPU-side record keyed by its `TextureId`:
///
/// ```text
///            ┌──────────── Loading (inactive, texture kept) ◀──┐
///            ▼                                                 │
/// Idle ──▶ Ready(stamp) ──new stamp──▶ upload, active ─────────┘
///  ▲          │
///  └──reset───┘           Invalid: released, never active again
/// ```
///
/// Syncing runs in two phases. `poll` samples every source once and
/// reports whether applying the result would touch a resident GPU texture
/// or the fragment table; the caller drains in-flight frames in that case.
/// `apply` then uploads, releases and (de)activates from the sampled state.

use std::collections::BTreeMap;
use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::{GraphicsDevice, Texture, TextureDesc};
use crate::resource::{ResourceState, TextureData, TextureId, TextureLibrary, TextureSource, TextureStatus};
use crate::utils::SlotAllocator;
use crate::{engine_debug, engine_warn};

struct TextureEntry {
    /// Source this record mirrors; a different source under the same id
    /// gets a fresh record
    source: Arc<dyn TextureSource>,
    /// Status sampled by the last `poll`
    status: TextureStatus,
    /// Content stamp of the uploaded pixels
    version: Option<u64>,
    texture: Option<Arc<dyn Texture>>,
    slot: Option<u32>,
    active: bool,
    invalid: bool,
    warned_slots: bool,
}

impl TextureEntry {
    fn new(source: Arc<dyn TextureSource>) -> Self {
        Self {
            source,
            status: TextureStatus::idle(),
            version: None,
            texture: None,
            slot: None,
            active: false,
            invalid: false,
            warned_slots: false,
        }
    }

    fn is_resident(&self) -> bool {
        self.texture.is_some()
    }

    fn has_binding(&self) -> bool {
        self.texture.is_some() || self.slot.is_some()
    }

    /// Whether applying `status` changes GPU state a frame may be reading,
    /// either the texture itself or the fragment table
    fn touches_gpu(&self, status: &TextureStatus) -> bool {
        match status.state {
            ResourceState::Idle | ResourceState::Invalid => self.has_binding(),
            ResourceState::Loading => self.active,
            ResourceState::Ready if self.version == Some(status.version) => self.is_resident() && !self.active,
            ResourceState::Ready => true,
        }
    }
}

/// Texture side of the GPU resource cache
pub struct GpuTextureCache {
    entries: BTreeMap<TextureId, TextureEntry>,
    /// Records dropped by `poll` or a library change, released by `apply`
    retired: Vec<TextureEntry>,
    slots: SlotAllocator,
    synced_library: Option<u64>,
    /// (slot, texture handle) pairs last reported by `apply`
    reported: Vec<(u32, u64)>,
    upload_count: u64,
}

impl GpuTextureCache {
    /// Create a cache binding at most `max_slots` textures at once
    pub fn new(max_slots: u32) -> Self {
        Self {
            entries: BTreeMap::new(),
            retired: Vec::new(),
            slots: SlotAllocator::with_capacity(max_slots),
            synced_library: None,
            reported: Vec::new(),
            upload_count: 0,
        }
    }

    /// Sample every source; returns `true` when `apply` will replace,
    /// release or (un)bind a GPU texture
    pub fn poll(&mut self, library: &TextureLibrary) -> bool {
        let mut touches_gpu = false;

        if self.synced_library != Some(library.last_modified()) {
            touches_gpu |= self
                .entries
                .iter()
                .any(|(id, entry)| !library.contains(*id) && entry.has_binding());
        }

        for (id, source) in library.iter() {
            if self.entries.get(&id).is_some_and(|entry| !Arc::ptr_eq(&entry.source, source)) {
                if let Some(stale) = self.entries.remove(&id) {
                    touches_gpu |= stale.has_binding();
                    self.retired.push(stale);
                }
            }
            let entry = self.entries.entry(id).or_insert_with(|| TextureEntry::new(source.clone()));
            if entry.invalid {
                continue;
            }
            let status = source.poll();
            touches_gpu |= entry.touches_gpu(&status);
            entry.status = status;
        }

        touches_gpu
    }

    /// Act on the statuses sampled by the last `poll`
    ///
    /// Returns `true` when the active bindings differ from the ones last
    /// reported and the fragment table must be re-encoded.
    pub fn apply(&mut self, device: &mut dyn GraphicsDevice, library: &TextureLibrary) -> Result<bool> {
        if self.synced_library != Some(library.last_modified()) {
            let removed: Vec<TextureId> = self
                .entries
                .keys()
                .copied()
                .filter(|id| !library.contains(*id))
                .collect();
            for id in removed {
                if let Some(entry) = self.entries.remove(&id) {
                    self.retired.push(entry);
                }
            }
            self.synced_library = Some(library.last_modified());
        }
        for entry in self.retired.drain(..) {
            if let Some(slot) = entry.slot {
                self.slots.free(slot);
            }
        }

        for (id, entry) in self.entries.iter_mut() {
            if entry.invalid {
                continue;
            }

            match entry.status.state {
                ResourceState::Invalid => {
                    engine_warn!("dank::GpuTextureCache", "Texture {} is invalid and will not be drawn", id.0);
                    entry.invalid = true;
                    Self::evict(&mut self.slots, entry);
                }
                ResourceState::Idle => {
                    Self::evict(&mut self.slots, entry);
                }
                ResourceState::Loading => {
                    entry.active = false;
                }
                ResourceState::Ready if entry.version == Some(entry.status.version) => {
                    entry.active = entry.is_resident();
                }
                ResourceState::Ready => {
                    let source = entry.source.clone();
                    let data = source.fetch_data();
                    let uploaded = Self::upload(device, &mut self.slots, *id, entry, data);
                    source.release_data();
                    if uploaded? {
                        self.upload_count += 1;
                    }
                }
            }
        }

        let bound: Vec<(u32, u64)> = self
            .bindings()
            .iter()
            .map(|(slot, texture)| (*slot, texture.handle()))
            .collect();
        let changed = bound != self.reported;
        self.reported = bound;
        Ok(changed)
    }

    /// `poll` followed by `apply`, for callers with no frames in flight
    pub fn sync(&mut self, device: &mut dyn GraphicsDevice, library: &TextureLibrary) -> Result<bool> {
        self.poll(library);
        self.apply(device, library)
    }

    /// Copy fetched pixels into the entry's texture; `Ok(false)` when the
    /// data was skipped
    fn upload(
        device: &mut dyn GraphicsDevice,
        slots: &mut SlotAllocator,
        id: TextureId,
        entry: &mut TextureEntry,
        data: TextureData,
    ) -> Result<bool> {
        if data.status.state != ResourceState::Ready {
            entry.status = data.status;
            entry.active = false;
            return Ok(false);
        }
        let Some(pixels) = data.pixels else {
            return Ok(false);
        };

        let desc = TextureDesc {
            width: data.status.width,
            height: data.status.height,
            format: data.status.format.into(),
        };
        if desc.width == 0 || desc.height == 0 || pixels.len() as u64 != desc.byte_len() {
            engine_warn!(
                "dank::GpuTextureCache",
                "Texture {} skipped: {} bytes for {}x{}",
                id.0, pixels.len(), desc.width, desc.height
            );
            return Ok(false);
        }

        let Some(slot) = entry.slot.or_else(|| slots.alloc()) else {
            if !entry.warned_slots {
                engine_warn!(
                    "dank::GpuTextureCache",
                    "Texture {} not bound: all {} texture slots in use",
                    id.0, slots.capacity()
                );
                entry.warned_slots = true;
            }
            return Ok(false);
        };
        entry.slot = Some(slot);

        let texture = match &entry.texture {
            Some(texture) if *texture.desc() == desc => texture.clone(),
            _ => device.create_texture(desc)?,
        };
        device.write_texture(&texture, &pixels)?;

        entry.texture = Some(texture);
        entry.version = Some(data.status.version);
        entry.status = data.status;
        entry.active = true;
        entry.warned_slots = false;

        engine_debug!(
            "dank::GpuTextureCache",
            "Uploaded texture {} v{} ({}x{}) into slot {}",
            id.0, data.status.version, desc.width, desc.height, slot
        );
        Ok(true)
    }

    fn evict(slots: &mut SlotAllocator, entry: &mut TextureEntry) {
        entry.texture = None;
        if let Some(slot) = entry.slot.take() {
            slots.free(slot);
        }
        entry.version = None;
        entry.active = false;
    }

    /// Active textures with their table slots, in slot order
    pub fn bindings(&self) -> Vec<(u32, Arc<dyn Texture>)> {
        let mut bindings: Vec<(u32, Arc<dyn Texture>)> = self
            .entries
            .values()
            .filter(|entry| entry.active)
            .filter_map(|entry| Some((entry.slot?, entry.texture.clone()?)))
            .collect();
        bindings.sort_by_key(|(slot, _)| *slot);
        bindings
    }

    /// Whether draws referencing `id` are encoded this frame
    pub fn is_active(&self, id: TextureId) -> bool {
        self.entries.get(&id).is_some_and(|entry| entry.active)
    }

    pub fn binding_slot(&self, id: TextureId) -> Option<u32> {
        self.entries.get(&id).and_then(|entry| entry.slot)
    }

    /// Last sampled lifecycle state of `id`
    pub fn state(&self, id: TextureId) -> Option<ResourceState> {
        self.entries.get(&id).map(|entry| {
            if entry.invalid { ResourceState::Invalid } else { entry.status.state }
        })
    }

    pub fn active_count(&self) -> u32 {
        self.entries.values().filter(|entry| entry.active).count() as u32
    }

    /// Number of pixel uploads so far
    pub fn upload_count(&self) -> u64 {
        self.upload_count
    }

    /// Drop every GPU texture and forget all lifecycle state
    pub fn release_all(&mut self) {
        self.entries.clear();
        self.retired.clear();
        self.slots.reset();
        self.synced_library = None;
        self.reported.clear();
    }
}

#[cfg(test)]
#[path = "gpu_texture_cache_tests.rs"]
mod tests;
