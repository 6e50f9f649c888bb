/// Mock graphics device for tests (no GPU required)
///
/// Every resource keeps its contents in memory and every queue operation is
/// recorded, so tests can check what the renderer uploaded, encoded and
/// submitted. A `MockController` cloned from the device stays usable after
/// the device has been moved into a renderer.
///
/// Fences complete on signal by default. With auto-completion disabled,
/// signals queue up until `MockController::complete_pending` runs, which
/// lets tests observe blocking fence waits.

use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use crate::error::{Error, Result};
use crate::graphics_device::{
    validate_bindings, validate_texture_upload, ArgumentTable, ArgumentTableDesc, BindingKind,
    BindingResource, Buffer, BufferDesc, BufferUsage, ClearValue, CommandList, Fence,
    GraphicsDevice, Pipeline, PipelineDesc, Rect2D, RenderTarget, TargetState, Texture,
    TextureDesc, TextureFormat, Viewport,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

// ============================================================================
// Shared state
// ============================================================================

/// Counters kept by the mock device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MockStats {
    pub buffers_created: u32,
    pub buffer_writes: u32,
    pub textures_created: u32,
    pub texture_uploads: u32,
    pub argument_tables_created: u32,
    pub table_writes: u32,
    pub fences_created: u32,
    pub command_lists_created: u32,
    pub pipelines_created: u32,
    pub acquires: u32,
    pub skipped_acquires: u32,
    pub submits: u32,
    pub presents: u32,
    pub signals: u32,
    pub resizes: u32,
    pub live_buffers: u32,
    pub live_textures: u32,
}

/// One command recorded by a `MockCommandList`
#[derive(Debug, Clone, PartialEq)]
pub enum MockCommand {
    Reset,
    Close,
    Transition { from: TargetState, to: TargetState },
    BeginRenderPass { clear: ClearValue },
    EndRenderPass,
    SetViewport(Viewport),
    SetScissor(Rect2D),
    BindPipeline,
    BindArgumentTable { set_index: u32, table: u64 },
    BindInstanceBuffer { buffer: u64, offset: u64 },
    BindIndexBuffer { buffer: u64, offset: u64 },
    DrawIndexed {
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    },
    DrawIndexedIndirect { buffer: u64, offset: u64, draw_count: u32, stride: u32 },
}

/// Queue-level event, in submission order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEvent {
    Acquire { index: u32 },
    Submit { target: u32, commands: usize },
    Present { target: u32 },
    Signal { fence: u64, value: u64 },
    Wait { fence: u64, value: u64 },
}

struct MockState {
    stats: MockStats,
    events: Vec<MockEvent>,
    submissions: Vec<Vec<MockCommand>>,
    surface_ready: bool,
    surface_size: (u32, u32),
    next_image: u32,
    image_count: u32,
    auto_complete: bool,
    fail_pipeline: bool,
    failing_buffers: u32,
    failing_textures: u32,
    pending: Vec<(Arc<MockFenceShared>, u64)>,
}

type SharedState = Arc<Mutex<MockState>>;

// ============================================================================
// Mock Buffer
// ============================================================================

pub struct MockBuffer {
    desc: BufferDesc,
    handle: u64,
    data: Mutex<Vec<u8>>,
    state: SharedState,
}

impl MockBuffer {
    pub fn usage(&self) -> BufferUsage {
        self.desc.usage
    }

    /// Copy of the buffer contents
    pub fn contents(&self) -> Vec<u8> {
        lock(&self.data).clone()
    }
}

impl Buffer for MockBuffer {
    fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        let end = offset + data.len() as u64;
        if end > self.desc.size {
            return Err(Error::InvalidResource(format!(
                "write of {} bytes at {} overflows buffer of {} bytes",
                data.len(),
                offset,
                self.desc.size
            )));
        }
        lock(&self.data)[offset as usize..end as usize].copy_from_slice(data);
        lock(&self.state).stats.buffer_writes += 1;
        Ok(())
    }

    fn size(&self) -> u64 {
        self.desc.size
    }

    fn handle(&self) -> u64 {
        self.handle
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for MockBuffer {
    fn drop(&mut self) {
        let mut state = lock(&self.state);
        state.stats.live_buffers = state.stats.live_buffers.saturating_sub(1);
    }
}

// ============================================================================
// Mock Texture
// ============================================================================

pub struct MockTexture {
    desc: TextureDesc,
    handle: u64,
    pixels: Mutex<Vec<u8>>,
    state: SharedState,
}

impl MockTexture {
    pub fn pixels(&self) -> Vec<u8> {
        lock(&self.pixels).clone()
    }
}

impl Texture for MockTexture {
    fn desc(&self) -> &TextureDesc {
        &self.desc
    }

    fn handle(&self) -> u64 {
        self.handle
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for MockTexture {
    fn drop(&mut self) {
        let mut state = lock(&self.state);
        state.stats.live_textures = state.stats.live_textures.saturating_sub(1);
    }
}

// ============================================================================
// Mock ArgumentTable
// ============================================================================

pub struct MockArgumentTable {
    desc: ArgumentTableDesc,
    handle: u64,
    slots: Mutex<Vec<Option<(BindingKind, u64)>>>,
    state: SharedState,
}

impl MockArgumentTable {
    pub fn handle(&self) -> u64 {
        self.handle
    }

    /// Kind and resource handle written into `slot`
    pub fn slot(&self, slot: u32) -> Option<(BindingKind, u64)> {
        lock(&self.slots).get(slot as usize).copied().flatten()
    }
}

impl ArgumentTable for MockArgumentTable {
    fn desc(&self) -> &ArgumentTableDesc {
        &self.desc
    }

    fn write(&self, bindings: &[(u32, BindingResource)]) -> Result<()> {
        validate_bindings(&self.desc, bindings)?;
        let mut slots = lock(&self.slots);
        for (slot, resource) in bindings {
            slots[*slot as usize] = Some((resource.kind(), resource.handle()));
        }
        lock(&self.state).stats.table_writes += 1;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Mock Fence
// ============================================================================

struct MockFenceShared {
    completed: Mutex<u64>,
    signal: Condvar,
}

impl MockFenceShared {
    fn complete(&self, value: u64) {
        let mut completed = lock(&self.completed);
        if value > *completed {
            *completed = value;
        }
        self.signal.notify_all();
    }
}

pub struct MockFence {
    handle: u64,
    shared: Arc<MockFenceShared>,
    state: SharedState,
}

impl MockFence {
    pub fn handle(&self) -> u64 {
        self.handle
    }
}

impl Fence for MockFence {
    fn completed_value(&self) -> Result<u64> {
        Ok(*lock(&self.shared.completed))
    }

    fn wait_for(&self, value: u64) -> Result<()> {
        lock(&self.state).events.push(MockEvent::Wait { fence: self.handle, value });
        let mut completed = lock(&self.shared.completed);
        while *completed < value {
            completed = match self.shared.signal.wait(completed) {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Mock CommandList
// ============================================================================

#[derive(Default)]
pub struct MockCommandList {
    pub commands: Vec<MockCommand>,
    recording: bool,
}

impl MockCommandList {
    fn record(&mut self, command: MockCommand) -> Result<()> {
        if !self.recording {
            return Err(Error::BackendError(format!("{:?} recorded outside reset/close", command)));
        }
        self.commands.push(command);
        Ok(())
    }
}

impl CommandList for MockCommandList {
    fn reset(&mut self) -> Result<()> {
        self.commands.clear();
        self.recording = true;
        self.commands.push(MockCommand::Reset);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.record(MockCommand::Close)?;
        self.recording = false;
        Ok(())
    }

    fn transition(&mut self, _target: &RenderTarget, from: TargetState, to: TargetState) -> Result<()> {
        self.record(MockCommand::Transition { from, to })
    }

    fn begin_render_pass(&mut self, _target: &RenderTarget, clear: ClearValue) -> Result<()> {
        self.record(MockCommand::BeginRenderPass { clear })
    }

    fn end_render_pass(&mut self) -> Result<()> {
        self.record(MockCommand::EndRenderPass)
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.record(MockCommand::SetViewport(viewport))
    }

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()> {
        self.record(MockCommand::SetScissor(scissor))
    }

    fn bind_pipeline(&mut self, _pipeline: &Arc<dyn Pipeline>) -> Result<()> {
        self.record(MockCommand::BindPipeline)
    }

    fn bind_argument_table(
        &mut self,
        _pipeline: &Arc<dyn Pipeline>,
        set_index: u32,
        table: &Arc<dyn ArgumentTable>,
    ) -> Result<()> {
        let handle = table
            .as_any()
            .downcast_ref::<MockArgumentTable>()
            .map(|table| table.handle)
            .unwrap_or(0);
        self.record(MockCommand::BindArgumentTable { set_index, table: handle })
    }

    fn bind_instance_buffer(&mut self, buffer: &Arc<dyn Buffer>, offset: u64) -> Result<()> {
        self.record(MockCommand::BindInstanceBuffer { buffer: buffer.handle(), offset })
    }

    fn bind_index_buffer(&mut self, buffer: &Arc<dyn Buffer>, offset: u64) -> Result<()> {
        self.record(MockCommand::BindIndexBuffer { buffer: buffer.handle(), offset })
    }

    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) -> Result<()> {
        self.record(MockCommand::DrawIndexed {
            index_count,
            instance_count,
            first_index,
            vertex_offset,
            first_instance,
        })
    }

    fn draw_indexed_indirect(
        &mut self,
        buffer: &Arc<dyn Buffer>,
        offset: u64,
        draw_count: u32,
        stride: u32,
    ) -> Result<()> {
        self.record(MockCommand::DrawIndexedIndirect {
            buffer: buffer.handle(),
            offset,
            draw_count,
            stride,
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Mock Pipeline
// ============================================================================

pub struct MockPipeline {
    pub desc: PipelineDesc,
}

impl Pipeline for MockPipeline {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Mock GraphicsDevice
// ============================================================================

/// Test-side handle on the mock device's shared state
#[derive(Clone)]
pub struct MockController {
    state: SharedState,
}

impl MockController {
    pub fn stats(&self) -> MockStats {
        lock(&self.state).stats
    }

    pub fn events(&self) -> Vec<MockEvent> {
        lock(&self.state).events.clone()
    }

    /// Command streams of every submitted list, in order
    pub fn submissions(&self) -> Vec<Vec<MockCommand>> {
        lock(&self.state).submissions.clone()
    }

    pub fn last_submission(&self) -> Option<Vec<MockCommand>> {
        lock(&self.state).submissions.last().cloned()
    }

    pub fn clear_history(&self) {
        let mut state = lock(&self.state);
        state.events.clear();
        state.submissions.clear();
    }

    /// When false, `acquire_render_target` returns `Ok(None)`
    pub fn set_surface_ready(&self, ready: bool) {
        lock(&self.state).surface_ready = ready;
    }

    /// When false, fence signals stay pending until `complete_pending`
    pub fn set_auto_complete(&self, auto_complete: bool) {
        lock(&self.state).auto_complete = auto_complete;
    }

    pub fn set_fail_pipeline(&self, fail: bool) {
        lock(&self.state).fail_pipeline = fail;
    }

    /// The next `count` buffer allocations report `OutOfMemory`
    pub fn fail_next_buffers(&self, count: u32) {
        lock(&self.state).failing_buffers = count;
    }

    /// The next `count` texture allocations report `OutOfMemory`
    pub fn fail_next_textures(&self, count: u32) {
        lock(&self.state).failing_textures = count;
    }

    pub fn pending_signals(&self) -> usize {
        lock(&self.state).pending.len()
    }

    /// Complete every queued fence signal, in order
    pub fn complete_pending(&self) {
        let pending = std::mem::take(&mut lock(&self.state).pending);
        for (fence, value) in pending {
            fence.complete(value);
        }
    }
}

/// Mock device implementing `GraphicsDevice` in memory
pub struct MockGraphicsDevice {
    state: SharedState,
    next_handle: AtomicU64,
}

impl Default for MockGraphicsDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGraphicsDevice {
    /// Device with an 800x600 surface of three images
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                stats: MockStats::default(),
                events: Vec::new(),
                submissions: Vec::new(),
                surface_ready: true,
                surface_size: (800, 600),
                next_image: 0,
                image_count: 3,
                auto_complete: true,
                fail_pipeline: false,
                failing_buffers: 0,
                failing_textures: 0,
                pending: Vec::new(),
            })),
            next_handle: AtomicU64::new(1),
        }
    }

    pub fn controller(&self) -> MockController {
        MockController { state: self.state.clone() }
    }

    fn handle(&self) -> u64 {
        self.next_handle.fetch_add(1, Ordering::Relaxed)
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        lock(&self.state)
    }
}

impl GraphicsDevice for MockGraphicsDevice {
    fn create_buffer(&mut self, desc: BufferDesc) -> Result<Arc<dyn Buffer>> {
        if desc.size == 0 {
            return Err(Error::InvalidResource("buffer size must be non-zero".to_string()));
        }
        {
            let mut state = self.state();
            if state.failing_buffers > 0 {
                state.failing_buffers -= 1;
                return Err(Error::OutOfMemory);
            }
            state.stats.buffers_created += 1;
            state.stats.live_buffers += 1;
        }
        Ok(Arc::new(MockBuffer {
            data: Mutex::new(vec![0u8; desc.size as usize]),
            handle: self.handle(),
            desc,
            state: self.state.clone(),
        }))
    }

    fn create_texture(&mut self, desc: TextureDesc) -> Result<Arc<dyn Texture>> {
        if desc.width == 0 || desc.height == 0 {
            return Err(Error::InvalidResource(format!(
                "texture extent {}x{} is empty",
                desc.width, desc.height
            )));
        }
        {
            let mut state = self.state();
            if state.failing_textures > 0 {
                state.failing_textures -= 1;
                return Err(Error::OutOfMemory);
            }
            state.stats.textures_created += 1;
            state.stats.live_textures += 1;
        }
        Ok(Arc::new(MockTexture {
            pixels: Mutex::new(vec![0u8; desc.byte_len() as usize]),
            handle: self.handle(),
            desc,
            state: self.state.clone(),
        }))
    }

    fn write_texture(&mut self, texture: &Arc<dyn Texture>, data: &[u8]) -> Result<()> {
        validate_texture_upload(texture.desc(), data)?;
        let mock = texture
            .as_any()
            .downcast_ref::<MockTexture>()
            .ok_or_else(|| Error::InvalidResource("texture not created by the mock device".to_string()))?;
        lock(&mock.pixels).copy_from_slice(data);
        self.state().stats.texture_uploads += 1;
        Ok(())
    }

    fn create_argument_table(&mut self, desc: ArgumentTableDesc) -> Result<Arc<dyn ArgumentTable>> {
        self.state().stats.argument_tables_created += 1;
        Ok(Arc::new(MockArgumentTable {
            slots: Mutex::new(vec![None; desc.capacity() as usize]),
            handle: self.handle(),
            desc,
            state: self.state.clone(),
        }))
    }

    fn create_fence(&mut self, initial_value: u64) -> Result<Arc<dyn Fence>> {
        self.state().stats.fences_created += 1;
        Ok(Arc::new(MockFence {
            handle: self.handle(),
            shared: Arc::new(MockFenceShared {
                completed: Mutex::new(initial_value),
                signal: Condvar::new(),
            }),
            state: self.state.clone(),
        }))
    }

    fn create_command_list(&mut self) -> Result<Box<dyn CommandList>> {
        self.state().stats.command_lists_created += 1;
        Ok(Box::new(MockCommandList::default()))
    }

    fn create_pipeline(&mut self, desc: PipelineDesc) -> Result<Arc<dyn Pipeline>> {
        if self.state().fail_pipeline {
            return Err(Error::InitializationFailed("mock pipeline creation failed".to_string()));
        }
        if desc.vertex_shader.spirv.is_empty() || desc.fragment_shader.spirv.is_empty() {
            return Err(Error::InitializationFailed("empty shader module".to_string()));
        }
        self.state().stats.pipelines_created += 1;
        Ok(Arc::new(MockPipeline { desc }))
    }

    fn acquire_render_target(&mut self) -> Result<Option<RenderTarget>> {
        let mut state = self.state();
        if !state.surface_ready {
            state.stats.skipped_acquires += 1;
            return Ok(None);
        }
        let index = state.next_image;
        state.next_image = (state.next_image + 1) % state.image_count;
        state.stats.acquires += 1;
        state.events.push(MockEvent::Acquire { index });
        Ok(Some(RenderTarget {
            index,
            width: state.surface_size.0,
            height: state.surface_size.1,
            format: TextureFormat::Bgra8Srgb,
        }))
    }

    fn submit(&mut self, commands: &dyn CommandList, target: &RenderTarget) -> Result<()> {
        let list = commands
            .as_any()
            .downcast_ref::<MockCommandList>()
            .ok_or_else(|| Error::InvalidResource("command list not created by the mock device".to_string()))?;
        if list.recording {
            return Err(Error::BackendError("submitted a command list that is still recording".to_string()));
        }
        let mut state = self.state();
        state.stats.submits += 1;
        state.events.push(MockEvent::Submit { target: target.index, commands: list.commands.len() });
        state.submissions.push(list.commands.clone());
        Ok(())
    }

    fn present(&mut self, target: &RenderTarget) -> Result<()> {
        let mut state = self.state();
        state.stats.presents += 1;
        state.events.push(MockEvent::Present { target: target.index });
        Ok(())
    }

    fn signal_fence(&mut self, fence: &Arc<dyn Fence>, value: u64) -> Result<()> {
        let mock = fence
            .as_any()
            .downcast_ref::<MockFence>()
            .ok_or_else(|| Error::InvalidResource("fence not created by the mock device".to_string()))?;
        let mut state = self.state();
        state.stats.signals += 1;
        state.events.push(MockEvent::Signal { fence: mock.handle, value });
        if state.auto_complete {
            drop(state);
            mock.shared.complete(value);
        } else {
            state.pending.push((mock.shared.clone(), value));
        }
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        let mut state = self.state();
        state.stats.resizes += 1;
        state.surface_size = (width, height);
        state.surface_ready = width > 0 && height > 0;
        Ok(())
    }

    fn surface_size(&self) -> (u32, u32) {
        lock(&self.state).surface_size
    }

    fn wait_idle(&self) -> Result<()> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
#[path = "mock_graphics_device_tests.rs"]
mod tests;
