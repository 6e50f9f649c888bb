/// Frame pipeline - N rotating frame slots paced by fences
///
/// One frame walks through these stages, in order:
///
/// ```text
/// WaitFence ─▶ Record ─▶ Transition(Present→RenderTarget) ─▶ Encode
///     ▲                                                        │
///     │                                                        ▼
///  Advance ◀─ SignalFence ◀─ Present ◀─ Submit ◀─ Transition(RenderTarget→Present)
/// ```
///
/// Every slot owns a command list, a fence and its per-frame instance and
/// indirect buffers. Fence values come from one counter shared by all
/// slots, so each signal is strictly greater than every earlier one.
/// `wait` is the only blocking point of a frame: a slot is not recorded
/// again until the value it last signaled has completed.
///
/// # Page growth
///
/// Instance and indirect buffers hold a whole number of pages of
/// `page_size` records. When a frame needs more, the slot's buffers are
/// replaced by larger ones before recording (the slot is idle at that
/// point). No draw is ever dropped for lack of space.

use std::sync::Arc;
use crate::error::{Error, Result};
use crate::graphics_device::{
    Buffer, BufferDesc, BufferUsage, CommandList, Fence, GraphicsDevice, RenderTarget, TargetState,
};
use crate::renderer::{DrawIndexedIndirectCommand, GpuInstance};
use crate::engine_debug;

/// Stage the pipeline last entered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStage {
    WaitFence,
    Record,
    TransitionToRenderTarget,
    Encode,
    TransitionToPresent,
    Submit,
    Present,
    SignalFence,
    Advance,
}

struct FrameSlot {
    commands: Box<dyn CommandList>,
    fence: Arc<dyn Fence>,
    /// Value signaled by the slot's last submission (0 = never submitted)
    fence_value: u64,
    instance_buffer: Option<Arc<dyn Buffer>>,
    indirect_buffer: Option<Arc<dyn Buffer>>,
    instance_capacity: u32,
    indirect_capacity: u32,
}

pub struct FramePipeline {
    slots: Vec<FrameSlot>,
    current: usize,
    next_fence_value: u64,
    page_size: u32,
    stage: FrameStage,
}

/// Smallest whole number of pages holding `count` records (at least one)
pub fn pages_for(count: u32, page_size: u32) -> u32 {
    count.div_ceil(page_size).max(1)
}

impl FramePipeline {
    /// Create `frames_in_flight` slots with one command list and fence each
    pub fn new(device: &mut dyn GraphicsDevice, frames_in_flight: u32, page_size: u32) -> Result<Self> {
        let mut slots = Vec::with_capacity(frames_in_flight as usize);
        for _ in 0..frames_in_flight {
            slots.push(FrameSlot {
                commands: device.create_command_list()?,
                fence: device.create_fence(0)?,
                fence_value: 0,
                instance_buffer: None,
                indirect_buffer: None,
                instance_capacity: 0,
                indirect_capacity: 0,
            });
        }
        Ok(Self {
            slots,
            current: 0,
            next_fence_value: 1,
            page_size,
            stage: FrameStage::Advance,
        })
    }

    /// Block until the current slot's previous submission has completed
    pub fn wait(&mut self) -> Result<()> {
        self.stage = FrameStage::WaitFence;
        let slot = &self.slots[self.current];
        if slot.fence_value > 0 {
            slot.fence.wait_for(slot.fence_value)?;
        }
        Ok(())
    }

    /// Block until every slot has completed its last submission
    pub fn drain(&self) -> Result<()> {
        for slot in &self.slots {
            if slot.fence_value > 0 {
                slot.fence.wait_for(slot.fence_value)?;
            }
        }
        Ok(())
    }

    /// Make the current slot's instance buffer hold at least `count` records
    pub fn reserve_instances(&mut self, device: &mut dyn GraphicsDevice, count: u32) -> Result<&Arc<dyn Buffer>> {
        let page_size = self.page_size;
        let slot = &mut self.slots[self.current];
        reserve_pages(
            device,
            PagedBuffer {
                buffer: &mut slot.instance_buffer,
                capacity: &mut slot.instance_capacity,
                record_size: std::mem::size_of::<GpuInstance>() as u64,
                usage: BufferUsage::VERTEX,
                name: "Instance",
            },
            count,
            page_size,
        )
    }

    /// Make the current slot's indirect buffer hold at least `count` commands
    pub fn reserve_indirect(&mut self, device: &mut dyn GraphicsDevice, count: u32) -> Result<&Arc<dyn Buffer>> {
        let page_size = self.page_size;
        let slot = &mut self.slots[self.current];
        reserve_pages(
            device,
            PagedBuffer {
                buffer: &mut slot.indirect_buffer,
                capacity: &mut slot.indirect_capacity,
                record_size: DrawIndexedIndirectCommand::STRIDE as u64,
                usage: BufferUsage::INDIRECT,
                name: "Indirect",
            },
            count,
            page_size,
        )
    }

    /// Reset the current slot's command list and move the target into
    /// the render-target state
    pub fn record(&mut self, target: &RenderTarget) -> Result<()> {
        self.stage = FrameStage::Record;
        let commands = &mut self.slots[self.current].commands;
        commands.reset()?;

        self.stage = FrameStage::TransitionToRenderTarget;
        commands.transition(target, TargetState::Present, TargetState::RenderTarget)?;

        self.stage = FrameStage::Encode;
        Ok(())
    }

    /// Command list of the current slot, valid between `record` and `finish`
    pub fn commands(&mut self) -> &mut dyn CommandList {
        self.slots[self.current].commands.as_mut()
    }

    /// Close, submit and present the current slot, then signal its fence
    /// and advance to the next slot
    ///
    /// Returns the fence value signaled for the frame.
    pub fn finish(&mut self, device: &mut dyn GraphicsDevice, target: &RenderTarget) -> Result<u64> {
        let slot = &mut self.slots[self.current];

        self.stage = FrameStage::TransitionToPresent;
        slot.commands.transition(target, TargetState::RenderTarget, TargetState::Present)?;
        slot.commands.close()?;

        self.stage = FrameStage::Submit;
        device.submit(slot.commands.as_ref(), target)?;

        self.stage = FrameStage::Present;
        device.present(target)?;

        self.stage = FrameStage::SignalFence;
        let value = self.next_fence_value;
        device.signal_fence(&slot.fence, value)?;
        slot.fence_value = value;
        self.next_fence_value += 1;

        self.stage = FrameStage::Advance;
        self.current = (self.current + 1) % self.slots.len();
        Ok(value)
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn frame_count(&self) -> usize {
        self.slots.len()
    }

    pub fn stage(&self) -> FrameStage {
        self.stage
    }

    /// Fence value last signaled by `slot`, if it was ever submitted
    pub fn last_signaled(&self, slot: usize) -> Option<u64> {
        self.slots
            .get(slot)
            .map(|slot| slot.fence_value)
            .filter(|value| *value > 0)
    }

    /// Fence of `slot`
    pub fn fence(&self, slot: usize) -> Option<&Arc<dyn Fence>> {
        self.slots.get(slot).map(|slot| &slot.fence)
    }

    /// Records one page holds
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Instance records the current slot can hold without growing
    pub fn instance_capacity(&self) -> u32 {
        self.slots[self.current].instance_capacity
    }
}

struct PagedBuffer<'a> {
    buffer: &'a mut Option<Arc<dyn Buffer>>,
    capacity: &'a mut u32,
    record_size: u64,
    usage: BufferUsage,
    name: &'static str,
}

fn reserve_pages<'a>(
    device: &mut dyn GraphicsDevice,
    paged: PagedBuffer<'a>,
    count: u32,
    page_size: u32,
) -> Result<&'a Arc<dyn Buffer>> {
    let capacity = pages_for(count, page_size) * page_size;
    if paged.buffer.is_none() || *paged.capacity < capacity {
        if paged.buffer.is_some() {
            engine_debug!(
                "dank::FramePipeline",
                "{} buffer grows from {} to {} records",
                paged.name,
                paged.capacity,
                capacity
            );
        }
        *paged.buffer = None;
        let buffer = device.create_buffer(BufferDesc {
            size: capacity as u64 * paged.record_size,
            usage: paged.usage,
        })?;
        *paged.capacity = capacity;
        return Ok(paged.buffer.insert(buffer));
    }
    paged
        .buffer
        .as_ref()
        .ok_or_else(|| Error::InvalidResource(format!("{} buffer missing", paged.name)))
}

#[cfg(test)]
#[path = "frame_pipeline_tests.rs"]
mod tests;
