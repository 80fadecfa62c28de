use super::FRAME_COUNT;
use anyhow::Result;
use windows::Win32::Foundation::{CloseHandle, HANDLE};
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::System::Threading::{CreateEventA, INFINITE, WaitForSingleObject};

/// One fence shared by all back buffers. Values only ever grow, each slot
/// remembers the value its last submission will signal.
pub(super) struct FrameFence {
    fence: ID3D12Fence,
    event: HANDLE,
    last_signaled: u64,
    slot_values: [u64; FRAME_COUNT as usize],
}

impl FrameFence {
    pub(super) fn new(device: &ID3D12Device) -> Result<Self> {
        unsafe {
            let fence: ID3D12Fence = device.CreateFence(0, D3D12_FENCE_FLAG_NONE)?;
            let event = CreateEventA(None, false, false, None)?;
            Ok(Self {
                fence,
                event,
                last_signaled: 0,
                slot_values: [0; FRAME_COUNT as usize],
            })
        }
    }

    fn wait_for(&self, value: u64) -> Result<()> {
        unsafe {
            if self.fence.GetCompletedValue() < value {
                self.fence.SetEventOnCompletion(value, self.event)?;
                WaitForSingleObject(self.event, INFINITE);
            }
        }
        Ok(())
    }

    fn signal(&mut self, queue: &ID3D12CommandQueue) -> Result<u64> {
        self.last_signaled += 1;
        unsafe { queue.Signal(&self.fence, self.last_signaled)? };
        Ok(self.last_signaled)
    }

    /// Blocks until the GPU is done with the commands last submitted for `slot`.
    pub(super) fn wait_slot(&self, slot: usize) -> Result<()> {
        self.wait_for(self.slot_values[slot])
    }

    pub(super) fn signal_slot(&mut self, queue: &ID3D12CommandQueue, slot: usize) -> Result<()> {
        self.slot_values[slot] = self.signal(queue)?;
        Ok(())
    }

    /// Drains the queue.
    pub(super) fn flush(&mut self, queue: &ID3D12CommandQueue) -> Result<()> {
        let value = self.signal(queue)?;
        self.wait_for(value)
    }
}

impl Drop for FrameFence {
    fn drop(&mut self) {
        if !self.event.is_invalid() {
            unsafe {
                let _ = CloseHandle(self.event);
            }
        }
    }
}
