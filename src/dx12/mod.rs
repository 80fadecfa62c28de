//! Direct3D 12 presentation in scRGB.
//!
//! The swapchain is FP16 with the linear BT.709 color space, so vertex colors
//! go out as written: 1.0 is 80 nits and nothing is clamped to SDR.

mod atlas;
mod fence;
mod pipeline;

use crate::geometry::Vertex;
use crate::text::TexturesDelta;
use anyhow::{Result, anyhow, bail};
use atlas::FontAtlas;
use fence::FrameFence;
use pipeline::{ATLAS_TABLE_SLOT, Pipelines};
use std::mem::ManuallyDrop;
use tracing::{debug, info, warn};
use windows::Win32::Foundation::*;
use windows::Win32::Graphics::Direct3D::*;
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::Graphics::Dxgi::Common::*;
use windows::Win32::Graphics::Dxgi::*;
use windows::core::Interface;

const FRAME_COUNT: u32 = 2;
const BACKBUFFER_FORMAT: DXGI_FORMAT = DXGI_FORMAT_R16G16B16A16_FLOAT;
const SCRGB_COLOR_SPACE: DXGI_COLOR_SPACE_TYPE = DXGI_COLOR_SPACE_RGB_FULL_G10_NONE_P709;

// Vertex upload heap: one slice per frame in flight, split between patches and glyphs
const FRAME_REGION_SIZE: usize = 512 * 1024;
const BATCH_REGION_SIZE: usize = FRAME_REGION_SIZE / 2;

#[derive(Clone, Copy)]
enum Batch {
    Patches,
    Glyphs,
}

impl Batch {
    fn region_offset(self) -> usize {
        match self {
            Batch::Patches => 0,
            Batch::Glyphs => BATCH_REGION_SIZE,
        }
    }
}

/// What the output reports about itself
#[derive(Clone, Copy, Debug)]
pub struct DisplayInfo {
    pub hdr_enabled: bool,
    pub max_luminance: f32,
    pub min_luminance: f32,
    pub max_full_frame_luminance: f32,
}

pub struct Dx12State {
    device: ID3D12Device,
    command_queue: ID3D12CommandQueue,
    swapchain: IDXGISwapChain4,
    rtv_heap: ID3D12DescriptorHeap,
    rtv_descriptor_size: u32,
    render_targets: Vec<ID3D12Resource>,
    command_allocators: Vec<ID3D12CommandAllocator>,
    command_list: ID3D12GraphicsCommandList,
    fence: FrameFence,
    frame_index: u32,
    width: u32,
    height: u32,
    // Applied at the next frame start, never mid-frame
    pending_resize: Option<(u32, u32)>,
    pipelines: Pipelines,
    // Persistently mapped
    vertex_buffer: ID3D12Resource,
    vertex_buffer_ptr: *mut u8,
    font_atlas: FontAtlas,
}

impl Dx12State {
    pub fn new(hwnd: HWND, width: u32, height: u32) -> Result<Self> {
        unsafe {
            let factory: IDXGIFactory4 = CreateDXGIFactory2(DXGI_CREATE_FACTORY_FLAGS(0))?;

            let adapter = get_hardware_adapter(&factory)?;
            let mut device: Option<ID3D12Device> = None;
            D3D12CreateDevice(&adapter, D3D_FEATURE_LEVEL_11_0, &mut device)?;
            let device = device.ok_or_else(|| anyhow!("Failed to create device"))?;

            let command_queue: ID3D12CommandQueue = device.CreateCommandQueue(&D3D12_COMMAND_QUEUE_DESC {
                Type: D3D12_COMMAND_LIST_TYPE_DIRECT,
                ..Default::default()
            })?;

            let swapchain = create_swapchain(&factory, &command_queue, hwnd, width, height)?;
            log_display_info(&swapchain);

            let rtv_heap: ID3D12DescriptorHeap = device.CreateDescriptorHeap(&D3D12_DESCRIPTOR_HEAP_DESC {
                NumDescriptors: FRAME_COUNT,
                Type: D3D12_DESCRIPTOR_HEAP_TYPE_RTV,
                ..Default::default()
            })?;
            let rtv_descriptor_size = device.GetDescriptorHandleIncrementSize(D3D12_DESCRIPTOR_HEAP_TYPE_RTV);
            let render_targets = create_render_targets(&device, &swapchain, &rtv_heap, rtv_descriptor_size)?;

            let command_allocators = (0..FRAME_COUNT)
                .map(|_| device.CreateCommandAllocator::<ID3D12CommandAllocator>(D3D12_COMMAND_LIST_TYPE_DIRECT))
                .collect::<windows::core::Result<Vec<_>>>()?;
            let command_list: ID3D12GraphicsCommandList =
                device.CreateCommandList(0, D3D12_COMMAND_LIST_TYPE_DIRECT, &command_allocators[0], None)?;
            command_list.Close()?;

            let fence = FrameFence::new(&device)?;
            let pipelines = Pipelines::new(&device)?;

            let vertex_buffer = create_upload_buffer(&device, (FRAME_REGION_SIZE * FRAME_COUNT as usize) as u64)?;
            let mut vertex_buffer_ptr: *mut std::ffi::c_void = std::ptr::null_mut();
            vertex_buffer.Map(0, None, Some(&mut vertex_buffer_ptr))?;

            let frame_index = swapchain.GetCurrentBackBufferIndex();
            info!(width, height, "Swapchain ready (scRGB FP16)");

            Ok(Self {
                device,
                command_queue,
                swapchain,
                rtv_heap,
                rtv_descriptor_size,
                render_targets,
                command_allocators,
                command_list,
                fence,
                frame_index,
                width,
                height,
                pending_resize: None,
                pipelines,
                vertex_buffer,
                vertex_buffer_ptr: vertex_buffer_ptr as *mut u8,
                font_atlas: FontAtlas::default(),
            })
        }
    }

    /// Backbuffer size in pixels.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Queues a backbuffer resize. Minimized (zero) sizes are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.pending_resize = Some((width, height)).filter(|&size| size != (self.width, self.height));
    }

    fn apply_pending_resize(&mut self) -> Result<()> {
        let Some((width, height)) = self.pending_resize.take() else {
            return Ok(());
        };

        self.fence.flush(&self.command_queue)?;

        unsafe {
            // Drop every reference to the old backbuffers before ResizeBuffers
            for allocator in &self.command_allocators {
                allocator.Reset()?;
            }
            self.command_list.Reset(&self.command_allocators[0], None)?;
            self.command_list.Close()?;
            self.render_targets.clear();

            self.swapchain
                .ResizeBuffers(FRAME_COUNT, width, height, BACKBUFFER_FORMAT, DXGI_SWAP_CHAIN_FLAG(0))?;
            // ResizeBuffers resets the color space
            self.swapchain.SetColorSpace1(SCRGB_COLOR_SPACE)?;

            self.render_targets =
                create_render_targets(&self.device, &self.swapchain, &self.rtv_heap, self.rtv_descriptor_size)?;
            self.frame_index = self.swapchain.GetCurrentBackBufferIndex();
        }

        self.width = width;
        self.height = height;
        debug!(width, height, "Swapchain resized");
        Ok(())
    }

    fn slot(&self) -> usize {
        self.frame_index as usize
    }

    /// Waits for this back buffer's previous frame and opens the command list.
    pub fn begin_frame(&mut self) -> Result<()> {
        self.apply_pending_resize()?;
        self.fence.wait_slot(self.slot())?;

        unsafe {
            let allocator = &self.command_allocators[self.slot()];
            allocator.Reset()?;
            self.command_list.Reset(allocator, None)?;
        }
        Ok(())
    }

    /// Records atlas uploads. Call between `begin_frame` and the first text draw.
    pub fn update_font_texture(&mut self, textures_delta: &TexturesDelta) -> Result<()> {
        let slot = self.slot();
        self.font_atlas.update(&self.device, &self.command_list, slot, textures_delta)
    }

    fn current_rtv(&self) -> D3D12_CPU_DESCRIPTOR_HANDLE {
        rtv_handle(&self.rtv_heap, self.rtv_descriptor_size, self.frame_index)
    }

    pub fn clear_render_target(&self, clear_color: [f32; 4]) {
        unsafe {
            resource_barrier(
                &self.command_list,
                &self.render_targets[self.slot()],
                D3D12_RESOURCE_STATE_PRESENT,
                D3D12_RESOURCE_STATE_RENDER_TARGET,
            );
            self.command_list.ClearRenderTargetView(self.current_rtv(), &clear_color, None);
        }
    }

    /// Copies a batch into this frame's region of the vertex heap, truncated
    /// to whole triangles when it does not fit.
    fn upload_vertices(&self, vertices: &[Vertex], batch: Batch) -> D3D12_VERTEX_BUFFER_VIEW {
        let stride = std::mem::size_of::<Vertex>();
        let capacity = BATCH_REGION_SIZE / stride / 3 * 3;
        if vertices.len() > capacity {
            warn!(vertices = vertices.len(), capacity, "Vertex batch truncated");
        }
        let vertices = &vertices[..vertices.len().min(capacity)];
        let offset = self.slot() * FRAME_REGION_SIZE + batch.region_offset();
        let bytes = std::mem::size_of_val(vertices);

        unsafe {
            std::ptr::copy_nonoverlapping(vertices.as_ptr() as *const u8, self.vertex_buffer_ptr.add(offset), bytes);

            D3D12_VERTEX_BUFFER_VIEW {
                BufferLocation: self.vertex_buffer.GetGPUVirtualAddress() + offset as u64,
                SizeInBytes: bytes as u32,
                StrideInBytes: stride as u32,
            }
        }
    }

    fn draw(&self, vertices: &[Vertex], batch: Batch) {
        let view = self.upload_vertices(vertices, batch);
        let count = view.SizeInBytes / view.StrideInBytes;
        let list = &self.command_list;

        unsafe {
            list.SetGraphicsRootSignature(&self.pipelines.root_signature);
            match batch {
                Batch::Patches => list.SetPipelineState(&self.pipelines.solid),
                Batch::Glyphs => {
                    list.SetPipelineState(&self.pipelines.glyph);
                    if let Some(heap) = self.font_atlas.srv_heap() {
                        list.SetDescriptorHeaps(&[Some(heap.clone())]);
                        list.SetGraphicsRootDescriptorTable(ATLAS_TABLE_SLOT, heap.GetGPUDescriptorHandleForHeapStart());
                    }
                }
            }

            list.RSSetViewports(&[D3D12_VIEWPORT {
                Width: self.width as f32,
                Height: self.height as f32,
                MaxDepth: 1.0,
                ..Default::default()
            }]);
            list.RSSetScissorRects(&[RECT {
                right: self.width as i32,
                bottom: self.height as i32,
                ..Default::default()
            }]);
            list.OMSetRenderTargets(1, Some(&self.current_rtv()), false, None);

            list.IASetPrimitiveTopology(D3D_PRIMITIVE_TOPOLOGY_TRIANGLELIST);
            list.IASetVertexBuffers(0, Some(&[view]));
            list.DrawInstanced(count, 1, 0, 0);
        }
    }

    /// Solid scRGB triangles.
    pub fn render_quads(&self, vertices: &[Vertex]) {
        if !vertices.is_empty() {
            self.draw(vertices, Batch::Patches);
        }
    }

    /// Atlas-textured triangles, skipped until the atlas exists.
    pub fn render_text(&self, vertices: &[Vertex]) {
        if !vertices.is_empty() && self.font_atlas.srv_heap().is_some() {
            self.draw(vertices, Batch::Glyphs);
        }
    }

    pub fn end_frame(&mut self) -> Result<()> {
        let slot = self.slot();
        unsafe {
            resource_barrier(
                &self.command_list,
                &self.render_targets[slot],
                D3D12_RESOURCE_STATE_RENDER_TARGET,
                D3D12_RESOURCE_STATE_PRESENT,
            );
            self.command_list.Close()?;

            let command_lists = [Some(self.command_list.cast::<ID3D12CommandList>()?)];
            self.command_queue.ExecuteCommandLists(&command_lists);

            // Vsync
            self.swapchain.Present(1, DXGI_PRESENT(0)).ok()?;
        }

        self.fence.signal_slot(&self.command_queue, slot)?;
        self.frame_index = unsafe { self.swapchain.GetCurrentBackBufferIndex() };
        Ok(())
    }
}

impl Drop for Dx12State {
    fn drop(&mut self) {
        let _ = self.fence.flush(&self.command_queue);
    }
}

unsafe fn get_hardware_adapter(factory: &IDXGIFactory4) -> Result<IDXGIAdapter1> {
    unsafe {
        let mut index = 0;
        while let Ok(adapter) = factory.EnumAdapters1(index) {
            index += 1;
            let desc = adapter.GetDesc1()?;
            if (desc.Flags & DXGI_ADAPTER_FLAG_SOFTWARE.0 as u32) != 0 {
                continue;
            }

            let supported = D3D12CreateDevice(
                &adapter,
                D3D_FEATURE_LEVEL_11_0,
                std::ptr::null_mut::<Option<ID3D12Device>>(),
            )
            .is_ok();
            if supported {
                let name_len = desc.Description.iter().position(|&c| c == 0).unwrap_or(desc.Description.len());
                info!(adapter = %String::from_utf16_lossy(&desc.Description[..name_len]), "Using GPU");
                return Ok(adapter);
            }
        }
        bail!("No hardware adapter supports Direct3D 12")
    }
}

/// Flip-model FP16 swapchain presenting linear scRGB.
unsafe fn create_swapchain(
    factory: &IDXGIFactory4,
    command_queue: &ID3D12CommandQueue,
    hwnd: HWND,
    width: u32,
    height: u32,
) -> Result<IDXGISwapChain4> {
    unsafe {
        let desc = DXGI_SWAP_CHAIN_DESC1 {
            Width: width,
            Height: height,
            Format: BACKBUFFER_FORMAT,
            SampleDesc: DXGI_SAMPLE_DESC { Count: 1, Quality: 0 },
            BufferUsage: DXGI_USAGE_RENDER_TARGET_OUTPUT,
            BufferCount: FRAME_COUNT,
            SwapEffect: DXGI_SWAP_EFFECT_FLIP_DISCARD,
            ..Default::default()
        };
        let swapchain: IDXGISwapChain4 = factory
            .CreateSwapChainForHwnd(command_queue, hwnd, &desc, None, None)?
            .cast()?;

        // winit owns fullscreen, keep DXGI's Alt+Enter out of it
        factory.MakeWindowAssociation(hwnd, DXGI_MWA_NO_ALT_ENTER)?;

        let support = swapchain.CheckColorSpaceSupport(SCRGB_COLOR_SPACE)?;
        if (support & DXGI_SWAP_CHAIN_COLOR_SPACE_SUPPORT_FLAG_PRESENT.0 as u32) == 0 {
            bail!("Swapchain cannot present scRGB (RGB_FULL_G10_NONE_P709)");
        }
        swapchain.SetColorSpace1(SCRGB_COLOR_SPACE)?;
        Ok(swapchain)
    }
}

fn log_display_info(swapchain: &IDXGISwapChain4) {
    match unsafe { query_display_info(swapchain) } {
        Ok(display) => {
            info!(
                hdr = display.hdr_enabled,
                max_nits = display.max_luminance,
                min_nits = display.min_luminance,
                full_frame_nits = display.max_full_frame_luminance,
                "Display"
            );
            if !display.hdr_enabled {
                warn!("Display is not in HDR mode, levels above SDR white will clip");
            }
        }
        Err(e) => warn!("Could not query display info: {}", e),
    }
}

unsafe fn query_display_info(swapchain: &IDXGISwapChain4) -> Result<DisplayInfo> {
    unsafe {
        let output: IDXGIOutput6 = swapchain.GetContainingOutput()?.cast()?;
        let desc = output.GetDesc1()?;
        Ok(DisplayInfo {
            hdr_enabled: desc.ColorSpace == DXGI_COLOR_SPACE_RGB_FULL_G2084_NONE_P2020,
            max_luminance: desc.MaxLuminance,
            min_luminance: desc.MinLuminance,
            max_full_frame_luminance: desc.MaxFullFrameLuminance,
        })
    }
}

fn rtv_handle(heap: &ID3D12DescriptorHeap, descriptor_size: u32, index: u32) -> D3D12_CPU_DESCRIPTOR_HANDLE {
    let start = unsafe { heap.GetCPUDescriptorHandleForHeapStart() };
    D3D12_CPU_DESCRIPTOR_HANDLE {
        ptr: start.ptr + (index * descriptor_size) as usize,
    }
}

unsafe fn create_render_targets(
    device: &ID3D12Device,
    swapchain: &IDXGISwapChain4,
    rtv_heap: &ID3D12DescriptorHeap,
    rtv_descriptor_size: u32,
) -> Result<Vec<ID3D12Resource>> {
    let mut buffers = Vec::with_capacity(FRAME_COUNT as usize);
    for i in 0..FRAME_COUNT {
        unsafe {
            let buffer: ID3D12Resource = swapchain.GetBuffer(i)?;
            device.CreateRenderTargetView(&buffer, None, rtv_handle(rtv_heap, rtv_descriptor_size, i));
            buffers.push(buffer);
        }
    }
    Ok(buffers)
}

fn create_upload_buffer(device: &ID3D12Device, size: u64) -> Result<ID3D12Resource> {
    unsafe {
        let mut resource: Option<ID3D12Resource> = None;
        device.CreateCommittedResource(
            &D3D12_HEAP_PROPERTIES {
                Type: D3D12_HEAP_TYPE_UPLOAD,
                ..Default::default()
            },
            D3D12_HEAP_FLAG_NONE,
            &D3D12_RESOURCE_DESC {
                Dimension: D3D12_RESOURCE_DIMENSION_BUFFER,
                Width: size,
                Height: 1,
                DepthOrArraySize: 1,
                MipLevels: 1,
                SampleDesc: DXGI_SAMPLE_DESC { Count: 1, Quality: 0 },
                Layout: D3D12_TEXTURE_LAYOUT_ROW_MAJOR,
                ..Default::default()
            },
            D3D12_RESOURCE_STATE_GENERIC_READ,
            None,
            &mut resource,
        )?;
        resource.ok_or_else(|| anyhow!("Failed to create upload buffer"))
    }
}

/// Transition barrier for the whole resource.
unsafe fn resource_barrier(
    command_list: &ID3D12GraphicsCommandList,
    resource: &ID3D12Resource,
    before: D3D12_RESOURCE_STATES,
    after: D3D12_RESOURCE_STATES,
) {
    unsafe {
        // Borrowed pointer, never released: ManuallyDrop keeps the refcount as is
        let borrowed: Option<ID3D12Resource> = std::mem::transmute_copy(resource);
        let barrier = D3D12_RESOURCE_BARRIER {
            Type: D3D12_RESOURCE_BARRIER_TYPE_TRANSITION,
            Flags: D3D12_RESOURCE_BARRIER_FLAG_NONE,
            Anonymous: D3D12_RESOURCE_BARRIER_0 {
                Transition: ManuallyDrop::new(D3D12_RESOURCE_TRANSITION_BARRIER {
                    pResource: ManuallyDrop::new(borrowed),
                    StateBefore: before,
                    StateAfter: after,
                    Subresource: D3D12_RESOURCE_BARRIER_ALL_SUBRESOURCES,
                }),
            },
        };
        command_list.ResourceBarrier(&[barrier]);
    }
}
