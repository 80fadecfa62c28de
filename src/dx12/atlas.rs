use super::{FRAME_COUNT, create_upload_buffer, resource_barrier};
use anyhow::{Result, anyhow};
use egui::{ImageDelta, TextureId, TexturesDelta};
use std::mem::ManuallyDrop;
use tracing::debug;
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::Graphics::Dxgi::Common::*;

const ATLAS_FORMAT: DXGI_FORMAT = DXGI_FORMAT_R8G8B8A8_UNORM;
const BYTES_PER_PIXEL: u32 = 4;

/// GPU copy of egui's font atlas (texture `Managed(0)`), sampled by the text pipeline.
#[derive(Default)]
pub(super) struct FontAtlas {
    texture: Option<ID3D12Resource>,
    srv_heap: Option<ID3D12DescriptorHeap>,
    // Staging buffers stay alive until the slot that recorded their copies comes round again
    staging: [Vec<ID3D12Resource>; FRAME_COUNT as usize],
}

impl FontAtlas {
    /// Shader-visible heap holding the atlas SRV, once the first full upload happened.
    pub(super) fn srv_heap(&self) -> Option<&ID3D12DescriptorHeap> {
        self.srv_heap.as_ref()
    }

    /// Records copies for every atlas change in `textures_delta`.
    /// `slot` must already have waited on its fence.
    pub(super) fn update(
        &mut self,
        device: &ID3D12Device,
        command_list: &ID3D12GraphicsCommandList,
        slot: usize,
        textures_delta: &TexturesDelta,
    ) -> Result<()> {
        self.staging[slot].clear();

        for (id, delta) in &textures_delta.set {
            if *id != TextureId::Managed(0) {
                continue;
            }
            match delta.pos {
                None => self.replace(device, command_list, slot, delta)?,
                Some([x, y]) => {
                    // A patch before the first full image has nothing to land in
                    let Some(texture) = self.texture.clone() else {
                        continue;
                    };
                    unsafe {
                        resource_barrier(
                            command_list,
                            &texture,
                            D3D12_RESOURCE_STATE_PIXEL_SHADER_RESOURCE,
                            D3D12_RESOURCE_STATE_COPY_DEST,
                        );
                    }
                    self.upload(device, command_list, slot, &texture, delta, x as u32, y as u32)?;
                }
            }
        }
        Ok(())
    }

    fn replace(
        &mut self,
        device: &ID3D12Device,
        command_list: &ID3D12GraphicsCommandList,
        slot: usize,
        delta: &ImageDelta,
    ) -> Result<()> {
        let [width, height] = delta.image.size();
        let texture = create_atlas_texture(device, width as u32, height as u32)?;
        debug!(width, height, "Font atlas created");

        self.upload(device, command_list, slot, &texture, delta, 0, 0)?;

        unsafe {
            let srv_heap: ID3D12DescriptorHeap = device.CreateDescriptorHeap(&D3D12_DESCRIPTOR_HEAP_DESC {
                NumDescriptors: 1,
                Type: D3D12_DESCRIPTOR_HEAP_TYPE_CBV_SRV_UAV,
                Flags: D3D12_DESCRIPTOR_HEAP_FLAG_SHADER_VISIBLE,
                ..Default::default()
            })?;
            device.CreateShaderResourceView(
                &texture,
                Some(&D3D12_SHADER_RESOURCE_VIEW_DESC {
                    Format: ATLAS_FORMAT,
                    ViewDimension: D3D12_SRV_DIMENSION_TEXTURE2D,
                    Shader4ComponentMapping: D3D12_DEFAULT_SHADER_4_COMPONENT_MAPPING,
                    Anonymous: D3D12_SHADER_RESOURCE_VIEW_DESC_0 {
                        Texture2D: D3D12_TEX2D_SRV {
                            MipLevels: 1,
                            ..Default::default()
                        },
                    },
                }),
                srv_heap.GetCPUDescriptorHandleForHeapStart(),
            );
            self.srv_heap = Some(srv_heap);
        }

        // The previous texture may still be referenced by an in-flight frame
        if let Some(old) = self.texture.replace(texture) {
            self.staging[slot].push(old);
        }
        Ok(())
    }

    /// Copies `delta` into `texture` at (`x`, `y`) and leaves it shader-readable.
    /// `texture` must be in the copy-dest state.
    #[allow(clippy::too_many_arguments)]
    fn upload(
        &mut self,
        device: &ID3D12Device,
        command_list: &ID3D12GraphicsCommandList,
        slot: usize,
        texture: &ID3D12Resource,
        delta: &ImageDelta,
        x: u32,
        y: u32,
    ) -> Result<()> {
        let egui::ImageData::Color(image) = &delta.image;
        let width = image.width() as u32;
        let height = image.height() as u32;
        let src_pitch = width * BYTES_PER_PIXEL;
        let row_pitch = src_pitch.next_multiple_of(D3D12_TEXTURE_DATA_PITCH_ALIGNMENT);

        let staging = create_upload_buffer(device, u64::from(row_pitch) * u64::from(height))?;

        unsafe {
            let mut mapped: *mut std::ffi::c_void = std::ptr::null_mut();
            staging.Map(0, None, Some(&mut mapped))?;
            let mapped = mapped as *mut u8;
            for (row, pixels) in image.pixels.chunks_exact(width as usize).enumerate() {
                let dst = mapped.add(row * row_pitch as usize);
                for (col, pixel) in pixels.iter().enumerate() {
                    let rgba = pixel.to_array();
                    std::ptr::copy_nonoverlapping(rgba.as_ptr(), dst.add(col * BYTES_PER_PIXEL as usize), 4);
                }
            }
            staging.Unmap(0, None);

            let dst = D3D12_TEXTURE_COPY_LOCATION {
                pResource: ManuallyDrop::new(Some(texture.clone())),
                Type: D3D12_TEXTURE_COPY_TYPE_SUBRESOURCE_INDEX,
                Anonymous: D3D12_TEXTURE_COPY_LOCATION_0 { SubresourceIndex: 0 },
            };
            let src = D3D12_TEXTURE_COPY_LOCATION {
                pResource: ManuallyDrop::new(Some(staging.clone())),
                Type: D3D12_TEXTURE_COPY_TYPE_PLACED_FOOTPRINT,
                Anonymous: D3D12_TEXTURE_COPY_LOCATION_0 {
                    PlacedFootprint: D3D12_PLACED_SUBRESOURCE_FOOTPRINT {
                        Offset: 0,
                        Footprint: D3D12_SUBRESOURCE_FOOTPRINT {
                            Format: ATLAS_FORMAT,
                            Width: width,
                            Height: height,
                            Depth: 1,
                            RowPitch: row_pitch,
                        },
                    },
                },
            };
            command_list.CopyTextureRegion(&dst, x, y, 0, &src, None);
            let _ = ManuallyDrop::into_inner(dst.pResource);
            let _ = ManuallyDrop::into_inner(src.pResource);

            resource_barrier(
                command_list,
                texture,
                D3D12_RESOURCE_STATE_COPY_DEST,
                D3D12_RESOURCE_STATE_PIXEL_SHADER_RESOURCE,
            );
        }

        self.staging[slot].push(staging);
        Ok(())
    }
}

fn create_atlas_texture(device: &ID3D12Device, width: u32, height: u32) -> Result<ID3D12Resource> {
    unsafe {
        let mut texture: Option<ID3D12Resource> = None;
        device.CreateCommittedResource(
            &D3D12_HEAP_PROPERTIES {
                Type: D3D12_HEAP_TYPE_DEFAULT,
                ..Default::default()
            },
            D3D12_HEAP_FLAG_NONE,
            &D3D12_RESOURCE_DESC {
                Dimension: D3D12_RESOURCE_DIMENSION_TEXTURE2D,
                Width: u64::from(width),
                Height: height,
                DepthOrArraySize: 1,
                MipLevels: 1,
                Format: ATLAS_FORMAT,
                SampleDesc: DXGI_SAMPLE_DESC { Count: 1, Quality: 0 },
                Layout: D3D12_TEXTURE_LAYOUT_UNKNOWN,
                ..Default::default()
            },
            D3D12_RESOURCE_STATE_COPY_DEST,
            None,
            &mut texture,
        )?;
        texture.ok_or_else(|| anyhow!("Failed to create font atlas texture"))
    }
}
