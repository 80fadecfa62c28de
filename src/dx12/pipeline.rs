use super::BACKBUFFER_FORMAT;
use anyhow::{Result, anyhow};
use std::ffi::CString;
use std::mem::ManuallyDrop;
use tracing::{error, warn};
use windows::Win32::Graphics::Direct3D::Fxc::*;
use windows::Win32::Graphics::Direct3D::*;
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::Graphics::Dxgi::Common::*;
use windows::core::PCSTR;

// Root parameter 0: descriptor table holding the font atlas SRV
pub(super) const ATLAS_TABLE_SLOT: u32 = 0;

const VS_SOURCE: &str = r#"
    struct VSInput {
        float2 position : POSITION;
        float2 uv : TEXCOORD;
        float4 color : COLOR;
    };
    struct VSOutput {
        float4 position : SV_Position;
        float2 uv : TEXCOORD;
        float4 color : COLOR;
    };
    VSOutput main(VSInput input) {
        VSOutput output;
        output.position = float4(input.position, 0.0, 1.0);
        output.uv = input.uv;
        output.color = input.color;
        return output;
    }
"#;

// Vertex color is already linear scRGB
const PS_SOLID_SOURCE: &str = r#"
    struct PSInput {
        float4 position : SV_Position;
        float2 uv : TEXCOORD;
        float4 color : COLOR;
    };
    float4 main(PSInput input) : SV_Target {
        return input.color;
    }
"#;

// Atlas alpha is glyph coverage
const PS_GLYPH_SOURCE: &str = r#"
    Texture2D atlas : register(t0);
    SamplerState atlasSampler : register(s0);
    struct PSInput {
        float4 position : SV_Position;
        float2 uv : TEXCOORD;
        float4 color : COLOR;
    };
    float4 main(PSInput input) : SV_Target {
        float coverage = atlas.Sample(atlasSampler, input.uv).a;
        return float4(input.color.rgb, input.color.a * coverage);
    }
"#;

/// Root signature plus the two pipelines drawing into the FP16 backbuffer.
pub(super) struct Pipelines {
    pub(super) root_signature: ID3D12RootSignature,
    /// Opaque fills for the patches
    pub(super) solid: ID3D12PipelineState,
    /// Alpha-blended glyphs for the labels
    pub(super) glyph: ID3D12PipelineState,
}

impl Pipelines {
    pub(super) fn new(device: &ID3D12Device) -> Result<Self> {
        let root_signature = create_root_signature(device)?;
        let solid = create_pipeline(device, &root_signature, PS_SOLID_SOURCE, false)?;
        let glyph = create_pipeline(device, &root_signature, PS_GLYPH_SOURCE, true)?;
        Ok(Self {
            root_signature,
            solid,
            glyph,
        })
    }
}

fn create_root_signature(device: &ID3D12Device) -> Result<ID3D12RootSignature> {
    let atlas_range = D3D12_DESCRIPTOR_RANGE {
        RangeType: D3D12_DESCRIPTOR_RANGE_TYPE_SRV,
        NumDescriptors: 1,
        BaseShaderRegister: 0,
        RegisterSpace: 0,
        OffsetInDescriptorsFromTableStart: 0,
    };
    let parameters = [D3D12_ROOT_PARAMETER {
        ParameterType: D3D12_ROOT_PARAMETER_TYPE_DESCRIPTOR_TABLE,
        Anonymous: D3D12_ROOT_PARAMETER_0 {
            DescriptorTable: D3D12_ROOT_DESCRIPTOR_TABLE {
                NumDescriptorRanges: 1,
                pDescriptorRanges: &atlas_range,
            },
        },
        ShaderVisibility: D3D12_SHADER_VISIBILITY_PIXEL,
    }];
    let samplers = [D3D12_STATIC_SAMPLER_DESC {
        Filter: D3D12_FILTER_MIN_MAG_MIP_LINEAR,
        AddressU: D3D12_TEXTURE_ADDRESS_MODE_CLAMP,
        AddressV: D3D12_TEXTURE_ADDRESS_MODE_CLAMP,
        AddressW: D3D12_TEXTURE_ADDRESS_MODE_CLAMP,
        ShaderVisibility: D3D12_SHADER_VISIBILITY_PIXEL,
        ..Default::default()
    }];

    let desc = D3D12_ROOT_SIGNATURE_DESC {
        NumParameters: parameters.len() as u32,
        pParameters: parameters.as_ptr(),
        NumStaticSamplers: samplers.len() as u32,
        pStaticSamplers: samplers.as_ptr(),
        Flags: D3D12_ROOT_SIGNATURE_FLAG_ALLOW_INPUT_ASSEMBLER_INPUT_LAYOUT,
    };

    unsafe {
        let mut blob = None;
        let mut error_blob = None;
        D3D12SerializeRootSignature(&desc, D3D_ROOT_SIGNATURE_VERSION_1, &mut blob, Some(&mut error_blob))?;
        let blob = blob.ok_or_else(|| anyhow!("Root signature serialization returned no blob"))?;
        Ok(device.CreateRootSignature(0, blob_bytes(&blob))?)
    }
}

/// Matches `geometry::Vertex`: position, uv, then color.
fn vertex_layout() -> [D3D12_INPUT_ELEMENT_DESC; 3] {
    let element = |name: &'static [u8], format: DXGI_FORMAT, offset: u32| D3D12_INPUT_ELEMENT_DESC {
        SemanticName: PCSTR(name.as_ptr()),
        SemanticIndex: 0,
        Format: format,
        InputSlot: 0,
        AlignedByteOffset: offset,
        InputSlotClass: D3D12_INPUT_CLASSIFICATION_PER_VERTEX_DATA,
        InstanceDataStepRate: 0,
    };
    [
        element(b"POSITION\0", DXGI_FORMAT_R32G32_FLOAT, 0),
        element(b"TEXCOORD\0", DXGI_FORMAT_R32G32_FLOAT, 8),
        element(b"COLOR\0", DXGI_FORMAT_R32G32B32A32_FLOAT, 16),
    ]
}

fn create_pipeline(
    device: &ID3D12Device,
    root_signature: &ID3D12RootSignature,
    pixel_shader: &str,
    blended: bool,
) -> Result<ID3D12PipelineState> {
    let vs = compile_shader(VS_SOURCE, "vs_5_0")?;
    let ps = compile_shader(pixel_shader, "ps_5_0")?;
    let layout = vertex_layout();

    unsafe {
        let mut desc = D3D12_GRAPHICS_PIPELINE_STATE_DESC {
            pRootSignature: ManuallyDrop::new(Some(root_signature.clone())),
            VS: bytecode(&vs),
            PS: bytecode(&ps),
            SampleMask: u32::MAX,
            RasterizerState: D3D12_RASTERIZER_DESC {
                FillMode: D3D12_FILL_MODE_SOLID,
                CullMode: D3D12_CULL_MODE_NONE,
                ..Default::default()
            },
            InputLayout: D3D12_INPUT_LAYOUT_DESC {
                pInputElementDescs: layout.as_ptr(),
                NumElements: layout.len() as u32,
            },
            PrimitiveTopologyType: D3D12_PRIMITIVE_TOPOLOGY_TYPE_TRIANGLE,
            NumRenderTargets: 1,
            SampleDesc: DXGI_SAMPLE_DESC { Count: 1, Quality: 0 },
            ..Default::default()
        };
        desc.RTVFormats[0] = BACKBUFFER_FORMAT;
        desc.BlendState.RenderTarget[0] = D3D12_RENDER_TARGET_BLEND_DESC {
            BlendEnable: blended.into(),
            SrcBlend: D3D12_BLEND_SRC_ALPHA,
            DestBlend: D3D12_BLEND_INV_SRC_ALPHA,
            BlendOp: D3D12_BLEND_OP_ADD,
            SrcBlendAlpha: D3D12_BLEND_ONE,
            DestBlendAlpha: D3D12_BLEND_INV_SRC_ALPHA,
            BlendOpAlpha: D3D12_BLEND_OP_ADD,
            RenderTargetWriteMask: D3D12_COLOR_WRITE_ENABLE_ALL.0 as u8,
            ..Default::default()
        };

        let pipeline = device.CreateGraphicsPipelineState(&desc);
        // Drop the root signature reference the descriptor took
        let _ = ManuallyDrop::into_inner(desc.pRootSignature);
        Ok(pipeline?)
    }
}

fn bytecode(blob: &ID3DBlob) -> D3D12_SHADER_BYTECODE {
    unsafe {
        D3D12_SHADER_BYTECODE {
            pShaderBytecode: blob.GetBufferPointer(),
            BytecodeLength: blob.GetBufferSize(),
        }
    }
}

unsafe fn blob_bytes(blob: &ID3DBlob) -> &[u8] {
    unsafe { std::slice::from_raw_parts(blob.GetBufferPointer() as *const u8, blob.GetBufferSize()) }
}

/// Compiles HLSL with entry point `main` for `target`.
fn compile_shader(source: &str, target: &str) -> Result<ID3DBlob> {
    let target = CString::new(target)?;
    let mut blob = None;
    let mut error_blob = None;

    unsafe {
        let result = D3DCompile(
            source.as_ptr() as *const std::ffi::c_void,
            source.len(),
            None,
            None,
            None,
            PCSTR(c"main".as_ptr() as *const u8),
            PCSTR(target.as_ptr() as *const u8),
            D3DCOMPILE_OPTIMIZATION_LEVEL3,
            0,
            &mut blob,
            Some(&mut error_blob),
        );

        // The compiler reports warnings through the same blob
        if let Some(error_blob) = error_blob {
            let message = String::from_utf8_lossy(blob_bytes(&error_blob));
            if result.is_err() {
                error!(profile = ?target, "Shader compilation failed: {}", message);
            } else {
                warn!(profile = ?target, "Shader compiler: {}", message);
            }
        }

        result?;
    }
    blob.ok_or_else(|| anyhow!("Shader compiler returned no bytecode"))
}
