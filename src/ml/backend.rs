// ============================================================
// Layer 5 - Backend Selection
// ============================================================
// The model and training loop are generic over Burn's Backend.
// The concrete backend is picked at runtime from the CLI:
//
//   cpu → NdArray (works everywhere, used by the tests)
//   gpu → Wgpu    (Vulkan / Metal / DX12)
//
// Training wraps either one in Autodiff; validation and
// inference run on the plain inner backend.

use burn::backend::{Autodiff, NdArray, Wgpu};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub type CpuBackend = NdArray;
pub type GpuBackend = Wgpu;

pub type CpuTrainBackend = Autodiff<CpuBackend>;
pub type GpuTrainBackend = Autodiff<GpuBackend>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum DeviceKind {
    #[default]
    Cpu,
    Gpu,
}

pub fn cpu_device() -> burn::backend::ndarray::NdArrayDevice {
    burn::backend::ndarray::NdArrayDevice::Cpu
}

pub fn gpu_device() -> burn::backend::wgpu::WgpuDevice {
    burn::backend::wgpu::WgpuDevice::default()
}
