// ============================================================
// Layer 5 — Backend Selection
// ============================================================
// Maps the DeviceKind chosen on the command line (or in the
// settings file) onto a concrete Burn backend:
//
//   cpu → Autodiff<NdArray>
//   gpu → Autodiff<Wgpu>        (only with the `wgpu` feature)
//
// Work that has to run on "whatever backend was chosen" implements
// BackendTask; `dispatch` instantiates it for the right backend.
//
// Reference: Burn Book §2 (Backends)

use anyhow::Result;
use burn::{
    backend::{ndarray::NdArrayDevice, Autodiff, NdArray},
    tensor::backend::AutodiffBackend,
};

use crate::domain::settings::DeviceKind;

pub type CpuBackend = Autodiff<NdArray>;

#[cfg(feature = "wgpu")]
pub type GpuBackend = Autodiff<burn::backend::Wgpu>;

/// A unit of work that is generic over the training backend.
pub trait BackendTask {
    type Output;

    fn run<B: AutodiffBackend>(self, device: B::Device) -> Result<Self::Output>;
}

pub fn dispatch<T: BackendTask>(kind: DeviceKind, task: T) -> Result<T::Output> {
    match kind {
        DeviceKind::Cpu => {
            tracing::info!("Using CPU backend (ndarray)");
            task.run::<CpuBackend>(NdArrayDevice::Cpu)
        }
        DeviceKind::Gpu => run_on_gpu(task),
    }
}

#[cfg(feature = "wgpu")]
fn run_on_gpu<T: BackendTask>(task: T) -> Result<T::Output> {
    tracing::info!("Using GPU backend (wgpu)");
    task.run::<GpuBackend>(burn::backend::wgpu::WgpuDevice::default())
}

#[cfg(not(feature = "wgpu"))]
fn run_on_gpu<T: BackendTask>(_task: T) -> Result<T::Output> {
    anyhow::bail!("GPU device requested, but this binary was built without the `wgpu` feature")
}
