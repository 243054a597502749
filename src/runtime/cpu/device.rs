//! Host CPU device

use crate::runtime::Device;

/// The host CPU, selected when `Params::gpu_id` is `None`
///
/// There is exactly one; every instance compares equal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CpuDevice {
    id: usize,
}

impl CpuDevice {
    /// The host device
    pub fn new() -> Self {
        Self { id: 0 }
    }
}

impl Device for CpuDevice {
    fn id(&self) -> usize {
        self.id
    }

    fn name(&self) -> String {
        "cpu".to_string()
    }
}
