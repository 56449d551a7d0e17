//! Engine-agnostic metrics for chunk meshing.
//!
//! Feature-gated and runtime-toggled so recording costs nothing when
//! disabled. [`crate::task_queue::ChunkMeshingStage`] feeds a
//! [`MeshingMetrics`] on every tick.
//!
//! # Usage
//!
//! ```ignore
//! use voxel_mesher::metrics::{MeshingMetrics, COLLECT_METRICS};
//!
//! // Compile with --features metrics
//! // Runtime toggle:
//! COLLECT_METRICS.store(false, Ordering::Relaxed);
//!
//! // Per chunk:
//! metrics.record_extract_timing(extract_us);
//! metrics.record_chunk(&lods);
//! ```

use std::collections::VecDeque;
use std::mem::size_of;
#[cfg(feature = "metrics")]
use std::sync::atomic::Ordering;
use std::sync::atomic::AtomicBool;

use glam::{DVec2, DVec3};

use crate::types::{LinearColor, MeshData, Tangent};

/// LOD slots tracked individually; deeper LODs share the last slot.
pub const TRACKED_LODS: usize = 8;

/// Runtime toggle for metrics collection.
pub static COLLECT_METRICS: AtomicBool = AtomicBool::new(true);

/// Check if metrics collection is enabled (both compile-time and runtime).
#[inline]
pub fn is_enabled() -> bool {
    #[cfg(feature = "metrics")]
    {
        COLLECT_METRICS.load(Ordering::Relaxed)
    }
    #[cfg(not(feature = "metrics"))]
    {
        false
    }
}

/// Rolling window for storing recent values (e.g., timing history).
#[derive(Debug, Clone)]
pub struct RollingWindow<T> {
    buffer: VecDeque<T>,
    capacity: usize,
}

impl<T> RollingWindow<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push a new value, evicting the oldest if at capacity.
    pub fn push(&mut self, value: T) {
        if self.capacity == 0 {
            return;
        }
        if self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.buffer.iter()
    }

    pub fn last(&self) -> Option<&T> {
        self.buffer.back()
    }
}

impl<T: Copy + Default + std::ops::Add<Output = T>> RollingWindow<T> {
    pub fn sum(&self) -> T {
        self.buffer.iter().copied().fold(T::default(), |acc, x| acc + x)
    }
}

impl RollingWindow<u64> {
    pub fn average(&self) -> f64 {
        if self.buffer.is_empty() {
            0.0
        } else {
            self.sum() as f64 / self.buffer.len() as f64
        }
    }

    pub fn min_max(&self) -> Option<(u64, u64)> {
        let min = self.buffer.iter().min()?;
        let max = self.buffer.iter().max()?;
        Some((*min, *max))
    }
}

impl Default for RollingWindow<u64> {
    fn default() -> Self {
        Self::new(128)
    }
}

/// Approximate heap size of one LOD's attribute and index buffers.
pub fn mesh_data_bytes(lod: &MeshData) -> u64 {
    let per_vertex = 2 * size_of::<DVec3>()
        + size_of::<Tangent>()
        + size_of::<DVec2>()
        + size_of::<LinearColor>();
    (lod.vertex_count() * per_vertex + lod.indices.len() * size_of::<u32>()) as u64
}

/// Statistics over every chunk meshed since the last reset.
#[derive(Debug, Clone)]
pub struct MeshingMetrics {
    // Output
    /// Emitted vertices per LOD index.
    pub vertices_per_lod: [u64; TRACKED_LODS],
    /// Emitted triangles per LOD index.
    pub triangles_per_lod: [u64; TRACKED_LODS],
    /// LODs that came out empty (degenerate mesh).
    pub empty_lods: u64,
    /// Approximate size of all emitted render buffers.
    pub mesh_memory_bytes: u64,

    // Timing
    /// Rolling window of extraction times in microseconds.
    pub extract_timings: RollingWindow<u64>,
    /// Rolling window of assembly times in microseconds.
    pub assemble_timings: RollingWindow<u64>,
    /// Rolling window of whole-tick times in microseconds.
    pub tick_timings: RollingWindow<u64>,
    pub last_extract_us: u64,
    pub last_assemble_us: u64,

    // Counters
    /// Chunks that produced render data.
    pub total_chunks: u64,
    /// Chunks whose run ended in an error (cancellation included).
    pub failed_chunks: u64,
}

impl Default for MeshingMetrics {
    fn default() -> Self {
        Self {
            vertices_per_lod: [0; TRACKED_LODS],
            triangles_per_lod: [0; TRACKED_LODS],
            empty_lods: 0,
            mesh_memory_bytes: 0,
            extract_timings: RollingWindow::new(128),
            assemble_timings: RollingWindow::new(128),
            tick_timings: RollingWindow::new(128),
            last_extract_us: 0,
            last_assemble_us: 0,
            total_chunks: 0,
            failed_chunks: 0,
        }
    }
}

impl MeshingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset everything except the cumulative chunk counters.
    pub fn reset(&mut self) {
        self.vertices_per_lod.fill(0);
        self.triangles_per_lod.fill(0);
        self.empty_lods = 0;
        self.mesh_memory_bytes = 0;
        self.extract_timings.clear();
        self.assemble_timings.clear();
        self.tick_timings.clear();
        self.last_extract_us = 0;
        self.last_assemble_us = 0;
    }

    pub fn record_extract_timing(&mut self, timing_us: u64) {
        if is_enabled() {
            self.extract_timings.push(timing_us);
            self.last_extract_us = timing_us;
        }
    }

    pub fn record_assemble_timing(&mut self, timing_us: u64) {
        if is_enabled() {
            self.assemble_timings.push(timing_us);
            self.last_assemble_us = timing_us;
        }
    }

    pub fn record_tick_timing(&mut self, timing_us: u64) {
        if is_enabled() {
            self.tick_timings.push(timing_us);
        }
    }

    /// Record the LODs of one successfully meshed chunk.
    pub fn record_chunk(&mut self, lods: &[MeshData]) {
        if !is_enabled() {
            return;
        }

        for (index, lod) in lods.iter().enumerate() {
            let slot = index.min(TRACKED_LODS - 1);
            self.vertices_per_lod[slot] += lod.vertex_count() as u64;
            self.triangles_per_lod[slot] += lod.triangle_count() as u64;
            self.mesh_memory_bytes += mesh_data_bytes(lod);
            if lod.is_empty() {
                self.empty_lods += 1;
            }
        }
        self.total_chunks += 1;
    }

    pub fn record_failure(&mut self) {
        if is_enabled() {
            self.failed_chunks += 1;
        }
    }

    pub fn total_vertices(&self) -> u64 {
        self.vertices_per_lod.iter().sum()
    }

    pub fn total_triangles(&self) -> u64 {
        self.triangles_per_lod.iter().sum()
    }

    pub fn avg_extract_timing_us(&self) -> f64 {
        self.extract_timings.average()
    }

    pub fn avg_assemble_timing_us(&self) -> f64 {
        self.assemble_timings.average()
    }

    pub fn mesh_memory_mb(&self) -> f64 {
        self.mesh_memory_bytes as f64 / 1_048_576.0
    }
}

#[cfg(all(test, feature = "metrics"))]
mod tests {
    use super::*;

    fn lod(vertices: usize, triangles: usize) -> MeshData {
        let mut data = MeshData::new();
        data.positions = vec![DVec3::ZERO; vertices];
        data.normals = vec![DVec3::Y; vertices];
        data.tangents = vec![Tangent::default(); vertices];
        data.uvs = vec![DVec2::ZERO; vertices];
        data.colors = vec![LinearColor::default(); vertices];
        data.indices = vec![0; triangles * 3];
        data
    }

    #[test]
    fn test_rolling_window() {
        let mut window = RollingWindow::new(3);
        assert!(window.is_empty());
        assert_eq!(window.min_max(), None);

        window.push(10u64);
        window.push(20);
        window.push(30);
        assert_eq!(window.sum(), 60);
        assert_eq!(window.average(), 20.0);

        // Oldest evicted
        window.push(40);
        assert_eq!(window.len(), 3);
        assert_eq!(window.sum(), 90);
        assert_eq!(window.min_max(), Some((20, 40)));
        assert_eq!(window.last(), Some(&40));
    }

    #[test]
    fn test_zero_capacity_window_stays_empty() {
        let mut window = RollingWindow::new(0);
        window.push(5u64);
        assert!(window.is_empty());
    }

    #[test]
    fn test_record_chunk() {
        let mut metrics = MeshingMetrics::new();

        metrics.record_chunk(&[lod(100, 180), lod(40, 60), lod(0, 0)]);
        metrics.record_chunk(&[lod(50, 90)]);

        assert_eq!(metrics.total_chunks, 2);
        assert_eq!(metrics.vertices_per_lod[0], 150);
        assert_eq!(metrics.triangles_per_lod[1], 60);
        assert_eq!(metrics.total_vertices(), 190);
        assert_eq!(metrics.total_triangles(), 330);
        assert_eq!(metrics.empty_lods, 1);
        assert!(metrics.mesh_memory_bytes > 190 * 24);

        metrics.reset();
        assert_eq!(metrics.total_vertices(), 0);
        assert_eq!(metrics.total_chunks, 2);
    }

    #[test]
    fn test_deep_lods_share_last_slot() {
        let mut metrics = MeshingMetrics::new();
        let lods: Vec<MeshData> = (0..TRACKED_LODS + 2).map(|_| lod(3, 1)).collect();
        metrics.record_chunk(&lods);
        assert_eq!(metrics.vertices_per_lod[TRACKED_LODS - 1], 9);
    }

    #[test]
    fn test_timing_recording() {
        let mut metrics = MeshingMetrics::new();

        metrics.record_extract_timing(1000);
        metrics.record_extract_timing(3000);
        metrics.record_assemble_timing(500);
        metrics.record_failure();

        assert_eq!(metrics.avg_extract_timing_us(), 2000.0);
        assert_eq!(metrics.last_extract_us, 3000);
        assert_eq!(metrics.last_assemble_us, 500);
        assert_eq!(metrics.failed_chunks, 1);
    }
}
