use tracing::debug;
use zdraw_core::geometry::{Frame, Point3};

use crate::host::FrameAccess;

/// 工作坐标系守卫。
///
/// 创建时保存当前坐标系快照；[`FrameGuard::activate`] 在首点离开工作平面时把坐标系
/// 沿法向平移到经过首点的平面；[`FrameGuard::restore`] 或 `Drop` 写回快照，且只写一次。
pub struct FrameGuard<'a> {
    frames: &'a mut dyn FrameAccess,
    snapshot: Frame,
    restored: bool,
}

impl<'a> FrameGuard<'a> {
    pub fn new(frames: &'a mut dyn FrameAccess) -> Self {
        let snapshot = frames.frame();
        Self {
            frames,
            snapshot,
            restored: false,
        }
    }

    /// 操作开始前的坐标系。
    #[inline]
    pub fn snapshot(&self) -> Frame {
        self.snapshot
    }

    #[inline]
    pub fn active(&self) -> Frame {
        self.frames.frame()
    }

    /// 以首点对齐工作平面，返回是否发生了平移。位移总是相对快照计算，不会累积。
    pub fn activate(&mut self, first_point: Point3) -> bool {
        let elevation = self.snapshot.elevation_of(first_point);
        if elevation == 0.0 {
            if self.frames.frame() != self.snapshot {
                self.frames.set_frame(self.snapshot);
            }
            return false;
        }

        let offset = self.snapshot.normal().scale(elevation);
        self.frames.set_frame(self.snapshot.displaced(offset));
        debug!(elevation, "工作平面已平移至首点");
        true
    }

    /// 写回快照并结束守卫。
    pub fn restore(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.restored {
            return;
        }
        self.frames.set_frame(self.snapshot);
        self.restored = true;
        debug!("工作坐标系已恢复");
    }
}

impl Drop for FrameGuard<'_> {
    fn drop(&mut self) {
        self.release();
    }
}
